//! Tracing subscriber setup.
//!
//! Events go to stderr so stdout stays parseable. The filter comes from
//! `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `format` is `"human"` or `"json"`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
