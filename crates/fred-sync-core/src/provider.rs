//! External time-series provider abstraction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::ProviderObservation;

/// A source of observations for a series.
///
/// Implementations return every point dated on or after
/// `observation_start`. An empty vector means the series is up to date.
/// Transport, HTTP, and decoding failures are reported as `Err` and the
/// caller treats them as a failure of this one series.
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    async fn fetch_observations(
        &self,
        series_id: &str,
        observation_start: NaiveDate,
    ) -> Result<Vec<ProviderObservation>>;
}
