//! FRED client against a local stub server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::json;

use fred_sync::provider::FredClient;
use fred_sync_core::provider::ObservationProvider;

const API_KEY: &str = "sekrit-key-123";

#[derive(Default)]
struct Stub {
    hits: AtomicUsize,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

/// Series ids pick the stub's behaviour:
/// `FLAKY` fails with 500 on the first hit, `BROKEN` always 500s,
/// `MISSING` returns 400, `EMPTY` omits the observations key.
async fn observations(
    State(stub): State<Arc<Stub>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let hit = stub.hits.fetch_add(1, Ordering::SeqCst);
    stub.queries.lock().unwrap().push(params.clone());

    match params.get("series_id").map(String::as_str) {
        Some("FLAKY") if hit == 0 => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream hiccup").into_response()
        }
        Some("BROKEN") => (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response(),
        Some("MISSING") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error_code": 400,
                "error_message": "Bad Request.  The series does not exist."
            })),
        )
            .into_response(),
        Some("EMPTY") => Json(json!({ "count": 0 })).into_response(),
        _ => Json(json!({
            "observations": [
                { "date": "2020-01-01", "value": "21000" },
                { "date": "2020-02-01", "value": "." }
            ]
        }))
        .into_response(),
    }
}

async fn start_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/fred/series/observations", get(observations))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/fred/series", addr), stub)
}

fn client(base_url: &str, max_retries: u32) -> FredClient {
    FredClient::new(base_url, API_KEY, Duration::from_secs(5), max_retries)
        .unwrap()
        .with_backoff_base(Duration::from_millis(10))
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 12, 1).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_expected_query() {
    let (base, stub) = start_stub().await;

    let points = client(&base, 0)
        .fetch_observations("GDP", start())
        .await
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].raw_value, "21000");
    assert_eq!(points[1].raw_value, ".");

    let queries = stub.queries.lock().unwrap();
    let q = &queries[0];
    assert_eq!(q.get("series_id").map(String::as_str), Some("GDP"));
    assert_eq!(
        q.get("observation_start").map(String::as_str),
        Some("2019-12-01")
    );
    assert_eq!(q.get("api_key").map(String::as_str), Some(API_KEY));
    assert_eq!(q.get("file_type").map(String::as_str), Some("json"));
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let (base, stub) = start_stub().await;

    client(&format!("{}/", base), 0)
        .fetch_observations("GDP", start())
        .await
        .unwrap();

    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_observations_key_is_empty() {
    let (base, _stub) = start_stub().await;

    let points = client(&base, 0)
        .fetch_observations("EMPTY", start())
        .await
        .unwrap();

    assert!(points.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (base, stub) = start_stub().await;

    let points = client(&base, 2)
        .fetch_observations("FLAKY", start())
        .await
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_error_fails_fast() {
    let (base, stub) = start_stub().await;

    let err = client(&base, 3)
        .fetch_observations("MISSING", start())
        .await
        .unwrap_err();

    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);
    assert!(err.to_string().contains("The series does not exist."));
    assert!(!format!("{:#}", err).contains(API_KEY));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let (base, stub) = start_stub().await;

    let err = client(&base, 2)
        .fetch_observations("BROKEN", start())
        .await
        .unwrap_err();

    assert_eq!(stub.hits.load(Ordering::SeqCst), 3);
    assert!(err.to_string().contains("500"));
    assert!(!format!("{:#}", err).contains(API_KEY));
}

#[tokio::test]
async fn test_connection_error_hides_api_key() {
    // Grab a free port, then close it so the connect is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/fred/series", addr), 1)
        .fetch_observations("GDP", start())
        .await
        .unwrap_err();

    let text = format!("{:#}", err);
    assert!(text.contains("provider request failed"));
    assert!(!text.contains(API_KEY));
}
