//! Integration tests for the HTTP feed against a local axum server.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use matchbell_feed::{EventFeed, FeedError, HttpEventFeed};

/// Helper: serve `app` on an ephemeral port, return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetches_and_decodes_matches() {
    let app = Router::new().route(
        "/matches",
        get(|| async {
            Json(json!({
                "matches": [
                    {"Team1": "India", "Team2": "Pakistan", "MatchTime": "2026-03-01T14:00:00Z", "MatchDuration": 420},
                    {"Team1": "England", "Team2": "Australia", "MatchTime": "2026-03-02 09:30:00"}
                ]
            }))
        }),
    );
    let base = serve(app).await;

    let feed = HttpEventFeed::new(format!("{base}/matches"), Duration::from_secs(5)).unwrap();
    let events = feed.fetch().await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].fixture(), "India vs Pakistan");
    assert_eq!(events[0].duration_minutes, 420);
    assert_eq!(events[1].duration_minutes, 360);
}

#[tokio::test]
async fn ids_are_stable_across_polls() {
    let app = Router::new().route(
        "/matches",
        get(|| async {
            Json(json!({
                "matches": [{"Team1": "India", "Team2": "Pakistan", "MatchTime": "2026-03-01T14:00:00Z"}]
            }))
        }),
    );
    let base = serve(app).await;
    let feed = HttpEventFeed::new(format!("{base}/matches"), Duration::from_secs(5)).unwrap();

    let first = feed.fetch().await.unwrap();
    let second = feed.fetch().await.unwrap();
    assert_eq!(first[0].id, second[0].id);
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let app = Router::new().route(
        "/matches",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    );
    let base = serve(app).await;
    let feed = HttpEventFeed::new(format!("{base}/matches"), Duration::from_secs(5)).unwrap();

    match feed.fetch().await {
        Err(FeedError::Status { status }) => assert_eq!(status, 503),
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_times_out() {
    let app = Router::new().route(
        "/matches",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"matches": []}))
        }),
    );
    let base = serve(app).await;
    let feed = HttpEventFeed::new(format!("{base}/matches"), Duration::from_millis(200)).unwrap();

    let err = feed.fetch().await.unwrap_err();
    assert!(matches!(err, FeedError::Timeout(_)), "got: {err:?}");
    assert!(err.is_network());
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let app = Router::new().route("/matches", get(|| async { "not json" }));
    let base = serve(app).await;
    let feed = HttpEventFeed::new(format!("{base}/matches"), Duration::from_secs(5)).unwrap();

    assert!(matches!(feed.fetch().await, Err(FeedError::Parse(_))));
}

#[tokio::test]
async fn unreachable_host_is_http_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let feed = HttpEventFeed::new(format!("http://{addr}/matches"), Duration::from_secs(2)).unwrap();
    let err = feed.fetch().await.unwrap_err();
    assert!(err.is_network(), "got: {err:?}");
}
