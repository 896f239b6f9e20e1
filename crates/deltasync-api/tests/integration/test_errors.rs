//! Integration tests for transport failures
//!
//! Non-success statuses surface as typed [`ApiError`]s reachable through
//! `anyhow::Error::downcast_ref`; the session cursor keeps every record the
//! handler already received.

use std::time::Duration;

use deltasync_api::client::ApiClient;
use deltasync_api::inbox::Inbox;
use deltasync_api::ApiError;
use deltasync_core::domain::{Cursor, DeltaFilter, SessionState, SyncSession};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_unauthorized_latest_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delta/latest_cursor"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let err = common::inbox(&server).latest_cursor().await.unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized(message)) => assert_eq!(message, "invalid token"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_too_many_requests_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "12"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let err = common::inbox(&server)
        .deltas(&mut session, |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::TooManyRequests { retry_after }) if *retry_after == Duration::from_secs(12)
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_server_error_mid_pull_keeps_cursor() {
    let server = MockServer::start().await;
    common::mount_page(&server, "0", common::first_page()).await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", common::NTH_CURSOR))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let mut count = 0;
    let err = common::inbox(&server)
        .deltas(&mut session, |_, _| count += 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::ServerError { status: 503, .. })
    ));
    assert_eq!(count, 1);
    assert_eq!(session.cursor().as_str(), common::NTH_CURSOR);
}

#[tokio::test]
async fn test_malformed_page_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let err = common::inbox(&server)
        .deltas(&mut session, |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_forbidden_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let err = common::inbox(&server)
        .delta_stream(&mut session, None, |_, _| {})
        .await
        .unwrap_err();

    let api_error = err.downcast_ref::<ApiError>().expect("typed error");
    assert!(api_error.is_auth_failure());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.cursor().is_beginning());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let inbox = Inbox::from_client(ApiClient::with_base_url(common::ACCESS_TOKEN, "http://127.0.0.1:1"));

    let err = inbox.latest_cursor().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Network(_))
    ));
}
