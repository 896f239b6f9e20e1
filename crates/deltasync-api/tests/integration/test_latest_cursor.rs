//! Integration tests for the latest-cursor endpoint

use deltasync_api::delta;

use crate::common;

#[tokio::test]
async fn test_latest_cursor_returns_body_cursor() {
    let server = wiremock::MockServer::start().await;
    common::mount_latest_cursor(&server).await;

    let cursor = common::inbox(&server)
        .latest_cursor()
        .await
        .expect("latest cursor request failed");

    assert_eq!(cursor.as_str(), common::LATEST_CURSOR);
}

#[tokio::test]
async fn test_latest_cursor_is_a_single_post() {
    let server = wiremock::MockServer::start().await;
    common::mount_latest_cursor(&server).await;

    delta::get_latest_cursor(&common::client(&server))
        .await
        .expect("latest cursor request failed");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "POST");
    assert_eq!(requests[0].url.path(), "/delta/latest_cursor");
}
