//! Shared test helpers for change-log API integration tests
//!
//! Provides wiremock-based mock server setup for the three delta endpoints.
//! Each helper mounts the necessary mock endpoints; [`inbox`] returns an
//! Inbox pointing at the mock server.

use serde_json::{json, Value};
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deltasync_api::client::ApiClient;
use deltasync_api::inbox::Inbox;

pub const ACCESS_TOKEN: &str = "UXXMOCJW-BKSLPCFI-UQAQFWLO";
pub const LATEST_CURSOR: &str = "cx7ln1akyj2qgdu6o5d5bakuw";
pub const NTH_CURSOR: &str = "a9vtneydekzye7uwfumdd4iu3";
pub const MESSAGE_ID: &str = "c7mllq7iag2ivlp6fxf7dhg9i";
pub const EVENT_ID: &str = "db0isjjvqez51vdjeq5lx37dk";

pub fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_base_url(ACCESS_TOKEN, server.uri())
}

pub fn inbox(server: &MockServer) -> Inbox {
    Inbox::from_client(client(server))
}

pub fn message_record(cursor: &str, event: &str, id: &str, subject: &str) -> Value {
    json!({
        "cursor": cursor,
        "event": event,
        "object": "message",
        "id": id,
        "attributes": {
            "id": id,
            "object": "message",
            "subject": subject,
            "unread": true
        }
    })
}

pub fn event_delete_record(cursor: &str, id: &str) -> Value {
    json!({
        "cursor": cursor,
        "event": "delete",
        "object": "event",
        "id": id
    })
}

/// First page after cursor `0`: one message modification
pub fn first_page() -> Value {
    json!({
        "cursor_start": "0",
        "cursor_end": NTH_CURSOR,
        "deltas": [
            message_record(NTH_CURSOR, "modify", "4ts2n4k4yo0bnb9l9w3k8zrxt", "Re: Lunch")
        ]
    })
}

/// Second page after the first page's cursor: a create and a delete
///
/// `cursor_end` equals the request cursor, so it is the last page.
pub fn second_page() -> Value {
    json!({
        "cursor_start": NTH_CURSOR,
        "cursor_end": NTH_CURSOR,
        "deltas": [
            message_record("7ovkw1gjgnrt6ltcsi8xlkl98", "create", MESSAGE_ID, "Lunch"),
            event_delete_record("eh0xdn2s6mfd3v0r6lh2vq6la", EVENT_ID)
        ]
    })
}

/// Mounts `POST /delta/latest_cursor`
pub async fn mount_latest_cursor(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/delta/latest_cursor"))
        .and(basic_auth(ACCESS_TOKEN, ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cursor": LATEST_CURSOR })))
        .mount(server)
        .await;
}

/// Mounts one `GET /delta` page for `cursor`, expected exactly once
pub async fn mount_page(server: &MockServer, cursor: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", cursor))
        .and(query_param("exclude_folders", "false"))
        .and(basic_auth(ACCESS_TOKEN, ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the two-page fixture
pub async fn mount_two_pages(server: &MockServer) {
    mount_page(server, "0", first_page()).await;
    mount_page(server, NTH_CURSOR, second_page()).await;
}

/// Mounts `GET /delta/streaming` returning `body` and then closing
pub async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .and(query_param("cursor", "0"))
        .and(query_param("exclude_folders", "false"))
        .and(basic_auth(ACCESS_TOKEN, ""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .append_header("Content-Type", "application/json"),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Streaming body equivalent to the two-page fixture
pub fn stream_body() -> String {
    [
        message_record(NTH_CURSOR, "modify", "4ts2n4k4yo0bnb9l9w3k8zrxt", "Re: Lunch"),
        message_record("7ovkw1gjgnrt6ltcsi8xlkl98", "create", MESSAGE_ID, "Lunch"),
        event_delete_record("eh0xdn2s6mfd3v0r6lh2vq6la", EVENT_ID),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}
