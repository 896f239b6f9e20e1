//! Integration tests for the paginated delta pull
//!
//! Verifies against a wiremock server:
//! - Callback mode follows pages by cursor and stops on a stalled cursor
//! - Objects resolve to the variant matching their type tag
//! - Lazy mode yields the same set and can be re-run
//! - Bogus records are skipped without error
//! - Filter options reach the query string

use std::collections::HashSet;

use deltasync_api::models::DomainObject;
use deltasync_core::domain::{Cursor, DeltaFilter, EventKind, SyncSession};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_callback_mode_follows_two_pages() {
    let server = MockServer::start().await;
    common::mount_two_pages(&server).await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let mut count = 0;
    let summary = common::inbox(&server)
        .deltas(&mut session, |event, object| {
            assert!(!object.cursor().as_str().is_empty());
            match event {
                EventKind::Create | EventKind::Modify => {
                    assert!(matches!(object, DomainObject::Message(_)))
                }
                EventKind::Delete => assert!(matches!(object, DomainObject::Event(_))),
            }
            count += 1;
        })
        .await
        .expect("delta pull failed");

    assert_eq!(count, 3);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.final_cursor.as_str(), "eh0xdn2s6mfd3v0r6lh2vq6la");
    // expect(1) on both pages is verified when the server drops
}

#[tokio::test]
async fn test_lazy_mode_yields_expected_set() {
    let server = MockServer::start().await;
    common::mount_page(&server, common::NTH_CURSOR, common::second_page()).await;

    let deltas = common::inbox(&server)
        .deltas_iter(Cursor::new(common::NTH_CURSOR).unwrap(), DeltaFilter::new());

    let seen: HashSet<(EventKind, String)> = deltas
        .collect()
        .await
        .expect("lazy pull failed")
        .into_iter()
        .map(|(event, object)| (event, object.id().to_string()))
        .collect();

    let expected: HashSet<(EventKind, String)> = [
        (EventKind::Create, common::MESSAGE_ID.to_string()),
        (EventKind::Delete, common::EVENT_ID.to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_lazy_mode_is_lazy_and_repeatable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", common::NTH_CURSOR))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::second_page()))
        .expect(2)
        .mount(&server)
        .await;

    let deltas = common::inbox(&server)
        .deltas_iter(Cursor::new(common::NTH_CURSOR).unwrap(), DeltaFilter::new());
    assert!(server.received_requests().await.unwrap().is_empty());

    let first: Vec<String> = deltas
        .collect()
        .await
        .unwrap()
        .iter()
        .map(|(_, o)| o.id().to_string())
        .collect();
    let second: Vec<String> = deltas
        .collect()
        .await
        .unwrap()
        .iter()
        .map(|(_, o)| o.id().to_string())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_bogus_records_are_skipped() {
    let server = MockServer::start().await;
    common::mount_page(
        &server,
        "0",
        json!({
            "cursor_start": "0",
            "cursor_end": "0",
            "deltas": [
                { "bogus": true },
                common::message_record("c1", "create", common::MESSAGE_ID, "Hi"),
                { "cursor": "c2", "event": "create", "object": "message" },
                common::message_record("c3", "modify", common::MESSAGE_ID, "Hi again"),
                { "cursor": "c4", "event": "create", "object": "hologram", "id": "h1" },
                { "cursor": "c5", "event": "explode", "object": "message", "id": "m9" },
                common::event_delete_record("c6", common::EVENT_ID),
                "not a record"
            ]
        }),
    )
    .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let mut count = 0;
    let summary = common::inbox(&server)
        .deltas(&mut session, |_, _| count += 1)
        .await
        .expect("bogus records must not fail the pull");

    assert_eq!(count, 3);
    assert_eq!(summary.skipped, 5);
    assert_eq!(summary.final_cursor.as_str(), "c6");
}

#[tokio::test]
async fn test_opaque_fallback_delivers_unknown_types() {
    let server = MockServer::start().await;
    common::mount_page(
        &server,
        "0",
        json!({
            "cursor_start": "0",
            "cursor_end": "0",
            "deltas": [
                { "cursor": "c1", "event": "create", "object": "hologram", "id": "h1", "attributes": {} }
            ]
        }),
    )
    .await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let mut tags = Vec::new();
    common::inbox(&server)
        .with_opaque_fallback(true)
        .deltas(&mut session, |_, object| tags.push(object.type_tag().to_string()))
        .await
        .unwrap();

    assert_eq!(tags, vec!["hologram"]);
}

#[tokio::test]
async fn test_filter_options_in_query_and_expanded_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", "0"))
        .and(query_param("exclude_folders", "true"))
        .and(query_param("exclude_types", "contact,event"))
        .and(query_param("view", "expanded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor_start": "0",
            "cursor_end": "0",
            "deltas": [
                common::message_record("c1", "create", common::MESSAGE_ID, "Hi"),
                { "cursor": "c2", "event": "create", "object": "contact", "id": "p1", "attributes": {} }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = DeltaFilter::from_types(["event", "contact"], Vec::<String>::new())
        .unwrap()
        .with_exclude_folders(true)
        .with_expanded_view(true);
    let mut session = SyncSession::new(Cursor::beginning(), filter);
    let mut objects = Vec::new();

    common::inbox(&server)
        .deltas(&mut session, |_, object| objects.push(object))
        .await
        .unwrap();

    // The contact is dropped client-side even though the server sent it
    assert_eq!(objects.len(), 1);
    assert!(matches!(objects[0], DomainObject::ExpandedMessage(_)));
}

#[tokio::test]
async fn test_exclude_folders_applies_when_server_ignores_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", "0"))
        .and(query_param("exclude_folders", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor_start": "0",
            "cursor_end": "c3",
            "deltas": [
                { "cursor": "c1", "event": "create", "object": "folder", "id": "f1", "attributes": {} },
                { "cursor": "c2", "event": "modify", "object": "label", "id": "l1", "attributes": {} },
                common::message_record("c3", "create", common::MESSAGE_ID, "Hi")
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/delta"))
        .and(query_param("cursor", "c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cursor_start": "c3",
            "cursor_end": "c3",
            "deltas": []
        })))
        .mount(&server)
        .await;

    let filter = DeltaFilter::new().with_exclude_folders(true);
    let mut session = SyncSession::new(Cursor::beginning(), filter);
    let mut tags = Vec::new();

    let summary = common::inbox(&server)
        .deltas(&mut session, |_, object| tags.push(object.type_tag().to_string()))
        .await
        .unwrap();

    assert_eq!(tags, vec!["message"]);
    assert_eq!(summary.skipped, 2);
}

#[tokio::test]
async fn test_stop_handle_ends_pull_early() {
    let server = MockServer::start().await;
    common::mount_page(&server, "0", common::first_page()).await;

    let mut session = SyncSession::new(Cursor::beginning(), DeltaFilter::new());
    let stop = session.stop_handle();
    let summary = common::inbox(&server)
        .deltas(&mut session, |_, _| stop.stop())
        .await
        .unwrap();

    assert!(summary.stopped_by_consumer);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.final_cursor.as_str(), common::NTH_CURSOR);
}
