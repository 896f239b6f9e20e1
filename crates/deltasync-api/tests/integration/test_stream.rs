//! Integration tests for the streaming delta endpoint

use std::time::Duration;

use deltasync_api::models::DomainObject;
use deltasync_core::domain::{Cursor, DeltaFilter, EventKind, SessionState, SyncSession};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn session() -> SyncSession {
    SyncSession::new(Cursor::beginning(), DeltaFilter::new())
}

#[tokio::test]
async fn test_stream_dispatches_records_over_one_connection() {
    let server = MockServer::start().await;
    common::mount_stream(&server, common::stream_body()).await;

    let mut session = session();
    let mut count = 0;
    let summary = common::inbox(&server)
        .delta_stream(&mut session, None, |event, object| {
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
        .expect("delta stream failed");

    assert_eq!(count, 3);
    assert_eq!(summary.dispatched, 3);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stream_skips_bogus_records() {
    let server = MockServer::start().await;
    let body = format!(
        "{}{}\n{}{}{}",
        r#"{"bogus": true}"#,
        common::message_record("c1", "create", common::MESSAGE_ID, "Hi"),
        r#"{"cursor": "c2", "event": }"#,
        common::message_record("c3", "modify", common::MESSAGE_ID, "Hi again"),
        common::event_delete_record("c4", common::EVENT_ID),
    );
    common::mount_stream(&server, body).await;

    let mut session = session();
    let stop = session.stop_handle();
    let mut count = 0;
    common::inbox(&server)
        .delta_stream(&mut session, None, |event, _| {
            if event == EventKind::Delete {
                stop.stop();
                return;
            }
            count += 1;
        })
        .await
        .expect("bogus records must not fail the stream");

    assert_eq!(count, 2);
    assert_eq!(session.cursor().as_str(), "c4");
}

#[tokio::test]
async fn test_stream_drops_malformed_record_with_nested_record() {
    let server = MockServer::start().await;
    let ghost = common::event_delete_record("ghost", common::EVENT_ID);
    let body = format!(
        r#"{{"cursor":"c9","event":"create","object":"message","id":"m1","attributes":{} BROKEN}}{}"#,
        ghost,
        common::message_record("c10", "create", common::MESSAGE_ID, "Hi"),
    );
    common::mount_stream(&server, body).await;

    let mut session = session();
    let mut cursors = Vec::new();
    let summary = common::inbox(&server)
        .delta_stream(&mut session, None, |_, object| {
            cursors.push(object.cursor().as_str().to_string())
        })
        .await
        .expect("a malformed record must not fail the stream");

    assert_eq!(cursors, vec!["c10"]);
    assert_eq!(summary.skipped, 1);
    assert_eq!(session.cursor().as_str(), "c10");
}

#[tokio::test]
async fn test_stop_from_handler_halts_dispatch() {
    let server = MockServer::start().await;
    common::mount_stream(&server, common::stream_body()).await;

    let mut session = session();
    let stop = session.stop_handle();
    let mut count = 0;
    let summary = common::inbox(&server)
        .delta_stream(&mut session, None, |_, _| {
            count += 1;
            if count == 2 {
                stop.stop();
            }
        })
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert!(summary.stopped_by_consumer);
    assert_eq!(summary.final_cursor.as_str(), "7ovkw1gjgnrt6ltcsi8xlkl98");
}

#[tokio::test]
async fn test_stream_inactivity_timeout_is_not_hit_on_closed_body() {
    let server = MockServer::start().await;
    common::mount_stream(&server, common::stream_body()).await;

    let mut session = session();
    let summary = common::inbox(&server)
        .delta_stream(&mut session, Some(Duration::from_secs(5)), |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.dispatched, 3);
}

#[tokio::test]
async fn test_stream_uses_streaming_path_with_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delta/streaming"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = SyncSession::new(
        Cursor::new(common::NTH_CURSOR).unwrap(),
        DeltaFilter::new(),
    );
    let summary = common::inbox(&server)
        .delta_stream(&mut session, None, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.final_cursor.as_str(), common::NTH_CURSOR);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].url.query(),
        Some("cursor=a9vtneydekzye7uwfumdd4iu3&exclude_folders=false")
    );
}
