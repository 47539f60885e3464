//! Drives the sync controller against a mock session API.

use std::time::Duration;

use chatview_core::{
    HttpSessionApi, LoadState, SEND_FAILED_TEXT, SyncController, SyncEffect, SyncEvent,
    execute_effect,
};
use chatview_types::{Content, MessageStatus};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Runs effects until the controller goes quiet.
async fn pump(api: &HttpSessionApi, controller: &mut SyncController, event: SyncEvent) {
    let mut queue: Vec<SyncEffect> = controller.handle(event);
    while let Some(effect) = queue.pop() {
        let completion = execute_effect(api, effect).await;
        queue.extend(controller.handle(completion));
    }
}

async fn mount_sessions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sessions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [
                {"id": "s1", "title": "Weather", "created_at": "2024-01-01T00:00:00"},
                {"id": "s2", "title": "Sales", "created_at": "2024-01-02T00:00:00"}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1",
            "title": "Weather",
            "created_at": "2024-01-01T00:00:00",
            "messages": [
                {"id": 1, "chat_session_id": "s1", "role": "user",
                 "content": {"text": "weather?"}, "created_at": "2024-01-01T00:00:01"},
                {"id": 2, "chat_session_id": "s1", "role": "ai",
                 "content": {"text": "sunny"}, "created_at": "2024-01-01T00:00:02"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn api(server: &MockServer) -> HttpSessionApi {
    HttpSessionApi::new(&server.uri(), Some(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn test_discovery_selects_and_loads_first_session() {
    let server = MockServer::start().await;
    mount_sessions(&server).await;
    let api = api(&server);
    let mut controller = SyncController::new("1");

    pump(&api, &mut controller, SyncEvent::Init).await;

    assert_eq!(controller.selected_session_id(), Some("s1"));
    assert_eq!(controller.load_state("s1"), LoadState::Loaded);
    let messages = controller.store().ordered_messages("s1");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, Content::text("sunny"));

    // Reselecting a loaded session hits the network no more (`expect(1)`).
    pump(
        &api,
        &mut controller,
        SyncEvent::Select {
            session_id: "s2".into(),
        },
    )
    .await;
    pump(
        &api,
        &mut controller,
        SyncEvent::Select {
            session_id: "s1".into(),
        },
    )
    .await;
}

#[tokio::test]
async fn test_send_round_trip_commits_reply() {
    let server = MockServer::start().await;
    mount_sessions(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"query": "and tomorrow?", "chatId": "s1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"blocks": [{"block_type": "text", "text": "rain"}]},
            "chat_id": "s1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let api = api(&server);
    let mut controller = SyncController::new("1");
    pump(&api, &mut controller, SyncEvent::Init).await;

    pump(
        &api,
        &mut controller,
        SyncEvent::Submit {
            text: "and tomorrow?".into(),
        },
    )
    .await;

    let messages = controller.store().ordered_messages("s1");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].status, MessageStatus::Committed);
    assert_eq!(messages[3].content.plain_text(), "rain");
    assert!(!controller.is_sending("s1"));
}

#[tokio::test]
async fn test_server_error_resolves_placeholder_to_error_text() {
    let server = MockServer::start().await;
    mount_sessions(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .mount(&server)
        .await;
    let api = api(&server);
    let mut controller = SyncController::new("1");
    pump(&api, &mut controller, SyncEvent::Init).await;

    pump(
        &api,
        &mut controller,
        SyncEvent::Submit { text: "hi".into() },
    )
    .await;

    let messages = controller.store().ordered_messages("s1");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].content, Content::text("hi"));
    assert_eq!(messages[3].content, Content::text(SEND_FAILED_TEXT));
    assert_eq!(messages[3].status, MessageStatus::Failed);
    assert!(!controller.is_sending("s1"));
}

#[tokio::test]
async fn test_create_session_lands_first_and_selected() {
    let server = MockServer::start().await;
    mount_sessions(&server).await;
    Mock::given(method("POST"))
        .and(path("/sessions/1"))
        .and(body_json(json!({"title": "New Chat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s3", "title": "New Chat", "created_at": "2024-01-03T00:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let api = api(&server);
    let mut controller = SyncController::new("1");
    pump(&api, &mut controller, SyncEvent::Init).await;

    pump(
        &api,
        &mut controller,
        SyncEvent::CreateSession { title: None },
    )
    .await;

    let ids: Vec<_> = controller
        .store()
        .sessions()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, ["s3", "s1", "s2"]);
    assert_eq!(controller.selected_session_id(), Some("s3"));
    assert!(controller.store().ordered_messages("s3").is_empty());
}
