//! Integration tests for the networked commands against a mock session
//! service.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn chatview(home: &TempDir, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("chatview");
    cmd.env("CHATVIEW_HOME", home.path())
        .env_remove("CHATVIEW_BASE_URL")
        .env_remove("CHATVIEW_IDENTITY")
        .args(["--base-url", &server.uri()]);
    cmd
}

#[tokio::test]
async fn test_sessions_list() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [
                {"id": "s1", "title": "Budget", "created_at": "2024-03-01T09:30:00"},
                {"id": "s2", "title": "Trip", "created_at": "2024-03-02T10:00:00"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["--identity", "7", "sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s1  Budget  2024-03-01 09:30"))
        .stdout(predicate::str::contains("s2  Trip"));
}

#[tokio::test]
async fn test_sessions_list_empty() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessions": []})))
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found."));
}

#[tokio::test]
async fn test_sessions_show_renders_transcript() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1",
            "title": "Budget",
            "created_at": "2024-03-01T09:30:00",
            "messages": [
                {"id": 1, "role": "user", "content": {"text": "total?"},
                 "created_at": "2024-03-01T09:31:00"},
                {"id": 2, "role": "ai", "content": {"blocks": [
                    {"block_type": "text", "text": "It is **12**."}
                ]}, "created_at": "2024-03-01T09:31:05"},
                {"id": 3, "role": "ai", "content": {"image": "x.png"},
                 "created_at": "2024-03-01T09:32:00"}
            ]
        })))
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["sessions", "show", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Budget (s1)"))
        .stdout(predicate::str::contains("You"))
        .stdout(predicate::str::contains("total?"))
        .stdout(predicate::str::contains("It is 12."))
        .stdout(predicate::str::contains("[unsupported content]"));
}

#[tokio::test]
async fn test_sessions_show_not_found() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Session not found"})))
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["sessions", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("load session 'missing'"))
        .stderr(predicate::str::contains("HTTP 404: Session not found"));
}

#[tokio::test]
async fn test_sessions_new_prints_id() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions/1"))
        .and(body_json(json!({"title": "Groceries"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s9", "title": "Groceries", "created_at": "2024-03-03T08:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["sessions", "new", "--title", "Groceries"])
        .assert()
        .success()
        .stdout(predicate::str::diff("s9\n"));
}

#[tokio::test]
async fn test_send_prints_rendered_reply() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"query": "how much?", "chatId": "s1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"blocks": [
                {"block_type": "text", "text": "Here you go"},
                {"block_type": "react", "code": "export default function T() { return <ul><li>rent 900</li></ul>; }"}
            ]},
            "chat_id": "s1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["send", "s1", "how much?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Here you go"))
        .stdout(predicate::str::contains("• rent 900"));
}

#[tokio::test]
async fn test_send_accepts_plain_string_reply() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "plain answer"})))
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["send", "s1", "hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plain answer"));
}

#[tokio::test]
async fn test_send_server_error() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["send", "s1", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("send message to session 's1'"))
        .stderr(predicate::str::contains("HTTP 500: boom"));
}

#[tokio::test]
async fn test_send_keeps_surrounding_whitespace() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"query": "  indented\n", "chatId": "s1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["send", "s1", "  indented\n"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[tokio::test]
async fn test_send_rejects_blank_text() {
    if !can_bind_localhost() {
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .expect(0)
        .mount(&server)
        .await;

    chatview(&home, &server)
        .args(["send", "s1", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message text is empty"));
}
