//! HTTP client for the session API.

use std::time::Duration;

use anyhow::{Context, Result};
use chatview_types::Session;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::wire::{ChatReply, ChatRequest, CreateSessionRequest, SessionList};
use super::{ApiResult, SessionApi};
use crate::config::Config;
use crate::error::NetworkError;

/// User-Agent header for session API requests.
pub const USER_AGENT: &str = concat!("chatview/", env!("CARGO_PKG_VERSION"));

/// Session API over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    base: Url,
    http: reqwest::Client,
}

impl HttpSessionApi {
    /// Creates a client rooted at `base_url`.
    ///
    /// `timeout` bounds every request end to end; `None` disables it.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("Invalid base URL: {base_url}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Base URL cannot carry a path: {base_url}");
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { base, http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Joins percent-encoded path segments onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(&e))?;
        decode(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> ApiResult<T> {
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(&e))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| NetworkError::from_reqwest(&e))?;

    if !status.is_success() {
        return Err(NetworkError::http_status(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| NetworkError::decode(format!("Unexpected response shape: {e}")))
}

impl SessionApi for HttpSessionApi {
    async fn list_sessions(&self, identity: &str) -> ApiResult<Vec<Session>> {
        let list: SessionList = self.get_json(self.endpoint(&["sessions", identity])).await?;
        Ok(list.sessions)
    }

    async fn fetch_session(&self, session_id: &str) -> ApiResult<Session> {
        self.get_json(self.endpoint(&["sessions", session_id])).await
    }

    async fn create_session(&self, identity: &str, title: &str) -> ApiResult<Session> {
        self.post_json(
            self.endpoint(&["sessions", identity]),
            &CreateSessionRequest { title },
        )
        .await
    }

    async fn send_message(&self, session_id: &str, query: &str) -> ApiResult<ChatReply> {
        self.post_json(
            self.endpoint(&["chat"]),
            &ChatRequest {
                query,
                chat_id: session_id,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use chatview_types::Role;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::NetworkErrorKind;

    fn client(server: &MockServer) -> HttpSessionApi {
        HttpSessionApi::new(&server.uri(), Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_endpoint_percent_encodes_segments() {
        let api = HttpSessionApi::new("http://localhost:8000/api/", None).unwrap();
        let url = api.endpoint(&["sessions", "a b/c"]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/sessions/a%20b%2Fc");
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        assert!(HttpSessionApi::new("mailto:someone@example.com", None).is_err());
        assert!(HttpSessionApi::new("::", None).is_err());
    }

    #[tokio::test]
    async fn test_list_sessions_decodes_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/1"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessions": [
                    {"id": "s1", "title": "First", "created_at": "2024-01-01T00:00:00"},
                    {"id": "s2", "title": "Second", "created_at": "2024-01-02T00:00:00"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sessions = client(&server).list_sessions("1").await.unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_fetch_session_returns_messages_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s1",
                "title": "t",
                "created_at": "2024-01-01T00:00:00",
                "messages": [
                    {"id": 2, "role": "ai", "content": {"text": "b"},
                     "created_at": "2024-01-01T00:00:02"},
                    {"id": 1, "role": "user", "content": {"text": "a"},
                     "created_at": "2024-01-01T00:00:01"}
                ]
            })))
            .mount(&server)
            .await;

        let session = client(&server).fetch_session("s1").await.unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].session_id, "s1");
    }

    #[tokio::test]
    async fn test_create_session_posts_title() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/1"))
            .and(body_json(json!({"title": "New Chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s9", "title": "New Chat", "created_at": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server)
            .create_session("1", "New Chat")
            .await
            .unwrap();
        assert_eq!(session.id, "s9");
    }

    #[tokio::test]
    async fn test_send_message_posts_raw_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({"query": "  hello  ", "chatId": "s1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "hi", "chat_id": "s1"})),
            )
            .mount(&server)
            .await;

        let reply = client(&server)
            .send_message("s1", "  hello  ")
            .await
            .unwrap();
        assert_eq!(reply.response, json!("hi"));
        assert_eq!(reply.chat_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Chat session not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_session("missing").await.unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::HttpStatus);
        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("Chat session not found"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_sessions("1").await.unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let api = HttpSessionApi::new(&server.uri(), Some(Duration::from_millis(100))).unwrap();
        let err = api.send_message("s1", "hi").await.unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) is essentially never listening.
        let api = HttpSessionApi::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let err = api.list_sessions("1").await.unwrap_err();
        assert!(matches!(
            err.kind,
            NetworkErrorKind::Transport | NetworkErrorKind::Timeout
        ));
    }
}
