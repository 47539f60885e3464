//! Error types for the session API and the session store.

use std::fmt;

use serde_json::Value;

/// Longest body excerpt kept on an HTTP status error.
const BODY_EXCERPT_CHARS: usize = 200;

/// Category of a failed session API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Connection refused, DNS failure, reset, or similar.
    Transport,
    /// The request exceeded `request_timeout_secs`.
    Timeout,
    /// Non-2xx response.
    HttpStatus,
    /// The response body did not decode.
    Decode,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Transport => write!(f, "transport"),
            NetworkErrorKind::Timeout => write!(f, "timeout"),
            NetworkErrorKind::HttpStatus => write!(f, "http_status"),
            NetworkErrorKind::Decode => write!(f, "decode"),
        }
    }
}

/// A failed session API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    /// One-line summary suitable for display.
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Timeout, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Decode, message)
    }

    /// Creates an HTTP status error, extracting `detail` or
    /// `error.message` from a JSON body when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else if let Some(detail) = json_error_message(body) {
            format!("HTTP {status}: {detail}")
        } else {
            format!("HTTP {status}: {}", excerpt(body))
        };
        Self {
            kind: NetworkErrorKind::HttpStatus,
            status: Some(status),
            message,
        }
    }

    /// Maps a reqwest failure onto a kind.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Request timed out: {e}"))
        } else if e.is_decode() {
            Self::decode(format!("Invalid response body: {e}"))
        } else if e.is_connect() {
            Self::transport(format!("Connection failed: {e}"))
        } else {
            Self::transport(format!("Network error: {e}"))
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NetworkError {}

fn json_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if let Some(detail) = json.get("detail") {
        return match detail {
            Value::String(s) => Some(s.clone()),
            other => Some(excerpt(&other.to_string())),
        };
    }
    json.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Store misuse. These indicate a programming error in the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownSession(String),
    EmptySession(String),
    UnknownMessage { session_id: String, message_id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UnknownSession(id) => write!(f, "unknown session `{id}`"),
            StoreError::EmptySession(id) => write!(f, "session `{id}` has no messages"),
            StoreError::UnknownMessage {
                session_id,
                message_id,
            } => write!(f, "session `{session_id}` has no message `{message_id}`"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_fastapi_detail() {
        let err = NetworkError::http_status(404, r#"{"detail":"Chat session not found"}"#);
        assert_eq!(err.kind, NetworkErrorKind::HttpStatus);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "HTTP 404: Chat session not found");
    }

    #[test]
    fn test_http_status_extracts_error_message() {
        let err = NetworkError::http_status(500, r#"{"error":{"message":"boom"}}"#);
        assert_eq!(err.to_string(), "HTTP 500: boom");

        let flat = NetworkError::http_status(502, r#"{"error":"bad gateway"}"#);
        assert_eq!(flat.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_http_status_truncates_plain_body() {
        let body = "x".repeat(500);
        let err = NetworkError::http_status(500, &body);
        assert!(err.message.ends_with('…'));
        assert!(err.message.chars().count() < 220);

        assert_eq!(NetworkError::http_status(503, "").message, "HTTP 503");
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::UnknownSession("s9".into()).to_string(),
            "unknown session `s9`"
        );
    }
}
