//! Message content model.
//!
//! Content is a closed union of two wire shapes:
//!
//! ```text
//! {"text": "..."}                                   -> Content::Text
//! {"blocks": [{"block_type": "text", "text": ..},   -> Content::Blocks
//!             {"block_type": "react", "code": ..}]}
//! ```
//!
//! `parse` is the only way raw JSON becomes `Content`; serde deserialization
//! goes through it too, so the two can never disagree.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Wire tag for prose blocks.
pub const TEXT_BLOCK_TAG: &str = "text";
/// Wire tag for generated UI code blocks.
pub const CODE_BLOCK_TAG: &str = "react";

/// Message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    /// Legacy/plain text.
    Text { text: String },
    /// Ordered structured blocks.
    Blocks { blocks: Vec<Block> },
}

/// One unit within structured content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "block_type")]
pub enum Block {
    /// Markdown prose.
    #[serde(rename = "text")]
    Text(TextBlock),
    /// Generated UI fragment (JSX-like source, untrusted).
    #[serde(rename = "react")]
    Code(CodeBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// One-line summary of what the fragment shows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code: String,
}

impl Content {
    /// Creates plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Returns true for `Content::Text` with an empty string.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Content::Text { text } if text.is_empty())
    }

    /// Text projection used for listings and previews.
    ///
    /// Code blocks contribute their description (if any), never their source.
    pub fn plain_text(&self) -> String {
        match self {
            Content::Text { text } => text.clone(),
            Content::Blocks { blocks } => blocks
                .iter()
                .filter_map(|block| match block {
                    Block::Text(b) => Some(b.text.as_str()),
                    Block::Code(b) => b.description.as_deref(),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Discriminant test: true for structured block content.
pub fn is_block_content(content: &Content) -> bool {
    matches!(content, Content::Blocks { .. })
}

/// Content did not match the closed union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFormatError {
    /// JSON path of the offending value (e.g. `$.blocks[1].code`).
    pub path: String,
    /// One-line summary suitable for display.
    pub message: String,
}

impl ContentFormatError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid content at {}: {}", self.path, self.message)
    }
}

impl std::error::Error for ContentFormatError {}

/// Parses raw JSON into `Content`.
///
/// # Errors
/// Returns `ContentFormatError` when `raw` matches neither shape, carries
/// both, or contains a block with an unknown tag or mistyped fields.
pub fn parse(raw: &Value) -> Result<Content, ContentFormatError> {
    let Some(obj) = raw.as_object() else {
        return Err(ContentFormatError::new(
            "$",
            format!("expected an object, found {}", json_kind(raw)),
        ));
    };

    match (obj.get("blocks"), obj.get("text")) {
        (Some(_), Some(_)) => Err(ContentFormatError::new(
            "$",
            "content has both `text` and `blocks`",
        )),
        (Some(blocks), None) => parse_blocks(blocks).map(|blocks| Content::Blocks { blocks }),
        (None, Some(Value::String(text))) => Ok(Content::Text { text: text.clone() }),
        (None, Some(other)) => Err(ContentFormatError::new(
            "$.text",
            format!("expected a string, found {}", json_kind(other)),
        )),
        (None, None) => Err(ContentFormatError::new(
            "$",
            "expected a `text` or `blocks` field",
        )),
    }
}

/// Decodes the `response` field of a chat reply.
///
/// Replies from older backends carry a JSON string rather than an object.
/// A string holding an embedded content document is parsed as such; any
/// other string becomes plain text.
///
/// # Errors
/// Returns `ContentFormatError` for non-string values that fail `parse`.
pub fn parse_reply(raw: &Value) -> Result<Content, ContentFormatError> {
    match raw {
        Value::String(text) => {
            if text.trim_start().starts_with('{')
                && let Ok(embedded) = serde_json::from_str::<Value>(text)
                && let Ok(content) = parse(&embedded)
            {
                return Ok(content);
            }
            Ok(Content::Text { text: text.clone() })
        }
        other => parse(other),
    }
}

fn parse_blocks(raw: &Value) -> Result<Vec<Block>, ContentFormatError> {
    let Some(items) = raw.as_array() else {
        return Err(ContentFormatError::new(
            "$.blocks",
            format!("expected an array, found {}", json_kind(raw)),
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_block(index, item))
        .collect()
}

fn parse_block(index: usize, raw: &Value) -> Result<Block, ContentFormatError> {
    let path = format!("$.blocks[{index}]");
    let Some(obj) = raw.as_object() else {
        return Err(ContentFormatError::new(
            path,
            format!("expected an object, found {}", json_kind(raw)),
        ));
    };

    // Untagged blocks are inferred from their payload field.
    let tag = match obj.get("block_type") {
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => {
            return Err(ContentFormatError::new(
                format!("{path}.block_type"),
                format!("expected a string, found {}", json_kind(other)),
            ));
        }
        None if obj.contains_key("code") => CODE_BLOCK_TAG,
        None if obj.contains_key("text") => TEXT_BLOCK_TAG,
        None => {
            return Err(ContentFormatError::new(path, "missing `block_type`"));
        }
    };

    match tag {
        TEXT_BLOCK_TAG => Ok(Block::Text(TextBlock {
            title: optional_string(obj, "title", &path)?,
            text: required_string(obj, "text", &path)?,
        })),
        CODE_BLOCK_TAG => Ok(Block::Code(CodeBlock {
            title: optional_string(obj, "title", &path)?,
            description: optional_string(obj, "description", &path)?,
            code: required_string(obj, "code", &path)?,
        })),
        other => Err(ContentFormatError::new(
            format!("{path}.block_type"),
            format!("unknown block type `{other}`"),
        )),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<String, ContentFormatError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ContentFormatError::new(
            format!("{path}.{field}"),
            format!("expected a string, found {}", json_kind(other)),
        )),
        None => Err(ContentFormatError::new(
            path.to_string(),
            format!("missing `{field}`"),
        )),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<Option<String>, ContentFormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ContentFormatError::new(
            format!("{path}.{field}"),
            format!("expected a string, found {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_text_content() {
        let content = parse(&json!({"text": "hello"})).unwrap();
        assert_eq!(content, Content::text("hello"));
        assert!(!is_block_content(&content));
    }

    #[test]
    fn test_parse_block_content() {
        let content = parse(&json!({
            "blocks": [
                {"block_type": "text", "text": "a"},
                {"block_type": "react", "code": "bad(("}
            ]
        }))
        .unwrap();

        assert!(is_block_content(&content));
        let Content::Blocks { blocks } = content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::Text(b) if b.text == "a"));
        assert!(matches!(&blocks[1], Block::Code(b) if b.code == "bad(("));
    }

    #[test]
    fn test_parse_rejects_unknown_block_type() {
        let err = parse(&json!({"blocks": [{"block_type": "video", "url": "x"}]})).unwrap_err();
        assert_eq!(err.path, "$.blocks[0].block_type");
        assert!(err.message.contains("video"));
    }

    #[test]
    fn test_parse_rejects_neither_shape() {
        assert!(parse(&json!({"body": "x"})).is_err());
        assert!(parse(&json!("just a string")).is_err());
        assert!(parse(&json!({"text": 42})).is_err());
    }

    #[test]
    fn test_parse_rejects_both_shapes() {
        let err = parse(&json!({"text": "a", "blocks": []})).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_parse_infers_untagged_blocks() {
        let content = parse(&json!({"blocks": [{"code": "<p/>"}, {"text": "t"}]})).unwrap();
        let Content::Blocks { blocks } = content else {
            panic!("expected blocks");
        };
        assert!(matches!(blocks[0], Block::Code(_)));
        assert!(matches!(blocks[1], Block::Text(_)));
    }

    #[test]
    fn test_parse_code_block_missing_code() {
        let err = parse(&json!({"blocks": [{"block_type": "react", "description": "d"}]}))
            .unwrap_err();
        assert!(err.message.contains("code"));
    }

    #[test]
    fn test_parse_reply_string_forms() {
        assert_eq!(parse_reply(&json!("plain")).unwrap(), Content::text("plain"));

        let embedded = json!(r#"{"blocks": [{"block_type": "text", "text": "x"}]}"#);
        assert!(is_block_content(&parse_reply(&embedded).unwrap()));

        // Looks like JSON but is not content: kept verbatim.
        let odd = json!(r#"{"foo": 1}"#);
        assert_eq!(parse_reply(&odd).unwrap(), Content::text(r#"{"foo": 1}"#));
    }

    #[test]
    fn test_serialize_matches_wire_shape() {
        let content = Content::Blocks {
            blocks: vec![Block::Code(CodeBlock {
                title: None,
                description: Some("chart".to_string()),
                code: "<Chart />".to_string(),
            })],
        };
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["blocks"][0]["block_type"], "react");
        assert_eq!(parse(&value).unwrap(), content);
    }

    #[test]
    fn test_plain_text_skips_code() {
        let content = parse(&json!({
            "blocks": [
                {"block_type": "text", "text": "intro"},
                {"block_type": "react", "description": "a chart", "code": "<div/>"}
            ]
        }))
        .unwrap();
        assert_eq!(content.plain_text(), "intro\n\na chart");
    }
}
