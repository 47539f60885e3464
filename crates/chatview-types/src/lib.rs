//! Shared data model for chatview.
//!
//! - `content`: the closed content union carried by messages (`Content`, `Block`)
//! - `session`: sessions, messages, roles and local delivery status
//! - `time`: lenient timestamp decoding for session API payloads

pub mod content;
pub mod session;
pub mod time;

pub use content::{
    Block, CodeBlock, Content, ContentFormatError, TextBlock, is_block_content, parse,
    parse_reply,
};
pub use session::{
    DEFAULT_SESSION_TITLE, Message, MessageId, MessageStatus, Role, Session, SessionId,
};
