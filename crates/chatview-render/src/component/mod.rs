//! Rendered component trees and their text layout.

mod layout;
mod node;

pub use layout::{LayoutItem, layout};
pub use node::Node;
