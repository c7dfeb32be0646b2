//! Article DOM: node types and the markup parser that builds them.

pub mod node;
pub mod parser;

pub use node::{MEDIA_TAG, NO_INDEX_TAG, Node, TRANSCRIPTION_TAG, TagNode};
pub use parser::ArticleDom;
