//! Core DSL reader module

pub mod codec;
pub mod dom;
pub mod format;
pub mod headword;
pub mod scanner;
pub mod types;

pub use dom::{ArticleDom, Node, TagNode};
pub use scanner::{DslScanner, Lines};
pub use types::error::{DslError, Result};
pub use types::models::{CodePage, DslEncoding, DslHeader, DslLine, LineFeed};
