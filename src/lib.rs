//! # dsl-reader
//!
//! A reader for ABBYY Lingvo DSL dictionary sources (`.dsl` and `.dsl.dz`).
//!
//! [`DslScanner`] detects the text encoding, reads the `#`-header and hands
//! out decoded lines with their byte offsets. [`ArticleDom`] parses one line
//! of article markup into a tree. The [`headword`] functions prepare
//! headwords for indexing (optional parts, tildes, unsorted parts).
pub mod dsl;

// Re-export the main types for convenience
pub use dsl::{
    ArticleDom, DslError, DslScanner, Node, Result, TagNode,
    format::{comments::strip_comments, language},
    headword,
    types::models::{CodePage, DslEncoding, DslHeader, DslLine, LineFeed},
};
