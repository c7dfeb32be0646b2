//! Custom error types for the dsl-reader crate.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Markup problems inside an article never surface here: the article parser
/// repairs the tree and logs a warning instead.
#[derive(Debug, Error)]
pub enum DslError {
    /// The dictionary file could not be opened.
    #[error("Can't open .dsl file {path}: {source}")]
    CantOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error originating from reading the (possibly decompressed) stream.
    #[error("Can't read .dsl file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is structurally unusable (empty, broken byte-order mark, header with no body).
    #[error("The .dsl file is malformed: {0}")]
    Malformed(String),

    /// `#SOURCE_CODE_PAGE` named a code page we have no table for.
    #[error("The .dsl file specified an unknown code page: {0}")]
    UnknownCodePage(String),

    /// A line contains bytes that are invalid in the detected encoding.
    ///
    /// The line has been consumed, so the caller may skip it and keep reading.
    #[error("Encoding error on line {line}: invalid {encoding} byte sequence")]
    Decoding { line: u32, encoding: &'static str },

    /// A read was attempted after end of stream had already been reported.
    #[error("Attempted to read past the end of the .dsl stream")]
    ReadPastEnd,
}

/// A convenience `Result` type alias using the crate's `DslError` type.
pub type Result<T> = std::result::Result<T, DslError>;
