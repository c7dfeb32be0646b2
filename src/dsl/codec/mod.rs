//! Codec layer for byte-level stream handling.
//!
//! # Submodules
//!
//! - [`decoding`][]: Encoding detection and line decoding (UTF-8/16, legacy code pages)
//! - [`compression`][]: Transparent gzip/dictzip stream opening

pub mod compression;
pub mod decoding;
