//! Core data structures for DSL dictionary sources.
//!
//! This module defines the fundamental types used throughout the library:
//! - Text encodings and line feed styles
//! - Header metadata
//! - Lines handed out by the scanner

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252};

use crate::dsl::format::language;

/// Single-byte code pages a DSL header may declare with `#SOURCE_CODE_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    /// `Latin` (windows-1252)
    Latin,
    /// `Cyrillic` (windows-1251)
    Cyrillic,
    /// `EasternEuropean` (windows-1250)
    EasternEuropean,
}

impl CodePage {
    /// Resolves the value of a `#SOURCE_CODE_PAGE` directive, ignoring case.
    pub fn from_directive(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("Latin") {
            Some(Self::Latin)
        } else if value.eq_ignore_ascii_case("Cyrillic") {
            Some(Self::Cyrillic)
        } else if value.eq_ignore_ascii_case("EasternEuropean") {
            Some(Self::EasternEuropean)
        } else {
            None
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        match self {
            CodePage::Latin => WINDOWS_1252,
            CodePage::Cyrillic => WINDOWS_1251,
            CodePage::EasternEuropean => WINDOWS_1250,
        }
    }
}

/// Text encoding of a DSL stream.
///
/// Determined once when the stream is opened and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DslEncoding {
    SingleByte(CodePage),
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl DslEncoding {
    /// The `encoding_rs` codec used to decode line bytes.
    pub fn codec(&self) -> &'static Encoding {
        match self {
            DslEncoding::SingleByte(code_page) => code_page.encoding(),
            DslEncoding::Utf8 => UTF_8,
            DslEncoding::Utf16Le => UTF_16LE,
            DslEncoding::Utf16Be => UTF_16BE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.codec().name()
    }

    /// Width in bytes of one code unit; line terminators are searched unit by unit.
    pub fn unit_width(&self) -> usize {
        match self {
            DslEncoding::Utf16Le | DslEncoding::Utf16Be => 2,
            DslEncoding::SingleByte(_) | DslEncoding::Utf8 => 1,
        }
    }

    pub fn is_unicode(&self) -> bool {
        !matches!(self, DslEncoding::SingleByte(_))
    }
}

/// Line terminator style of a DSL stream.
///
/// Only used for offset bookkeeping; it never changes what a line contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFeed {
    #[default]
    Lf,
    CrLf,
}

impl LineFeed {
    /// Number of bytes a terminator of this style occupies in the given encoding.
    pub fn byte_len(&self, encoding: DslEncoding) -> usize {
        let units = match self {
            LineFeed::Lf => 1,
            LineFeed::CrLf => 2,
        };
        units * encoding.unit_width()
    }
}

/// Metadata read from the `#`-directives at the top of a DSL file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DslHeader {
    /// `#NAME`
    pub dictionary_name: String,
    /// `#INDEX_LANGUAGE`
    pub lang_from: String,
    /// `#CONTENTS_LANGUAGE`
    pub lang_to: String,
    /// `#SOUND_DICTIONARY`, the preferred external dictionary with sounds.
    pub sound_dictionary: Option<String>,
}

impl DslHeader {
    /// Numeric id of the source language, 0 if it is unknown.
    pub fn lang_from_id(&self) -> u32 {
        language::dsl_language_to_id(&self.lang_from)
    }

    /// Numeric id of the target language, 0 if it is unknown.
    pub fn lang_to_id(&self) -> u32 {
        language::dsl_language_to_id(&self.lang_to)
    }
}

/// A decoded line together with the byte offset at which it starts.
///
/// The offset is measured in the decompressed stream, counting any
/// byte-order mark, so it can be used to seek back to the line later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DslLine {
    pub text: String,
    pub offset: u64,
}
