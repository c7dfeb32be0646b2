//! Encoding detection and strict line decoding.
//!
//! DSL sources come in UTF-16 (with or without a byte-order mark), UTF-8, or
//! one of three legacy single-byte code pages declared in the header.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::dsl::types::error::{DslError, Result};
use crate::dsl::types::models::{CodePage, DslEncoding};

/// Outcome of inspecting the first bytes of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub encoding: DslEncoding,
    /// Length of the byte-order mark to skip, 0 if there is none.
    pub bom_len: usize,
    /// True when nothing in the bytes pinned the encoding down, so a
    /// `#SOURCE_CODE_PAGE` directive may still select a code page.
    pub needs_code_page: bool,
}

/// Detects the encoding from the first bytes of the (decompressed) stream.
///
/// # Detection order
/// 1. `FF FE` / `FE FF` byte-order marks select UTF-16LE / UTF-16BE
/// 2. `EF BB BF` selects UTF-8; `EF BB` followed by anything else is malformed
/// 3. A zero byte in the first 16-bit unit selects UTF-16 without a mark
/// 4. Otherwise UTF-8, pending a code page declared in the header
pub fn detect_encoding(prefix: &[u8]) -> Result<Detection> {
    let detection = match prefix {
        [] => return Err(DslError::Malformed("the stream is empty".to_string())),
        [0xFF, 0xFE, ..] => Detection {
            encoding: DslEncoding::Utf16Le,
            bom_len: 2,
            needs_code_page: false,
        },
        [0xFE, 0xFF, ..] => Detection {
            encoding: DslEncoding::Utf16Be,
            bom_len: 2,
            needs_code_page: false,
        },
        [0xEF, 0xBB, 0xBF, ..] => Detection {
            encoding: DslEncoding::Utf8,
            bom_len: 3,
            needs_code_page: false,
        },
        [0xEF, 0xBB, ..] => {
            return Err(DslError::Malformed(
                "truncated UTF-8 byte-order mark".to_string(),
            ));
        }
        [first, 0, ..] if *first != 0 => Detection {
            encoding: DslEncoding::Utf16Le,
            bom_len: 0,
            needs_code_page: false,
        },
        [0, second, ..] if *second != 0 => Detection {
            encoding: DslEncoding::Utf16Be,
            bom_len: 0,
            needs_code_page: false,
        },
        _ => Detection {
            encoding: DslEncoding::Utf8,
            bom_len: 0,
            needs_code_page: true,
        },
    };

    debug!(
        "Detected {} (byte-order mark: {} bytes, code page pending: {})",
        detection.encoding.name(),
        detection.bom_len,
        detection.needs_code_page
    );
    Ok(detection)
}

/// Parses a user-supplied encoding label.
///
/// Accepts the DSL code page names as well as the usual WHATWG labels.
pub fn parse_encoding(label: &str) -> Option<DslEncoding> {
    if let Some(code_page) = CodePage::from_directive(label) {
        return Some(DslEncoding::SingleByte(code_page));
    }

    let normalized = label.trim().to_ascii_lowercase();
    let encoding = match normalized.as_str() {
        "utf-8" | "utf8" => DslEncoding::Utf8,
        "utf-16le" | "utf16le" | "utf-16" | "unicode" => DslEncoding::Utf16Le,
        "utf-16be" | "utf16be" => DslEncoding::Utf16Be,
        "windows-1252" | "cp1252" | "latin1" => DslEncoding::SingleByte(CodePage::Latin),
        "windows-1251" | "cp1251" => DslEncoding::SingleByte(CodePage::Cyrillic),
        "windows-1250" | "cp1250" => DslEncoding::SingleByte(CodePage::EasternEuropean),
        _ => {
            warn!("Ignoring unknown encoding label '{}'", label);
            return None;
        }
    };
    Some(encoding)
}

/// Reads the code unit starting at `index`, honouring the unit width of the encoding.
pub fn unit_at(bytes: &[u8], index: usize, encoding: DslEncoding) -> Option<u16> {
    match encoding {
        DslEncoding::Utf16Le => bytes.get(index..index + 2).map(LittleEndian::read_u16),
        DslEncoding::Utf16Be => bytes.get(index..index + 2).map(BigEndian::read_u16),
        DslEncoding::Utf8 | DslEncoding::SingleByte(_) => bytes.get(index).map(|&b| u16::from(b)),
    }
}

/// Finds the first code unit equal to `target`, returning its byte index.
pub fn find_unit(bytes: &[u8], target: u16, encoding: DslEncoding) -> Option<usize> {
    let width = encoding.unit_width();
    (0..bytes.len() / width)
        .map(|i| i * width)
        .find(|&index| unit_at(bytes, index, encoding) == Some(target))
}

/// Decodes one line, failing on any sequence that is invalid in `encoding`.
pub fn decode_line(bytes: &[u8], encoding: DslEncoding, line: u32) -> Result<String> {
    encoding
        .codec()
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(DslError::Decoding {
            line,
            encoding: encoding.name(),
        })
}

/// Decodes one line, replacing invalid sequences. Used for provisional header sniffing.
pub fn decode_line_lossy(bytes: &[u8], encoding: DslEncoding) -> String {
    let (text, _) = encoding.codec().decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Byte length of the leading whitespace plus the first token of a line.
///
/// Lines that do not start with whitespace (headword lines) are returned whole.
pub fn headword_prefix_len(bytes: &[u8], encoding: DslEncoding) -> usize {
    let width = encoding.unit_width();
    let is_space = |index: usize| matches!(unit_at(bytes, index, encoding), Some(0x20 | 0x09));

    if !is_space(0) {
        return bytes.len();
    }

    let mut index = 0;
    while index < bytes.len() && is_space(index) {
        index += width;
    }
    while index < bytes.len() && !is_space(index) {
        index += width;
    }
    index.min(bytes.len())
}
