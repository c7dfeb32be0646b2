//! DSL header directive parsing.
//!
//! A DSL file starts with lines like:
//! ```text
//! #NAME "English-Russian Dictionary"
//! #INDEX_LANGUAGE "English"
//! #CONTENTS_LANGUAGE "Russian"
//! #SOURCE_CODE_PAGE "Cyrillic"
//! ```
//! The value is whatever lies between the first and the last double quote.

use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::dsl::types::models::DslHeader;

static DIRECTIVE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn directive_regex() -> &'static Regex {
    DIRECTIVE_PATTERN.get_or_init(|| Regex::new(r"^#([A-Za-z_]*)").expect("Invalid directive regex pattern"))
}

/// Header directives this crate understands. Anything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Name,
    IndexLanguage,
    ContentsLanguage,
    SoundDictionary,
    SourceCodePage,
}

impl Directive {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NAME" => Some(Self::Name),
            "INDEX_LANGUAGE" => Some(Self::IndexLanguage),
            "CONTENTS_LANGUAGE" => Some(Self::ContentsLanguage),
            "SOUND_DICTIONARY" => Some(Self::SoundDictionary),
            "SOURCE_CODE_PAGE" => Some(Self::SourceCodePage),
            _ => None,
        }
    }
}

/// Classification of a single `#`-line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveLine<'a> {
    Known(Directive, &'a str),
    /// Unrecognised directive name; skipped for forward compatibility.
    Unknown(&'a str),
    /// A recognised directive whose value is not enclosed in quotes.
    Malformed(Directive),
}

/// Splits a header line into its directive and quoted value.
pub fn parse_directive(line: &str) -> DirectiveLine<'_> {
    let Some(captures) = directive_regex().captures(line) else {
        return DirectiveLine::Unknown("");
    };
    let name_match = captures.get(1).map_or("", |m| m.as_str());
    let Some(directive) = Directive::from_name(name_match) else {
        return DirectiveLine::Unknown(name_match);
    };

    let rest = &line[captures.get(0).map_or(0, |m| m.end())..];
    match (rest.find('"'), rest.rfind('"')) {
        (Some(begin), Some(end)) if end > begin => DirectiveLine::Known(directive, &rest[begin + 1..end]),
        _ => DirectiveLine::Malformed(directive),
    }
}

/// Returns the value of the last `#SOURCE_CODE_PAGE` directive, if any.
///
/// Run on provisionally decoded lines, before the final encoding is known.
pub fn find_code_page(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .filter_map(|line| match parse_directive(line) {
            DirectiveLine::Known(Directive::SourceCodePage, value) => Some(value.to_string()),
            _ => None,
        })
        .last()
}

/// Builds the header from decoded `#`-lines.
///
/// Malformed lines are reported and skipped; they never abort the scan.
pub fn parse(lines: &[String]) -> DslHeader {
    let mut header = DslHeader::default();

    for line in lines {
        match parse_directive(line) {
            DirectiveLine::Known(directive, value) => {
                let value = value.to_string();
                match directive {
                    Directive::Name => header.dictionary_name = value,
                    Directive::IndexLanguage => header.lang_from = value,
                    Directive::ContentsLanguage => header.lang_to = value,
                    Directive::SoundDictionary => header.sound_dictionary = Some(value),
                    Directive::SourceCodePage => {}
                }
            }
            DirectiveLine::Unknown(name) => debug!("Skipping unknown header directive '#{}'", name),
            DirectiveLine::Malformed(directive) => {
                warn!("Malformed header line, no quoted value for {:?}: {}", directive, line)
            }
        }
    }

    header
}
