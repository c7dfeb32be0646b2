//! Language name resolution for `#INDEX_LANGUAGE` / `#CONTENTS_LANGUAGE`.
//!
//! DSL headers name languages the way Lingvo does ("English",
//! "GermanNewSpelling", "SpanishModernSort"). These are mapped onto
//! two-letter ISO 639-1 codes through an immutable table, and a code is
//! turned into a numeric id by packing its two letters: `c0 | c1 << 8`.
//! Id 0 means "unknown".

/// One row of the language table.
#[derive(Debug, Clone, Copy)]
pub struct LanguageCode {
    /// ISO 639-1 code.
    pub code: &'static str,
    /// Folded names (lowercase, alphanumerics only) Lingvo uses for it.
    pub names: &'static [&'static str],
    /// Windows locale id, where Lingvo files carry one.
    pub lcid: Option<u16>,
}

const fn lang(code: &'static str, names: &'static [&'static str], lcid: Option<u16>) -> LanguageCode {
    LanguageCode { code, names, lcid }
}

pub static LANGUAGE_CODES: &[LanguageCode] = &[
    lang("en", &["english"], Some(1033)),
    lang("ru", &["russian"], Some(1049)),
    lang("de", &["german"], Some(1031)),
    lang("fr", &["french"], Some(1036)),
    lang("es", &["spanish"], Some(1034)),
    lang("it", &["italian"], Some(1040)),
    lang("nl", &["dutch"], Some(1043)),
    lang("pt", &["portuguese"], Some(2070)),
    lang("pl", &["polish"], Some(1045)),
    lang("uk", &["ukrainian"], Some(1058)),
    lang("be", &["belarusian", "byelorussian", "belarusan"], Some(1059)),
    lang("bg", &["bulgarian"], Some(1026)),
    lang("cs", &["czech"], Some(1029)),
    lang("sk", &["slovak"], Some(1051)),
    lang("sl", &["slovenian", "slovene"], Some(1060)),
    lang("hr", &["croatian"], Some(1050)),
    lang("sr", &["serbian"], Some(3098)),
    lang("mk", &["macedonian"], Some(1071)),
    lang("da", &["danish"], Some(1030)),
    lang("no", &["norwegian", "norwegianbokmal", "norwegiannynorsk"], Some(1044)),
    lang("sv", &["swedish"], Some(1053)),
    lang("fi", &["finnish"], Some(1035)),
    lang("is", &["icelandic"], Some(1039)),
    lang("et", &["estonian"], Some(1061)),
    lang("lv", &["latvian"], Some(1062)),
    lang("lt", &["lithuanian"], Some(1063)),
    lang("hu", &["hungarian"], Some(1038)),
    lang("ro", &["romanian"], Some(1048)),
    lang("el", &["greek", "moderngreek"], Some(1032)),
    lang("la", &["latin"], None),
    lang("eo", &["esperanto"], None),
    lang("ga", &["irish"], None),
    lang("cy", &["welsh"], None),
    lang("ca", &["catalan"], Some(1027)),
    lang("eu", &["basque"], Some(1069)),
    lang("sq", &["albanian"], Some(1052)),
    lang("tr", &["turkish"], Some(1055)),
    lang("az", &["azeri", "azerbaijani"], Some(1068)),
    lang("kk", &["kazakh"], Some(1087)),
    lang("tt", &["tatar"], Some(1092)),
    lang("ky", &["kirghiz", "kyrgyz"], None),
    lang("uz", &["uzbek"], None),
    lang("tk", &["turkmen"], None),
    lang("tg", &["tajik"], None),
    lang("ba", &["bashkir"], None),
    lang("cv", &["chuvash"], None),
    lang("mn", &["mongolian"], None),
    lang("ka", &["georgian"], Some(1079)),
    lang("hy", &["armenian"], Some(1067)),
    lang("he", &["hebrew"], Some(1037)),
    lang("ar", &["arabic"], Some(1025)),
    lang("fa", &["persian", "farsi"], Some(1065)),
    lang("hi", &["hindi"], Some(1081)),
    lang("th", &["thai"], Some(1054)),
    lang("vi", &["vietnamese"], Some(1066)),
    lang("id", &["indonesian"], Some(1057)),
    lang("af", &["afrikaans"], Some(1078)),
    lang("zh", &["chinese"], Some(2052)),
    lang("ja", &["japanese"], Some(1041)),
    lang("ko", &["korean"], Some(1042)),
];

/// Variant suffixes Lingvo appends to a language name ("GermanNewSpelling").
const VARIANT_SUFFIXES: &[&str] = &["newspelling", "standard", "modernsort", "traditionalsort", "prc"];

/// Packs a two-letter code into its numeric id. Returns 0 for anything else.
pub fn code_to_id(code: &str) -> u32 {
    match code.as_bytes() {
        [first, second] => u32::from(first.to_ascii_lowercase()) | (u32::from(second.to_ascii_lowercase()) << 8),
        _ => 0,
    }
}

/// Inverse of [`code_to_id`], limited to codes present in the table.
pub fn code_for_id(id: u32) -> Option<&'static str> {
    LANGUAGE_CODES
        .iter()
        .find(|entry| code_to_id(entry.code) == id)
        .map(|entry| entry.code)
}

/// Looks up the code for a Windows locale id carried by some Lingvo files.
pub fn code_for_lcid(lcid: u16) -> Option<&'static str> {
    LANGUAGE_CODES
        .iter()
        .find(|entry| entry.lcid == Some(lcid))
        .map(|entry| entry.code)
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_entry(folded: &str) -> Option<&'static LanguageCode> {
    LANGUAGE_CODES
        .iter()
        .find(|entry| entry.code == folded || entry.names.contains(&folded))
}

/// Converts a language name from a DSL header to its numeric id.
///
/// Accepts Lingvo names (with or without a variant suffix) and bare
/// two-letter codes. Unknown names resolve to 0.
pub fn dsl_language_to_id(name: &str) -> u32 {
    let folded = fold(name);
    if folded.is_empty() {
        return 0;
    }

    if let Some(entry) = find_entry(&folded) {
        return code_to_id(entry.code);
    }

    VARIANT_SUFFIXES
        .iter()
        .find_map(|suffix| folded.strip_suffix(suffix))
        .filter(|stripped| !stripped.is_empty())
        .and_then(find_entry)
        .map_or(0, |entry| code_to_id(entry.code))
}
