//! Headword transforms used for indexing and display.
//!
//! All functions take and return plain strings and know nothing about the
//! tag parser. They honour backslash escapes, so [`unescape_dsl`] must run
//! last, after every escape-sensitive step.

use log::warn;

/// Upper bound on variants produced by [`expand_optional_parts`].
pub const MAX_OPTIONAL_VARIANTS: usize = 32;

/// Characters with a special meaning somewhere in DSL markup.
const SPECIAL_CHARS: &[char] = &['\\', '[', ']', '{', '}', '(', ')', '<', '>', '~', '^', '@', '#'];

fn is_dsl_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Handles `{unsorted}` parts of a headword.
///
/// With `strip` the braced text is removed together with its braces (sort
/// keys, search); without it only the braces go (display). Braces nest, and
/// an unclosed `{` with `strip` drops the rest of the string.
pub fn process_unsorted_parts(text: &str, strip: bool) -> String {
    let mut result = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if depth == 0 || !strip {
                    result.push(ch);
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                } else {
                    chars.next();
                }
            }
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    warn!("Unmatched closing brace in \"{}\"", text);
                } else {
                    depth -= 1;
                }
            }
            _ => {
                if depth == 0 || !strip {
                    result.push(ch);
                }
            }
        }
    }

    if strip && depth > 0 {
        warn!("Unclosed brace(s) in \"{}\"", text);
    }
    result
}

/// Expands `(optional)` parts into every combination of present and absent.
///
/// `k` independent groups give `2^k` variants (capped at
/// [`MAX_OPTIONAL_VARIANTS`]) with all parentheses removed. Variants come in
/// depth-first order, resolving groups left to right and producing the
/// "absent" branch before the "present" one: `"ab(c)d"` gives `["abd", "abcd"]`.
/// Duplicate variants are dropped, keeping the first.
pub fn expand_optional_parts(text: &str) -> Vec<String> {
    let mut variants = Vec::new();
    expand_from(text.chars().collect(), 0, &mut variants);
    variants
}

fn push_variant(variants: &mut Vec<String>, variant: String) {
    if variants.len() < MAX_OPTIONAL_VARIANTS && !variants.contains(&variant) {
        variants.push(variant);
    }
}

/// Index of the parenthesis closing the one at `open`, skipping escapes and nested pairs.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 1;
    let mut index = open + 1;
    while index < chars.len() {
        match chars[index] {
            '\\' => index += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}

fn expand_from(mut chars: Vec<char>, mut x: usize, variants: &mut Vec<String>) {
    if variants.len() >= MAX_OPTIONAL_VARIANTS {
        return;
    }

    while x < chars.len() {
        match chars[x] {
            '\\' => x += 2,
            '(' => {
                match matching_paren(&chars, x) {
                    // Empty parentheses have nothing to leave out.
                    Some(close) if close == x + 1 => {}
                    Some(close) => {
                        let mut absent = chars[..x].to_vec();
                        absent.extend_from_slice(&chars[close + 1..]);
                        expand_from(absent, x, variants);
                    }
                    // Unclosed: one more variant chopped at the parenthesis.
                    None if x + 1 != chars.len() => push_variant(variants, chars[..x].iter().collect()),
                    None => {}
                }
                chars.remove(x);
            }
            ')' => {
                chars.remove(x);
            }
            _ => x += 1,
        }
    }

    push_variant(variants, chars.into_iter().collect());
}

/// Replaces every unescaped `~` with `replacement` (trimmed).
///
/// `^~` inserts the replacement with the case of its first letter flipped.
pub fn expand_tildes(text: &str, replacement: &str) -> String {
    let replacement = replacement.trim();
    let mut result = String::with_capacity(text.len() + replacement.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                result.push(ch);
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            '^' if chars.peek() == Some(&'~') => {
                chars.next();
                result.push_str(&flip_first_case(replacement));
            }
            '~' => result.push_str(replacement),
            _ => result.push(ch),
        }
    }
    result
}

fn flip_first_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Removes backslash escapes, keeping each escaped character literally.
pub fn unescape_dsl(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// Escapes every DSL special character so it reads as literal text.
///
/// `unescape_dsl(&escape_dsl(s)) == s` for any `s`.
pub fn escape_dsl(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}

/// Collapses runs of spaces and tabs into a single space and trims both ends.
pub fn normalize_headword(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if is_dsl_whitespace(ch) {
            pending_space = !result.is_empty();
        } else {
            if pending_space {
                result.push(' ');
                pending_space = false;
            }
            result.push(ch);
        }
    }
    result
}
