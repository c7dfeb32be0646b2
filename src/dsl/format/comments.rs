//! Removal of `{{...}}` comments from decoded lines.

/// Removes every `{{...}}` span from `line`.
///
/// `in_comment` carries state between lines: when it is set on entry the
/// line is treated as continuing a comment opened earlier, and it is left set
/// on exit if a `{{` remains unterminated. Delimiters are always removed and
/// comments do not nest; the first `}}` closes the comment.
pub fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut stripped = String::with_capacity(line.len());
    let mut rest = line;

    loop {
        if *in_comment {
            match rest.find("}}") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_comment = false;
                }
                None => return stripped,
            }
        }

        match rest.find("{{") {
            Some(start) => {
                stripped.push_str(&rest[..start]);
                rest = &rest[start + 2..];
                *in_comment = true;
            }
            None => {
                stripped.push_str(rest);
                return stripped;
            }
        }
    }
}
