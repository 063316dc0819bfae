//! `//`-style comment stripping for `CMakeSettings.json`.
//!
//! Visual Studio writes line comments into the file even though JSON has no
//! comment syntax, so they must be removed before parsing. The stripper is
//! string-aware: `//` inside a JSON string (URLs, UNC-ish paths) is data,
//! not a comment.

/// Remove `//` line comments outside of JSON strings.
///
/// Newlines are preserved so parser diagnostics keep their line numbers.
#[must_use]
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Comment runs to end of line; keep the newline itself.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_full_line_comments() {
        let text = "// header\n{\n  \"a\": 1\n}\n";
        assert_eq!(strip_comments(text), "\n{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn strips_trailing_comments() {
        let text = "{ \"a\": 1 // trailing\n}";
        assert_eq!(strip_comments(text), "{ \"a\": 1 \n}");
    }

    #[test]
    fn preserves_slashes_inside_strings() {
        let text = r#"{ "url": "https://example.com//x" }"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn handles_escaped_quotes_inside_strings() {
        let text = r#"{ "a": "quote \" then // not a comment" }"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn single_slash_is_kept() {
        let text = "{ \"a\": 1 } /";
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn comment_at_end_of_input_without_newline() {
        let text = "{ \"a\": 1 } // done";
        assert_eq!(strip_comments(text), "{ \"a\": 1 } ");
    }

    #[test]
    fn stripped_output_parses_as_json() {
        let text = r#"
// CMakeSettings.json
{
  // configurations drive the build
  "configurations": [] // none yet
}
"#;
        let value: serde_json::Value = serde_json::from_str(&strip_comments(text)).unwrap();
        assert!(value.get("configurations").is_some());
    }
}
