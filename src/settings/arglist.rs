//! Constrained argument-template parsing.
//!
//! `cmakeCommandArgs` and `buildCommandArgs` are user-supplied template
//! strings. They are never evaluated as code: after `${}` expression
//! expansion, `$[env.NAME]` placeholders are substituted from the resolved
//! environment, then the template is parsed either as a JSON array of
//! string tokens or split on whitespace with double-quote grouping.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

/// `$[env.NAME]` placeholders, resolved before token parsing.
#[allow(clippy::expect_used)]
static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\[env\.([A-Za-z_][A-Za-z0-9_]*)\]").expect("placeholder pattern is valid")
});

/// Parse an argument template into a token list.
///
/// Resolution order for `$[env.NAME]`: the configuration's resolved
/// environment first, the ambient process environment second. Templates
/// beginning with `[` must be a JSON array whose elements are all strings;
/// anything else is split on whitespace, with double quotes grouping tokens
/// that contain spaces.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidArguments`] for an unresolvable
/// placeholder, a malformed JSON array, a non-string array element, or an
/// unterminated quote.
pub fn parse_arg_list(
    template: &str,
    environment: &BTreeMap<String, String>,
) -> Result<Vec<String>, ConfigError> {
    let resolved = resolve_placeholders(template, environment)?;
    let trimmed = resolved.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return parse_json_array(template, trimmed);
    }
    split_quoted(template, trimmed)
}

fn resolve_placeholders(
    template: &str,
    environment: &BTreeMap<String, String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for captures in ENV_PLACEHOLDER.captures_iter(template) {
        let (whole, name) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(name)) => (whole, name.as_str()),
            _ => continue,
        };
        let value = environment
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .ok_or_else(|| ConfigError::InvalidArguments {
                template: template.to_string(),
                message: format!("unresolvable placeholder $[env.{name}]"),
            })?;
        out.push_str(template.get(last..whole.start()).unwrap_or_default());
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(template.get(last..).unwrap_or_default());
    Ok(out)
}

fn parse_json_array(template: &str, text: &str) -> Result<Vec<String>, ConfigError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidArguments {
            template: template.to_string(),
            message: format!("not a JSON array: {e}"),
        })?;
    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(s) => Ok(s),
            other => Err(ConfigError::InvalidArguments {
                template: template.to_string(),
                message: format!("array elements must be strings, got {other}"),
            }),
        })
        .collect()
}

fn split_quoted(template: &str, text: &str) -> Result<Vec<String>, ConfigError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if in_quotes {
        return Err(ConfigError::InvalidArguments {
            template: template.to_string(),
            message: "unterminated quote".to_string(),
        });
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_template_yields_no_tokens() {
        assert!(parse_arg_list("", &env(&[])).unwrap().is_empty());
        assert!(parse_arg_list("   ", &env(&[])).unwrap().is_empty());
    }

    #[test]
    fn whitespace_split_with_quotes() {
        let tokens = parse_arg_list(r#"-DA=1 "-DB=two words" -Wdev"#, &env(&[])).unwrap();
        assert_eq!(tokens, vec!["-DA=1", "-DB=two words", "-Wdev"]);
    }

    #[test]
    fn json_array_form_is_parsed() {
        let tokens = parse_arg_list(r#"["-DA=1", "-DB=two words"]"#, &env(&[])).unwrap();
        assert_eq!(tokens, vec!["-DA=1", "-DB=two words"]);
    }

    #[test]
    fn json_array_rejects_non_string_elements() {
        let err = parse_arg_list(r#"["-DA=1", 2]"#, &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArguments { .. }));
    }

    #[test]
    fn malformed_json_array_is_rejected() {
        let err = parse_arg_list("[not json", &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArguments { .. }));
    }

    #[test]
    fn env_placeholders_resolve_from_resolved_environment() {
        let tokens = parse_arg_list(
            "-DROOT=$[env.VCPKG_DIR]/installed",
            &env(&[("VCPKG_DIR", "/opt/vcpkg")]),
        )
        .unwrap();
        assert_eq!(tokens, vec!["-DROOT=/opt/vcpkg/installed"]);
    }

    #[test]
    fn unresolvable_placeholder_is_an_error() {
        let err = parse_arg_list("-DX=$[env.CMAKESETTINGS_SURELY_UNSET_12345]", &env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArguments { .. }));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse_arg_list("\"-DA=unclosed", &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArguments { .. }));
    }

    #[test]
    fn dollar_brace_tokens_pass_through_untouched() {
        // Unresolved ${} placeholders survive argument parsing verbatim.
        let tokens = parse_arg_list("-DMISSING=${unresolvedName}", &env(&[])).unwrap();
        assert_eq!(tokens, vec!["-DMISSING=${unresolvedName}"]);
    }
}
