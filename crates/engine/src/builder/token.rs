//! Raw-text token rewriting.
//!
//! `replace_tokens` is a pure function of the text, the pattern, and a
//! resolver. Matches are replaced left to right without overlap; a token
//! whose key does not resolve keeps its original text.

use regex::Regex;

use crate::error::Result;

/// Rewrite every match of `pattern` whose capture group 1 resolves.
///
/// A pattern without a group 1, or a match whose group 1 is empty or did not
/// participate, leaves the token untouched.
pub fn replace_tokens<F>(text: &str, pattern: &Regex, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    if text.is_empty() || pattern.captures_len() < 2 {
        return Ok(text.to_string());
    }

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let (Some(token), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if key.as_str().is_empty() {
            continue;
        }
        if let Some(value) = resolve(key.as_str())? {
            output.push_str(&text[last..token.start()]);
            output.push_str(&value);
            last = token.end();
        }
    }
    output.push_str(&text[last..]);
    Ok(output)
}

/// Escape a value for inclusion in markup text or attribute values.
pub fn escape_markup(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
