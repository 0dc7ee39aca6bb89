//! Character map parsing and application.
//!
//! Serialized form is `from=to,from=to`. A literal `,` or `=` inside either
//! side is written doubled (`,,` and `==`).

use crate::error::{BuilderError, Result};

/// Ordered literal substring substitutions applied to keys before lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharMap {
    pairs: Vec<(String, String)>,
}

impl CharMap {
    /// Build a map from already-split pairs.
    pub fn from_pairs<I, F, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        if pairs.iter().any(|(from, _)| from.is_empty()) {
            return Err(BuilderError::invalid_option(
                crate::constants::OPTION_CHAR_MAP,
                "mapped substring must not be empty",
            ));
        }
        Ok(Self { pairs })
    }

    /// Parse the serialized `from=to,from=to` form.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        let mut from = String::new();
        let mut to = String::new();
        let mut in_to = false;
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ',' | '=' if chars.peek() == Some(&c) => {
                    chars.next();
                    let target = if in_to { &mut to } else { &mut from };
                    target.push(c);
                }
                '=' if !in_to => in_to = true,
                '=' => {
                    return Err(BuilderError::invalid_option(
                        crate::constants::OPTION_CHAR_MAP,
                        "unescaped '=' in replacement (write '==' for a literal '=')",
                    ));
                }
                ',' => {
                    pairs.push(finish_pair(&mut from, &mut to, in_to)?);
                    in_to = false;
                }
                _ => {
                    let target = if in_to { &mut to } else { &mut from };
                    target.push(c);
                }
            }
        }

        if in_to || !from.is_empty() {
            pairs.push(finish_pair(&mut from, &mut to, in_to)?);
        }

        Self::from_pairs(pairs)
    }

    /// Apply every substitution in order, left to right.
    pub fn apply(&self, key: &str) -> String {
        self.pairs
            .iter()
            .fold(key.to_string(), |acc, (from, to)| acc.replace(from, to))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

fn finish_pair(from: &mut String, to: &mut String, in_to: bool) -> Result<(String, String)> {
    if !in_to {
        return Err(BuilderError::invalid_option(
            crate::constants::OPTION_CHAR_MAP,
            format!("entry '{from}' is missing '=' (expected from=to)"),
        ));
    }
    Ok((std::mem::take(from), std::mem::take(to)))
}
