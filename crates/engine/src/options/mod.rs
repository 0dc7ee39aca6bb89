//! Builder options: the raw option bag and the resolved configuration.
//!
//! Responsibilities:
//! - Hold the flat, case-insensitive option bag a host hands to a builder.
//! - Parse the core options (`mode`, `prefix`, `stripPrefix`, `enabled`,
//!   `escapeExpandedValues`, `tokenPattern`, `charMap`) into `BuilderConfig`.
//!
//! Does NOT handle:
//! - Token substitution inside option values (see `builder`).
//! - Options owned by a concrete backing source (read via `InitContext`).
//!
//! Invariants:
//! - Option names match case-insensitively; the last insert of a name wins.
//! - `BuilderConfig` is immutable once built.
//! - A token pattern that compiles but lacks a capture group is accepted; it
//!   leaves every token untouched.

mod char_map;

pub use char_map::CharMap;

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_TOKEN_PATTERN, OPTION_CHAR_MAP, OPTION_ENABLED, OPTION_ESCAPE_EXPANDED_VALUES,
    OPTION_MODE, OPTION_PREFIX, OPTION_STRIP_PREFIX, OPTION_TOKEN_PATTERN,
};
use crate::error::{BuilderError, Result};

/// How a builder applies values to a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Replace values of keys that already exist in the section.
    #[default]
    Strict,
    /// Replace existing keys and insert every other key the source has.
    Greedy,
    /// Rewrite `${token}` placeholders in the raw section text.
    Token,
}

impl FromStr for Mode {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "greedy" => Ok(Self::Greedy),
            "token" | "expand" => Ok(Self::Token),
            other => Err(BuilderError::invalid_option(
                OPTION_MODE,
                format!("'{other}' is not one of Strict, Greedy, Token"),
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Strict => f.write_str("Strict"),
            Mode::Greedy => f.write_str("Greedy"),
            Mode::Token => f.write_str("Token"),
        }
    }
}

/// Whether a builder runs, and whether its backing-source failures are fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Enabled {
    /// Run; backing-source errors fail the load.
    #[default]
    Enabled,
    /// Run; backing-source errors are logged and treated as missing values.
    Optional,
    /// Do nothing.
    Disabled,
}

impl FromStr for Enabled {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "true" => Ok(Self::Enabled),
            "optional" => Ok(Self::Optional),
            "disabled" | "false" => Ok(Self::Disabled),
            other => Err(BuilderError::invalid_option(
                OPTION_ENABLED,
                format!("'{other}' is not one of Enabled, Optional, Disabled"),
            )),
        }
    }
}

/// Parse a boolean option value.
pub fn parse_bool(option: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(BuilderError::invalid_option(
            option,
            "must be one of true, false, yes, no, 1, 0",
        )),
    }
}

/// Flat, case-insensitive option bag supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    // lowercased name -> (name as given, value)
    entries: BTreeMap<String, (String, String)>,
}

impl BuilderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut options = Self::new();
        for (name, value) in pairs {
            options.insert(name, value);
        }
        options
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Raw value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Resolved, immutable builder configuration.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub mode: Mode,
    pub key_prefix: String,
    pub strip_prefix: bool,
    pub enabled: Enabled,
    pub escape_expanded_values: bool,
    pub token_pattern: Regex,
    pub char_map: CharMap,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            key_prefix: String::new(),
            strip_prefix: false,
            enabled: Enabled::default(),
            escape_expanded_values: false,
            token_pattern: default_token_pattern(),
            char_map: CharMap::default(),
        }
    }
}

impl BuilderConfig {
    /// Parse the core options. `resolve` maps a raw option value to its final
    /// text (token substitution against app settings happens there).
    ///
    /// `enabled` is read first; a disabled builder reads nothing else.
    pub fn parse<F>(options: &BuilderOptions, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&str, &str) -> Result<String>,
    {
        let mut value = |name: &str| -> Result<Option<String>> {
            options.get(name).map(|raw| resolve(name, raw)).transpose()
        };

        let enabled = value(OPTION_ENABLED)?
            .map(|raw| raw.parse::<Enabled>())
            .transpose()?
            .unwrap_or_default();
        if enabled == Enabled::Disabled {
            return Ok(Self {
                enabled,
                ..Self::default()
            });
        }

        let mode = value(OPTION_MODE)?
            .map(|raw| raw.parse::<Mode>())
            .transpose()?
            .unwrap_or_default();
        let key_prefix = value(OPTION_PREFIX)?.unwrap_or_default();
        let strip_prefix = value(OPTION_STRIP_PREFIX)?
            .map(|raw| parse_bool(OPTION_STRIP_PREFIX, &raw))
            .transpose()?
            .unwrap_or(false);
        let escape_expanded_values = value(OPTION_ESCAPE_EXPANDED_VALUES)?
            .map(|raw| parse_bool(OPTION_ESCAPE_EXPANDED_VALUES, &raw))
            .transpose()?
            .unwrap_or(false);
        let char_map = value(OPTION_CHAR_MAP)?
            .map(|raw| CharMap::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        // The pattern itself is taken literally; resolving it would run it
        // through the default pattern.
        let token_pattern = match options.get(OPTION_TOKEN_PATTERN) {
            Some(raw) if !raw.trim().is_empty() => compile_token_pattern(raw)?,
            _ => default_token_pattern(),
        };

        Ok(Self {
            mode,
            key_prefix,
            strip_prefix,
            enabled,
            escape_expanded_values,
            token_pattern,
            char_map,
        })
    }

    /// True when the token pattern has a group 1 to take keys from.
    pub fn has_token_group(&self) -> bool {
        self.token_pattern.captures_len() >= 2
    }
}

fn compile_token_pattern(raw: &str) -> Result<Regex> {
    let pattern = Regex::new(raw).map_err(|e| {
        BuilderError::invalid_option(OPTION_TOKEN_PATTERN, format!("invalid regex: {e}"))
    })?;
    if pattern.captures_len() < 2 {
        tracing::warn!(
            pattern = raw,
            "token pattern has no capture group; tokens will be left untouched"
        );
    }
    Ok(pattern)
}

/// The compiled default token pattern.
pub fn default_token_pattern() -> Regex {
    static PATTERN: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is a valid regex")
    });
    PATTERN.clone()
}
