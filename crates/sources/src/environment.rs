//! Process environment as a backing source.
//!
//! Responsibilities:
//! - Look up environment variables by name, ASCII case-insensitively.
//! - Enumerate variables under a prefix for Greedy mode.
//!
//! Does NOT handle:
//! - Loading `.env` files (see `dotenv_file`).
//!
//! Invariants:
//! - Reads the environment at lookup time; the builder's cache decides how
//!   often that happens.
//! - Variables whose name or value is not valid UTF-8 are invisible.

use kvconf_engine::{KeyValueSource, SourceResult};

use crate::values::starts_with_ignore_case;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSource;

impl EnvironmentSource {
    pub fn new() -> Self {
        Self
    }
}

fn utf8_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

impl KeyValueSource for EnvironmentSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        if let Ok(value) = std::env::var(key) {
            return Ok(Some(value));
        }
        Ok(utf8_vars()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value))
    }

    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>> {
        Ok(utf8_vars()
            .filter(|(name, _)| starts_with_ignore_case(name, prefix))
            .collect())
    }

    fn validate_key(&self, key: &str) -> bool {
        !key.is_empty() && !key.contains(['=', '\0'])
    }
}
