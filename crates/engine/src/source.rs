//! The backing-source contract.
//!
//! Responsibilities:
//! - Define `KeyValueSource`, the two-method contract every concrete value
//!   source implements, plus optional hooks with sensible defaults.
//! - Provide `InitContext`, the view a source gets of its options during
//!   lazy initialization.
//!
//! Does NOT handle:
//! - Prefix filtering, caching, or error wrapping (the builder does these).
//!
//! Invariants:
//! - `initialize` runs exactly once per successful builder initialization and
//!   returns before any `get_value`/`get_all_values` call can reach the source.
//!   State a source sets in `initialize` is therefore safe to read from its
//!   lookups without further synchronization.
//! - Sources never apply prefix logic themselves.

use crate::error::{BuilderError, Result, SourceResult};
use crate::options::{BuilderConfig, BuilderOptions, parse_bool};

/// A pluggable provider of configuration values.
pub trait KeyValueSource: Send + Sync + 'static {
    /// Look up one value. Case-insensitive by convention.
    fn get_value(&self, key: &str) -> SourceResult<Option<String>>;

    /// Every key/value whose key starts with `prefix`. Empty, not an error,
    /// when the source has nothing.
    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>>;

    /// Lazy-init hook, run once after the core options are parsed.
    fn initialize(&mut self, _ctx: &InitContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Source-specific key validation. Invalid keys are never looked up.
    fn validate_key(&self, _key: &str) -> bool {
        true
    }

    /// Transform applied to every key written back into a section.
    fn output_key(&self, key: &str) -> String {
        key.to_string()
    }

    /// Whether `get_all_values` is usable. Greedy mode requires it.
    fn supports_bulk_fetch(&self) -> bool {
        true
    }
}

/// Options view handed to `KeyValueSource::initialize`.
///
/// Values read through `option` have had `${token}` references to app
/// settings substituted; `raw_option` returns them as written.
pub struct InitContext<'a> {
    pub(crate) builder: &'a str,
    pub(crate) options: &'a BuilderOptions,
    pub(crate) config: &'a BuilderConfig,
    pub(crate) resolve: &'a dyn Fn(&str) -> Result<String>,
}

impl<'a> InitContext<'a> {
    /// Name of the builder being initialized.
    pub fn builder_name(&self) -> &str {
        self.builder
    }

    /// The already-parsed core configuration.
    pub fn config(&self) -> &BuilderConfig {
        self.config
    }

    /// Option value with app-settings tokens substituted.
    pub fn option(&self, name: &str) -> Result<Option<String>> {
        self.options
            .get(name)
            .map(|raw| (self.resolve)(raw))
            .transpose()
    }

    /// Like `option`, but a missing or blank value is a configuration error.
    pub fn required_option(&self, name: &str) -> Result<String> {
        match self.option(name)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(BuilderError::MissingOption(name.to_string())),
        }
    }

    /// Boolean option, `default` when absent.
    pub fn bool_option(&self, name: &str, default: bool) -> Result<bool> {
        self.option(name)?
            .map(|raw| parse_bool(name, &raw))
            .transpose()
            .map(|value| value.unwrap_or(default))
    }

    /// Option value exactly as supplied by the host.
    pub fn raw_option(&self, name: &str) -> Option<&str> {
        self.options.get(name)
    }
}
