//! The key/value substitution engine.
//!
//! Responsibilities:
//! - Lazily parse builder options and initialize the backing source, once,
//!   no matter how many threads arrive first.
//! - Strict mode: replace values of keys already present in a section.
//! - Greedy mode: additionally insert every key the source has under the
//!   active prefix, from a single bulk fetch.
//! - Token mode: rewrite `${key}` tokens in a section's raw text.
//! - Cache lookups per instance and apply the `enabled` error policy.
//!
//! Does NOT handle:
//! - Parsing raw section text into a section (see `pipeline`).
//! - Knowing a section's shape (delegated to `section::SectionAdapter`).
//!
//! Invariants:
//! - Options and the source are unreachable until initialization publishes.
//! - A disabled builder never touches its source and never fails.
//! - Without `stripPrefix`, keys not starting with the prefix are never looked up.
//! - Configuration errors surface even when `enabled=Optional`.

mod cache;
mod init;
mod keys;
mod token;

pub use token::{escape_markup, replace_tokens};

use keys::{lookup_key, starts_with_ignore_case, trim_prefix};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use cache::ValueCache;
use init::{LazyInit, Ready};

use crate::constants::OPTION_MODE;
use crate::error::{BuilderError, Phase, Result, SourceError};
use crate::options::{BuilderConfig, BuilderOptions, Enabled, Mode, default_token_pattern};
use crate::section::{AdapterRegistry, SectionAdapter};
use crate::settings::{SettingsAccessor, SettingsSnapshot};
use crate::source::{InitContext, KeyValueSource};

/// What a host needs from any configuration builder.
pub trait ConfigBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// Raw pass over a section's serialized text, before it is parsed.
    fn process_raw_text(&self, text: &str) -> Result<String>;

    /// Structured pass over a parsed section, edited in place.
    fn process_section(&self, section: &mut dyn Any) -> Result<()>;
}

/// A configuration builder driving one backing source.
pub struct KeyValueConfigBuilder<S> {
    name: String,
    options: BuilderOptions,
    settings: Option<Arc<dyn SettingsAccessor>>,
    adapters: Arc<AdapterRegistry>,
    state: LazyInit<S>,
    cache: ValueCache,
}

impl<S: KeyValueSource> fmt::Debug for KeyValueConfigBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueConfigBuilder")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("config", &self.state.get().map(|ready| &ready.config))
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueSource> KeyValueConfigBuilder<S> {
    pub fn new(name: impl Into<String>, source: S, options: BuilderOptions) -> Self {
        Self {
            name: name.into(),
            options,
            settings: None,
            adapters: Arc::new(AdapterRegistry::default()),
            state: LazyInit::new(source),
            cache: ValueCache::default(),
        }
    }

    /// Resolve `${key}` tokens in option values against these app settings.
    pub fn with_settings_accessor(mut self, settings: Arc<dyn SettingsAccessor>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use a custom adapter registry.
    pub fn with_adapters(mut self, adapters: Arc<AdapterRegistry>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed configuration, initializing on first call.
    ///
    /// `None` only for a re-entrant call made while initialization runs.
    pub fn config(&self) -> Result<Option<&BuilderConfig>> {
        Ok(self.ready()?.map(|ready| &ready.config))
    }

    /// The backing source, once initialized.
    pub fn source(&self) -> Option<&S> {
        self.state.get().map(|ready| &ready.source)
    }

    /// Cached lookup of one source key. Keys outside the prefix are `None`.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let Some(ready) = self.active()? else {
            return Ok(None);
        };
        if !starts_with_ignore_case(key, &ready.config.key_prefix) {
            return Ok(None);
        }
        self.cached_value(ready, key)
    }

    /// Every source key/value under the prefix, fetched once per instance.
    pub fn get_all_values(&self) -> Result<Vec<(String, String)>> {
        let Some(ready) = self.active()? else {
            return Ok(Vec::new());
        };
        let all = self.bulk_values(ready)?;
        Ok(all
            .values()
            .filter(|entry| starts_with_ignore_case(&entry.key, &ready.config.key_prefix))
            .map(|entry| (entry.key.clone(), entry.expose()))
            .collect())
    }

    /// Token mode: rewrite tokens in `text`. Other modes return it unchanged.
    pub fn process_raw_text(&self, text: &str) -> Result<String> {
        let Some(ready) = self.active()? else {
            return Ok(text.to_string());
        };
        if ready.config.mode != Mode::Token || !ready.config.has_token_group() {
            return Ok(text.to_string());
        }

        let config = &ready.config;
        replace_tokens(text, &config.token_pattern, |token_key| {
            let Some(key) = lookup_key(config, token_key) else {
                return Ok(None);
            };
            if !ready.source.validate_key(&key) {
                return Ok(None);
            }
            Ok(self.cached_value(ready, &key)?.map(|value| {
                if config.escape_expanded_values {
                    escape_markup(&value)
                } else {
                    value
                }
            }))
        })
    }

    /// Strict or Greedy mode: edit `section` in place through its adapter.
    ///
    /// Sections without a registered adapter pass through untouched.
    pub fn process_section(&self, section: &mut dyn Any) -> Result<()> {
        let Some(ready) = self.active()? else {
            return Ok(());
        };
        if ready.config.mode == Mode::Token {
            return Ok(());
        }
        let Some(adapter) = self.adapters.resolve(section) else {
            tracing::debug!(builder = %self.name, "no adapter for section; skipping");
            return Ok(());
        };

        match ready.config.mode {
            Mode::Strict => self.process_strict(ready, adapter.as_ref(), section),
            Mode::Greedy => self.process_greedy(ready, adapter.as_ref(), section),
            Mode::Token => Ok(()),
        }
    }

    fn process_strict(
        &self,
        ready: &Ready<S>,
        adapter: &dyn SectionAdapter,
        section: &mut dyn Any,
    ) -> Result<()> {
        for item in adapter.items(section) {
            let Some(key) = lookup_key(&ready.config, &item.key) else {
                continue;
            };
            if !ready.source.validate_key(&key) {
                continue;
            }
            if let Some(value) = self.cached_value(ready, &key)? {
                let output = ready.source.output_key(&item.key);
                adapter.insert_or_update(section, &output, &value, Some(&item.key), Some(&item));
            }
        }
        Ok(())
    }

    fn process_greedy(
        &self,
        ready: &Ready<S>,
        adapter: &dyn SectionAdapter,
        section: &mut dyn Any,
    ) -> Result<()> {
        let all = self.bulk_values(ready)?;
        for entry in all.values() {
            if !starts_with_ignore_case(&entry.key, &ready.config.key_prefix) {
                continue;
            }
            let key = trim_prefix(&ready.config, &entry.key);
            let old_key = adapter.original_case(section, key);
            let output = ready.source.output_key(old_key.as_deref().unwrap_or(key));
            adapter.insert_or_update(section, &output, &entry.expose(), old_key.as_deref(), None);
        }
        Ok(())
    }

    fn cached_value(&self, ready: &Ready<S>, key: &str) -> Result<Option<String>> {
        if ready.config.mode == Mode::Greedy {
            let all = self.bulk_values(ready)?;
            return Ok(all.get(&cache::cache_key(key)).map(|entry| entry.expose()));
        }

        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }
        tracing::debug!(builder = %self.name, key = %key, "cache miss");
        let value = match ready.source.get_value(key) {
            Ok(value) => value,
            Err(error) => {
                self.source_failed(ready, Phase::GetValue, error)?;
                None
            }
        };
        Ok(self.cache.insert(key, value))
    }

    fn bulk_values(&self, ready: &Ready<S>) -> Result<Arc<cache::BulkValues>> {
        self.cache.bulk_or_fetch(|| {
            let prefix = &ready.config.key_prefix;
            tracing::debug!(builder = %self.name, prefix = %prefix, "fetching all values");
            match ready.source.get_all_values(prefix) {
                Ok(values) => Ok(values),
                Err(error) => {
                    self.source_failed(ready, Phase::GetAllValues, error)?;
                    Ok(Vec::new())
                }
            }
        })
    }

    /// Apply the `enabled` policy to a backing-source failure.
    fn source_failed(&self, ready: &Ready<S>, phase: Phase, error: SourceError) -> Result<()> {
        if ready.config.enabled == Enabled::Optional {
            tracing::warn!(
                builder = %self.name,
                phase = %phase,
                error = %error,
                "backing source failed; continuing without its values"
            );
            return Ok(());
        }
        Err(BuilderError::wrap(
            &self.name,
            phase,
            BuilderError::Source(error),
        ))
    }

    /// Initialized state, or `None` when disabled or re-entered mid-init.
    fn active(&self) -> Result<Option<&Ready<S>>> {
        Ok(self
            .ready()?
            .filter(|ready| ready.config.enabled != Enabled::Disabled))
    }

    fn ready(&self) -> Result<Option<&Ready<S>>> {
        self.state
            .get_or_init(|source| self.initialize(source))
            .map_err(|error| BuilderError::wrap(&self.name, Phase::Initialization, error))
    }

    fn initialize(&self, source: &mut S) -> Result<BuilderConfig> {
        let resolve = |raw: &str| self.resolve_option_tokens(raw);
        let config = BuilderConfig::parse(&self.options, |_, raw| resolve(raw))?;
        if config.enabled == Enabled::Disabled {
            tracing::debug!(builder = %self.name, "builder disabled");
            return Ok(config);
        }

        source.initialize(&InitContext {
            builder: &self.name,
            options: &self.options,
            config: &config,
            resolve: &resolve,
        })?;

        if config.mode == Mode::Greedy && !source.supports_bulk_fetch() {
            return Err(BuilderError::invalid_option(
                OPTION_MODE,
                "Greedy mode needs a source that can enumerate its values",
            ));
        }

        tracing::debug!(
            builder = %self.name,
            mode = %config.mode,
            prefix = %config.key_prefix,
            "builder initialized"
        );
        Ok(config)
    }

    /// Substitute `${key}` references to app settings in an option value.
    fn resolve_option_tokens(&self, raw: &str) -> Result<String> {
        let Some(settings) = &self.settings else {
            return Ok(raw.to_string());
        };
        let pattern = default_token_pattern();
        if !pattern.is_match(raw) {
            return Ok(raw.to_string());
        }

        match settings.snapshot()? {
            SettingsSnapshot::InProgress => {
                tracing::debug!(
                    builder = %self.name,
                    "app settings are being processed; option tokens left as written"
                );
                Ok(raw.to_string())
            }
            SettingsSnapshot::Ready(app_settings) => replace_tokens(raw, &pattern, |key| {
                Ok(app_settings.get(key).map(str::to_string))
            }),
        }
    }
}

impl<S: KeyValueSource> ConfigBuilder for KeyValueConfigBuilder<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_raw_text(&self, text: &str) -> Result<String> {
        KeyValueConfigBuilder::process_raw_text(self, text)
    }

    fn process_section(&self, section: &mut dyn Any) -> Result<()> {
        KeyValueConfigBuilder::process_section(self, section)
    }
}
