//! Key/value configuration builders.
//!
//! This crate injects values from pluggable backing sources (vaults, remote
//! stores, environment, files) into configuration sections at load time.
//! A `KeyValueConfigBuilder` owns the substitution policy (mode, prefix,
//! character map, token pattern, caching); a `KeyValueSource` only fetches.

pub mod constants;
mod builder;
mod error;
mod options;
mod pipeline;
pub mod section;
mod settings;
mod source;

pub use builder::{ConfigBuilder, KeyValueConfigBuilder, escape_markup, replace_tokens};
pub use error::{BuilderError, Phase, Result, SourceError, SourceResult};
pub use options::{
    BuilderConfig, BuilderOptions, CharMap, Enabled, Mode, default_token_pattern, parse_bool,
};
pub use pipeline::{Document, PipelineError, SectionPipeline};
pub use section::{
    AdapterRegistry, AppSettings, ConnectionString, ConnectionStrings, SectionAdapter,
    SectionHandler, SectionItem, Update,
};
pub use settings::{ProcessingGuard, SettingsAccessor, SettingsSnapshot, SharedAppSettings};
pub use source::{InitContext, KeyValueSource};
