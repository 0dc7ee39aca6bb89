//! Ready-made backing sources for `kvconf-engine` builders.
//!
//! Each source implements `KeyValueSource`; file-backed sources read their
//! location from builder options in `initialize`, so option values may use
//! `${key}` tokens that resolve against app settings.

pub mod constants;
mod dotenv_file;
mod environment;
mod error;
mod json_file;
mod key_per_file;
mod values;

pub use dotenv_file::DotEnvFileSource;
pub use environment::EnvironmentSource;
pub use error::SourceLoadError;
pub use json_file::{JsonFileSource, JsonMode};
pub use key_per_file::KeyPerFileSource;
