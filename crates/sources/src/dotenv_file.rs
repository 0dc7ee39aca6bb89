//! `.env` file as a backing source.
//!
//! Responsibilities:
//! - Parse the file named by `path` with `dotenvy`, once, during builder
//!   initialization.
//!
//! Does NOT handle:
//! - Exporting the parsed variables; the process environment is never
//!   modified.
//!
//! Invariants:
//! - Errors NEVER include raw .env line contents to prevent secret leakage.
//! - A missing file is an error unless `optional=true`.

use kvconf_engine::{InitContext, KeyValueSource, SourceResult};
use std::path::{Path, PathBuf};

use crate::constants::{OPTION_OPTIONAL, OPTION_PATH};
use crate::error::SourceLoadError;
use crate::values::ValueSet;

#[derive(Debug, Default)]
pub struct DotEnvFileSource {
    path: Option<PathBuf>,
    values: ValueSet,
}

impl DotEnvFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// File resolved during initialization.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl KeyValueSource for DotEnvFileSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        Ok(self.values.get(key))
    }

    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>> {
        Ok(self.values.with_prefix(prefix))
    }

    fn initialize(&mut self, ctx: &InitContext<'_>) -> kvconf_engine::Result<()> {
        let path = PathBuf::from(ctx.required_option(OPTION_PATH)?);
        let optional = ctx.bool_option(OPTION_OPTIONAL, false)?;

        self.values = match load_dotenv(&path) {
            Ok(values) => values,
            Err(SourceLoadError::DotenvIo { kind, .. })
                if optional && kind == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(
                    builder = %ctx.builder_name(),
                    path = %path.display(),
                    "optional .env file not found"
                );
                ValueSet::default()
            }
            Err(error) => return Err(error.into()),
        };
        tracing::debug!(
            builder = %ctx.builder_name(),
            path = %path.display(),
            keys = self.values.len(),
            "dotenv file loaded"
        );
        self.path = Some(path);
        Ok(())
    }
}

fn load_dotenv(path: &Path) -> Result<ValueSet, SourceLoadError> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(path, e))?;
    iter.map(|item| item.map_err(|e| dotenv_error(path, e)))
        .collect()
}

fn dotenv_error(path: &Path, error: dotenvy::Error) -> SourceLoadError {
    let path = path.to_path_buf();
    match error {
        dotenvy::Error::LineParse(_, error_index) => {
            SourceLoadError::DotenvParse { path, error_index }
        }
        dotenvy::Error::Io(io_err) => SourceLoadError::DotenvIo {
            path,
            kind: io_err.kind(),
        },
        _ => SourceLoadError::DotenvUnknown { path },
    }
}
