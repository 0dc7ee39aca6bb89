//! JSON file as a backing source.
//!
//! Responsibilities:
//! - Read the file named by `jsonFile` once, during builder initialization.
//! - `Flat` mode: expose top-level scalar properties only.
//! - `Sectional` mode: flatten nested objects and arrays into `a:b:0` keys.
//!
//! Does NOT handle:
//! - Watching the file for changes.
//!
//! Invariants:
//! - The file's top level must be an object.
//! - `null` values are skipped; other scalars render as their JSON text
//!   (strings without quotes).

use kvconf_engine::{BuilderError, InitContext, KeyValueSource, SourceResult};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    JSON_SECTION_SEPARATOR, OPTION_JSON_FILE, OPTION_JSON_MODE, OPTION_OPTIONAL,
};
use crate::error::{SourceLoadError, is_not_found};
use crate::values::ValueSet;

/// How nested JSON structure maps onto keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonMode {
    #[default]
    Flat,
    Sectional,
}

impl FromStr for JsonMode {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "sectional" => Ok(Self::Sectional),
            other => Err(BuilderError::invalid_option(
                OPTION_JSON_MODE,
                format!("unknown mode '{other}' (expected Flat or Sectional)"),
            )),
        }
    }
}

impl fmt::Display for JsonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("Flat"),
            Self::Sectional => f.write_str("Sectional"),
        }
    }
}

#[derive(Debug, Default)]
pub struct JsonFileSource {
    path: Option<PathBuf>,
    mode: JsonMode,
    values: ValueSet,
}

impl JsonFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// File resolved during initialization.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> JsonMode {
        self.mode
    }
}

impl KeyValueSource for JsonFileSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        Ok(self.values.get(key))
    }

    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>> {
        Ok(self.values.with_prefix(prefix))
    }

    fn initialize(&mut self, ctx: &InitContext<'_>) -> kvconf_engine::Result<()> {
        let path = PathBuf::from(ctx.required_option(OPTION_JSON_FILE)?);
        let optional = ctx.bool_option(OPTION_OPTIONAL, false)?;
        self.mode = ctx
            .option(OPTION_JSON_MODE)?
            .map(|raw| raw.parse::<JsonMode>())
            .transpose()?
            .unwrap_or_default();

        self.values = match std::fs::read_to_string(&path) {
            Ok(text) => parse_json(&path, &text, self.mode)?,
            Err(source) if optional && is_not_found(&source) => {
                tracing::debug!(
                    builder = %ctx.builder_name(),
                    path = %path.display(),
                    "optional JSON file not found"
                );
                ValueSet::default()
            }
            Err(source) => return Err(SourceLoadError::Read { path, source }.into()),
        };
        tracing::debug!(
            builder = %ctx.builder_name(),
            path = %path.display(),
            mode = %self.mode,
            keys = self.values.len(),
            "JSON file loaded"
        );
        self.path = Some(path);
        Ok(())
    }
}

fn parse_json(path: &Path, text: &str, mode: JsonMode) -> Result<ValueSet, SourceLoadError> {
    let root: Value = serde_json::from_str(text).map_err(|source| SourceLoadError::JsonParse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(object) = root else {
        return Err(SourceLoadError::JsonNotAnObject {
            path: path.to_path_buf(),
        });
    };

    let mut values = ValueSet::default();
    match mode {
        JsonMode::Flat => {
            for (key, value) in &object {
                if let Some(text) = scalar_text(value) {
                    values.push(key.as_str(), text);
                }
            }
        }
        JsonMode::Sectional => flatten_object(&object, None, &mut values),
    }
    Ok(values)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn flatten_object(object: &Map<String, Value>, parent: Option<&str>, out: &mut ValueSet) {
    for (key, value) in object {
        flatten_value(value, &join(parent, key), out);
    }
}

fn flatten_value(value: &Value, key: &str, out: &mut ValueSet) {
    match value {
        Value::Object(object) => flatten_object(object, Some(key), out),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(item, &join(Some(key), &index.to_string()), out);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.push(key, text);
            }
        }
    }
}

fn join(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}{JSON_SECTION_SEPARATOR}{key}"),
        None => key.to_string(),
    }
}
