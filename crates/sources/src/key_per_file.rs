//! Directory of files as a backing source: file name is the key, file
//! content is the value.
//!
//! Responsibilities:
//! - Load `directoryPath` once, during builder initialization.
//! - With `keyDelimiter` set, descend into subdirectories and join path
//!   segments with the delimiter (`db/host` -> `db:host` for `:`).
//! - Skip files whose name starts with `ignorePrefix` (default `ignore.`).
//!
//! Invariants:
//! - One trailing line ending is trimmed from each value.
//! - Without `keyDelimiter`, subdirectories are ignored.
//! - Files that are not valid UTF-8 fail initialization.

use anyhow::Context;
use kvconf_engine::{InitContext, KeyValueSource, SourceResult};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_IGNORE_PREFIX, OPTION_DIRECTORY_PATH, OPTION_IGNORE_PREFIX, OPTION_KEY_DELIMITER,
    OPTION_OPTIONAL,
};
use crate::error::SourceLoadError;
use crate::values::{ValueSet, starts_with_ignore_case};

#[derive(Debug, Default)]
pub struct KeyPerFileSource {
    directory: Option<PathBuf>,
    values: ValueSet,
}

impl KeyPerFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory resolved during initialization.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }
}

/// Walk settings for one load.
struct Layout<'a> {
    delimiter: Option<&'a str>,
    ignore_prefix: &'a str,
}

impl KeyValueSource for KeyPerFileSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        Ok(self.values.get(key))
    }

    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>> {
        Ok(self.values.with_prefix(prefix))
    }

    fn initialize(&mut self, ctx: &InitContext<'_>) -> kvconf_engine::Result<()> {
        let directory = PathBuf::from(ctx.required_option(OPTION_DIRECTORY_PATH)?);
        let optional = ctx.bool_option(OPTION_OPTIONAL, false)?;
        let delimiter = ctx.option(OPTION_KEY_DELIMITER)?.filter(|d| !d.is_empty());
        let ignore_prefix = ctx
            .option(OPTION_IGNORE_PREFIX)?
            .unwrap_or_else(|| DEFAULT_IGNORE_PREFIX.to_string());

        if !directory.exists() && optional {
            tracing::debug!(
                builder = %ctx.builder_name(),
                path = %directory.display(),
                "optional key-per-file directory not found"
            );
            self.directory = Some(directory);
            return Ok(());
        }
        if !directory.is_dir() {
            return Err(SourceLoadError::NotADirectory { path: directory }.into());
        }

        let layout = Layout {
            delimiter: delimiter.as_deref(),
            ignore_prefix: &ignore_prefix,
        };
        let mut values = ValueSet::default();
        load_directory(&directory, None, &layout, &mut values).map_err(|source| {
            SourceLoadError::Directory {
                path: directory.clone(),
                source,
            }
        })?;

        tracing::debug!(
            builder = %ctx.builder_name(),
            path = %directory.display(),
            keys = values.len(),
            "key-per-file directory loaded"
        );
        self.values = values;
        self.directory = Some(directory);
        Ok(())
    }
}

fn load_directory(
    directory: &Path,
    parent_key: Option<&str>,
    layout: &Layout<'_>,
    out: &mut ValueSet,
) -> anyhow::Result<()> {
    let mut entries = std::fs::read_dir(directory)
        .with_context(|| format!("Failed to list directory {}", directory.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list directory {}", directory.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !layout.ignore_prefix.is_empty() && starts_with_ignore_case(&name, layout.ignore_prefix)
        {
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        let key = match (parent_key, layout.delimiter) {
            (Some(parent), Some(delimiter)) => format!("{parent}{delimiter}{name}"),
            _ => name,
        };

        if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
            if layout.delimiter.is_some() {
                load_directory(&path, Some(&key), layout, out)?;
            }
            continue;
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        out.push(key, trim_line_ending(&content));
    }
    Ok(())
}

fn trim_line_ending(content: &str) -> &str {
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_line_ending_removes_one() {
        assert_eq!(trim_line_ending("secret\n"), "secret");
        assert_eq!(trim_line_ending("secret\r\n"), "secret");
        assert_eq!(trim_line_ending("secret\n\n"), "secret\n");
        assert_eq!(trim_line_ending("  spaced  "), "  spaced  ");
    }

    #[test]
    fn test_nested_keys_join_with_delimiter() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("db")).unwrap();
        std::fs::write(dir.path().join("db").join("host"), "localhost\n").unwrap();
        std::fs::write(dir.path().join("name"), "orders").unwrap();
        std::fs::write(dir.path().join("ignore.readme"), "skip me").unwrap();

        let mut values = ValueSet::default();
        let layout = Layout {
            delimiter: Some("__"),
            ignore_prefix: DEFAULT_IGNORE_PREFIX,
        };
        load_directory(dir.path(), None, &layout, &mut values).unwrap();

        assert_eq!(values.get("db__host"), Some("localhost".to_string()));
        assert_eq!(values.get("name"), Some("orders".to_string()));
        assert_eq!(values.get("ignore.readme"), None);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_subdirectories_skipped_without_delimiter() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("inner"), "x").unwrap();
        std::fs::write(dir.path().join("top"), "y").unwrap();

        let mut values = ValueSet::default();
        let layout = Layout {
            delimiter: None,
            ignore_prefix: DEFAULT_IGNORE_PREFIX,
        };
        load_directory(dir.path(), None, &layout, &mut values).unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("top"), Some("y".to_string()));
    }
}
