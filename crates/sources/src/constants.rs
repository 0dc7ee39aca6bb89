//! Option names and defaults for the bundled sources.

// =============================================================================
// Shared Options
// =============================================================================

/// When true, a missing file or directory yields an empty source.
pub const OPTION_OPTIONAL: &str = "optional";

// =============================================================================
// JSON File Source
// =============================================================================

pub const OPTION_JSON_FILE: &str = "jsonFile";
pub const OPTION_JSON_MODE: &str = "jsonMode";

/// Separator joining nested JSON object keys in `Sectional` mode.
pub const JSON_SECTION_SEPARATOR: &str = ":";

// =============================================================================
// Key-Per-File Source
// =============================================================================

pub const OPTION_DIRECTORY_PATH: &str = "directoryPath";
pub const OPTION_KEY_DELIMITER: &str = "keyDelimiter";
pub const OPTION_IGNORE_PREFIX: &str = "ignorePrefix";

/// Files whose names start with this are skipped unless overridden.
pub const DEFAULT_IGNORE_PREFIX: &str = "ignore.";

// =============================================================================
// Dotenv File Source
// =============================================================================

pub const OPTION_PATH: &str = "path";
