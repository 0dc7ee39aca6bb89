//! Centralized constants for the kvconf engine.
//!
//! Option names are matched case-insensitively by `BuilderOptions`, so the
//! spelling here is only the canonical form used in messages.

// =============================================================================
// Builder Option Names
// =============================================================================

pub const OPTION_MODE: &str = "mode";
pub const OPTION_PREFIX: &str = "prefix";
pub const OPTION_STRIP_PREFIX: &str = "stripPrefix";
pub const OPTION_ENABLED: &str = "enabled";
pub const OPTION_ESCAPE_EXPANDED_VALUES: &str = "escapeExpandedValues";
pub const OPTION_TOKEN_PATTERN: &str = "tokenPattern";
pub const OPTION_CHAR_MAP: &str = "charMap";

// =============================================================================
// Token Defaults
// =============================================================================

/// Default token pattern: matches `${name}` where `name` starts with a word
/// character followed by word characters or any of `-$@#+,.:~`.
pub const DEFAULT_TOKEN_PATTERN: &str = r"\$\{(\w[\w\-$@#+,.:~]*)\}";

// =============================================================================
// Section Shapes
// =============================================================================

/// Suffix addressing the provider attribute of a connection string entry.
pub const PROVIDER_NAME_SUFFIX: &str = ":providerName";

/// Registry names of the two built-in adapters.
pub const APP_SETTINGS_ADAPTER: &str = "appSettings";
pub const CONNECTION_STRINGS_ADAPTER: &str = "connectionStrings";

/// Section names in a JSON document.
pub const APP_SETTINGS_SECTION: &str = "appSettings";
pub const CONNECTION_STRINGS_SECTION: &str = "connectionStrings";
