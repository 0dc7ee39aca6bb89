//! Key transform pipeline: character map, then prefix test or strip.

use crate::options::BuilderConfig;

/// ASCII case-insensitive `starts_with`.
pub fn starts_with_ignore_case(key: &str, prefix: &str) -> bool {
    key.len() >= prefix.len()
        && key.is_char_boundary(prefix.len())
        && key[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// The key to look up for a section or token key, or `None` when the key
/// falls outside the configured prefix.
///
/// Without `stripPrefix` the mapped key must itself carry the prefix and is
/// looked up whole; with it, the prefix is prepended.
pub fn lookup_key(config: &BuilderConfig, raw_key: &str) -> Option<String> {
    let mapped = config.char_map.apply(raw_key);
    if config.strip_prefix {
        Some(format!("{}{mapped}", config.key_prefix))
    } else if starts_with_ignore_case(&mapped, &config.key_prefix) {
        Some(mapped)
    } else {
        None
    }
}

/// The section-facing name of a source key.
pub fn trim_prefix<'a>(config: &BuilderConfig, source_key: &'a str) -> &'a str {
    if config.strip_prefix && starts_with_ignore_case(source_key, &config.key_prefix) {
        &source_key[config.key_prefix.len()..]
    } else {
        source_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CharMap;

    fn config(prefix: &str, strip: bool) -> BuilderConfig {
        BuilderConfig {
            key_prefix: prefix.to_string(),
            strip_prefix: strip,
            ..BuilderConfig::default()
        }
    }

    #[test]
    fn test_without_strip_requires_prefix() {
        let config = config("App_", false);
        assert_eq!(lookup_key(&config, "app_Key"), Some("app_Key".to_string()));
        assert_eq!(lookup_key(&config, "Key"), None);
    }

    #[test]
    fn test_with_strip_prepends_prefix() {
        let config = config("Prefix_", true);
        assert_eq!(
            lookup_key(&config, "TestKey"),
            Some("Prefix_TestKey".to_string())
        );
    }

    #[test]
    fn test_char_map_applies_before_prefix_test() {
        let mut config = config("app-", false);
        config.char_map = CharMap::from_pairs([(":", "-")]).unwrap();
        assert_eq!(lookup_key(&config, "app:key"), Some("app-key".to_string()));
    }

    #[test]
    fn test_trim_prefix() {
        assert_eq!(trim_prefix(&config("P_", true), "p_Key"), "Key");
        assert_eq!(trim_prefix(&config("P_", false), "P_Key"), "P_Key");
        assert_eq!(trim_prefix(&config("P_", true), "Other"), "Other");
    }

    #[test]
    fn test_starts_with_respects_char_boundaries() {
        assert!(!starts_with_ignore_case("éa", "a"));
        assert!(starts_with_ignore_case("anything", ""));
    }
}
