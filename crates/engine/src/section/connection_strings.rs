//! Named-tuple section shape: connection strings with a provider attribute.
//!
//! Each entry is enumerated twice: `name` carries the connection string and
//! `name:providerName` carries the provider, so both can be injected.

use serde::{Deserialize, Serialize};

use super::{SectionHandler, SectionItem, Update};
use crate::constants::PROVIDER_NAME_SUFFIX;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionString {
    pub name: String,
    pub connection_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl ConnectionString {
    pub fn new(name: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_string: connection_string.into(),
            provider_name: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_name = Some(provider.into());
        self
    }
}

/// Ordered list of connection strings; names are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionStrings {
    entries: Vec<ConnectionString>,
}

impl ConnectionStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionString> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn add(&mut self, entry: ConnectionString) {
        self.remove(&entry.name);
        self.entries.push(entry);
    }

    /// Put `entry` where `old_name` sits, falling back to the slot of an
    /// entry already named like `entry`, then to the end. Other entries with
    /// the new name are dropped.
    pub fn replace(&mut self, old_name: &str, entry: ConnectionString) {
        let Some(index) = self
            .position(old_name)
            .or_else(|| self.position(&entry.name))
        else {
            self.entries.push(entry);
            return;
        };

        let name = entry.name.clone();
        self.entries[index] = entry;
        let mut position = 0;
        self.entries.retain(|other| {
            let keep = position == index || !other.name.eq_ignore_ascii_case(&name);
            position += 1;
            keep
        });
    }

    pub fn remove(&mut self, name: &str) -> Option<ConnectionString> {
        let index = self.position(name)?;
        Some(self.entries.remove(index))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionString> {
        self.entries.iter()
    }
}

impl FromIterator<ConnectionString> for ConnectionStrings {
    fn from_iter<T: IntoIterator<Item = ConnectionString>>(iter: T) -> Self {
        let mut strings = Self::new();
        for entry in iter {
            strings.add(entry);
        }
        strings
    }
}

/// Splits `name:providerName` into `name`.
fn provider_target(key: &str) -> Option<&str> {
    let split = key.len().checked_sub(PROVIDER_NAME_SUFFIX.len())?;
    let (name, suffix) = (key.get(..split)?, key.get(split..)?);
    suffix
        .eq_ignore_ascii_case(PROVIDER_NAME_SUFFIX)
        .then_some(name)
}

/// Adapter for `ConnectionStrings`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionStringsHandler;

impl SectionHandler for ConnectionStringsHandler {
    type Section = ConnectionStrings;
    type Handle = ConnectionString;

    fn items(&self, section: &ConnectionStrings) -> Vec<SectionItem<ConnectionString>> {
        section
            .iter()
            .flat_map(|entry| {
                [
                    SectionItem {
                        key: entry.name.clone(),
                        value: Some(entry.connection_string.clone()),
                        handle: entry.clone(),
                    },
                    SectionItem {
                        key: format!("{}{PROVIDER_NAME_SUFFIX}", entry.name),
                        value: entry.provider_name.clone(),
                        handle: entry.clone(),
                    },
                ]
            })
            .collect()
    }

    fn insert_or_update(
        &self,
        section: &mut ConnectionStrings,
        update: Update<'_, ConnectionString>,
    ) {
        if let Some(name) = provider_target(update.key) {
            let lookup = update.old_handle.map_or(name, |old| old.name.as_str());
            let mut entry = section
                .get(lookup)
                .cloned()
                .unwrap_or_else(|| ConnectionString::new(name, ""));
            entry.name = name.to_string();
            entry.provider_name = Some(update.value.to_string());
            section.replace(lookup, entry);
            return;
        }

        // Keep attributes the engine does not know about.
        let mut entry = update
            .old_handle
            .cloned()
            .or_else(|| section.get(update.key).cloned())
            .unwrap_or_default();
        entry.name = update.key.to_string();
        entry.connection_string = update.value.to_string();
        section.replace(update.old_key.unwrap_or(update.key), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update<'a>(
        key: &'a str,
        value: &'a str,
        old_key: Option<&'a str>,
        old_handle: Option<&'a ConnectionString>,
    ) -> Update<'a, ConnectionString> {
        Update {
            key,
            value,
            old_key,
            old_handle,
        }
    }

    #[test]
    fn test_items_expose_provider_key() {
        let section: ConnectionStrings =
            [ConnectionString::new("db", "Server=x").with_provider("System.Data.SqlClient")]
                .into_iter()
                .collect();
        let items = ConnectionStringsHandler.items(&section);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "db");
        assert_eq!(items[0].value.as_deref(), Some("Server=x"));
        assert_eq!(items[1].key, "db:providerName");
        assert_eq!(items[1].value.as_deref(), Some("System.Data.SqlClient"));
    }

    #[test]
    fn test_update_preserves_provider() {
        let original = ConnectionString::new("db", "old").with_provider("Npgsql");
        let mut section: ConnectionStrings = [original.clone()].into_iter().collect();
        ConnectionStringsHandler.insert_or_update(
            &mut section,
            update("db", "new", Some("db"), Some(&original)),
        );
        let entry = section.get("db").unwrap();
        assert_eq!(entry.connection_string, "new");
        assert_eq!(entry.provider_name.as_deref(), Some("Npgsql"));
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn test_update_without_handle_preserves_existing_provider() {
        let mut section: ConnectionStrings = [ConnectionString::new("DB", "old").with_provider("p")]
            .into_iter()
            .collect();
        ConnectionStringsHandler.insert_or_update(&mut section, update("db", "new", None, None));
        let entry = section.get("db").unwrap();
        assert_eq!(entry.name, "db");
        assert_eq!(entry.provider_name.as_deref(), Some("p"));
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn test_provider_key_updates_only_provider() {
        let original = ConnectionString::new("db", "Server=x");
        let mut section: ConnectionStrings = [original.clone()].into_iter().collect();
        ConnectionStringsHandler.insert_or_update(
            &mut section,
            update("db:providerName", "MySql", Some("db:providerName"), Some(&original)),
        );
        let entry = section.get("db").unwrap();
        assert_eq!(entry.connection_string, "Server=x");
        assert_eq!(entry.provider_name.as_deref(), Some("MySql"));
    }

    #[test]
    fn test_provider_key_creates_entry() {
        let mut section = ConnectionStrings::new();
        ConnectionStringsHandler
            .insert_or_update(&mut section, update("new:PROVIDERNAME", "p", None, None));
        let entry = section.get("new").unwrap();
        assert_eq!(entry.connection_string, "");
        assert_eq!(entry.provider_name.as_deref(), Some("p"));
    }

    #[test]
    fn test_updates_keep_entry_position() {
        let original = ConnectionString::new("a", "old").with_provider("p");
        let mut section: ConnectionStrings = [
            original.clone(),
            ConnectionString::new("b", "2"),
            ConnectionString::new("c", "3"),
        ]
        .into_iter()
        .collect();

        ConnectionStringsHandler.insert_or_update(
            &mut section,
            update("a", "new", Some("a"), Some(&original)),
        );
        ConnectionStringsHandler.insert_or_update(
            &mut section,
            update("b:providerName", "q", None, None),
        );

        let names: Vec<_> = section.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(section.get("a").unwrap().connection_string, "new");
        assert_eq!(section.get("b").unwrap().provider_name.as_deref(), Some("q"));
    }

    #[test]
    fn test_replace_drops_duplicate_of_new_name() {
        let mut section: ConnectionStrings = [
            ConnectionString::new("Prefix_a", "1"),
            ConnectionString::new("b", "2"),
            ConnectionString::new("a", "stale"),
        ]
        .into_iter()
        .collect();

        section.replace("Prefix_a", ConnectionString::new("a", "fresh"));

        let names: Vec<_> = section.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(section.get("a").unwrap().connection_string, "fresh");
    }

    #[test]
    fn test_provider_target() {
        assert_eq!(provider_target("a:providerName"), Some("a"));
        assert_eq!(provider_target("a:ProviderName"), Some("a"));
        assert_eq!(provider_target("providerName"), None);
        assert_eq!(provider_target("a"), None);
    }

    #[test]
    fn test_json_shape() {
        let section: ConnectionStrings = serde_json::from_str(
            r#"[{"name":"db","connectionString":"x","providerName":"p"}]"#,
        )
        .unwrap();
        assert_eq!(section.get("db").unwrap().provider_name.as_deref(), Some("p"));
    }
}
