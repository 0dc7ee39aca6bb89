//! Flat key/value section shape.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{SectionHandler, SectionItem, Update};

/// One `key = value` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Ordered list of settings with case-insensitive keys.
///
/// Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSettings {
    entries: Vec<Setting>,
}

impl AppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].value.as_str())
    }

    /// Set `key`, replacing an entry that matches case-insensitively.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i] = Setting { key, value },
            None => self.entries.push(Setting { key, value }),
        }
    }

    /// Replace the entry at `old_key` with `new_key = value`, keeping its
    /// position. Any other entry already named `new_key` is dropped.
    pub fn replace(&mut self, old_key: &str, new_key: &str, value: &str) {
        let Some(i) = self.position(old_key) else {
            self.set(new_key, value);
            return;
        };
        self.entries[i] = Setting {
            key: new_key.to_string(),
            value: value.to_string(),
        };
        let mut index = 0;
        self.entries.retain(|entry| {
            let keep = index == i || !entry.key.eq_ignore_ascii_case(new_key);
            index += 1;
            keep
        });
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.key.eq_ignore_ascii_case(key))
    }
}

impl FromIterator<(String, String)> for AppSettings {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.set(key, value);
        }
        settings
    }
}

impl Serialize for AppSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AppSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SettingsVisitor;

        impl<'de> Visitor<'de> for SettingsVisitor {
            type Value = AppSettings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of string settings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AppSettings, A::Error> {
                let mut settings = AppSettings::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    settings.set(key, value);
                }
                Ok(settings)
            }
        }

        deserializer.deserialize_map(SettingsVisitor)
    }
}

/// Adapter for `AppSettings`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppSettingsHandler;

impl SectionHandler for AppSettingsHandler {
    type Section = AppSettings;
    type Handle = ();

    fn items(&self, section: &AppSettings) -> Vec<SectionItem<()>> {
        section
            .iter()
            .map(|(key, value)| SectionItem {
                key: key.to_string(),
                value: Some(value.to_string()),
                handle: (),
            })
            .collect()
    }

    fn insert_or_update(&self, section: &mut AppSettings, update: Update<'_, ()>) {
        match update.old_key {
            Some(old_key) => section.replace(old_key, update.key, update.value),
            None => section.set(update.key, update.value),
        }
    }

    fn original_case(&self, section: &AppSettings, key: &str) -> Option<String> {
        section
            .position(key)
            .map(|i| section.entries[i].key.clone())
    }
}
