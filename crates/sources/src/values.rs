//! In-memory key/value snapshot shared by the file-backed sources.

/// Ordered key/value pairs with ASCII case-insensitive lookup.
///
/// When two keys differ only in case, the later one wins on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ValueSet {
    entries: Vec<(String, String)>,
}

impl ValueSet {
    pub(crate) fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
    }

    pub(crate) fn with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(k, _)| starts_with_ignore_case(k, prefix))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<(String, String)> for ValueSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub(crate) fn starts_with_ignore_case(key: &str, prefix: &str) -> bool {
    key.len() >= prefix.len()
        && key.is_char_boundary(prefix.len())
        && key[..prefix.len()].eq_ignore_ascii_case(prefix)
}
