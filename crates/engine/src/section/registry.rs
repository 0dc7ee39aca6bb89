//! Named, ordered registry of section adapters.
//!
//! Resolution walks the list last-to-first and returns the first adapter
//! that accepts the section, so re-registering a name overrides it.

use std::any::Any;
use std::sync::Arc;

use super::{
    AppSettingsHandler, ConnectionStringsHandler, SectionAdapter, SectionHandler, TypedAdapter,
};
use crate::constants::{APP_SETTINGS_ADAPTER, CONNECTION_STRINGS_ADAPTER};

#[derive(Clone)]
pub struct AdapterRegistry {
    entries: Vec<(String, Arc<dyn SectionAdapter>)>,
}

impl Default for AdapterRegistry {
    /// Registry with the app-settings and connection-strings adapters.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.add(APP_SETTINGS_ADAPTER, AppSettingsHandler);
        registry.add(CONNECTION_STRINGS_ADAPTER, ConnectionStringsHandler);
        registry
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|(name, adapter)| (name, adapter.section_type_name())),
            )
            .finish()
    }
}

impl AdapterRegistry {
    /// Registry with no adapters at all.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `handler` under `name`, moving it to the end of the list if
    /// the name was already registered.
    pub fn add<H: SectionHandler>(&mut self, name: impl Into<String>, handler: H) {
        self.add_adapter(name, Arc::new(TypedAdapter(handler)));
    }

    /// Register an already-erased adapter.
    pub fn add_adapter(&mut self, name: impl Into<String>, adapter: Arc<dyn SectionAdapter>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, adapter));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != name);
        self.entries.len() != before
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// The last-registered adapter accepting `section`.
    pub fn resolve(&self, section: &dyn Any) -> Option<Arc<dyn SectionAdapter>> {
        self.entries
            .iter()
            .rev()
            .find(|(_, adapter)| adapter.accepts(section))
            .map(|(_, adapter)| Arc::clone(adapter))
    }
}
