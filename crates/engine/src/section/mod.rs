//! Section adapters: the bridge between generic key/value edits and concrete
//! section shapes.
//!
//! Responsibilities:
//! - Define `SectionHandler`, the typed capability set a section shape
//!   implements (enumerate, insert-or-update, recover key casing).
//! - Erase handlers into `SectionAdapter` so the engine can drive any shape
//!   through `&mut dyn Any`.
//! - Provide the two built-in shapes and their handlers.
//!
//! Does NOT handle:
//! - Choosing which adapter applies to a section (see `registry`).
//! - Deciding which keys to touch (see `builder`).
//!
//! Invariants:
//! - `items` returns a snapshot materialized before any edit, so the engine
//!   may call `insert_or_update` while walking it.
//! - The handle in an item is handed back unchanged on update.

mod app_settings;
mod connection_strings;
mod registry;

pub use app_settings::{AppSettings, AppSettingsHandler, Setting};
pub use connection_strings::{ConnectionString, ConnectionStrings, ConnectionStringsHandler};
pub use registry::AdapterRegistry;

use std::any::Any;

/// One enumerated entry of a section.
#[derive(Debug, Clone)]
pub struct SectionItem<H> {
    pub key: String,
    pub value: Option<String>,
    pub handle: H,
}

/// An insert-or-update request.
#[derive(Debug)]
pub struct Update<'a, H> {
    /// Key to write.
    pub key: &'a str,
    pub value: &'a str,
    /// Key of the item being replaced, when the edit targets an existing item.
    pub old_key: Option<&'a str>,
    /// Handle of the item being replaced, when it came from `items`.
    pub old_handle: Option<&'a H>,
}

/// Typed operations over one section shape.
pub trait SectionHandler: Send + Sync + 'static {
    type Section: 'static;
    type Handle: Send + 'static;

    /// Snapshot of the section's current key/value items.
    fn items(&self, section: &Self::Section) -> Vec<SectionItem<Self::Handle>>;

    /// Write `update.key = update.value`, replacing the old item in place
    /// when one is given and preserving attributes the engine does not know.
    fn insert_or_update(&self, section: &mut Self::Section, update: Update<'_, Self::Handle>);

    /// The casing an existing item uses for `key`, if any item matches it
    /// case-insensitively.
    fn original_case(&self, section: &Self::Section, key: &str) -> Option<String> {
        self.items(section)
            .into_iter()
            .find(|item| item.key.eq_ignore_ascii_case(key))
            .map(|item| item.key)
    }
}

/// A type-erased item; the handle is opaque to the engine.
pub struct Item {
    pub key: String,
    pub value: Option<String>,
    handle: Box<dyn Any + Send>,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may be secrets.
        f.debug_struct("Item").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Object-safe adapter the engine drives.
pub trait SectionAdapter: Send + Sync {
    /// Type name of the section shape, for diagnostics.
    fn section_type_name(&self) -> &'static str;

    fn accepts(&self, section: &dyn Any) -> bool;

    fn items(&self, section: &dyn Any) -> Vec<Item>;

    fn insert_or_update(
        &self,
        section: &mut dyn Any,
        key: &str,
        value: &str,
        old_key: Option<&str>,
        old_item: Option<&Item>,
    );

    fn original_case(&self, section: &dyn Any, key: &str) -> Option<String>;
}

/// Wraps a `SectionHandler` as a `SectionAdapter`.
pub(crate) struct TypedAdapter<H>(pub(crate) H);

impl<H: SectionHandler> SectionAdapter for TypedAdapter<H> {
    fn section_type_name(&self) -> &'static str {
        std::any::type_name::<H::Section>()
    }

    fn accepts(&self, section: &dyn Any) -> bool {
        section.is::<H::Section>()
    }

    fn items(&self, section: &dyn Any) -> Vec<Item> {
        let Some(section) = section.downcast_ref::<H::Section>() else {
            return Vec::new();
        };
        self.0
            .items(section)
            .into_iter()
            .map(|item| Item {
                key: item.key,
                value: item.value,
                handle: Box::new(item.handle),
            })
            .collect()
    }

    fn insert_or_update(
        &self,
        section: &mut dyn Any,
        key: &str,
        value: &str,
        old_key: Option<&str>,
        old_item: Option<&Item>,
    ) {
        let Some(section) = section.downcast_mut::<H::Section>() else {
            return;
        };
        let old_handle = old_item.and_then(|item| item.handle.downcast_ref::<H::Handle>());
        self.0.insert_or_update(
            section,
            Update {
                key,
                value,
                old_key,
                old_handle,
            },
        );
    }

    fn original_case(&self, section: &dyn Any, key: &str) -> Option<String> {
        section
            .downcast_ref::<H::Section>()
            .and_then(|section| self.0.original_case(section, key))
    }
}
