//! Section loading pipeline.
//!
//! Responsibilities:
//! - Run every builder's raw pass over a section's JSON text, parse it, then
//!   run every builder's structured pass, in registration order.
//! - Mark app settings as in progress while they load and publish them once
//!   done, so builders resolving `${key}` options see a consistent snapshot.
//!
//! Does NOT handle:
//! - Reading configuration files from disk.
//! - Interpreting section values.
//!
//! Invariants:
//! - All raw passes complete before the section is parsed.
//! - App settings are published only after every builder has processed them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

use crate::builder::ConfigBuilder;
use crate::constants::{APP_SETTINGS_SECTION, CONNECTION_STRINGS_SECTION};
use crate::error::BuilderError;
use crate::section::{AppSettings, ConnectionStrings};
use crate::settings::SharedAppSettings;

/// Errors from loading a section through the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to parse section '{section}'")]
    Parse {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// The two well-known sections of a document, after every builder ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub app_settings: AppSettings,
    #[serde(default)]
    pub connection_strings: ConnectionStrings,
}

/// Ordered builders applied to each section a host loads.
pub struct SectionPipeline {
    builders: Vec<Arc<dyn ConfigBuilder>>,
    app_settings: Arc<SharedAppSettings>,
}

impl SectionPipeline {
    pub fn new(app_settings: Arc<SharedAppSettings>) -> Self {
        Self {
            builders: Vec::new(),
            app_settings,
        }
    }

    pub fn with_builder(mut self, builder: Arc<dyn ConfigBuilder>) -> Self {
        self.builders.push(builder);
        self
    }

    pub fn app_settings(&self) -> &Arc<SharedAppSettings> {
        &self.app_settings
    }

    /// Load one section from its raw JSON text.
    ///
    /// Token-mode values are spliced into the text verbatim and the result is
    /// parsed as JSON afterwards. A resolved value containing `"` or `\` must
    /// already be JSON-escaped in the source, otherwise loading fails with
    /// [`PipelineError::Parse`]. `escapeExpandedValues` does markup escaping
    /// only and does not help here.
    pub fn load_section<T>(&self, section: &str, raw: &str) -> Result<T, PipelineError>
    where
        T: DeserializeOwned + Any,
    {
        let mut text = raw.to_string();
        for builder in &self.builders {
            text = builder.process_raw_text(&text)?;
        }

        let mut parsed: T = serde_json::from_str(&text).map_err(|source| PipelineError::Parse {
            section: section.to_string(),
            source,
        })?;

        for builder in &self.builders {
            builder.process_section(&mut parsed)?;
        }
        tracing::debug!(
            section,
            builders = self.builders.len(),
            "section processed"
        );
        Ok(parsed)
    }

    /// Load app settings and publish them for option token resolution.
    pub fn load_app_settings(&self, raw: &str) -> Result<AppSettings, PipelineError> {
        let settings = {
            let _processing = self.app_settings.begin_processing();
            self.load_section::<AppSettings>(APP_SETTINGS_SECTION, raw)?
        };
        self.app_settings.publish(settings.clone());
        Ok(settings)
    }

    /// Load a whole document: app settings first, then connection strings.
    /// Missing sections load as empty.
    pub fn load_document(&self, raw: &str) -> Result<Document, PipelineError> {
        let document: Value = serde_json::from_str(raw).map_err(|source| PipelineError::Parse {
            section: "<document>".to_string(),
            source,
        })?;

        let section_text = |name: &str, empty: &str| {
            document
                .get(name)
                .map_or_else(|| empty.to_string(), Value::to_string)
        };

        let app_settings = self.load_app_settings(&section_text(APP_SETTINGS_SECTION, "{}"))?;
        let connection_strings = self.load_section::<ConnectionStrings>(
            CONNECTION_STRINGS_SECTION,
            &section_text(CONNECTION_STRINGS_SECTION, "[]"),
        )?;

        Ok(Document {
            app_settings,
            connection_strings,
        })
    }
}
