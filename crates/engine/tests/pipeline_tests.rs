//! End-to-end tests driving builders through `SectionPipeline`.

mod common;

use common::CountingSource;
use kvconf_engine::{
    AdapterRegistry, AppSettings, BuilderOptions, ConfigBuilder, KeyValueConfigBuilder,
    PipelineError, SectionHandler, SectionItem, SectionPipeline, SharedAppSettings, Update,
};
use std::sync::Arc;

const DOCUMENT: &str = r#"{
    "appSettings": { "env": "prod", "greeting": "hello ${User}", "Secret": "placeholder" },
    "connectionStrings": [
        { "name": "db", "connectionString": "Server=${DbHost}", "providerName": "Npgsql" }
    ]
}"#;

fn token_builder() -> Arc<dyn ConfigBuilder> {
    Arc::new(KeyValueConfigBuilder::new(
        "tokens",
        CountingSource::new([("User", "ada"), ("DbHost", "db.internal")]),
        BuilderOptions::new().with("mode", "Token"),
    ))
}

#[test]
fn test_raw_pass_runs_before_structured_pass() {
    let shared = Arc::new(SharedAppSettings::new());
    let strict = Arc::new(KeyValueConfigBuilder::new(
        "vault",
        CountingSource::new([("Secret", "s3cr3t")]),
        BuilderOptions::new(),
    ));
    let pipeline = SectionPipeline::new(Arc::clone(&shared))
        .with_builder(token_builder())
        .with_builder(strict);

    let document = pipeline.load_document(DOCUMENT).unwrap();

    assert_eq!(document.app_settings.get("greeting"), Some("hello ada"));
    assert_eq!(document.app_settings.get("Secret"), Some("s3cr3t"));
    let db = document.connection_strings.get("db").unwrap();
    assert_eq!(db.connection_string, "Server=db.internal");
    assert_eq!(db.provider_name.as_deref(), Some("Npgsql"));
    // Published for later option resolution.
    assert_eq!(shared.current().get("Secret"), Some("s3cr3t"));
    assert!(!shared.is_processing());
}

#[test]
fn test_option_tokens_stay_literal_while_app_settings_load() {
    let shared = Arc::new(SharedAppSettings::new());
    let builder = Arc::new(
        KeyValueConfigBuilder::new(
            "vault",
            CountingSource::new([]),
            BuilderOptions::new().with("prefix", "${env}."),
        )
        .with_settings_accessor(shared.clone()),
    );
    let pipeline = SectionPipeline::new(Arc::clone(&shared)).with_builder(builder.clone());

    pipeline.load_document(DOCUMENT).unwrap();

    assert_eq!(builder.config().unwrap().unwrap().key_prefix, "${env}.");
}

#[test]
fn test_published_settings_resolve_later_builders() {
    let shared = Arc::new(SharedAppSettings::new());
    SectionPipeline::new(Arc::clone(&shared))
        .load_document(DOCUMENT)
        .unwrap();

    let builder = Arc::new(
        KeyValueConfigBuilder::new(
            "vault",
            CountingSource::new([("prod.db", "Server=prod-db")]),
            BuilderOptions::from_pairs([("prefix", "${env}."), ("stripPrefix", "true")]),
        )
        .with_settings_accessor(shared.clone()),
    );
    let pipeline = SectionPipeline::new(Arc::clone(&shared)).with_builder(builder.clone());

    let strings: kvconf_engine::ConnectionStrings = pipeline
        .load_section(
            "connectionStrings",
            r#"[{"name":"db","connectionString":"dev"}]"#,
        )
        .unwrap();

    assert_eq!(builder.config().unwrap().unwrap().key_prefix, "prod.");
    assert_eq!(strings.get("db").unwrap().connection_string, "Server=prod-db");
}

#[test]
fn test_builder_errors_abort_loading() {
    let shared = Arc::new(SharedAppSettings::new());
    let failing = Arc::new(KeyValueConfigBuilder::new(
        "vault",
        CountingSource::failing("sealed"),
        BuilderOptions::new(),
    ));
    let pipeline = SectionPipeline::new(Arc::clone(&shared)).with_builder(failing);

    let err = pipeline.load_document(DOCUMENT).unwrap_err();

    assert!(matches!(err, PipelineError::Builder(_)));
    assert_eq!(err.to_string(), "'vault' GetValue() Error");
    assert!(!shared.is_processing());
    assert!(shared.current().is_empty());
}

#[test]
fn test_malformed_section_is_parse_error() {
    let pipeline = SectionPipeline::new(Arc::new(SharedAppSettings::new()));

    let err = pipeline
        .load_section::<AppSettings>("appSettings", "{not json")
        .unwrap_err();

    assert!(matches!(err, PipelineError::Parse { ref section, .. } if section == "appSettings"));
}

#[test]
fn test_token_values_are_spliced_verbatim() {
    let pipeline = SectionPipeline::new(Arc::new(SharedAppSettings::new())).with_builder(Arc::new(
        KeyValueConfigBuilder::new(
            "tokens",
            CountingSource::new([("Quoted", r#"say "hi""#), ("Escaped", r#"say \"hi\""#)]),
            BuilderOptions::new().with("mode", "Token"),
        ),
    ));

    let err = pipeline
        .load_section::<AppSettings>("appSettings", r#"{ "a": "${Quoted}" }"#)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Parse { .. }));

    let settings = pipeline
        .load_section::<AppSettings>("appSettings", r#"{ "a": "${Escaped}" }"#)
        .unwrap();
    assert_eq!(settings.get("a"), Some(r#"say "hi""#));
}

#[test]
fn test_missing_sections_load_empty() {
    let pipeline = SectionPipeline::new(Arc::new(SharedAppSettings::new()));

    let document = pipeline.load_document("{}").unwrap();

    assert!(document.app_settings.is_empty());
    assert!(document.connection_strings.is_empty());
}

#[test]
fn test_unadapted_section_types_pass_through() {
    let builder = Arc::new(KeyValueConfigBuilder::new(
        "vault",
        CountingSource::new([("a", "1")]),
        BuilderOptions::new().with("mode", "Greedy"),
    ));
    let pipeline =
        SectionPipeline::new(Arc::new(SharedAppSettings::new())).with_builder(builder.clone());

    let value: serde_json::Value = pipeline.load_section("custom", r#"{"a":"x"}"#).unwrap();

    assert_eq!(value["a"], "x");
    assert_eq!(builder.source().unwrap().all_calls(), 0);
}

/// Writes every key upper-cased.
struct ShoutingHandler;

impl SectionHandler for ShoutingHandler {
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
        if let Some(old_key) = update.old_key {
            section.remove(old_key);
        }
        section.set(update.key.to_uppercase(), update.value.to_uppercase());
    }
}

#[test]
fn test_custom_adapter_overrides_builtin() {
    let mut adapters = AdapterRegistry::default();
    adapters.add("shouting", ShoutingHandler);
    let builder = Arc::new(
        KeyValueConfigBuilder::new(
            "vault",
            CountingSource::new([("greeting", "hi")]),
            BuilderOptions::new(),
        )
        .with_adapters(Arc::new(adapters)),
    );
    let pipeline =
        SectionPipeline::new(Arc::new(SharedAppSettings::new())).with_builder(builder);

    let settings = pipeline
        .load_app_settings(r#"{"greeting":"hello"}"#)
        .unwrap();

    let entries: Vec<_> = settings.iter().collect();
    assert_eq!(entries, vec![("GREETING", "HI")]);
}
