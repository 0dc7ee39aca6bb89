//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use kvconf_engine::{InitContext, KeyValueSource, SourceResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory source that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct CountingSource {
    values: Vec<(String, String)>,
    fail_with: Option<String>,
    bulk: bool,
    get_calls: AtomicUsize,
    all_calls: AtomicUsize,
}

impl CountingSource {
    pub fn new<const N: usize>(values: [(&str, &str); N]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            bulk: true,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            bulk: true,
            ..Self::default()
        }
    }

    pub fn without_bulk_fetch(mut self) -> Self {
        self.bulk = false;
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }
}

impl KeyValueSource for CountingSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }
        Ok(self
            .values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone()))
    }

    fn get_all_values(&self, prefix: &str) -> SourceResult<Vec<(String, String)>> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(message.clone().into());
        }
        Ok(self
            .values
            .iter()
            .filter(|(k, _)| {
                k.len() >= prefix.len()
                    && k.is_char_boundary(prefix.len())
                    && k[..prefix.len()].eq_ignore_ascii_case(prefix)
            })
            .cloned()
            .collect())
    }

    fn supports_bulk_fetch(&self) -> bool {
        self.bulk
    }
}

/// Source whose lookups depend on state set during `initialize`.
#[derive(Debug, Default)]
pub struct SlowInitSource {
    pub endpoint: Option<String>,
    pub init_runs: usize,
}

impl KeyValueSource for SlowInitSource {
    fn get_value(&self, key: &str) -> SourceResult<Option<String>> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or("lookup before initialize returned")?;
        Ok(Some(format!("{endpoint}/{key}")))
    }

    fn get_all_values(&self, _prefix: &str) -> SourceResult<Vec<(String, String)>> {
        Ok(Vec::new())
    }

    fn initialize(&mut self, ctx: &InitContext<'_>) -> kvconf_engine::Result<()> {
        self.init_runs += 1;
        std::thread::sleep(std::time::Duration::from_millis(50));
        self.endpoint = Some(ctx.required_option("endpoint")?);
        Ok(())
    }
}
