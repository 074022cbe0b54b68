//! Per-scenario state
//!
//! A [`ScenarioContext`] owns everything a scenario mutates: memory, variables,
//! request headers and the last captured response. It is built from a shared,
//! read-only [`Seed`] and thrown away when the scenario ends.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::common::{Error, Result};

use super::query::Dialect;
use super::template;
use super::value::{Memory, Value};

/// Default memory entries, read once from the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
    values: BTreeMap<String, String>,
}

impl Seed {
    /// Seed from the environment variables named in `keys`; empty values are skipped
    pub fn from_env<S: AsRef<str>>(keys: &[S]) -> Self {
        Self::from_lookup(keys, |key| std::env::var(key).ok())
    }

    /// Seed from an arbitrary lookup, e.g. a fixed map in tests
    pub fn from_lookup<S, F>(keys: &[S], lookup: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        for key in keys.iter().map(AsRef::as_ref) {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                tracing::debug!(key, value = %value, "seeding default memory");
                values.insert(key.to_string(), value);
            }
        }
        Self { values }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn to_memory(&self) -> Memory {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

/// The last captured HTTP response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastResponse {
    pub status_code: u16,
    /// Code and reason phrase, e.g. `200 OK`
    pub status_text: String,
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl LastResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Which captured payload a step inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The last response body
    Body,
    /// The GraphQL error channel
    Errors,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Body => "response body",
            Source::Errors => "response errors",
        }
    }
}

/// Mutable state of one scenario
#[derive(Debug)]
pub struct ScenarioContext {
    seed: Arc<Seed>,
    memory: Memory,
    variables: Memory,
    headers: BTreeMap<String, String>,
    last_response: LastResponse,
    last_errors: Vec<u8>,
}

impl ScenarioContext {
    /// Fresh context: memory holds exactly the seed, everything else is empty
    pub fn new(seed: Arc<Seed>) -> Self {
        let memory = seed.to_memory();
        Self {
            seed,
            memory,
            variables: Memory::new(),
            headers: BTreeMap::new(),
            last_response: LastResponse::default(),
            last_errors: Vec::new(),
        }
    }

    /// Restore the state of a fresh context
    pub fn reset(&mut self) {
        tracing::trace!("resetting scenario context");
        self.reset_memory();
        self.reset_variables();
        self.reset_headers();
        self.last_response = LastResponse::default();
        self.last_errors.clear();
    }

    pub fn reset_memory(&mut self) {
        self.memory = self.seed.to_memory();
    }

    pub fn reset_variables(&mut self) {
        self.variables.clear();
    }

    pub fn reset_headers(&mut self) {
        self.headers.clear();
    }

    // === Memory ===

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.memory.get(key)
    }

    /// Memory entry as a string; absent and empty entries are `None`
    pub fn get_nonempty_str(&self, key: &str) -> Result<Option<&str>> {
        match self.memory.get(key) {
            None => Ok(None),
            Some(value) => {
                let s = value.as_str(key)?;
                Ok(Some(s).filter(|s| !s.is_empty()))
            }
        }
    }

    pub fn remember(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        tracing::trace!(key = %key, value = %value, "remembered");
        self.memory.insert(key, value);
    }

    /// Render `text` against memory
    pub fn render(&self, text: &str) -> String {
        template::render(text, &self.memory)
    }

    /// Render `text`, failing when a non-empty template renders to nothing
    pub fn render_required(&self, text: &str) -> Result<String> {
        let out = self.render(text);
        if out.is_empty() && !text.is_empty() {
            return Err(Error::TemplateEmpty(text.to_string()));
        }
        Ok(out)
    }

    /// Load every file of `dir` into memory, keyed by file name without `.graphql`
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize> {
        if dir.as_os_str().is_empty() {
            return Err(Error::Config("No directory name given".to_string()));
        }
        let entries = std::fs::read_dir(dir).map_err(|e| Error::FileRead {
            path: dir.display().to_string(),
            error: e.to_string(),
        })?;

        let mut loaded = 0;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let key = name.strip_suffix(".graphql").unwrap_or(name).to_string();
            let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            tracing::trace!(key = %key, file = %path.display(), "loading file into memory");
            self.memory.insert(key, Value::String(content));
            loaded += 1;
        }
        Ok(loaded)
    }

    // === Variables ===

    pub fn variables(&self) -> &Memory {
        &self.variables
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    // === Headers ===

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive lookup of a request header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Render `value` and store it, replacing any header of the same name in any case
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let rendered = self.render_required(value)?;
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), rendered);
        Ok(())
    }

    // === Captured response ===

    pub fn last_response(&self) -> &LastResponse {
        &self.last_response
    }

    pub fn last_errors(&self) -> &[u8] {
        &self.last_errors
    }

    /// Replace the captured response; the error channel is cleared
    pub fn capture(&mut self, response: LastResponse) {
        self.last_response = response;
        self.last_errors.clear();
    }

    pub fn set_last_errors(&mut self, errors: Vec<u8>) {
        self.last_errors = errors;
    }

    /// Raw bytes of the selected payload; an empty error channel reads as `[]`
    pub fn source_bytes(&self, source: Source) -> &[u8] {
        match source {
            Source::Body => self.last_response.body.as_slice(),
            Source::Errors if self.last_errors.is_empty() => b"[]".as_slice(),
            Source::Errors => self.last_errors.as_slice(),
        }
    }

    /// Parse the selected payload as JSON
    pub fn source_json(&self, source: Source) -> Result<serde_json::Value> {
        serde_json::from_slice(self.source_bytes(source))
            .map_err(|e| Error::invalid_json(source.name(), e))
    }

    /// Evaluate a query against the selected payload
    pub fn query(&self, source: Source, dialect: Dialect, query: &str) -> Result<serde_json::Value> {
        let tree = self.source_json(source)?;
        dialect.evaluator().evaluate(query, &tree)
    }

    /// Store the value a query extracts under `key`
    pub fn remember_query(
        &mut self,
        source: Source,
        dialect: Dialect,
        query: &str,
        key: &str,
    ) -> Result<()> {
        let query = self.render_required(query)?;
        let value = self.query(source, dialect, &query)?;
        self.remember(key, Value::from_json(value));
        Ok(())
    }

    // === Dumps ===

    pub fn dump_memory(&self) {
        for (key, value) in &self.memory {
            tracing::info!(key = %key, value = ?value, "dumped memory value");
        }
    }

    pub fn dump_variables(&self) {
        for (key, value) in &self.variables {
            tracing::info!(key = %key, value = ?value, "dumped variable");
        }
    }

    pub fn dump_headers(&self) {
        for (key, value) in &self.headers {
            tracing::info!(key = %key, value = %value, "dumped header");
        }
    }

    pub fn dump_response_headers(&self) {
        for (key, value) in &self.last_response.headers {
            tracing::info!(key = %key, value = %value, "dumped response header");
        }
    }

    /// The response body pretty-printed when it is JSON, verbatim otherwise
    pub fn pretty_body(&self) -> String {
        serde_json::from_slice::<serde_json::Value>(&self.last_response.body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_else(|| self.last_response.body_text().into_owned())
    }
}
