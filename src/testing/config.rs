//! Scenario file types
//!
//! Defines the data structures for deserializing YAML scenario files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};

/// A feature: a named group of scenarios loaded from one YAML file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    /// Name of the feature
    pub name: String,
    /// Optional description of what the feature covers
    pub description: Option<String>,
    /// Steps run at the start of every scenario
    #[serde(default)]
    pub background: Vec<StepSpec>,
    /// Scenarios, run in order
    pub scenarios: Vec<Scenario>,
}

/// One scenario: an ordered list of steps sharing a context
#[derive(Deserialize, Debug)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// A step as written in the file: a bare phrase, or a phrase with a doc string
///
/// Doc-string phrases end in `:`, so YAML reads them as a one-entry mapping:
///
/// ```yaml
/// - the response should match json: |
///     {"id": 1}
/// ```
///
/// is the phrase `the response should match json:` with its doc string. The
/// explicit `{step, doc}` form is accepted too, with `step` quoted.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawStep")]
pub enum StepSpec {
    Phrase(String),
    WithDoc { step: String, doc: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    Phrase(String),
    WithDoc { step: String, doc: String },
    Keyed(BTreeMap<String, serde_yaml::Value>),
}

impl TryFrom<RawStep> for StepSpec {
    type Error = String;

    fn try_from(raw: RawStep) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawStep::Phrase(phrase) => Ok(StepSpec::Phrase(phrase)),
            RawStep::WithDoc { step, doc } => Ok(StepSpec::WithDoc { step, doc }),
            RawStep::Keyed(map) => {
                let mut entries = map.into_iter();
                let (key, value) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => return Err("a step mapping must hold exactly one phrase".to_string()),
                };
                // The mapping separator is the phrase's trailing colon
                let step = format!("{}:", key.trim_end());
                let doc = match value {
                    serde_yaml::Value::Null => return Ok(StepSpec::Phrase(step)),
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    // Inline `{...}` / `[...]` documents arrive as YAML collections
                    other @ (serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_)) => {
                        serde_json::to_string(&other)
                            .map_err(|e| format!("doc string of '{}' is not JSON: {}", step, e))?
                    }
                    serde_yaml::Value::Tagged(_) => {
                        return Err(format!("doc string of '{}' must be text", step))
                    }
                };
                Ok(StepSpec::WithDoc { step, doc })
            }
        }
    }
}

impl StepSpec {
    pub fn phrase(&self) -> &str {
        match self {
            StepSpec::Phrase(phrase) => phrase,
            StepSpec::WithDoc { step, .. } => step,
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            StepSpec::Phrase(_) => None,
            StepSpec::WithDoc { doc, .. } => Some(doc),
        }
    }
}

impl ScenarioFile {
    /// Read and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse scenario file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_phrases_and_doc_steps() {
        let file = ScenarioFile::parse(
            r#"
name: Users API
scenarios:
  - name: fetch user
    steps:
      - I send "GET" request to "/users/1"
      - the response should match json: |
          {"id": 1}
      - step: "I send \"POST\" request to \"/users\" with data:"
        doc: '{"name": "Ann"}'
"#,
        )
        .unwrap();

        assert_eq!(file.name, "Users API");
        assert!(file.description.is_none());
        assert!(file.background.is_empty());
        let steps = &file.scenarios[0].steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].phrase(), r#"I send "GET" request to "/users/1""#);
        assert_eq!(steps[0].doc(), None);
        assert_eq!(steps[1].phrase(), "the response should match json:");
        assert_eq!(steps[1].doc(), Some("{\"id\": 1}\n"));
        assert_eq!(steps[2].phrase(), r#"I send "POST" request to "/users" with data:"#);
        assert_eq!(steps[2].doc(), Some(r#"{"name": "Ann"}"#));
    }

    #[test]
    fn test_doc_phrase_without_doc_is_a_plain_phrase() {
        let file = ScenarioFile::parse(
            r#"
name: missing doc
scenarios:
  - name: forgot the document
    steps:
      - the response should match json:
      - I remember "QUERY" as: query { me }
"#,
        )
        .unwrap();
        let steps = &file.scenarios[0].steps;
        assert_eq!(
            steps[0],
            StepSpec::Phrase("the response should match json:".into())
        );
        assert_eq!(steps[1].phrase(), r#"I remember "QUERY" as:"#);
        assert_eq!(steps[1].doc(), Some("query { me }"));
    }

    #[test]
    fn test_inline_json_doc_is_kept_as_json_text() {
        let file = ScenarioFile::parse(
            r#"
name: inline
scenarios:
  - name: flow mapping
    steps:
      - the response should match subset of json: {"id": 1}
"#,
        )
        .unwrap();
        let doc = file.scenarios[0].steps[0].doc().unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(doc).unwrap(), serde_json::json!({"id": 1}));
    }

    #[test]
    fn test_step_mapping_with_two_phrases_is_rejected() {
        let err = ScenarioFile::parse(
            r#"
name: ambiguous
scenarios:
  - name: two keys
    steps:
      - the response should be: a
        the response should match json: b
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_background_and_empty_scenario() {
        let file = ScenarioFile::parse(
            r#"
name: With background
description: shared setup
background:
  - I set HTTP header "Accept" as "application/json"
scenarios:
  - name: nothing yet
"#,
        )
        .unwrap();
        assert_eq!(file.description.as_deref(), Some("shared setup"));
        assert_eq!(file.background.len(), 1);
        assert!(file.scenarios[0].steps.is_empty());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let err = ScenarioFile::parse("name: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ScenarioFile::parse("name: missing scenarios").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = ScenarioFile::load(Path::new("/no/such/scenario.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
