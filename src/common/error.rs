//! Error types for apiprobe
//!
//! Error messages are written for scenario authors: a failed step prints the
//! error as-is, so every variant names what was expected and what was found.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apiprobe
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("No {kind} endpoint defined. Please set {key} env variable/memory.")]
    MissingEndpoint { kind: &'static str, key: &'static str },

    #[error("No value for '{0}' in memory. Please set memory with a value.")]
    MissingMemoryKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid {kind} value: '{value}'")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Value '{key}' is {actual}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    // === Template Errors ===
    #[error("Template '{0}' rendered to an empty string")]
    TemplateEmpty(String),

    // === Transport Errors ===
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    // === Parse Errors ===
    #[error("Failed to parse {what} as JSON: {message}")]
    InvalidJson { what: &'static str, message: String },

    // === Query Errors ===
    #[error("{dialect} query '{query}' failed: {message}")]
    Query {
        dialect: &'static str,
        query: String,
        message: String,
    },

    // === Assertion Errors ===
    #[error("expected response code to be: {expected}, but actual is: {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("expected header {name} to be: {expected}, but found no such header")]
    HeaderMissing { name: String, expected: String },

    #[error("expected header {name} to be: {expected}, but actual is: {actual}")]
    HeaderMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    AssertionFailed(String),

    // === Scenario Errors ===
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid JSON error for the named document
    pub fn invalid_json(what: &'static str, error: impl std::fmt::Display) -> Self {
        Self::InvalidJson {
            what,
            message: error.to_string(),
        }
    }

    /// Create a query failure error
    pub fn query(dialect: &'static str, query: &str, message: impl Into<String>) -> Self {
        Self::Query {
            dialect,
            query: query.to_string(),
            message: message.into(),
        }
    }

    /// Create a transport error for the given URL
    pub fn transport(url: &str, error: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    /// Create an invalid value error for a typed setter
    pub fn invalid_value(kind: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            kind,
            value: value.to_string(),
        }
    }

    /// Whether this error is an assertion mismatch rather than an execution failure
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Error::StatusMismatch { .. }
                | Error::HeaderMissing { .. }
                | Error::HeaderMismatch { .. }
                | Error::AssertionFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_classification() {
        assert!(Error::StatusMismatch { expected: 200, actual: 404 }.is_mismatch());
        assert!(Error::AssertionFailed("x".into()).is_mismatch());
        assert!(!Error::query("jq", ".a", "boom").is_mismatch());
        assert!(!Error::MissingMemoryKey("q".into()).is_mismatch());
    }

    #[test]
    fn test_messages_name_both_sides() {
        let e = Error::HeaderMismatch {
            name: "content-type".into(),
            expected: "text/plain".into(),
            actual: "application/json".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("text/plain"));
        assert!(msg.contains("application/json"));
    }
}
