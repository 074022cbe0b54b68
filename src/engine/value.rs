//! Typed values stored in scenario memory and variables

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::common::{Error, Result};

/// Keyed values: scenario memory and variables
pub type Memory = BTreeMap<String, Value>;

/// A value held in memory or variables
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<String>),
    Json(serde_json::Value),
}

impl Value {
    /// Short name of the variant, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Json(_) => "json",
        }
    }

    pub fn as_str(&self, key: &str) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch(key, "string")),
        }
    }

    pub fn as_i64(&self, key: &str) -> Result<i64> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(other.mismatch(key, "integer")),
        }
    }

    /// Floats, and integers widened to floats
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Integer(n) => Ok(*n as f64),
            other => Err(other.mismatch(key, "float")),
        }
    }

    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(other.mismatch(key, "boolean")),
        }
    }

    pub fn as_list(&self, key: &str) -> Result<&[String]> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch(key, "list")),
        }
    }

    fn mismatch(&self, key: &str, expected: &'static str) -> Error {
        Error::TypeMismatch {
            key: key.to_string(),
            expected,
            actual: self.kind(),
        }
    }

    /// Convert an extracted JSON value, keeping scalars in their natural variant
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => match n.as_f64() {
                    Some(f) => Value::Float(f),
                    None => Value::Json(serde_json::Value::Number(n)),
                },
            },
            other => Value::Json(other),
        }
    }

    /// Parse a strict boolean: `1 t T TRUE true True 0 f F FALSE false False`
    pub fn parse_bool(text: &str) -> Result<bool> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(Error::invalid_value("boolean", text)),
        }
    }

    pub fn parse_integer(text: &str) -> Result<i64> {
        text.parse()
            .map_err(|_| Error::invalid_value("number", text))
    }

    pub fn parse_float(text: &str) -> Result<f64> {
        text.parse()
            .map_err(|_| Error::invalid_value("float", text))
    }

    /// Comma-separated list; items are kept verbatim
    pub fn parse_list(text: &str) -> Self {
        Value::List(text.split(',').map(String::from).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Text used when the value is substituted into a template
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                let json = serde_json::to_string(items).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}
