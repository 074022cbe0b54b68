//! Path-query dialects
//!
//! Both dialects sit behind [`QueryEvaluator`] so assertions don't care which
//! one a step asked for. JSONPath comes from `serde_json_path`, jq filters
//! from `jaq`.

use std::fmt;

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;
use serde_json_path::JsonPath;

use crate::common::{Error, Result};

/// Evaluates a query against a parsed JSON document
pub trait QueryEvaluator {
    /// Dialect name used in error messages
    fn name(&self) -> &'static str;

    /// Evaluate `query` against `input`, yielding the single value to compare
    fn evaluate(&self, query: &str, input: &Value) -> Result<Value>;
}

/// Query dialect selected by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JsonPath,
    Jq,
}

impl Dialect {
    pub fn evaluator(self) -> &'static dyn QueryEvaluator {
        match self {
            Dialect::JsonPath => &JsonPathEvaluator,
            Dialect::Jq => &JqEvaluator,
        }
    }

    /// Parse the dialect keyword used in step phrases
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jsonpath" => Some(Dialect::JsonPath),
            "jq" => Some(Dialect::Jq),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.evaluator().name())
    }
}

/// JSONPath (RFC 9535) selector
///
/// A singular query (names and indexes only) yields its node. Wildcards,
/// descendants, filters, slices and unions always yield an array of the
/// matched nodes. No match at all is a "path not found" error.
pub struct JsonPathEvaluator;

impl QueryEvaluator for JsonPathEvaluator {
    fn name(&self) -> &'static str {
        "jsonpath"
    }

    fn evaluate(&self, query: &str, input: &Value) -> Result<Value> {
        let path = JsonPath::parse(query).map_err(|e| Error::query(self.name(), query, e.to_string()))?;
        let nodes = path.query(input).all();
        match nodes.as_slice() {
            [] => Err(Error::query(self.name(), query, "path not found")),
            [single] if is_singular(query) => Ok((*single).clone()),
            many => Ok(Value::Array(many.iter().map(|v| (*v).clone()).collect())),
        }
    }
}

/// Whether a JSONPath query can select at most one node
fn is_singular(query: &str) -> bool {
    let mut quote = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut prev = '\0';

    for c in query.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '*' => return false,
            '.' if prev == '.' => return false,
            '?' | ':' | ',' if depth > 0 => return false,
            _ => {}
        }
        prev = c;
    }
    true
}

/// jq filter
///
/// A filter may emit a stream of values; the last one is the result.
pub struct JqEvaluator;

impl QueryEvaluator for JqEvaluator {
    fn name(&self) -> &'static str {
        "jq"
    }

    fn evaluate(&self, query: &str, input: &Value) -> Result<Value> {
        let fail = |message: String| Error::query(self.name(), query, message);

        let program = File {
            code: query,
            path: (),
        };
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = Arena::default();
        let modules = loader
            .load(&arena, program)
            .map_err(|errs| fail(format!("invalid filter: {:?}", errs)))?;

        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errs| fail(format!("cannot compile filter: {:?}", errs)))?;

        let inputs = RcIter::new(core::iter::empty());
        let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

        let mut last = None;
        for output in outputs {
            let val = output.map_err(|e| fail(e.to_string()))?;
            last = Some(Value::from(val));
        }
        last.ok_or_else(|| fail("filter produced no output".to_string()))
    }
}
