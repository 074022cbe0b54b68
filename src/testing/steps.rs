//! Step phrase parsing
//!
//! Maps the phrases used in scenario files onto [`Step`] values. Matching is
//! exact: a phrase either matches one pattern completely or is unknown.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::common::{Error, Result};
use crate::engine::{Dialect, Expectation, Source};

/// A parsed step, ready to run against a scenario context
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Send {
        method: String,
        path: String,
        body: String,
    },
    Status(u16),
    Header {
        name: String,
        value: String,
    },
    BodyExact {
        source: Source,
        expected: String,
    },
    BodyJson {
        source: Source,
        expected: String,
    },
    BodySubset {
        source: Source,
        expected: String,
    },
    Query {
        source: Source,
        dialect: Dialect,
        query: String,
        expectation: Expectation,
    },
    RememberQuery {
        dialect: Dialect,
        query: String,
        key: String,
    },
    Remember {
        key: String,
        value: String,
    },
    SetVariable {
        key: String,
        kind: VariableKind,
        value: String,
    },
    SetHeader {
        name: String,
        value: String,
    },
    ExecuteQuery(String),
    Wait(u64),
    Dump(DumpTarget),
    Reset(ResetTarget),
    LoadDirectory(String),
}

/// How the text of a variable step is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    String,
    StringList,
    Number,
    Float,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpTarget {
    Memory,
    Variables,
    Headers,
    ResponseHeaders,
    ResponseJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget {
    Headers,
    Variables,
    Memory,
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Send,
    SendWithData,
    Status,
    Header,
    BodyExact,
    BodyJson,
    BodySubset,
    QueryText,
    QueryNumber,
    QueryFloat,
    QueryJson,
    QuerySubset,
    RememberQuery,
    Remember,
    RememberDoc,
    SetVariable,
    SetHeader,
    ExecuteQuery,
    Wait,
    Dump,
    Reset,
    LoadDirectory,
}

impl Pattern {
    fn takes_doc(self) -> bool {
        matches!(
            self,
            Pattern::SendWithData
                | Pattern::BodyExact
                | Pattern::BodyJson
                | Pattern::BodySubset
                | Pattern::QueryJson
                | Pattern::QuerySubset
                | Pattern::RememberDoc
        )
    }
}

// Quoted argument; `\"` and `\\` escapes are allowed inside
const QUOTED: &str = r#""((?:[^"\\]|\\.)*)""#;

fn patterns() -> &'static [(Pattern, Regex)] {
    static PATTERNS: OnceLock<Vec<(Pattern, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let query = format!(r"the response( errors)? (jsonpath|jq) {QUOTED} should match");
        [
            (Pattern::Send, format!(r"I send {QUOTED} request to {QUOTED}")),
            (Pattern::SendWithData, format!(r"I send {QUOTED} request to {QUOTED} with data:")),
            (Pattern::Status, r"the response code should be (\d+)".to_string()),
            (Pattern::Header, format!(r"the response header {QUOTED} should match {QUOTED}")),
            (Pattern::BodyExact, r"the response( errors)? should be:".to_string()),
            (Pattern::BodyJson, r"the response( errors)? should match json:".to_string()),
            (Pattern::BodySubset, r"the response( errors)? should match subset of json:".to_string()),
            (Pattern::QueryText, format!(r"{query} {QUOTED}")),
            (Pattern::QueryNumber, format!(r"{query} number {QUOTED}")),
            (Pattern::QueryFloat, format!(r"{query} float {QUOTED}")),
            (Pattern::QueryJson, format!(r"{query} json:")),
            (Pattern::QuerySubset, format!(r"{query} subset of json:")),
            (Pattern::RememberQuery, format!(r"I remember (?:response )?(jsonpath|jq) {QUOTED} as {QUOTED}")),
            (Pattern::Remember, format!(r"I remember {QUOTED} as {QUOTED}")),
            (Pattern::RememberDoc, format!(r"I remember {QUOTED} as:")),
            (Pattern::SetVariable, format!(r"I set variable {QUOTED} as (?:(string list|number|float|boolean) )?{QUOTED}")),
            (Pattern::SetHeader, format!(r"I set HTTP header {QUOTED} as {QUOTED}")),
            (Pattern::ExecuteQuery, format!(r"I execute query {QUOTED}")),
            (Pattern::Wait, r#"I wait "(\d+)" seconds?"#.to_string()),
            (Pattern::Dump, r"I dump (memory|variables|headers|response headers|response as JSON)".to_string()),
            (Pattern::Reset, r"I reset (headers|variables|memory)".to_string()),
            (Pattern::LoadDirectory, format!(r"I load variables from directory {QUOTED}")),
        ]
        .into_iter()
        .map(|(pattern, re)| {
            let re = Regex::new(&format!("^{re}$")).expect("step patterns compile");
            (pattern, re)
        })
        .collect()
    })
}

/// Parse a phrase and its optional doc string into a [`Step`]
pub fn parse_step(phrase: &str, doc: Option<&str>) -> Result<Step> {
    let phrase = phrase.trim();
    let (pattern, caps) = patterns()
        .iter()
        .find_map(|(pattern, re)| re.captures(phrase).map(|caps| (*pattern, caps)))
        .ok_or_else(|| Error::UnknownStep(phrase.to_string()))?;

    let doc = match (pattern.takes_doc(), doc) {
        (true, Some(doc)) => doc.to_string(),
        (true, None) => {
            return Err(Error::Config(format!(
                "Step '{}' requires a doc string",
                phrase
            )))
        }
        (false, Some(_)) => {
            return Err(Error::Config(format!(
                "Step '{}' does not take a doc string",
                phrase
            )))
        }
        (false, None) => String::new(),
    };

    let text = |i: usize| unescape(caps.get(i).map_or("", |m| m.as_str()));
    let source = |caps: &Captures| {
        if caps.get(1).is_some() {
            Source::Errors
        } else {
            Source::Body
        }
    };

    let step = match pattern {
        Pattern::Send => Step::Send {
            method: text(1),
            path: text(2),
            body: String::new(),
        },
        Pattern::SendWithData => Step::Send {
            method: text(1),
            path: text(2),
            body: doc,
        },
        Pattern::Status => {
            let code = &caps[1];
            Step::Status(
                code.parse()
                    .map_err(|_| Error::invalid_value("status code", code))?,
            )
        }
        Pattern::Header => Step::Header {
            name: text(1),
            value: text(2),
        },
        Pattern::BodyExact => Step::BodyExact {
            source: source(&caps),
            expected: doc,
        },
        Pattern::BodyJson => Step::BodyJson {
            source: source(&caps),
            expected: doc,
        },
        Pattern::BodySubset => Step::BodySubset {
            source: source(&caps),
            expected: doc,
        },
        Pattern::QueryText
        | Pattern::QueryNumber
        | Pattern::QueryFloat
        | Pattern::QueryJson
        | Pattern::QuerySubset => {
            let expectation = match pattern {
                Pattern::QueryText => Expectation::Text(text(4)),
                Pattern::QueryNumber => Expectation::Integer(text(4)),
                Pattern::QueryFloat => Expectation::Float(text(4)),
                Pattern::QueryJson => Expectation::Json(doc),
                _ => Expectation::Subset(doc),
            };
            Step::Query {
                source: source(&caps),
                dialect: dialect(&caps[2])?,
                query: text(3),
                expectation,
            }
        }
        Pattern::RememberQuery => Step::RememberQuery {
            dialect: dialect(&caps[1])?,
            query: text(2),
            key: text(3),
        },
        Pattern::Remember => Step::Remember {
            key: text(1),
            value: text(2),
        },
        Pattern::RememberDoc => Step::Remember {
            key: text(1),
            value: doc,
        },
        Pattern::SetVariable => Step::SetVariable {
            key: text(1),
            kind: match caps.get(2).map(|m| m.as_str()) {
                Some("string list") => VariableKind::StringList,
                Some("number") => VariableKind::Number,
                Some("float") => VariableKind::Float,
                Some("boolean") => VariableKind::Boolean,
                _ => VariableKind::String,
            },
            value: text(3),
        },
        Pattern::SetHeader => Step::SetHeader {
            name: text(1),
            value: text(2),
        },
        Pattern::ExecuteQuery => Step::ExecuteQuery(text(1)),
        Pattern::Wait => {
            let secs = &caps[1];
            Step::Wait(
                secs.parse()
                    .map_err(|_| Error::invalid_value("number", secs))?,
            )
        }
        Pattern::Dump => Step::Dump(match &caps[1] {
            "memory" => DumpTarget::Memory,
            "variables" => DumpTarget::Variables,
            "headers" => DumpTarget::Headers,
            "response headers" => DumpTarget::ResponseHeaders,
            _ => DumpTarget::ResponseJson,
        }),
        Pattern::Reset => Step::Reset(match &caps[1] {
            "headers" => ResetTarget::Headers,
            "variables" => ResetTarget::Variables,
            _ => ResetTarget::Memory,
        }),
        Pattern::LoadDirectory => Step::LoadDirectory(text(1)),
    };
    Ok(step)
}

fn dialect(keyword: &str) -> Result<Dialect> {
    Dialect::parse(keyword).ok_or_else(|| Error::Internal(format!("unknown dialect {}", keyword)))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
