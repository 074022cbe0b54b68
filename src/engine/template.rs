//! Template rendering against scenario memory
//!
//! Supports the Go-template subset that scenario files use:
//! `{{.KEY}}`, `{{now}}` and `{{after "24h"}}`. Rendering never fails the
//! caller directly; an invalid template renders to an empty string and the
//! consumer decides how to fail.

use std::sync::OnceLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;

use super::value::Memory;

/// Why a template could not be rendered
#[derive(Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("unclosed action at byte {0}")]
    Unclosed(usize),

    #[error("empty action")]
    EmptyAction,

    #[error("map has no entry for key \"{0}\"")]
    MissingKey(String),

    #[error("function \"{0}\" not defined")]
    UnknownFunction(String),

    #[error("wrong number of args for {name}: want {want} got {got}")]
    Arity {
        name: &'static str,
        want: usize,
        got: usize,
    },

    #[error("malformed argument: {0}")]
    BadArgument(String),

    #[error("invalid duration \"{0}\"")]
    BadDuration(String),
}

/// Render `text` against `memory`, returning an empty string on failure
pub fn render(text: &str, memory: &Memory) -> String {
    match try_render(text, memory) {
        Ok(out) => {
            tracing::trace!(input = text, output = %out, "rendered template");
            out
        }
        Err(e) => {
            tracing::warn!(template = text, error = %e, "template rendering failed");
            String::new()
        }
    }
}

/// Render `text` against `memory`
pub fn try_render(
    text: &str,
    memory: &Memory,
) -> std::result::Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or(TemplateError::Unclosed(offset + start))?;
        out.push_str(&eval_action(after_open[..end].trim(), memory)?);

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

fn action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?:\.(?P<key>[A-Za-z0-9_]+)|(?P<func>[A-Za-z_][A-Za-z0-9_]*)(?P<args>(?:\s+(?:"(?:[^"\\]|\\.)*"|`[^`]*`))*))$"#)
            .expect("static pattern compiles")
    })
}

fn arg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|`[^`]*`"#).expect("static pattern compiles")
    })
}

fn eval_action(
    action: &str,
    memory: &Memory,
) -> std::result::Result<String, TemplateError> {
    if action.is_empty() {
        return Err(TemplateError::EmptyAction);
    }
    let caps = action_pattern()
        .captures(action)
        .ok_or_else(|| TemplateError::BadArgument(action.to_string()))?;

    if let Some(key) = caps.name("key") {
        return memory
            .get(key.as_str())
            .map(|v| v.to_string())
            .ok_or_else(|| TemplateError::MissingKey(key.as_str().to_string()));
    }

    let func = caps.name("func").map(|m| m.as_str()).unwrap_or_default();
    let args = caps
        .name("args")
        .map(|m| {
            arg_pattern()
                .find_iter(m.as_str())
                .map(|a| unquote(a.as_str()))
                .collect::<std::result::Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    match func {
        "now" => {
            expect_args("now", 0, &args)?;
            Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        "after" => {
            expect_args("after", 1, &args)?;
            after(&args[0])
        }
        other => Err(TemplateError::UnknownFunction(other.to_string())),
    }
}

fn expect_args(
    name: &'static str,
    want: usize,
    args: &[String],
) -> std::result::Result<(), TemplateError> {
    if args.len() != want {
        return Err(TemplateError::Arity {
            name,
            want,
            got: args.len(),
        });
    }
    Ok(())
}

fn unquote(literal: &str) -> std::result::Result<String, TemplateError> {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Ok(raw.to_string());
    }
    serde_json::from_str::<String>(literal)
        .map_err(|_| TemplateError::BadArgument(literal.to_string()))
}

/// Current UTC time shifted by a duration such as `24h`, `-90m` or `1h30m`
fn after(spec: &str) -> std::result::Result<String, TemplateError> {
    let bad = || TemplateError::BadDuration(spec.to_string());
    let (negative, magnitude) = match spec.trim() {
        s if s.starts_with('-') => (true, &s[1..]),
        s => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let parsed = humantime::parse_duration(magnitude).map_err(|_| bad())?;
    let delta = chrono::Duration::from_std(parsed).map_err(|_| bad())?;

    let now = Utc::now();
    let at = if negative {
        now.checked_sub_signed(delta)
    } else {
        now.checked_add_signed(delta)
    }
    .ok_or_else(bad)?;
    Ok(at.to_rfc3339_opts(SecondsFormat::Secs, true))
}
