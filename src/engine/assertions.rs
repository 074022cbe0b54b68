//! Response assertions
//!
//! Each strategy reads the captured response (or the error channel) from a
//! [`ScenarioContext`] and returns `Ok(())` or an error carrying both the
//! expected and the actual representation. Expected text is rendered against
//! memory first.

use crate::common::{Error, Result};

use super::context::{ScenarioContext, Source};
use super::matching::{compare_subset, json_equal};
use super::query::Dialect;

/// What the value extracted by a path query is compared against
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// String equality (non-string scalars compare by their JSON text)
    Text(String),
    /// Integer equality after truncating the extracted number
    Integer(String),
    /// Float equality
    Float(String),
    /// Deep JSON equality with a document
    Json(String),
    /// Subset/superset match against a document
    Subset(String),
}

pub fn assert_status(ctx: &ScenarioContext, expected: u16) -> Result<()> {
    let actual = ctx.last_response().status_code;
    if actual != expected {
        return Err(Error::StatusMismatch { expected, actual });
    }
    Ok(())
}

pub fn assert_header(ctx: &ScenarioContext, name: &str, expected: &str) -> Result<()> {
    let expected = ctx.render_required(expected)?;
    tracing::trace!(headers = ?ctx.last_response().headers, "comparing headers");
    match ctx.last_response().header(name) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(Error::HeaderMismatch {
            name: name.to_lowercase(),
            expected,
            actual: actual.to_string(),
        }),
        None => Err(Error::HeaderMissing {
            name: name.to_lowercase(),
            expected,
        }),
    }
}

/// Byte-for-byte comparison of the payload with the rendered text
pub fn assert_exact(ctx: &ScenarioContext, source: Source, expected: &str) -> Result<()> {
    let expected = ctx.render_required(expected)?;
    let actual = ctx.source_bytes(source);
    if expected.as_bytes() != actual {
        return Err(Error::AssertionFailed(format!(
            "expected {} to be: {}, but actual is: {}",
            source.name(),
            expected,
            String::from_utf8_lossy(actual)
        )));
    }
    Ok(())
}

pub fn assert_json(ctx: &ScenarioContext, source: Source, expected: &str) -> Result<()> {
    let expected_text = ctx.render_required(expected)?;
    let expected = parse_expected(&expected_text)?;
    let actual = ctx.source_json(source)?;
    if !json_equal(&actual, &expected) {
        return Err(Error::AssertionFailed(format!(
            "expected JSON does not match actual {}, expected={} actual={}",
            source.name(),
            expected,
            actual
        )));
    }
    Ok(())
}

/// Passes when the payload contains every field of the expected document
pub fn assert_subset(ctx: &ScenarioContext, source: Source, expected: &str) -> Result<()> {
    let expected_text = ctx.render_required(expected)?;
    let expected = parse_expected(&expected_text)?;
    let actual = ctx.source_json(source)?;
    let comparison = compare_subset(&actual, &expected);
    if !comparison.passed() {
        return Err(Error::AssertionFailed(format!(
            "No match for {}:\n{}\nactual=[{}] expected=[{}]",
            source.name(),
            comparison.report(),
            actual,
            expected
        )));
    }
    tracing::trace!(kind = ?comparison.kind, "subset comparison passed");
    Ok(())
}

/// Evaluate a path query and compare the extracted value
pub fn assert_query(
    ctx: &ScenarioContext,
    source: Source,
    dialect: Dialect,
    query: &str,
    expectation: &Expectation,
) -> Result<()> {
    let query = ctx.render_required(query)?;
    let actual = ctx.query(source, dialect, &query)?;

    let mismatch = |expected: &dyn std::fmt::Display, got: &dyn std::fmt::Display| {
        Error::AssertionFailed(format!(
            "No match for value, expected=[{}] got=[{}] for {} path=[{}]",
            expected, got, dialect, query
        ))
    };

    match expectation {
        Expectation::Text(expected) => {
            let expected = ctx.render_required(expected)?;
            let got = match &actual {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if got != expected {
                return Err(mismatch(&expected, &got));
            }
        }
        Expectation::Integer(expected) => {
            let expected = parse_typed(ctx, expected, "number", |s| s.parse::<i64>().ok())?;
            let got = truncate(&actual).ok_or_else(|| not_a_number(dialect, &query, &actual))?;
            if got != expected {
                return Err(mismatch(&expected, &got));
            }
        }
        Expectation::Float(expected) => {
            let expected = parse_typed(ctx, expected, "float", |s| s.parse::<f64>().ok())?;
            let got = actual
                .as_f64()
                .ok_or_else(|| not_a_number(dialect, &query, &actual))?;
            if got != expected {
                return Err(mismatch(&expected, &got));
            }
        }
        Expectation::Json(expected) => {
            let expected = parse_expected(&ctx.render_required(expected)?)?;
            if !json_equal(&actual, &expected) {
                return Err(Error::AssertionFailed(format!(
                    "expected JSON does not match actual, expected:\n{}\nactual:\n{}\nfor {} path=[{}]",
                    expected, actual, dialect, query
                )));
            }
        }
        Expectation::Subset(expected) => {
            let expected = parse_expected(&ctx.render_required(expected)?)?;
            let comparison = compare_subset(&actual, &expected);
            if !comparison.passed() {
                return Err(Error::AssertionFailed(format!(
                    "No match for {} path=[{}]:\n{}\nactual=[{}] expected=[{}]",
                    dialect,
                    query,
                    comparison.report(),
                    actual,
                    expected
                )));
            }
        }
    }
    Ok(())
}

fn parse_expected(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| Error::invalid_json("expected document", e))
}

fn parse_typed<T>(
    ctx: &ScenarioContext,
    raw: &str,
    kind: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    let rendered = ctx.render_required(raw)?;
    parse(&rendered).ok_or_else(|| Error::invalid_value(kind, &rendered))
}

/// Integer value of a JSON number, truncating toward zero
fn truncate(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        _ => None,
    }
}

fn not_a_number(dialect: Dialect, query: &str, actual: &serde_json::Value) -> Error {
    Error::query(
        dialect.evaluator().name(),
        query,
        format!("cannot parse value as number: {}", actual),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::engine::context::{LastResponse, Seed};

    fn ctx_with_body(body: &str) -> ScenarioContext {
        let mut ctx = ScenarioContext::new(Arc::new(Seed::default()));
        let mut response = LastResponse {
            status_code: 200,
            status_text: "200 OK".into(),
            body: body.as_bytes().to_vec(),
            ..Default::default()
        };
        response
            .headers
            .insert("Content-Type".into(), "application/json".into());
        ctx.capture(response);
        ctx
    }

    #[test]
    fn test_status() {
        let ctx = ctx_with_body("{}");
        assert!(assert_status(&ctx, 200).is_ok());
        assert!(matches!(
            assert_status(&ctx, 201),
            Err(Error::StatusMismatch { expected: 201, actual: 200 })
        ));
    }

    #[test]
    fn test_header_case_insensitive_and_distinct_failures() {
        let ctx = ctx_with_body("{}");
        assert!(assert_header(&ctx, "content-type", "application/json").is_ok());
        assert!(matches!(
            assert_header(&ctx, "CONTENT-TYPE", "text/plain"),
            Err(Error::HeaderMismatch { .. })
        ));
        assert!(matches!(
            assert_header(&ctx, "etag", "x"),
            Err(Error::HeaderMissing { .. })
        ));
    }

    #[test]
    fn test_broken_expected_template_never_matches_empty_values() {
        let mut ctx = ctx_with_body(r#"{"name":""}"#);
        let mut response = ctx.last_response().clone();
        response.headers.insert("X-Empty".into(), String::new());
        ctx.capture(response);

        assert!(matches!(
            assert_header(&ctx, "x-empty", "{{.MISSING}}"),
            Err(Error::TemplateEmpty(_))
        ));
        assert!(matches!(
            assert_query(
                &ctx,
                Source::Body,
                Dialect::Jq,
                ".name",
                &Expectation::Text("{{.MISSING}}".into())
            ),
            Err(Error::TemplateEmpty(_))
        ));

        // A literal empty expectation is still allowed
        assert!(assert_header(&ctx, "x-empty", "").is_ok());
        assert!(assert_query(&ctx, Source::Body, Dialect::Jq, ".name", &Expectation::Text(String::new())).is_ok());
    }

    #[test]
    fn test_exact_body_renders_expected() {
        let mut ctx = ctx_with_body("hello Ann");
        ctx.remember("NAME", "Ann");
        assert!(assert_exact(&ctx, Source::Body, "hello {{.NAME}}").is_ok());
        assert!(assert_exact(&ctx, Source::Body, "hello Bob").is_err());
    }

    #[test]
    fn test_json_equality_key_order() {
        let ctx = ctx_with_body(r#"{"a":1,"b":2}"#);
        assert!(assert_json(&ctx, Source::Body, r#"{"b": 2, "a": 1}"#).is_ok());
        let err = assert_json(&ctx, Source::Body, r#"{"a": 1}"#).unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_json_requires_valid_documents() {
        let ctx = ctx_with_body("not json");
        assert!(matches!(
            assert_json(&ctx, Source::Body, "{}"),
            Err(Error::InvalidJson { .. })
        ));
        let ctx = ctx_with_body("{}");
        assert!(matches!(
            assert_json(&ctx, Source::Body, "{oops"),
            Err(Error::InvalidJson { what: "expected document", .. })
        ));
    }

    #[test]
    fn test_subset_strategy() {
        let ctx = ctx_with_body(r#"{"id":1,"name":"Ann"}"#);
        assert!(assert_subset(&ctx, Source::Body, r#"{"id":1}"#).is_ok());
        assert!(assert_subset(&ctx, Source::Body, r#"{"id":1,"name":"Ann"}"#).is_ok());
        let err = assert_subset(&ctx, Source::Body, r#"{"id":2}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected 2"), "{msg}");
        assert!(msg.contains("actual 1"), "{msg}");
    }

    #[test]
    fn test_integer_query_truncates() {
        let ctx = ctx_with_body(r#"{"score":3.9,"count":-2.7}"#);
        let q = |e: &str| {
            assert_query(&ctx, Source::Body, Dialect::Jq, ".score", &Expectation::Integer(e.into()))
        };
        assert!(q("3").is_ok());
        assert!(q("4").unwrap_err().is_mismatch());
        assert!(assert_query(
            &ctx,
            Source::Body,
            Dialect::JsonPath,
            "$.count",
            &Expectation::Integer("-2".into())
        )
        .is_ok());
    }

    #[test]
    fn test_integer_query_rejects_non_numbers() {
        let ctx = ctx_with_body(r#"{"name":"Ann"}"#);
        let err = assert_query(
            &ctx,
            Source::Body,
            Dialect::Jq,
            ".name",
            &Expectation::Integer("1".into()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Query { .. }));

        let err = assert_query(
            &ctx,
            Source::Body,
            Dialect::Jq,
            ".name",
            &Expectation::Integer("one".into()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { kind: "number", .. }));
    }

    #[test]
    fn test_float_and_text_queries() {
        let ctx = ctx_with_body(r#"{"ratio":0.25,"name":"Ann","id":7}"#);
        assert!(assert_query(&ctx, Source::Body, Dialect::Jq, ".ratio", &Expectation::Float("0.25".into())).is_ok());
        assert!(assert_query(&ctx, Source::Body, Dialect::Jq, ".ratio", &Expectation::Float("0.5".into())).is_err());
        assert!(assert_query(&ctx, Source::Body, Dialect::JsonPath, "$.name", &Expectation::Text("Ann".into())).is_ok());
        assert!(assert_query(&ctx, Source::Body, Dialect::JsonPath, "$.id", &Expectation::Text("7".into())).is_ok());
    }

    #[test]
    fn test_query_failure_is_not_a_mismatch() {
        let ctx = ctx_with_body(r#"{"a":1}"#);
        let err = assert_query(
            &ctx,
            Source::Body,
            Dialect::JsonPath,
            "$.b",
            &Expectation::Text("1".into()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
        assert!(!err.is_mismatch());
    }

    #[test]
    fn test_query_json_and_subset() {
        let ctx = ctx_with_body(r#"{"user":{"id":1,"name":"Ann","roles":["admin"]}}"#);
        assert!(assert_query(
            &ctx,
            Source::Body,
            Dialect::Jq,
            ".user",
            &Expectation::Json(r#"{"name":"Ann","id":1,"roles":["admin"]}"#.into())
        )
        .is_ok());
        assert!(assert_query(
            &ctx,
            Source::Body,
            Dialect::JsonPath,
            "$.user",
            &Expectation::Subset(r#"{"name":"Ann"}"#.into())
        )
        .is_ok());
        assert!(assert_query(
            &ctx,
            Source::Body,
            Dialect::JsonPath,
            "$.user",
            &Expectation::Subset(r#"{"name":"Bob"}"#.into())
        )
        .is_err());
    }

    #[test]
    fn test_error_channel_source() {
        let mut ctx = ctx_with_body(r#"{"data":null,"errors":[{"message":"not found"}]}"#);
        ctx.set_last_errors(br#"[{"message":"not found"}]"#.to_vec());
        let expectation = Expectation::Text("not found".into());
        assert!(assert_query(&ctx, Source::Errors, Dialect::Jq, ".[0].message", &expectation).is_ok());
        assert!(assert_query(&ctx, Source::Body, Dialect::Jq, ".[0].message", &expectation).is_err());
        assert!(assert_json(&ctx, Source::Errors, r#"[{"message":"not found"}]"#).is_ok());
    }
}
