//! Structural JSON comparison
//!
//! Two comparisons are provided: deep equality, where numbers compare by
//! value and object key order is irrelevant, and subset classification, where
//! the actual document may carry more than the expected one.

use serde_json::{Number, Value};

/// Outcome of a subset comparison, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Actual and expected are equal
    FullMatch,
    /// Actual contains everything expected, and more
    SupersetMatch,
    /// Something expected is missing or different
    NoMatch,
}

/// Result of [`compare_subset`]: the classification and every difference found
#[derive(Debug, Clone)]
pub struct Comparison {
    pub kind: MatchKind,
    pub differences: Vec<String>,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.kind != MatchKind::NoMatch
    }

    /// Human-readable list of differences, one per line
    pub fn report(&self) -> String {
        self.differences.join("\n")
    }
}

/// Deep equality of two JSON trees
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Classify `actual` against `expected`; fields absent from `expected` are ignored
pub fn compare_subset(actual: &Value, expected: &Value) -> Comparison {
    let mut differences = Vec::new();
    let kind = compare_at("$", actual, expected, &mut differences);
    Comparison { kind, differences }
}

fn compare_at(path: &str, actual: &Value, expected: &Value, diffs: &mut Vec<String>) -> MatchKind {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => {
            let mut kind = MatchKind::FullMatch;
            for (key, ev) in e {
                let child = format!("{}.{}", path, key);
                kind = kind.max(match a.get(key) {
                    Some(av) => compare_at(&child, av, ev, diffs),
                    None => {
                        diffs.push(format!("{}: missing, expected {}", child, ev));
                        MatchKind::NoMatch
                    }
                });
            }
            if a.keys().any(|k| !e.contains_key(k)) {
                kind = kind.max(MatchKind::SupersetMatch);
            }
            kind
        }
        (Value::Array(a), Value::Array(e)) => {
            let mut kind = MatchKind::FullMatch;
            for (i, ev) in e.iter().enumerate() {
                let child = format!("{}[{}]", path, i);
                kind = kind.max(match a.get(i) {
                    Some(av) => compare_at(&child, av, ev, diffs),
                    None => {
                        diffs.push(format!("{}: missing, expected {}", child, ev));
                        MatchKind::NoMatch
                    }
                });
            }
            if a.len() > e.len() {
                kind = kind.max(MatchKind::SupersetMatch);
            }
            kind
        }
        _ if json_equal(actual, expected) => MatchKind::FullMatch,
        _ => {
            diffs.push(format!("{}: expected {}, actual {}", path, expected, actual));
            MatchKind::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_equality_ignores_key_order() {
        assert!(json_equal(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_deep_equality_compares_numbers_by_value() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!([1, 2.5]), &json!([1.0, 2.5])));
        assert!(!json_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_deep_equality_is_reflexive() {
        let v = json!({"list": [1, {"x": null}], "s": "t", "f": false});
        assert!(json_equal(&v, &v));
    }

    #[test]
    fn test_subset_classification() {
        let expected = json!({"a": 1});
        assert_eq!(compare_subset(&json!({"a": 1}), &expected).kind, MatchKind::FullMatch);
        assert_eq!(
            compare_subset(&json!({"a": 1, "b": 2}), &expected).kind,
            MatchKind::SupersetMatch
        );
        assert_eq!(compare_subset(&json!({"b": 2}), &expected).kind, MatchKind::NoMatch);
        assert_eq!(compare_subset(&json!({"a": 2}), &expected).kind, MatchKind::NoMatch);
    }

    #[test]
    fn test_nested_subset_and_arrays() {
        let actual = json!({"user": {"id": 1, "tags": ["a", "b", "c"], "extra": true}});
        let cmp = compare_subset(&actual, &json!({"user": {"tags": ["a", "b"]}}));
        assert_eq!(cmp.kind, MatchKind::SupersetMatch);
        assert!(cmp.passed());

        let cmp = compare_subset(&actual, &json!({"user": {"tags": ["a", "b", "c", "d"]}}));
        assert_eq!(cmp.kind, MatchKind::NoMatch);
        assert_eq!(cmp.differences, vec![r#"$.user.tags[3]: missing, expected "d""#]);
    }

    #[test]
    fn test_difference_names_both_values() {
        let cmp = compare_subset(&json!({"id": 1, "name": "Ann"}), &json!({"id": 2}));
        assert!(!cmp.passed());
        assert_eq!(cmp.report(), "$.id: expected 2, actual 1");
    }

    #[test]
    fn test_no_match_dominates_superset() {
        let cmp = compare_subset(&json!({"a": 1, "b": 2, "c": 3}), &json!({"a": 1, "d": 4}));
        assert_eq!(cmp.kind, MatchKind::NoMatch);
    }
}
