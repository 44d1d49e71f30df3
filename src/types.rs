use crate::dom::Document;
use crate::FINGERPRINT_DELIMITER;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// A schema-less record as fetched by a connector or stored in the document store.
/// Only the fields named by the configured keys are ever inspected.
pub type Entry = Map<String, Value>;

/// Composite identity of an entry under a given list of key fields.
///
/// Two entries with equal values for every key field share a fingerprint. The identity is
/// heuristic: a key value containing the delimiter can make distinct entries collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of `entry` over `keys`, in key order.
    pub fn of(entry: &Entry, keys: &[String]) -> Self {
        let parts: Vec<String> = keys
            .iter()
            .map(|key| render_key_value(entry.get(key)))
            .collect();
        Self(parts.join(FINGERPRINT_DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Missing and null values both render as the empty string.
fn render_key_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => render_number(n),
        Some(other) => other.to_string(),
    }
}

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Integral floats render like integers, so `1.0` and `1` are the same key.
fn render_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                return format!("{}", f as i64);
            }
        }
    }
    n.to_string()
}

/// Handle to an index defined in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHandle {
    /// The collection the index covers.
    pub doctype: String,
    /// Store-side name of the index.
    pub name: String,
    /// Indexed fields, in order.
    pub fields: Vec<String>,
}

impl IndexHandle {
    pub fn new(doctype: impl Into<String>, fields: &[String]) -> Self {
        Self {
            doctype: doctype.into(),
            name: format!("by_{}", fields.join("_")),
            fields: fields.to_vec(),
        }
    }
}

/// A response body after the client's transform step.
#[derive(Debug)]
pub enum Payload {
    /// Body parsed as JSON.
    Json(Value),
    /// Body parsed into a queryable HTML document.
    Html(Document),
    /// Raw body text.
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_html(&self) -> Option<&Document> {
        match self {
            Payload::Html(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The full response handed back when `resolve_with_full_response` is set.
#[derive(Debug)]
pub struct FullResponse {
    pub status: StatusCode,
    /// Final URL, after redirects.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Payload,
}

/// What a request resolves to: the transformed body alone, or the full response around it.
#[derive(Debug)]
pub enum Transformed {
    Body(Payload),
    Full(FullResponse),
}

impl Transformed {
    /// The payload, wherever it lives.
    pub fn payload(&self) -> &Payload {
        match self {
            Transformed::Body(payload) => payload,
            Transformed::Full(response) => &response.body,
        }
    }

    pub fn into_payload(self) -> Payload {
        match self {
            Transformed::Body(payload) => payload,
            Transformed::Full(response) => response.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Entry {
        match value {
            Value::Object(map) => map,
            _ => panic!("test entries must be objects"),
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fingerprint_ignores_non_key_fields() {
        let a = entry(json!({"id": 1, "name": "a"}));
        let b = entry(json!({"id": 1, "name": "x"}));

        assert_eq!(Fingerprint::of(&a, &keys(&["id"])), Fingerprint::of(&b, &keys(&["id"])));
    }

    #[test]
    fn test_fingerprint_composite_order() {
        let e = entry(json!({"a": "left", "b": 2, "c": true}));

        assert_eq!(Fingerprint::of(&e, &keys(&["a", "b", "c"])).as_str(), "left####2####true");
        assert_eq!(Fingerprint::of(&e, &keys(&["b", "a"])).as_str(), "2####left");
    }

    #[test]
    fn test_fingerprint_missing_and_null_render_empty() {
        let missing = entry(json!({"a": 1}));
        let null = entry(json!({"a": 1, "b": null}));

        assert_eq!(Fingerprint::of(&missing, &keys(&["a", "b"])).as_str(), "1####");
        assert_eq!(
            Fingerprint::of(&missing, &keys(&["a", "b"])),
            Fingerprint::of(&null, &keys(&["a", "b"]))
        );
    }

    #[test]
    fn test_fingerprint_string_and_number_collide() {
        // Values are compared by their rendering, not their JSON type.
        let number = entry(json!({"id": 7}));
        let string = entry(json!({"id": "7"}));

        assert_eq!(Fingerprint::of(&number, &keys(&["id"])), Fingerprint::of(&string, &keys(&["id"])));
    }

    #[test]
    fn test_fingerprint_integral_float_matches_integer() {
        let integer = entry(json!({"id": 1, "amount": -42}));
        let float = entry(json!({"id": 1.0, "amount": -42.0}));

        assert_eq!(
            Fingerprint::of(&integer, &keys(&["id", "amount"])),
            Fingerprint::of(&float, &keys(&["id", "amount"]))
        );
        assert_eq!(Fingerprint::of(&float, &keys(&["id", "amount"])).as_str(), "1####-42");
    }

    #[test]
    fn test_fingerprint_fractional_float_kept() {
        let e = entry(json!({"amount": 12.5}));

        assert_eq!(Fingerprint::of(&e, &keys(&["amount"])).as_str(), "12.5");
        assert_ne!(
            Fingerprint::of(&e, &keys(&["amount"])),
            Fingerprint::of(&entry(json!({"amount": 12})), &keys(&["amount"]))
        );
    }

    #[test]
    fn test_index_handle_name() {
        let handle = IndexHandle::new("io.bills", &keys(&["date", "amount"]));

        assert_eq!(handle.name, "by_date_amount");
        assert_eq!(handle.fields, keys(&["date", "amount"]));
    }
}
