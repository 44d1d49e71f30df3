//! Mango-style query selectors.
//!
//! A selector is a JSON object mapping field names to conditions. A condition is either a bare
//! value (equality) or an object of operators. `$and` / `$or` combine sub-selectors.

use crate::types::Entry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Value);

impl Selector {
    /// Wraps an arbitrary selector object.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// `{key: {"$gt": null}}` for every key: every record where each key field is set.
    pub fn exists_all(keys: &[String]) -> Self {
        let conditions: Map<String, Value> = keys
            .iter()
            .map(|key| (key.clone(), json!({ "$gt": null })))
            .collect();
        Self(Value::Object(conditions))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Evaluates the selector against `entry`. Unknown operators never match.
    pub fn matches(&self, entry: &Entry) -> bool {
        match &self.0 {
            Value::Object(conditions) => matches_object(conditions, entry),
            _ => false,
        }
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn matches_object(conditions: &Map<String, Value>, entry: &Entry) -> bool {
    conditions.iter().all(|(field, condition)| match field.as_str() {
        "$and" => sub_selectors(condition).all(|sub| matches_object(sub, entry)),
        "$or" => sub_selectors(condition).any(|sub| matches_object(sub, entry)),
        _ => matches_field(entry.get(field), condition),
    })
}

fn sub_selectors(condition: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn matches_field(value: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) && !ops.is_empty() => ops
            .iter()
            .all(|(op, operand)| matches_operator(value, op, operand)),
        literal => value.is_some_and(|v| collate(v, literal) == Ordering::Equal),
    }
}

fn matches_operator(value: Option<&Value>, op: &str, operand: &Value) -> bool {
    if op == "$exists" {
        return operand.as_bool() == Some(value.is_some());
    }

    // A missing field satisfies no comparison.
    let Some(value) = value else {
        return false;
    };

    match op {
        "$eq" => collate(value, operand) == Ordering::Equal,
        "$ne" => collate(value, operand) != Ordering::Equal,
        "$gt" => collate(value, operand) == Ordering::Greater,
        "$gte" => collate(value, operand) != Ordering::Less,
        "$lt" => collate(value, operand) == Ordering::Less,
        "$lte" => collate(value, operand) != Ordering::Greater,
        "$in" => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| collate(value, item) == Ordering::Equal)),
        "$nin" => operand
            .as_array()
            .is_some_and(|items| items.iter().all(|item| collate(value, item) != Ordering::Equal)),
        _ => false,
    }
}

/// Document-store collation: null < false < true < numbers < strings < arrays < objects.
pub fn collate(a: &Value, b: &Value) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| collate(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| collate(lv, rv)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}
