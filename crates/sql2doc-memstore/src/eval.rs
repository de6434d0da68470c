//! Filter matching, projection and sort ordering over JSON documents

use serde_json::Value as Json;
use sql2doc_ir::{Condition, Document, Filter, Projection, SortDirection, SortSpec, Value};
use std::cmp::Ordering;

/// Comparable view of a single value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Str(&'a str),
    /// Epoch seconds
    Date(i64),
    Other,
}

impl<'a> Scalar<'a> {
    fn from_json(v: &'a Json) -> Self {
        match v {
            Json::Null => Scalar::Null,
            Json::Bool(b) => Scalar::Bool(*b),
            Json::Number(n) => n.as_f64().map_or(Scalar::Other, Scalar::Number),
            Json::String(s) => Scalar::Str(s),
            Json::Object(obj) => match obj.get("$date") {
                Some(date) => date_millis(date).map_or(Scalar::Other, |ms| Scalar::Date(ms.div_euclid(1000))),
                None => Scalar::Other,
            },
            Json::Array(_) => Scalar::Other,
        }
    }

    fn from_value(v: &'a Value) -> Self {
        match v {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int(i) => Scalar::Number(*i as f64),
            Value::Float(f) => Scalar::Number(*f),
            Value::String(s) => Scalar::Str(s),
            Value::Date(secs) => Scalar::Date(*secs),
        }
    }

    /// Dates compare with numbers as epoch seconds; other classes never mix.
    fn compare(self, other: Scalar<'_>) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Some(Ordering::Equal),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(&b)),
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(&b)),
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(&b),
            (Scalar::Number(a), Scalar::Date(b)) => a.partial_cmp(&(b as f64)),
            (Scalar::Date(a), Scalar::Number(b)) => (a as f64).partial_cmp(&b),
            _ => None,
        }
    }

    /// Cross-type sort rank: null < numbers < strings < objects < arrays < bool < date
    fn rank(v: Option<&Json>) -> u8 {
        match v {
            None | Some(Json::Null) => 0,
            Some(Json::Number(_)) => 1,
            Some(Json::String(_)) => 2,
            Some(Json::Object(o)) if o.contains_key("$date") => 6,
            Some(Json::Object(_)) => 3,
            Some(Json::Array(_)) => 4,
            Some(Json::Bool(_)) => 5,
        }
    }
}

/// Hashable identity of a value for grouping. Numbers and dates that
/// compare equal share an identity, so `1`, `1.0` and a date at epoch
/// second 1 fall into one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    /// Bit pattern of the value as `f64`, with `-0.0` folded into `0.0`
    Number(u64),
    Str(String),
    /// Arrays and plain objects, by their JSON text
    Other(String),
}

pub fn key_part(v: &Json) -> KeyPart {
    match Scalar::from_json(v) {
        Scalar::Null => KeyPart::Null,
        Scalar::Bool(b) => KeyPart::Bool(b),
        Scalar::Number(n) => KeyPart::Number(number_bits(n)),
        Scalar::Date(secs) => KeyPart::Number(number_bits(secs as f64)),
        Scalar::Str(s) => KeyPart::Str(s.to_string()),
        Scalar::Other => KeyPart::Other(v.to_string()),
    }
}

fn number_bits(n: f64) -> u64 {
    if n == 0.0 {
        0f64.to_bits()
    } else {
        n.to_bits()
    }
}

fn date_millis(v: &Json) -> Option<i64> {
    match v {
        Json::Number(n) => n.as_i64(),
        Json::Object(obj) => obj.get("$numberLong")?.as_str()?.parse().ok(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Arrays match when any element does.
fn any_scalar(doc_value: Option<&Json>, pred: impl Fn(Scalar<'_>) -> bool) -> bool {
    match doc_value {
        None => pred(Scalar::Null),
        Some(Json::Array(items)) => items.iter().any(|item| pred(Scalar::from_json(item))),
        Some(v) => pred(Scalar::from_json(v)),
    }
}

fn equals(doc_value: Option<&Json>, expected: &Value) -> bool {
    let expected = Scalar::from_value(expected);
    any_scalar(doc_value, |s| s.compare(expected) == Some(Ordering::Equal))
}

pub fn matches_condition(doc_value: Option<&Json>, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(v) => equals(doc_value, v),
        Condition::Ne(v) => !equals(doc_value, v),
        Condition::Gt(v) => {
            let bound = Scalar::from_value(v);
            doc_value.is_some() && any_scalar(doc_value, |s| s.compare(bound) == Some(Ordering::Greater))
        }
        Condition::Range { gte, lt } => {
            let low = Scalar::from_value(gte);
            let high = Scalar::from_value(lt);
            doc_value.is_some()
                && any_scalar(doc_value, |s| {
                    matches!(s.compare(low), Some(Ordering::Greater | Ordering::Equal))
                        && s.compare(high) == Some(Ordering::Less)
                })
        }
    }
}

pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, condition)| matches_condition(doc.get(field), condition))
}

/// Keep projected fields (and `_id`); an empty projection keeps everything.
pub fn project(doc: &Document, projection: &Projection) -> Document {
    if projection.is_empty() {
        return doc.clone();
    }

    doc.iter()
        .filter(|(k, _)| k.as_str() == "_id" || projection.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn compare_json(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    let (ra, rb) = (Scalar::rank(a), Scalar::rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }

    match (a, b) {
        (Some(a), Some(b)) => Scalar::from_json(a)
            .compare(Scalar::from_json(b))
            .unwrap_or_else(|| a.to_string().cmp(&b.to_string())),
        _ => Ordering::Equal,
    }
}

pub fn compare_docs(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for (field, direction) in sort.iter() {
        let ord = compare_json(a.get(field), b.get(field));
        let ord = match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
