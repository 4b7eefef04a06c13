//! Typed attribute values and the external coercion schema that drives them.
//!
//! Replaces an untyped `map<string, any>` with a closed value variant plus a
//! declared schema, so callers can add new attribute names without touching
//! code — only the schema document needs a new entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value. Kept as a flat, serializable sum type rather
/// than `serde_yaml::Value` so downstream code can match on it exhaustively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(chrono::NaiveDate),
    List(Vec<AttributeValue>),
    Object(BTreeMap<String, AttributeValue>),
}

/// A named, ordered bag of attributes attached to a file or note.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// The declared type an attribute's raw string value must coerce to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    StringList,
    Integer,
    Float,
    Bool,
    Object,
    Date,
}

/// External, user-editable coercion schema: attribute name -> declared type.
///
/// Lives at `.nt/lint` alongside lint rules (see [`crate::config`]); kept
/// separate from compiled code so new attributes never require a rebuild.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AttributeSchema {
    #[serde(default)]
    pub types: BTreeMap<String, AttributeType>,
}

impl AttributeSchema {
    /// Coerces a raw `@name: value` token into a typed [`AttributeValue`].
    ///
    /// Returns `None` on coercion failure — per §4.9, a failed coercion drops
    /// the attribute rather than aborting parsing; callers should surface the
    /// drop as a lint finding, not an error.
    pub fn coerce(&self, name: &str, raw: &str) -> Option<AttributeValue> {
        let declared = self.types.get(name).copied().unwrap_or(AttributeType::String);
        match declared {
            AttributeType::String => Some(AttributeValue::String(raw.to_string())),
            AttributeType::StringList => Some(AttributeValue::List(
                raw.split(',')
                    .map(|s| AttributeValue::String(s.trim().to_string()))
                    .collect(),
            )),
            AttributeType::Integer => raw.trim().parse::<i64>().ok().map(AttributeValue::Integer),
            AttributeType::Float => raw.trim().parse::<f64>().ok().map(AttributeValue::Float),
            AttributeType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(AttributeValue::Bool(true)),
                "false" | "no" | "0" => Some(AttributeValue::Bool(false)),
                _ => None,
            },
            AttributeType::Date => chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(AttributeValue::Date),
            AttributeType::Object => serde_json::from_str(raw)
                .ok()
                .and_then(|v: serde_json::Value| json_to_attribute(&v)),
        }
    }
}

fn json_to_attribute(value: &serde_json::Value) -> Option<AttributeValue> {
    match value {
        serde_json::Value::String(s) => Some(AttributeValue::String(s.clone())),
        serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(AttributeValue::Integer(i))
            } else {
                n.as_f64().map(AttributeValue::Float)
            }
        }
        serde_json::Value::Array(items) => {
            let coerced: Option<Vec<_>> = items.iter().map(json_to_attribute).collect();
            coerced.map(AttributeValue::List)
        }
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_attribute(v)?);
            }
            Some(AttributeValue::Object(out))
        }
        serde_json::Value::Null => None,
    }
}
