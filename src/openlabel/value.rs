//! Attribute values carried through from OpenLABEL records.
//!
//! OpenLABEL attributes are free-form JSON. They are kept as a small tagged
//! union in an ordered map so that "later value wins per key" stays a plain
//! `BTreeMap::insert`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// An ordered bag of named attribute values.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Converts a raw JSON value.
    ///
    /// Integers that fit in `i64` stay integers; everything else numeric
    /// becomes a float.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Interprets the value as a stream or coordinate-system name.
    ///
    /// Strings are used as-is and integers are formatted; nothing else can
    /// name a stream.
    pub fn as_stream_name(&self) -> Option<String> {
        match self {
            Self::String(s) if !s.is_empty() => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Truthiness used for flag attributes such as `is_hole` and `closed`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => {
                if s.eq_ignore_ascii_case("true") {
                    true
                } else if s.eq_ignore_ascii_case("false") {
                    false
                } else {
                    !s.is_empty()
                }
            }
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_keeps_integers() {
        assert_eq!(AttributeValue::from_json(&json!(3)), AttributeValue::Int(3));
        assert_eq!(
            AttributeValue::from_json(&json!(2.5)),
            AttributeValue::Float(2.5)
        );
    }

    #[test]
    fn from_json_nests_maps() {
        let value = AttributeValue::from_json(&json!({"a": [true, null]}));
        let AttributeValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(
            map.get("a"),
            Some(&AttributeValue::List(vec![
                AttributeValue::Bool(true),
                AttributeValue::Null
            ]))
        );
    }

    #[test]
    fn truthiness_matches_flag_semantics() {
        assert!(AttributeValue::from("TRUE").is_truthy());
        assert!(!AttributeValue::from("false").is_truthy());
        assert!(!AttributeValue::from("").is_truthy());
        assert!(AttributeValue::from("yes").is_truthy());
        assert!(!AttributeValue::Int(0).is_truthy());
        assert!(!AttributeValue::Null.is_truthy());
        assert!(AttributeValue::Bool(true).is_truthy());
    }

    #[test]
    fn serializes_untagged() {
        let mut attrs = Attributes::new();
        attrs.insert("occluded".into(), true.into());
        attrs.insert("score".into(), 0.5.into());
        let json = serde_json::to_string(&attrs).expect("serialize attributes");
        assert_eq!(json, r#"{"occluded":true,"score":0.5}"#);
    }

    #[test]
    fn stream_names_from_strings_and_ints() {
        assert_eq!(
            AttributeValue::from("cam0").as_stream_name(),
            Some("cam0".to_string())
        );
        assert_eq!(AttributeValue::Int(2).as_stream_name(), Some("2".into()));
        assert_eq!(AttributeValue::Bool(true).as_stream_name(), None);
    }
}
