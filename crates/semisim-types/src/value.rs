//! Dynamically-typed attribute values.
//!
//! Scenario documents attach arbitrary attributes to every entity: numbers,
//! strings, booleans, and nested mappings or sequences of the same. [`Value`]
//! models that open set and deserializes straight from YAML or JSON.
//!
//! Snapshots flatten every attribute to a [`ScalarValue`]: composite values
//! are rendered as compact JSON strings so the exported records stay flat
//! and portable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An attribute value held by an entity.
///
/// Integers and floats are kept apart so that values read from a scenario
/// (`gdp: 100`) are exported exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null (`~` or `null` in the document).
    #[default]
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Text(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// A string-keyed mapping of values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Return the value as `f64` if it is numeric. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Return the value as `i64` if it is an integer.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Return the value as a string slice if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Return the value as a boolean if it is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the inner mapping if the value is a map.
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Return the inner sequence if the value is a list.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }

    /// Whether the value is an explicit null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value is a mapping or a sequence.
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Human-readable name of the variant, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::List(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }

    /// Flatten the value for a snapshot record.
    ///
    /// Composite values are stringified as compact JSON. If that conversion
    /// fails the result degrades to [`ScalarValue::Null`] instead of erroring.
    pub fn to_scalar(&self) -> ScalarValue {
        match self {
            Self::Null => ScalarValue::Null,
            Self::Bool(b) => ScalarValue::Bool(*b),
            Self::Int(i) => ScalarValue::Int(*i),
            Self::Float(f) => ScalarValue::Float(*f),
            Self::Text(s) => ScalarValue::Text(s.clone()),
            Self::List(_) | Self::Map(_) => serde_json::to_string(self)
                .map_or(ScalarValue::Null, ScalarValue::Text),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Self>> for Value {
    fn from(l: Vec<Self>) -> Self {
        Self::List(l)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(m: BTreeMap<String, Self>) -> Self {
        Self::Map(m)
    }
}

impl From<BTreeMap<String, f64>> for Value {
    fn from(m: BTreeMap<String, f64>) -> Self {
        Self::Map(m.into_iter().map(|(k, v)| (k, Self::Float(v))).collect())
    }
}

/// A flattened, non-composite attribute value as exported in snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Null, also used when a value could not be converted.
    #[default]
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string, including stringified composite values.
    Text(String),
}

impl ScalarValue {
    /// Return the value as `f64` if it is numeric.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}
