//! Primary keys and key ranges.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A primary key or indexed value.
///
/// Integers sort before text, matching the engine's native key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    /// Read a key out of a JSON value. Only integers and strings qualify.
    pub fn from_json(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_i64().map(Key::Int),
            Value::String(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Key::Int(n) => Value::from(*n),
            Key::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

/// The engine's native range primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyRange {
    Bound {
        lower: Key,
        upper: Key,
        lower_open: bool,
        upper_open: bool,
    },
    LowerBound {
        lower: Key,
        open: bool,
    },
    UpperBound {
        upper: Key,
        open: bool,
    },
}

impl KeyRange {
    pub fn contains(&self, key: &Key) -> bool {
        match self {
            KeyRange::Bound {
                lower,
                upper,
                lower_open,
                upper_open,
            } => above(key, lower, *lower_open) && below(key, upper, *upper_open),
            KeyRange::LowerBound { lower, open } => above(key, lower, *open),
            KeyRange::UpperBound { upper, open } => below(key, upper, *open),
        }
    }
}

fn above(key: &Key, lower: &Key, open: bool) -> bool {
    if open { key > lower } else { key >= lower }
}

fn below(key: &Key, upper: &Key, open: bool) -> bool {
    if open { key < upper } else { key <= upper }
}

/// Caller-facing description of a range: optional bounds plus open flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeDescriptor {
    pub min: Option<Key>,
    pub max: Option<Key>,
    /// Exclude `min` itself.
    pub min_open: bool,
    /// Exclude `max` itself.
    pub max_open: bool,
}

impl RangeDescriptor {
    /// `[min, max]`, both ends included.
    pub fn between(min: impl Into<Key>, max: impl Into<Key>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
            ..Self::default()
        }
    }

    /// `[min, ∞)`.
    pub fn at_least(min: impl Into<Key>) -> Self {
        Self {
            min: Some(min.into()),
            ..Self::default()
        }
    }

    /// `(-∞, max]`.
    pub fn at_most(max: impl Into<Key>) -> Self {
        Self {
            max: Some(max.into()),
            ..Self::default()
        }
    }

    pub fn with_min_open(mut self, open: bool) -> Self {
        self.min_open = open;
        self
    }

    pub fn with_max_open(mut self, open: bool) -> Self {
        self.max_open = open;
        self
    }

    /// Translate into the engine primitive.
    ///
    /// `None` when no bound is present, or when the bounds can match nothing
    /// (`min > max`, or `min == max` with either end open).
    pub fn to_key_range(&self) -> Option<KeyRange> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => {
                if min > max || (min == max && (self.min_open || self.max_open)) {
                    return None;
                }
                Some(KeyRange::Bound {
                    lower: min.clone(),
                    upper: max.clone(),
                    lower_open: self.min_open,
                    upper_open: self.max_open,
                })
            }
            (Some(min), None) => Some(KeyRange::LowerBound {
                lower: min.clone(),
                open: self.min_open,
            }),
            (None, Some(max)) => Some(KeyRange::UpperBound {
                upper: max.clone(),
                open: self.max_open,
            }),
            (None, None) => None,
        }
    }
}
