//! Tagged inputs, resolved once at the call boundary.

use serde_json::Value;

use crate::error::UsageError;
use crate::key::{Key, RangeDescriptor};

/// Records handed to `upsert`: one object or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    One(Value),
    Many(Vec<Value>),
}

impl Records {
    /// Normalize into a non-empty batch. A single record must be an object.
    pub(crate) fn into_batch(self) -> Result<Vec<Value>, UsageError> {
        match self {
            Records::One(record @ Value::Object(_)) => Ok(vec![record]),
            Records::One(_) => Err(UsageError::InvalidInput("records")),
            Records::Many(records) if records.is_empty() => {
                Err(UsageError::InvalidInput("records"))
            }
            Records::Many(records) => Ok(records),
        }
    }
}

/// JSON arrays become [`Records::Many`]; anything else is a single record.
impl From<Value> for Records {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(records) => Records::Many(records),
            other => Records::One(other),
        }
    }
}

impl From<Vec<Value>> for Records {
    fn from(records: Vec<Value>) -> Self {
        Records::Many(records)
    }
}

/// Keys (or indexed values): one or a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keys {
    One(Key),
    Many(Vec<Key>),
}

impl Keys {
    /// Normalize into a non-empty batch. `what` names the input in errors.
    pub(crate) fn into_batch(self, what: &'static str) -> Result<Vec<Key>, UsageError> {
        match self {
            Keys::One(key) => Ok(vec![key]),
            Keys::Many(keys) if keys.is_empty() => Err(UsageError::InvalidInput(what)),
            Keys::Many(keys) => Ok(keys),
        }
    }
}

impl From<Key> for Keys {
    fn from(key: Key) -> Self {
        Keys::One(key)
    }
}

impl From<i64> for Keys {
    fn from(n: i64) -> Self {
        Keys::One(n.into())
    }
}

impl From<i32> for Keys {
    fn from(n: i32) -> Self {
        Keys::One(n.into())
    }
}

impl From<&str> for Keys {
    fn from(s: &str) -> Self {
        Keys::One(s.into())
    }
}

impl From<String> for Keys {
    fn from(s: String) -> Self {
        Keys::One(s.into())
    }
}

impl From<Vec<Key>> for Keys {
    fn from(keys: Vec<Key>) -> Self {
        Keys::Many(keys)
    }
}

impl From<Vec<i64>> for Keys {
    fn from(keys: Vec<i64>) -> Self {
        Keys::Many(keys.into_iter().map(Key::from).collect())
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        Keys::Many(keys.into_iter().map(Key::from).collect())
    }
}

/// What `remove` deletes: a key range or explicit keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    Range(RangeDescriptor),
    Keys(Keys),
}

impl RemoveTarget {
    /// Pick a target from loosely supplied parts. A range wins over keys when
    /// both are given.
    pub fn resolve(range: Option<RangeDescriptor>, keys: Option<Keys>) -> Option<RemoveTarget> {
        match (range, keys) {
            (Some(range), _) => Some(RemoveTarget::Range(range)),
            (None, Some(keys)) => Some(RemoveTarget::Keys(keys)),
            (None, None) => None,
        }
    }
}

impl From<RangeDescriptor> for RemoveTarget {
    fn from(range: RangeDescriptor) -> Self {
        RemoveTarget::Range(range)
    }
}

impl From<Keys> for RemoveTarget {
    fn from(keys: Keys) -> Self {
        RemoveTarget::Keys(keys)
    }
}

impl From<Key> for RemoveTarget {
    fn from(key: Key) -> Self {
        RemoveTarget::Keys(key.into())
    }
}

impl From<i64> for RemoveTarget {
    fn from(n: i64) -> Self {
        RemoveTarget::Keys(n.into())
    }
}

impl From<i32> for RemoveTarget {
    fn from(n: i32) -> Self {
        RemoveTarget::Keys(n.into())
    }
}

impl From<&str> for RemoveTarget {
    fn from(s: &str) -> Self {
        RemoveTarget::Keys(s.into())
    }
}

impl From<Vec<i64>> for RemoveTarget {
    fn from(keys: Vec<i64>) -> Self {
        RemoveTarget::Keys(keys.into())
    }
}

impl From<Vec<&str>> for RemoveTarget {
    fn from(keys: Vec<&str>) -> Self {
        RemoveTarget::Keys(keys.into())
    }
}

/// How much of a table `scan_all` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pagination {
    /// Every record.
    #[default]
    All,
    /// Zero-based `page` of `size` records.
    Page { page: usize, size: usize },
}

impl Pagination {
    /// Half-open index window `[start, end)`, or `None` for [`Pagination::All`].
    pub fn window(&self) -> Option<(usize, usize)> {
        match *self {
            Pagination::All => None,
            Pagination::Page { page, size } => {
                let start = page.saturating_mul(size);
                let end = page.saturating_add(1).saturating_mul(size);
                Some((start, end))
            }
        }
    }
}
