//! Runtime values for the binding engine.
//!
//! Values mirror the document's JSON data model with one addition: an
//! explicit [`Value::Undefined`] variant, distinct from `Null`. A read of a
//! scope path nobody owns resolves to `Undefined`, never to an error, so
//! the distinction is observable to expressions.
//!
//! Construction goes through factory methods (`Value::str`, `Value::list`,
//! `Value::object`) so call sites stay uniform with the rest of the
//! workspace.

use std::fmt;

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::path::PathSeg;

/// A JSON-like runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value: a read of something nobody owns.
    Undefined,
    /// Explicit null from the document.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value. All numbers are doubles, as in the document model.
    Number(f64),
    /// String value.
    Str(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Insertion-ordered object.
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Create a numeric value.
    #[inline]
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Create a list value.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items)
    }

    /// Create an object value from key/value pairs, preserving order.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Create an empty object value.
    #[inline]
    pub fn empty_object() -> Self {
        Value::Object(IndexMap::new())
    }

    /// Returns `true` if this is `Undefined`.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// JS-style truthiness: `false`, `0`, `NaN`, `""`, `null` and
    /// `undefined` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Object(_) => true,
        }
    }

    /// Navigate one path segment into this value. Anything that does not
    /// resolve yields `None`.
    pub fn get_seg(&self, seg: &PathSeg) -> Option<&Value> {
        match (self, seg) {
            (Value::Object(map), PathSeg::Key(key)) => map.get(key.as_str()),
            (Value::List(items), PathSeg::Index(idx)) => items.get(*idx),
            (Value::List(items), PathSeg::Key(key)) => {
                key.parse::<usize>().ok().and_then(|idx| items.get(idx))
            }
            _ => None,
        }
    }

    /// Navigate a full path into this value.
    pub fn get_path(&self, path: &[PathSeg]) -> Option<&Value> {
        let mut current = self;
        for seg in path {
            current = current.get_seg(seg)?;
        }
        Some(current)
    }

    /// Navigate one segment the way expressions read: `length` resolves on
    /// lists and strings, and a dead end yields `Undefined`, never an error.
    pub fn navigate_seg(&self, seg: &PathSeg) -> Value {
        if let PathSeg::Key(key) = seg {
            if key == "length" {
                match self {
                    Value::List(items) => return Value::Number(items.len() as f64),
                    Value::Str(s) => return Value::Number(s.chars().count() as f64),
                    _ => {}
                }
            }
        }
        self.get_seg(seg).cloned().unwrap_or(Value::Undefined)
    }

    /// Navigate a full path with [`Value::navigate_seg`] semantics.
    ///
    /// This is the one navigation routine shared by every layer that reads
    /// expression paths, so the sandbox and the evaluator cannot disagree
    /// about what a path resolves to.
    pub fn navigate(&self, path: &[PathSeg]) -> Value {
        let mut current = self;
        for (idx, seg) in path.iter().enumerate() {
            if let PathSeg::Key(key) = seg {
                if key == "length" {
                    match current {
                        // A segment past `length` navigates into a number,
                        // which dead-ends as `Undefined`.
                        Value::List(items) if idx == path.len() - 1 => {
                            return Value::Number(items.len() as f64);
                        }
                        Value::Str(s) if idx == path.len() - 1 => {
                            return Value::Number(s.chars().count() as f64);
                        }
                        Value::List(_) | Value::Str(_) => return Value::Undefined,
                        _ => {}
                    }
                }
            }
            match current.get_seg(seg) {
                Some(next) => current = next,
                None => return Value::Undefined,
            }
        }
        current.clone()
    }

    /// Replace the value at `path`, if every intermediate container exists.
    ///
    /// Returns `false` when the path does not resolve; intermediate
    /// containers are never created. The parser guarantees that container
    /// defaults carry the full structure for every nested slot it emits.
    pub fn set_path(&mut self, path: &[PathSeg], new_value: Value) -> bool {
        let Some((last, prefix)) = path.split_last() else {
            *self = new_value;
            return true;
        };
        let mut current = self;
        for seg in prefix {
            current = match (current, seg) {
                (Value::Object(map), PathSeg::Key(key)) => match map.get_mut(key.as_str()) {
                    Some(v) => v,
                    None => return false,
                },
                (Value::List(items), PathSeg::Index(idx)) => match items.get_mut(*idx) {
                    Some(v) => v,
                    None => return false,
                },
                _ => return false,
            };
        }
        match (current, last) {
            (Value::Object(map), PathSeg::Key(key)) => {
                map.insert(key.clone(), new_value);
                true
            }
            (Value::List(items), PathSeg::Index(idx)) => match items.get_mut(*idx) {
                Some(slot) => {
                    *slot = new_value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Merge `other`'s entries into this object, later entries winning.
    ///
    /// Non-object receivers are replaced wholesale.
    pub fn merge_object(&mut self, other: &Value) {
        match (self, other) {
            (Value::Object(dst), Value::Object(src)) => {
                for (key, val) in src {
                    dst.insert(key.clone(), val.clone());
                }
            }
            (dst, src) => *dst = src.clone(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

/// Format a double the way expression output expects: integral values
/// print without a fractional part (`4`, not `4.0`).
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                let mut first = true;
                for item in items {
                    if !first {
                        write!(f, ",")?;
                    }
                    first = false;
                    if !item.is_undefined() && *item != Value::Null {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Undefined has no JSON spelling; it round-trips as null.
            Value::Undefined | Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, val) in map {
                    out.serialize_entry(key, val)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
