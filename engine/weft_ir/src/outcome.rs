//! The `{value, error, loading}` triple every binding resolves to.

use serde::Serialize;

use crate::errors::BindError;
use crate::value::Value;

/// Result of resolving one binding.
///
/// Dominance for consumers: `error` first, then `loading`, else `value`.
/// The raw `value` is still carried alongside an error or loading flag so
/// the inspector can show it, but [`EvalOutcome::display_value`] applies
/// the dominance rule.
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct EvalOutcome {
    /// The resolved value. `Undefined` when errored.
    pub value: Value,
    /// This binding's error, own or copied up from a dependency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BindError>,
    /// Whether this binding (or a transitive dependency) represents an
    /// asynchronous operation still in flight.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub loading: bool,
}

impl EvalOutcome {
    /// A settled value: no error, not loading.
    pub fn value(value: Value) -> Self {
        EvalOutcome {
            value,
            error: None,
            loading: false,
        }
    }

    /// An errored outcome; the visible value is `Undefined`.
    pub fn error(error: BindError) -> Self {
        EvalOutcome {
            value: Value::Undefined,
            error: Some(error),
            loading: false,
        }
    }

    /// A pending outcome with no value yet.
    pub fn pending() -> Self {
        EvalOutcome {
            value: Value::Undefined,
            error: None,
            loading: true,
        }
    }

    /// Set the loading flag, builder-style.
    pub fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// The value a rendering consumer should see: `Undefined` when an
    /// error dominates, the raw value otherwise.
    pub fn display_value(&self) -> &Value {
        if self.error.is_some() {
            &Value::Undefined
        } else {
            &self.value
        }
    }

    /// Settled and usable: no error, not loading.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.error.is_none() && !self.loading
    }

    /// Equality as the controlled channel sees it: value equality, same
    /// error *presence* (not content), same loading flag. Equal writes are
    /// dropped to break producer feedback loops.
    pub fn shallow_eq(&self, other: &EvalOutcome) -> bool {
        self.value == other.value
            && self.error.is_some() == other.error.is_some()
            && self.loading == other.loading
    }
}

impl From<Value> for EvalOutcome {
    fn from(value: Value) -> Self {
        EvalOutcome::value(value)
    }
}
