//! Error taxonomy for binding resolution.
//!
//! Three of the four kinds are *data*: they live inside an
//! [`EvalOutcome`](crate::EvalOutcome) and never unwind an evaluation pass.
//! Only [`MissingBindingError`] — a write to a scope path no binding owns,
//! which is an integration bug — escapes as a returned `Err`.

use serde::Serialize;
use thiserror::Error;

use crate::binding::BindingId;

/// An error carried as data on a binding's result.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BindError {
    /// Resolution re-entered an expression that was still computing.
    #[error("cycle detected while resolving \"{path}\"")]
    Cycle {
        /// The scope path (or binding id) whose resolution re-entered itself.
        path: String,
    },

    /// The expression sandbox reported a failure; the message is the
    /// sandbox's own, wrapped unchanged.
    #[error("{message}")]
    Expression {
        /// Sandbox-provided failure message.
        message: String,
    },

    /// An error copied up from a transitive dependency during bubbling,
    /// not original to this binding.
    #[error("error in dependency \"{source}\": {inner}")]
    Dependency {
        /// The binding the error was first discovered on.
        source: BindingId,
        /// The dependency's own error.
        inner: Box<BindError>,
    },
}

impl BindError {
    /// Build an expression error from any displayable failure.
    pub fn expression(message: impl Into<String>) -> Self {
        BindError::Expression {
            message: message.into(),
        }
    }

    /// Wrap an upstream error as a dependency error.
    pub fn dependency(source: BindingId, inner: BindError) -> Self {
        BindError::Dependency {
            source,
            inner: Box::new(inner),
        }
    }

    /// Returns `true` if this error is a cycle, including a cycle copied
    /// up through any number of `Dependency` wrappers.
    pub fn is_cycle(&self) -> bool {
        match self {
            BindError::Cycle { .. } => true,
            BindError::Dependency { inner, .. } => inner.is_cycle(),
            BindError::Expression { .. } => false,
        }
    }

    /// The innermost error, unwrapping `Dependency` layers.
    pub fn root(&self) -> &BindError {
        match self {
            BindError::Dependency { inner, .. } => inner.root(),
            other => other,
        }
    }
}

/// A write targeted a scope path with no owning binding anywhere in the
/// scope chain.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("no binding owns scope path \"{path}\"")]
pub struct MissingBindingError {
    /// The dotted path the write targeted.
    pub path: String,
}

impl MissingBindingError {
    /// Create a missing-binding error for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        MissingBindingError { path: path.into() }
    }
}
