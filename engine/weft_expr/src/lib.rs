//! Weft Expr - the expression sandbox.
//!
//! The evaluator core needs exactly one capability from an expression
//! language: a synchronous, exception-safe
//! `evaluate(code, scope) -> value or error`. This crate defines that
//! contract ([`ExpressionSandbox`]) together with the interception seam the
//! engine uses for implicit dependency discovery ([`ScopeReader`]), and
//! ships [`JsLikeSandbox`], a small JS-flavoured expression interpreter:
//!
//! - literals: numbers, `'..'`/`".."` strings, `true`/`false`/`null`/
//!   `undefined`, array literals
//! - identifier/member/index chains, read through the scope as one dotted
//!   path when the chain is static
//! - unary `-` `!`; binary `* / % + - < <= > >= == != && ||`;
//!   conditional `c ? a : b`; parentheses
//!
//! Coercions are JS-ish: `+` concatenates when either operand is a string,
//! arithmetic coerces through `to_number` (undefined becomes NaN), and
//! `&&`/`||`/`?:` short-circuit on truthiness. Short-circuiting matters
//! beyond semantics: reads in the untaken branch never happen, so the
//! engine never records dependency edges for them.
//!
//! Any other sandbox implementing [`ExpressionSandbox`] slots into the
//! engine unchanged.

mod ast;
mod eval;
mod parser;
mod token;

#[cfg(test)]
mod tests;

use thiserror::Error;
use weft_ir::{PathSeg, Value};

/// Error returned by [`ScopeReader::read`].
///
/// A missing path is *not* an error — it reads as `Undefined`. A read only
/// fails when the engine must abort the running expression, which is how a
/// cycle cuts recursion short.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The read re-entered a binding that is still being computed.
    #[error("cycle detected while resolving \"{path}\"")]
    Cycle {
        /// Dotted form of the path whose resolution re-entered itself.
        path: String,
    },
    /// The engine aborted the read for another reason (e.g. a depth limit).
    #[error("{message}")]
    Aborted {
        /// Engine-provided reason.
        message: String,
    },
}

/// The interception layer an expression reads its namespace through.
///
/// This is the proxy seam: the engine's implementation resolves bound
/// paths on demand and records each resolution as a dependency edge of the
/// expression currently being evaluated.
pub trait ScopeReader {
    /// Read `path` from the namespace. Missing paths resolve to
    /// `Ok(Value::Undefined)`.
    fn read(&self, path: &[PathSeg]) -> Result<Value, ReadError>;
}

/// A scope reader over a plain value, with no interception.
///
/// Useful in tests and anywhere an expression should evaluate against a
/// fixed namespace.
pub struct PlainScope<'a>(pub &'a Value);

impl ScopeReader for PlainScope<'_> {
    fn read(&self, path: &[PathSeg]) -> Result<Value, ReadError> {
        Ok(self.0.navigate(path))
    }
}

/// Failure of one expression evaluation. Always data, never a panic.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SandboxError {
    /// Human-readable failure description.
    pub message: String,
}

impl SandboxError {
    /// Create a sandbox error from any displayable failure.
    pub fn new(message: impl Into<String>) -> Self {
        SandboxError {
            message: message.into(),
        }
    }
}

impl From<ReadError> for SandboxError {
    fn from(err: ReadError) -> Self {
        SandboxError::new(err.to_string())
    }
}

/// The capability the engine requires of an expression language.
pub trait ExpressionSandbox {
    /// Evaluate `code` against `scope`. Synchronous and exception-safe:
    /// every failure comes back as `Err`, never as a panic.
    fn evaluate(&self, code: &str, scope: &dyn ScopeReader) -> Result<Value, SandboxError>;
}

/// The default sandbox: lex, parse, and walk the expression tree.
///
/// Stateless; one instance serves any number of scopes and passes.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsLikeSandbox;

impl ExpressionSandbox for JsLikeSandbox {
    fn evaluate(&self, code: &str, scope: &dyn ScopeReader) -> Result<Value, SandboxError> {
        let expr = parser::parse(code)?;
        eval::evaluate(&expr, scope)
    }
}
