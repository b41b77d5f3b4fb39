//! Weft IR - core data model for the binding evaluation engine.
//!
//! This crate defines the vocabulary shared by the registry/parser, the
//! evaluator, and the scope layer:
//!
//! - [`Value`]: JSON-like runtime value with an explicit `Undefined` variant
//! - [`PathSeg`] / [`ScopePath`]: dotted paths into the merged namespace
//! - [`Binding`] / [`BindingKind`] / [`BindingTable`]: the flat binding table
//!   produced by one parse pass (immutable once built)
//! - [`EvalOutcome`]: the `{value, error, loading}` triple every binding
//!   resolves to
//! - [`BindError`] / [`MissingBindingError`]: the error taxonomy
//!
//! Everything here is plain data. The crate has no evaluation logic.

mod binding;
mod errors;
mod outcome;
mod path;
mod value;

pub use binding::{
    Binding, BindingId, BindingKind, BindingMeta, BindingTable, BindingTableBuilder, Facet,
    Initializer, NestedSlot,
};
pub use errors::{BindError, MissingBindingError};
pub use outcome::EvalOutcome;
pub use path::{PathSeg, ScopePath};
pub use value::Value;
