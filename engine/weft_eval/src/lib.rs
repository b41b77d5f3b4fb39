//! Weft Eval - the reactive binding evaluator.
//!
//! This crate is the algorithmic core of the engine:
//!
//! - [`evaluate`]: one pull-based evaluation pass over a
//!   [`BindingTable`](weft_ir::BindingTable). Dependencies are discovered
//!   implicitly by observing which scope paths each expression actually
//!   reads, cycles are cut with a memo sentinel, and error/loading state is
//!   bubbled along the dependency graph the pass just discovered.
//! - [`Scope`] / [`ScopeHandle`]: nested runtime scopes composing ancestor
//!   values with locally resolved bindings.
//! - The controlled channel: the imperative write path
//!   ([`ScopeHandle::set_controlled`], [`ScopeHandle::set_by_scope_path`],
//!   [`ScopeHandle::update_table`]) that commits externally produced values
//!   into the same namespace expressions read.
//! - [`ScopeInspector`]: fire-and-forget snapshots for a live inspector UI.
//!
//! A pass is single-threaded and synchronous; `loading` is a data value
//! describing an asynchronous operation owned elsewhere, never a
//! suspension point in here.

mod channel;
mod config;
mod inspector;
mod resolver;
mod scope;
mod shared;

#[cfg(test)]
mod tests;

pub use channel::ChannelError;
pub use config::EvalConfig;
pub use inspector::{BindingEntry, ScopeInspector, ScopeSnapshot};
pub use resolver::{evaluate, EvalOutput};
pub use scope::{CreateScope, Scope, ScopeHandle};
pub use shared::Shared;
