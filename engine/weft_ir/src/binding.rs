//! The flat binding table one parse pass produces.
//!
//! A [`Binding`] is identified by a stable string id
//! (`<nodeId>.<facet>.<propName>[.<nestedPath>]`) and is exactly one of:
//! a constant, an expression, or a controlled slot with an optional
//! initializer. Tables are immutable once built; a new document state
//! produces a new table. Committed results for controlled bindings live in
//! a per-scope overlay owned by the runtime, not in the table.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::warn;

use crate::path::ScopePath;
use crate::value::Value;

/// Stable identifier of a binding within one table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BindingId(String);

impl BindingId {
    /// Create an id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        BindingId(id.into())
    }

    /// The id's textual form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the id of a nested leaf: `<self>.<suffix>`.
    pub fn child(&self, suffix: &str) -> BindingId {
        BindingId(format!("{}.{suffix}", self.0))
    }
}

impl From<&str> for BindingId {
    fn from(id: &str) -> Self {
        BindingId(id.to_owned())
    }
}

impl From<String> for BindingId {
    fn from(id: String) -> Self {
        BindingId(id)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BindingId {}

/// Starting value for a controlled binding that has no committed result yet.
#[derive(Clone, Debug, PartialEq)]
pub enum Initializer {
    /// A fixed starting value.
    Const(Value),
    /// An expression evaluated once, against the same intercepted base as
    /// every other expression, until a result is committed.
    Expr(String),
}

/// What a binding *is*. Exactly one of these per binding.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingKind {
    /// A constant from the document (or a component default).
    Const(Value),
    /// An expression; its source string is handed to the sandbox verbatim.
    Expr(String),
    /// A controlled slot, written imperatively from outside expression
    /// evaluation. Never carries an expression of its own.
    Controlled {
        /// Used while no result has been committed.
        initializer: Option<Initializer>,
        /// Whether the slot represents an in-flight operation (query result
        /// fields) and therefore reads as `loading` until committed.
        loading_while_pending: bool,
    },
}

/// Link from a container binding to one independently-bound leaf inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct NestedSlot {
    /// Path of the leaf inside the container value.
    pub path: Vec<crate::path::PathSeg>,
    /// The leaf's own binding id.
    pub id: BindingId,
}

/// One entry in the binding table.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// Where the resolved value is exposed in the scope namespace, if
    /// anywhere.
    pub scope_path: Option<ScopePath>,
    /// The binding's kind.
    pub kind: BindingKind,
    /// Independently-bound leaves inside this binding's container value.
    pub nested: Vec<NestedSlot>,
}

impl Binding {
    /// A constant binding with no scope path.
    pub fn constant(value: Value) -> Self {
        Binding {
            scope_path: None,
            kind: BindingKind::Const(value),
            nested: Vec::new(),
        }
    }

    /// An expression binding with no scope path.
    pub fn expression(source: impl Into<String>) -> Self {
        Binding {
            scope_path: None,
            kind: BindingKind::Expr(source.into()),
            nested: Vec::new(),
        }
    }

    /// A controlled binding.
    pub fn controlled(initializer: Option<Initializer>, loading_while_pending: bool) -> Self {
        Binding {
            scope_path: None,
            kind: BindingKind::Controlled {
                initializer,
                loading_while_pending,
            },
            nested: Vec::new(),
        }
    }

    /// Set the scope path, builder-style.
    pub fn at(mut self, scope_path: impl Into<ScopePath>) -> Self {
        self.scope_path = Some(scope_path.into());
        self
    }
}

/// Which part of a node a binding belongs to, for the inspector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    /// An element prop.
    Props,
    /// A query/mutation parameter.
    Params,
    /// Query execution config (enabled flag, refetch interval).
    Config,
    /// A query/mutation result field.
    Result,
    /// A declared page parameter.
    PageParam,
}

/// Inspector-facing description of where a binding came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingMeta {
    /// The owning node's id (or `"page"` for page parameters).
    pub node_id: String,
    /// Which facet of the node the binding covers.
    pub facet: Facet,
    /// The prop/param/field name, including any nested path suffix.
    pub prop: String,
}

/// The flat, insertion-ordered table of bindings for one parse pass.
#[derive(Clone, Debug, Default)]
pub struct BindingTable {
    bindings: IndexMap<BindingId, Binding>,
    controlled: FxHashSet<BindingId>,
    meta: FxHashMap<BindingId, BindingMeta>,
}

impl BindingTable {
    /// Start building a table.
    pub fn builder() -> BindingTableBuilder {
        BindingTableBuilder::default()
    }

    /// Look up a binding by id.
    #[inline]
    pub fn get(&self, id: &BindingId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&BindingId, &Binding)> {
        self.bindings.iter()
    }

    /// All ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &BindingId> {
        self.bindings.keys()
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether `id` is registered as controlled.
    #[inline]
    pub fn is_controlled(&self, id: &BindingId) -> bool {
        self.controlled.contains(id)
    }

    /// Inspector metadata for `id`.
    #[inline]
    pub fn meta(&self, id: &BindingId) -> Option<&BindingMeta> {
        self.meta.get(id)
    }
}

/// Builder enforcing the table invariants (unique ids, one binding per
/// scope path). Parsing is total, so violations degrade with a warning:
/// last write wins.
#[derive(Default)]
pub struct BindingTableBuilder {
    table: BindingTable,
    seen_paths: FxHashSet<ScopePath>,
}

impl BindingTableBuilder {
    /// Insert a binding. A duplicate id or scope path replaces the earlier
    /// entry and logs a warning.
    pub fn insert(&mut self, id: BindingId, binding: Binding, meta: BindingMeta) -> &mut Self {
        if let Some(path) = &binding.scope_path {
            if !self.seen_paths.insert(path.clone()) {
                warn!(%id, %path, "scope path bound more than once; keeping the later binding");
            }
        }
        if self.table.bindings.insert(id.clone(), binding).is_some() {
            warn!(%id, "binding id registered more than once; keeping the later binding");
        }
        self.table.meta.insert(id.clone(), meta);
        self
    }

    /// Mark an already-inserted id as controlled.
    pub fn mark_controlled(&mut self, id: BindingId) -> &mut Self {
        self.table.controlled.insert(id);
        self
    }

    /// Finish the table.
    pub fn build(self) -> BindingTable {
        self.table
    }
}
