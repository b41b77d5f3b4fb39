//! Runtime scopes: the evaluator's results composed into a nested
//! namespace.
//!
//! A scope is created when its owning subtree becomes active (a page, or
//! one instance of a repeated template) and dropped when it is
//! deactivated; no evaluation state outlives it. A child scope reads its
//! parent's already-committed `values` snapshot and never writes into it,
//! which is what keeps sibling scopes fully independent.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;
use weft_expr::{ExpressionSandbox, JsLikeSandbox};
use weft_ir::{BindingId, BindingTable, EvalOutcome, PathSeg, Value};

use crate::config::EvalConfig;
use crate::inspector::{BindingEntry, ScopeInspector, ScopeSnapshot};
use crate::resolver::evaluate;
use crate::shared::Shared;

/// Options for [`Scope::create`].
pub struct CreateScope {
    /// Parent scope, if any. The child holds a handle, not ownership;
    /// parents outlive children for as long as evaluation reads them.
    pub parent: Option<ScopeHandle>,
    /// Values local to this scope (e.g. the row object of a repeated
    /// template instance). Merged over the parent's values.
    pub local_values: Value,
    /// The expression sandbox to evaluate with.
    pub sandbox: Rc<dyn ExpressionSandbox>,
    /// Snapshot receiver, if an inspector is attached.
    pub inspector: Option<Rc<dyn ScopeInspector>>,
    /// Evaluation limits.
    pub config: EvalConfig,
}

impl Default for CreateScope {
    fn default() -> Self {
        CreateScope {
            parent: None,
            local_values: Value::empty_object(),
            sandbox: Rc::new(JsLikeSandbox),
            inspector: None,
            config: EvalConfig::default(),
        }
    }
}

impl CreateScope {
    /// Nest under `parent`, builder-style.
    pub fn with_parent(mut self, parent: ScopeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set scope-local values, builder-style.
    pub fn with_local_values(mut self, local_values: Value) -> Self {
        self.local_values = local_values;
        self
    }

    /// Attach an inspector, builder-style.
    pub fn with_inspector(mut self, inspector: Rc<dyn ScopeInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Use a different sandbox, builder-style.
    pub fn with_sandbox(mut self, sandbox: Rc<dyn ExpressionSandbox>) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// One runtime scope's state. Accessed through [`ScopeHandle`].
pub struct Scope {
    pub(crate) id: String,
    pub(crate) parent: Option<ScopeHandle>,
    pub(crate) table: Rc<BindingTable>,
    /// Controlled-channel overlay: committed results by binding id.
    pub(crate) committed: FxHashMap<BindingId, EvalOutcome>,
    pub(crate) local_values: Value,
    /// The merged namespace after the latest pass.
    pub(crate) values: Value,
    /// Raw per-binding outcomes after the latest pass.
    pub(crate) results: FxHashMap<BindingId, EvalOutcome>,
    /// Dependency edges discovered by the latest pass.
    pub(crate) deps: FxHashMap<BindingId, Vec<BindingId>>,
    pub(crate) sandbox: Rc<dyn ExpressionSandbox>,
    pub(crate) inspector: Option<Rc<dyn ScopeInspector>>,
    pub(crate) config: EvalConfig,
}

impl Scope {
    /// Create a scope over `table` and run its first evaluation pass.
    pub fn create(id: impl Into<String>, table: BindingTable, options: CreateScope) -> ScopeHandle {
        let id = id.into();
        debug!(scope = %id, bindings = table.len(), "creating scope");
        let handle = ScopeHandle(Shared::new(Scope {
            id,
            parent: options.parent,
            table: Rc::new(table),
            committed: FxHashMap::default(),
            local_values: options.local_values,
            values: Value::empty_object(),
            results: FxHashMap::default(),
            deps: FxHashMap::default(),
            sandbox: options.sandbox,
            inspector: options.inspector,
            config: options.config,
        }));
        handle.recompute();
        handle
    }

    fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            scope_id: self.id.clone(),
            values: self.values.clone(),
            bindings: self
                .table
                .ids()
                .map(|id| BindingEntry {
                    id: id.clone(),
                    meta: self.table.meta(id).cloned(),
                    outcome: self.results.get(id).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Cloneable handle to a scope. Single-threaded by design: sibling scopes
/// are independent, and one scope's pass is a self-contained synchronous
/// call.
#[derive(Clone)]
pub struct ScopeHandle(pub(crate) Shared<Scope>);

impl ScopeHandle {
    /// The scope's id.
    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    /// The parent scope, if any.
    pub fn parent(&self) -> Option<ScopeHandle> {
        self.0.borrow().parent.clone()
    }

    /// The merged namespace: parent values, then local values, then
    /// resolved scope-path values, later layers winning. Usable directly
    /// as a property source by the rendering collaborator.
    pub fn values(&self) -> Value {
        self.0.borrow().values.clone()
    }

    /// One binding's resolved outcome.
    pub fn outcome(&self, id: &BindingId) -> Option<EvalOutcome> {
        self.0.borrow().results.get(id).cloned()
    }

    /// All per-binding outcomes, for introspection.
    pub fn bindings(&self) -> FxHashMap<BindingId, EvalOutcome> {
        self.0.borrow().results.clone()
    }

    /// Direct dependency edges discovered by the latest pass.
    pub fn deps(&self) -> FxHashMap<BindingId, Vec<BindingId>> {
        self.0.borrow().deps.clone()
    }

    /// A fresh inspector snapshot of the current state.
    pub fn snapshot(&self) -> ScopeSnapshot {
        self.0.borrow().snapshot()
    }

    /// Run one evaluation pass and publish the outcome.
    pub(crate) fn recompute(&self) {
        let (snapshot, inspector) = {
            let mut inner = self.0.borrow_mut();

            let mut base = inner
                .parent
                .as_ref()
                .map_or_else(Value::empty_object, ScopeHandle::values);
            base.merge_object(&inner.local_values);

            let output = evaluate(
                inner.table.as_ref(),
                &inner.committed,
                &base,
                inner.sandbox.as_ref(),
                &inner.config,
            );

            let mut values = base;
            for (id, binding) in inner.table.iter() {
                if let Some(path) = &binding.scope_path {
                    if let Some(outcome) = output.results.get(id) {
                        splice(&mut values, path.segments(), outcome.display_value().clone());
                    }
                }
            }

            inner.results = output.results;
            inner.deps = output.deps;
            inner.values = values;
            (inner.snapshot(), inner.inspector.clone())
        };
        // Fire-and-forget, outside the borrow so the receiver may read the
        // scope again.
        if let Some(inspector) = inspector {
            inspector.bindings_updated(&snapshot);
        }
    }
}

/// Write `value` at `path` inside the merged namespace, creating
/// intermediate objects along key segments. Index segments must already
/// exist; a scope path never conjures list elements.
fn splice(target: &mut Value, path: &[PathSeg], value: Value) {
    let Some((last, prefix)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for seg in prefix {
        match seg {
            PathSeg::Key(key) => {
                if !matches!(current, Value::Object(_)) {
                    *current = Value::empty_object();
                }
                let Value::Object(map) = current else {
                    return;
                };
                let slot = map.entry(key.clone()).or_insert_with(Value::empty_object);
                if !matches!(slot, Value::Object(_) | Value::List(_)) {
                    *slot = Value::empty_object();
                }
                current = slot;
            }
            PathSeg::Index(idx) => {
                let Value::List(items) = current else {
                    return;
                };
                let Some(next) = items.get_mut(*idx) else {
                    return;
                };
                current = next;
            }
        }
    }
    match last {
        PathSeg::Key(key) => {
            if !matches!(current, Value::Object(_)) {
                *current = Value::empty_object();
            }
            if let Value::Object(map) = current {
                map.insert(key.clone(), value);
            }
        }
        PathSeg::Index(idx) => {
            if let Value::List(items) = current {
                if let Some(slot) = items.get_mut(*idx) {
                    *slot = value;
                }
            }
        }
    }
}
