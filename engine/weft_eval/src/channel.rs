//! The controlled binding channel: the imperative write path.
//!
//! User input and query results are produced outside expression
//! recomputation, yet participate in the same dependency graph. They
//! arrive here, get committed into the scope's overlay, and trigger a new
//! evaluation pass for that scope only.

use thiserror::Error;
use tracing::trace;
use weft_ir::{BindingId, EvalOutcome, MissingBindingError, ScopePath};

use crate::scope::ScopeHandle;

/// Failure of a direct controlled write.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The target binding exists but is not registered as controlled.
    #[error("binding \"{id}\" is not controlled")]
    NotControlled {
        /// The rejected binding id.
        id: BindingId,
    },
    /// The target binding does not exist in this scope's table.
    #[error("binding \"{id}\" is not in this scope")]
    Unknown {
        /// The rejected binding id.
        id: BindingId,
    },
}

impl ScopeHandle {
    /// Commit a result for a controlled binding and re-evaluate the scope.
    ///
    /// Returns `Ok(false)` without recomputation when `outcome` is
    /// shallow-equal to the binding's current result (same value, same
    /// error presence, same loading flag); producers re-emitting the same
    /// value must not cause feedback loops.
    pub fn set_controlled(
        &self,
        id: &BindingId,
        outcome: EvalOutcome,
    ) -> Result<bool, ChannelError> {
        {
            let mut inner = self.0.borrow_mut();
            if inner.table.get(id).is_none() {
                return Err(ChannelError::Unknown { id: id.clone() });
            }
            if !inner.table.is_controlled(id) {
                return Err(ChannelError::NotControlled { id: id.clone() });
            }
            if inner
                .results
                .get(id)
                .is_some_and(|current| current.shallow_eq(&outcome))
            {
                trace!(binding = %id, "dropping shallow-equal controlled write");
                return Ok(false);
            }
            inner.committed.insert(id.clone(), outcome);
        }
        self.recompute();
        Ok(true)
    }

    /// Commit a result addressed by scope path instead of binding id.
    ///
    /// This is the write-back mechanism for expressions that assign to
    /// previously-read state (e.g. an event-handler assignment). The owner
    /// is looked up in this scope first, then up the parent chain; a path
    /// no controlled binding owns anywhere is an integration error and the
    /// one case that surfaces as `Err`.
    pub fn set_by_scope_path(
        &self,
        path: &str,
        outcome: EvalOutcome,
    ) -> Result<(), MissingBindingError> {
        let parsed = ScopePath::parse(path);
        let mut scope = Some(self.clone());
        while let Some(handle) = scope {
            let owner = {
                let inner = handle.0.borrow();
                let found = inner.table.iter().find_map(|(id, binding)| {
                    (binding.scope_path.as_ref() == Some(&parsed)
                        && inner.table.is_controlled(id))
                    .then(|| id.clone())
                });
                found
            };
            if let Some(id) = owner {
                // The owner was just checked controlled, so this cannot
                // fail; an equal write is still silently dropped.
                let _ = handle.set_controlled(&id, outcome);
                return Ok(());
            }
            scope = handle.parent();
        }
        Err(MissingBindingError::new(path))
    }

    /// Swap in a new binding table after a document edit and re-evaluate.
    ///
    /// Committed controlled results are preserved for ids that are still
    /// controlled in the new table; everything else is recomputed from
    /// scratch.
    pub fn update_table(&self, table: weft_ir::BindingTable) {
        {
            let mut inner = self.0.borrow_mut();
            let table = std::rc::Rc::new(table);
            inner.committed.retain(|id, _| table.is_controlled(id));
            inner.table = table;
        }
        self.recompute();
    }
}
