//! Fire-and-forget snapshots for an editor/inspection collaborator.

use serde::Serialize;
use weft_ir::{BindingId, BindingMeta, EvalOutcome, Value};

/// One binding's state in a snapshot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingEntry {
    /// The binding's id.
    pub id: BindingId,
    /// Where the binding came from, if the table recorded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BindingMeta>,
    /// The binding's resolved outcome.
    pub outcome: EvalOutcome,
}

/// Everything the inspector UI needs about one scope, after one pass.
/// Serialized camelCase, like the document model on the way in.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    /// The scope's id.
    pub scope_id: String,
    /// The merged namespace, as the rendering collaborator sees it.
    pub values: Value,
    /// Per-binding outcomes in table order.
    pub bindings: Vec<BindingEntry>,
}

/// Receiver of scope snapshots. Push-only: no acknowledgement, and the
/// engine never waits on it.
pub trait ScopeInspector {
    /// A scope's bindings changed; `snapshot` is the post-pass state.
    fn bindings_updated(&self, snapshot: &ScopeSnapshot);
}
