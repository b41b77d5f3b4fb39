//! One evaluation pass: pull-based resolution with implicit dependency
//! discovery.
//!
//! The pass never plans an evaluation order. Each expression is handed a
//! [`ScopeReader`] view of the base namespace; whenever it reads a path
//! that a binding owns, that binding is resolved on the spot (through a
//! memo table) and the read is recorded as a dependency edge of whichever
//! expression is currently on the evaluation stack. New edges can appear
//! on any pass without a re-planning phase.
//!
//! Cycle handling: an expression's memo entry is `Computing` for as long
//! as it is on the stack. A read that would re-enter a `Computing`
//! expression aborts the *reading* expression with a cycle error; the
//! binding that was re-entered then picks the cycle up through bubbling.
//! Either way every binding on the cycle ends up with a cycle error and
//! the pass returns normally.

use std::cell::RefCell;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use weft_expr::{ExpressionSandbox, ReadError, ScopeReader};
use weft_ir::{
    BindError, Binding, BindingId, BindingKind, BindingTable, EvalOutcome, Initializer, PathSeg,
    ScopePath, Value,
};

use crate::config::EvalConfig;

/// Result of one pass.
#[derive(Clone, Debug, Default)]
pub struct EvalOutput {
    /// Per-binding outcomes, after bubbling and nested-result merging.
    pub results: FxHashMap<BindingId, EvalOutcome>,
    /// Direct dependency edges discovered this pass, in discovery order.
    /// Rebuilt from scratch every pass.
    pub deps: FxHashMap<BindingId, Vec<BindingId>>,
}

/// Run one evaluation pass.
///
/// `committed` is the controlled-channel overlay: results previously
/// committed for controlled bindings. `base` is the merged ancestor/local
/// namespace the scope was created over.
pub fn evaluate(
    table: &BindingTable,
    committed: &FxHashMap<BindingId, EvalOutcome>,
    base: &Value,
    sandbox: &dyn ExpressionSandbox,
    config: &EvalConfig,
) -> EvalOutput {
    let resolver = Resolver {
        table,
        committed,
        base,
        sandbox,
        config,
        path_index: table
            .iter()
            .filter_map(|(id, binding)| binding.scope_path.as_ref().map(|p| (p.clone(), id.clone())))
            .collect(),
        state: RefCell::new(State::default()),
    };

    // Pull every binding; anything never read by an expression still gets
    // forced here. The memo table makes repeated pulls cheap.
    for id in table.ids() {
        resolver.resolve(id);
    }

    let state = resolver.state.into_inner();
    let raw = state.results;
    let deps = state.deps;

    let bubbled = bubble(table, &raw, &deps);
    let results = merge_nested(table, bubbled);

    debug!(bindings = table.len(), "evaluation pass complete");
    EvalOutput { results, deps }
}

/// Memo entry for one expression source string.
#[derive(Clone, Debug)]
enum MemoState {
    /// On the evaluation stack right now; re-entry means a cycle.
    Computing,
    /// Finished this pass.
    Done(EvalOutcome),
}

#[derive(Default)]
struct State {
    /// Memo keyed by expression source text. Reset implicitly: each pass
    /// builds a fresh `State`, so nothing leaks between passes.
    memo: FxHashMap<String, MemoState>,
    results: FxHashMap<BindingId, EvalOutcome>,
    deps: FxHashMap<BindingId, Vec<BindingId>>,
    /// Bindings whose expressions are currently being evaluated,
    /// outermost first.
    stack: Vec<BindingId>,
    /// The typed reason the innermost read aborted, if any; lets the
    /// evaluation site classify the sandbox failure it gets back.
    abort: Option<ReadError>,
}

struct Resolver<'a> {
    table: &'a BindingTable,
    committed: &'a FxHashMap<BindingId, EvalOutcome>,
    base: &'a Value,
    sandbox: &'a dyn ExpressionSandbox,
    config: &'a EvalConfig,
    /// Reverse index: scope path -> owning binding.
    path_index: Vec<(ScopePath, BindingId)>,
    state: RefCell<State>,
}

impl Resolver<'_> {
    /// Resolve one binding, memoized for the duration of the pass.
    fn resolve(&self, id: &BindingId) -> EvalOutcome {
        if let Some(done) = self.state.borrow().results.get(id) {
            return done.clone();
        }
        let Some(binding) = self.table.get(id) else {
            // Ids in the dependency graph always come from the table; a
            // miss here means the caller handed us a foreign id.
            return EvalOutcome::value(Value::Undefined);
        };

        let outcome = match &binding.kind {
            BindingKind::Const(value) => EvalOutcome::value(value.clone()),
            BindingKind::Expr(source) => self.eval_expr(id, source),
            BindingKind::Controlled {
                initializer,
                loading_while_pending,
            } => match self.committed.get(id) {
                Some(committed) => committed.clone(),
                None => self.initial(id, initializer.as_ref(), *loading_while_pending),
            },
        };

        self.state
            .borrow_mut()
            .results
            .insert(id.clone(), outcome.clone());
        outcome
    }

    /// A controlled binding with no committed result falls back to its
    /// initializer, still flagged loading if it represents an in-flight
    /// operation.
    fn initial(
        &self,
        id: &BindingId,
        initializer: Option<&Initializer>,
        loading_while_pending: bool,
    ) -> EvalOutcome {
        let outcome = match initializer {
            None => EvalOutcome::value(Value::Undefined),
            Some(Initializer::Const(value)) => EvalOutcome::value(value.clone()),
            Some(Initializer::Expr(source)) => self.eval_expr(id, source),
        };
        let loading = outcome.loading || loading_while_pending;
        outcome.with_loading(loading)
    }

    /// Evaluate one expression through the memo table.
    fn eval_expr(&self, id: &BindingId, source: &str) -> EvalOutcome {
        {
            let mut state = self.state.borrow_mut();
            match state.memo.get(source) {
                Some(MemoState::Done(outcome)) => return outcome.clone(),
                Some(MemoState::Computing) => {
                    // Backstop; reads normally catch re-entry first.
                    return EvalOutcome::error(BindError::Cycle {
                        path: id.to_string(),
                    });
                }
                None => {}
            }
            if state.stack.len() >= self.config.max_depth {
                return EvalOutcome::error(BindError::expression(format!(
                    "evaluation depth limit ({}) exceeded at \"{id}\"",
                    self.config.max_depth
                )));
            }
            state.memo.insert(source.to_owned(), MemoState::Computing);
            state.stack.push(id.clone());
            state.abort = None;
        }

        trace!(binding = %id, source, "evaluating expression");
        let evaluated = self.sandbox.evaluate(source, self);

        let mut state = self.state.borrow_mut();
        state.stack.pop();
        let outcome = match evaluated {
            Ok(value) => EvalOutcome::value(value),
            Err(err) => EvalOutcome::error(match state.abort.take() {
                Some(ReadError::Cycle { path }) => BindError::Cycle { path },
                Some(ReadError::Aborted { message }) => BindError::expression(message),
                None => BindError::expression(err.message),
            }),
        };
        state
            .memo
            .insert(source.to_owned(), MemoState::Done(outcome.clone()));
        outcome
    }

    /// The longest-prefix binding owning `path`, if any.
    fn owner_of(&self, path: &[PathSeg]) -> Option<(&BindingId, usize)> {
        let mut best: Option<(&BindingId, usize)> = None;
        for (scope_path, id) in &self.path_index {
            if scope_path.is_prefix_of(path)
                && best.is_none_or(|(_, len)| scope_path.len() > len)
            {
                best = Some((id, scope_path.len()));
            }
        }
        best
    }

    /// The source string that would be evaluated if `binding` were
    /// resolved right now; used for the re-entry check.
    fn active_source<'b>(&self, id: &BindingId, binding: &'b Binding) -> Option<&'b str> {
        match &binding.kind {
            BindingKind::Expr(source) => Some(source),
            BindingKind::Controlled {
                initializer: Some(Initializer::Expr(source)),
                ..
            } if !self.committed.contains_key(id) => Some(source),
            _ => None,
        }
    }
}

impl ScopeReader for Resolver<'_> {
    fn read(&self, path: &[PathSeg]) -> Result<Value, ReadError> {
        let Some((owner, prefix_len)) = self.owner_of(path) else {
            // Plain base property: not a binding, so no dependency edge.
            return Ok(self.base.navigate(path));
        };
        let owner = owner.clone();

        {
            let mut state = self.state.borrow_mut();
            // Resolutions made while an expression is running are that
            // expression's dependencies. Eager reads record nothing.
            if let Some(current) = state.stack.last().cloned() {
                if current != owner {
                    let edges = state.deps.entry(current).or_default();
                    if !edges.contains(&owner) {
                        edges.push(owner.clone());
                    }
                }
            }

            if let Some(binding) = self.table.get(&owner) {
                if let Some(source) = self.active_source(&owner, binding) {
                    if matches!(state.memo.get(source), Some(MemoState::Computing)) {
                        let dotted = dotted(path);
                        let err = ReadError::Cycle { path: dotted };
                        state.abort = Some(err.clone());
                        return Err(err);
                    }
                }
            }
        }

        let outcome = self.resolve(&owner);
        // An errored or pending dependency reads as `undefined`; its error
        // and loading flags reach the reader through bubbling instead.
        let value = if outcome.error.is_some() {
            Value::Undefined
        } else {
            outcome.value
        };
        Ok(value.navigate(&path[prefix_len..]))
    }
}

fn dotted(path: &[PathSeg]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Flatten the dependency graph transitively and copy error/loading state
/// downstream: a binding's visible error is its own, else the first error
/// discovered along its transitive dependencies; it is loading if it or
/// any transitive dependency is.
fn bubble(
    table: &BindingTable,
    raw: &FxHashMap<BindingId, EvalOutcome>,
    deps: &FxHashMap<BindingId, Vec<BindingId>>,
) -> FxHashMap<BindingId, EvalOutcome> {
    let mut bubbled = FxHashMap::default();
    for id in table.ids() {
        let Some(own) = raw.get(id) else { continue };
        let mut outcome = own.clone();

        let mut visited = FxHashSet::default();
        visited.insert(id.clone());
        let mut queue: Vec<&BindingId> = deps.get(id).into_iter().flatten().collect();
        let mut cursor = 0;
        while cursor < queue.len() {
            let dep = queue[cursor];
            cursor += 1;
            if !visited.insert(dep.clone()) {
                continue;
            }
            if let Some(dep_outcome) = raw.get(dep) {
                if outcome.error.is_none() {
                    if let Some(err) = &dep_outcome.error {
                        outcome.error =
                            Some(BindError::dependency(dep.clone(), err.clone()));
                        outcome.value = Value::Undefined;
                    }
                }
                outcome.loading = outcome.loading || dep_outcome.loading;
            }
            queue.extend(deps.get(dep).into_iter().flatten());
        }
        bubbled.insert(id.clone(), outcome);
    }
    bubbled
}

/// Splice independently bound leaves back into their container bindings.
///
/// Walks `NestedSlot` links recursively; the visited set guards against
/// slot graphs that share or cycle through the same binding.
fn merge_nested(
    table: &BindingTable,
    bubbled: FxHashMap<BindingId, EvalOutcome>,
) -> FxHashMap<BindingId, EvalOutcome> {
    let mut merged: FxHashMap<BindingId, EvalOutcome> = FxHashMap::default();
    for id in table.ids() {
        let mut visiting = FxHashSet::default();
        let outcome = merge_one(table, &bubbled, &mut merged, &mut visiting, id);
        merged.insert(id.clone(), outcome);
    }
    merged
}

fn merge_one(
    table: &BindingTable,
    bubbled: &FxHashMap<BindingId, EvalOutcome>,
    merged: &mut FxHashMap<BindingId, EvalOutcome>,
    visiting: &mut FxHashSet<BindingId>,
    id: &BindingId,
) -> EvalOutcome {
    if let Some(done) = merged.get(id) {
        return done.clone();
    }
    let Some(own) = bubbled.get(id) else {
        return EvalOutcome::value(Value::Undefined);
    };
    let Some(binding) = table.get(id) else {
        return own.clone();
    };
    if binding.nested.is_empty() || !visiting.insert(id.clone()) {
        return own.clone();
    }

    let mut outcome = own.clone();
    for slot in &binding.nested {
        let leaf = merge_one(table, bubbled, merged, visiting, &slot.id);
        outcome.value.set_path(&slot.path, leaf.value);
        outcome.loading = outcome.loading || leaf.loading;
        if outcome.error.is_none() {
            if let Some(err) = leaf.error {
                outcome.error = Some(BindError::dependency(slot.id.clone(), err));
            }
        }
    }
    visiting.remove(id);
    outcome
}
