//! Evaluator test suites, relocated per the >200-line module convention.

mod channel_tests;
mod resolver_tests;
mod scope_tests;

use std::cell::RefCell;

use weft_expr::{ExpressionSandbox, JsLikeSandbox, SandboxError, ScopeReader};
use weft_ir::{BindingMeta, Facet, Value};

/// A sandbox probe: delegates to [`JsLikeSandbox`] and records every
/// source string it is asked to evaluate.
#[derive(Default)]
pub(crate) struct CountingSandbox {
    pub(crate) calls: RefCell<Vec<String>>,
}

impl CountingSandbox {
    pub(crate) fn count_of(&self, source: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == source).count()
    }

    pub(crate) fn total(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ExpressionSandbox for CountingSandbox {
    fn evaluate(&self, code: &str, scope: &dyn ScopeReader) -> Result<Value, SandboxError> {
        self.calls.borrow_mut().push(code.to_owned());
        JsLikeSandbox.evaluate(code, scope)
    }
}

/// Shorthand binding metadata for hand-built tables.
pub(crate) fn meta(node_id: &str, prop: &str) -> BindingMeta {
    BindingMeta {
        node_id: node_id.to_owned(),
        facet: Facet::Props,
        prop: prop.to_owned(),
    }
}
