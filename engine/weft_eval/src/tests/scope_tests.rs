//! Tests for scope composition: merged values, nesting, shadowing,
//! inspector snapshots.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use weft_ir::{Binding, BindingTable, EvalOutcome, Value};

use crate::scope::{CreateScope, Scope};
use crate::tests::meta;
use crate::{ScopeInspector, ScopeSnapshot};

fn simple_table() -> BindingTable {
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::expression("2 + 2").at("form.value"),
        meta("n1", "value"),
    );
    builder.build()
}

#[test]
fn test_scope_values_expose_resolved_scope_paths() {
    let scope = Scope::create("page", simple_table(), CreateScope::default());
    assert_eq!(
        scope.values(),
        Value::object([(
            "form",
            Value::object([("value", Value::number(4.0))])
        )])
    );
    assert_eq!(
        scope.outcome(&"n1.props.value".into()),
        Some(EvalOutcome::value(Value::number(4.0)))
    );
}

#[test]
fn test_child_reads_parent_values() {
    let parent = Scope::create("page", simple_table(), CreateScope::default());

    let mut builder = BindingTable::builder();
    builder.insert(
        "n2.props.label".into(),
        Binding::expression("'Total: ' + form.value").at("label"),
        meta("n2", "label"),
    );
    let child = Scope::create(
        "row-0",
        builder.build(),
        CreateScope::default().with_parent(parent.clone()),
    );

    assert_eq!(
        child.outcome(&"n2.props.label".into()),
        Some(EvalOutcome::value(Value::str("Total: 4")))
    );
    // An ancestor read is not a binding of the child scope: no edge.
    assert_eq!(child.deps().get(&"n2.props.label".into()), None);
    // The parent never sees child values.
    assert_eq!(parent.values().get_path(&[weft_ir::PathSeg::key("label")]), None);
}

#[test]
fn test_local_values_shadow_parent_bindings() {
    // Parent exposes `x` from a binding; the child's local `x` wins for
    // expressions evaluated in the child, without affecting the parent.
    let mut builder = BindingTable::builder();
    builder.insert(
        "p.props.x".into(),
        Binding::expression("1").at("x"),
        meta("p", "x"),
    );
    let parent = Scope::create("page", builder.build(), CreateScope::default());

    let mut builder = BindingTable::builder();
    builder.insert(
        "c.props.y".into(),
        Binding::expression("x * 10").at("y"),
        meta("c", "y"),
    );
    let child = Scope::create(
        "row-0",
        builder.build(),
        CreateScope::default()
            .with_parent(parent.clone())
            .with_local_values(Value::object([("x", Value::number(2.0))])),
    );

    assert_eq!(
        child.outcome(&"c.props.y".into()),
        Some(EvalOutcome::value(Value::number(20.0)))
    );
    assert_eq!(
        parent.outcome(&"p.props.x".into()),
        Some(EvalOutcome::value(Value::number(1.0)))
    );
}

#[test]
fn test_sibling_scopes_are_independent() {
    let parent = Scope::create("page", simple_table(), CreateScope::default());
    let row = |idx: f64| {
        let mut builder = BindingTable::builder();
        builder.insert(
            "cell.props.text".into(),
            Binding::expression("row.n + form.value").at("cell.text"),
            meta("cell", "text"),
        );
        Scope::create(
            format!("row-{idx}"),
            builder.build(),
            CreateScope::default()
                .with_parent(parent.clone())
                .with_local_values(Value::object([(
                    "row",
                    Value::object([("n", Value::number(idx))]),
                )])),
        )
    };

    let first = row(1.0);
    let second = row(2.0);
    assert_eq!(
        first.outcome(&"cell.props.text".into()),
        Some(EvalOutcome::value(Value::number(5.0)))
    );
    assert_eq!(
        second.outcome(&"cell.props.text".into()),
        Some(EvalOutcome::value(Value::number(6.0)))
    );
}

/// Captures every snapshot pushed to it.
#[derive(Default)]
struct CapturingInspector {
    snapshots: RefCell<Vec<ScopeSnapshot>>,
}

impl ScopeInspector for CapturingInspector {
    fn bindings_updated(&self, snapshot: &ScopeSnapshot) {
        self.snapshots.borrow_mut().push(snapshot.clone());
    }
}

#[test]
fn test_inspector_receives_snapshots() {
    let inspector = Rc::new(CapturingInspector::default());
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::controlled(None, false).at("form.value"),
        meta("n1", "value"),
    );
    builder.mark_controlled("n1.props.value".into());
    let scope = Scope::create(
        "page",
        builder.build(),
        CreateScope::default().with_inspector(inspector.clone()),
    );

    assert_eq!(inspector.snapshots.borrow().len(), 1, "initial pass pushes");

    scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("typed")),
        )
        .expect("controlled write");

    let snapshots = inspector.snapshots.borrow();
    assert_eq!(snapshots.len(), 2, "each pass pushes once");
    let last = &snapshots[1];
    assert_eq!(last.scope_id, "page");
    assert_eq!(
        last.values.get_path(&[
            weft_ir::PathSeg::key("form"),
            weft_ir::PathSeg::key("value"),
        ]),
        Some(&Value::str("typed"))
    );
    assert_eq!(last.bindings.len(), 1);
    assert!(last.bindings[0].meta.is_some());

    // Snapshots serialize camelCase, like the document model on the way in.
    let json = serde_json::to_value(last).expect("snapshot serializes");
    assert_eq!(json["scopeId"], serde_json::json!("page"));
    assert_eq!(json["scope_id"], serde_json::Value::Null);
    assert_eq!(json["bindings"][0]["meta"]["nodeId"], serde_json::json!("n1"));
    assert_eq!(json["bindings"][0]["meta"]["facet"], serde_json::json!("props"));
}
