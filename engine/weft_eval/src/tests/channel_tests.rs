//! Tests for the controlled binding channel.

use std::rc::Rc;

use pretty_assertions::assert_eq;
use weft_ir::{Binding, BindingTable, EvalOutcome, Initializer, Value};

use crate::channel::ChannelError;
use crate::scope::{CreateScope, Scope};
use crate::tests::{meta, CountingSandbox};

fn controlled_table() -> BindingTable {
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::controlled(Some(Initializer::Const(Value::str(""))), false).at("form.value"),
        meta("n1", "value"),
    );
    builder.mark_controlled("n1.props.value".into());
    builder.insert(
        "n2.props.label".into(),
        Binding::expression("'you typed: ' + form.value").at("label"),
        meta("n2", "label"),
    );
    builder.build()
}

#[test]
fn test_write_to_unknown_binding_is_rejected() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    let err = scope
        .set_controlled(&"nope.props.value".into(), EvalOutcome::value(Value::Null))
        .unwrap_err();
    assert_eq!(
        err,
        ChannelError::Unknown {
            id: "nope.props.value".into()
        }
    );
}

#[test]
fn test_write_to_uncontrolled_binding_is_rejected() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    let err = scope
        .set_controlled(&"n2.props.label".into(), EvalOutcome::value(Value::Null))
        .unwrap_err();
    assert_eq!(
        err,
        ChannelError::NotControlled {
            id: "n2.props.label".into()
        }
    );
}

#[test]
fn test_commit_recomputes_dependents() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    assert_eq!(
        scope.outcome(&"n2.props.label".into()),
        Some(EvalOutcome::value(Value::str("you typed: ")))
    );

    let changed = scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("hi")),
        )
        .expect("controlled write");
    assert!(changed);
    assert_eq!(
        scope.outcome(&"n2.props.label".into()),
        Some(EvalOutcome::value(Value::str("you typed: hi")))
    );
}

#[test]
fn test_shallow_equal_commit_is_dropped() {
    let sandbox = Rc::new(CountingSandbox::default());
    let scope = Scope::create(
        "page",
        controlled_table(),
        CreateScope::default().with_sandbox(sandbox.clone()),
    );
    scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("hi")),
        )
        .expect("controlled write");
    let evaluations = sandbox.total();

    // A producer re-emitting the identical result must not start a pass.
    let changed = scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("hi")),
        )
        .expect("controlled write");
    assert!(!changed);
    assert_eq!(sandbox.total(), evaluations);

    // Same value with a different loading flag is a real change.
    let changed = scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("hi")).with_loading(true),
        )
        .expect("controlled write");
    assert!(changed);
}

#[test]
fn test_pending_query_result_settles_on_commit() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "q1.rows".into(),
        Binding::controlled(None, true).at("usersQuery.rows"),
        meta("q1", "rows"),
    );
    builder.mark_controlled("q1.rows".into());
    builder.insert(
        "n1.props.count".into(),
        Binding::expression("usersQuery.rows.length").at("count"),
        meta("n1", "count"),
    );
    let scope = Scope::create("page", builder.build(), CreateScope::default());

    // Until the producer commits, the field and its readers are loading.
    let count = scope.outcome(&"n1.props.count".into()).expect("resolved");
    assert!(count.loading);
    assert!(count.error.is_none());

    scope
        .set_controlled(
            &"q1.rows".into(),
            EvalOutcome::value(Value::list(vec![
                Value::object([("name", Value::str("ada"))]),
                Value::object([("name", Value::str("grace"))]),
            ])),
        )
        .expect("controlled write");
    assert_eq!(
        scope.outcome(&"n1.props.count".into()),
        Some(EvalOutcome::value(Value::number(2.0)))
    );
}

#[test]
fn test_scope_path_write_finds_owner_in_parent() {
    let parent = Scope::create("page", controlled_table(), CreateScope::default());
    let child = Scope::create(
        "row-0",
        BindingTable::default(),
        CreateScope::default().with_parent(parent.clone()),
    );

    child
        .set_by_scope_path("form.value", EvalOutcome::value(Value::str("from child")))
        .expect("owner found in parent");
    assert_eq!(
        parent.outcome(&"n1.props.value".into()),
        Some(EvalOutcome::value(Value::str("from child")))
    );
}

#[test]
fn test_scope_path_write_prefers_nearest_owner() {
    let parent = Scope::create("page", controlled_table(), CreateScope::default());

    let mut builder = BindingTable::builder();
    builder.insert(
        "c1.props.value".into(),
        Binding::controlled(None, false).at("form.value"),
        meta("c1", "value"),
    );
    builder.mark_controlled("c1.props.value".into());
    let child = Scope::create(
        "row-0",
        builder.build(),
        CreateScope::default().with_parent(parent.clone()),
    );

    child
        .set_by_scope_path("form.value", EvalOutcome::value(Value::str("local")))
        .expect("owner found in child");
    assert_eq!(
        child.outcome(&"c1.props.value".into()),
        Some(EvalOutcome::value(Value::str("local")))
    );
    // The parent's identically-pathed binding is untouched.
    assert_eq!(
        parent.outcome(&"n1.props.value".into()),
        Some(EvalOutcome::value(Value::str("")))
    );
}

#[test]
fn test_scope_path_write_without_owner_errors() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    // `label` exists but is an expression binding, not a controlled one.
    assert!(scope
        .set_by_scope_path("label", EvalOutcome::value(Value::Null))
        .is_err());
    assert!(scope
        .set_by_scope_path("no.such.path", EvalOutcome::value(Value::Null))
        .is_err());
}

#[test]
fn test_update_table_preserves_surviving_commits() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("kept")),
        )
        .expect("controlled write");

    // Document edit: the label expression changes, the input survives.
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::controlled(Some(Initializer::Const(Value::str(""))), false).at("form.value"),
        meta("n1", "value"),
    );
    builder.mark_controlled("n1.props.value".into());
    builder.insert(
        "n2.props.label".into(),
        Binding::expression("form.value + '!'").at("label"),
        meta("n2", "label"),
    );
    scope.update_table(builder.build());

    assert_eq!(
        scope.outcome(&"n1.props.value".into()),
        Some(EvalOutcome::value(Value::str("kept")))
    );
    assert_eq!(
        scope.outcome(&"n2.props.label".into()),
        Some(EvalOutcome::value(Value::str("kept!")))
    );
}

#[test]
fn test_update_table_drops_commits_for_removed_bindings() {
    let scope = Scope::create("page", controlled_table(), CreateScope::default());
    scope
        .set_controlled(
            &"n1.props.value".into(),
            EvalOutcome::value(Value::str("stale")),
        )
        .expect("controlled write");

    // The edit turns the input into a plain expression; the old commit
    // must not shadow it.
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::expression("'fixed'").at("form.value"),
        meta("n1", "value"),
    );
    scope.update_table(builder.build());

    assert_eq!(
        scope.outcome(&"n1.props.value".into()),
        Some(EvalOutcome::value(Value::str("fixed")))
    );
}
