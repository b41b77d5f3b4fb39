//! Tests for one evaluation pass: laziness, cycles, bubbling, merging.

use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use weft_expr::JsLikeSandbox;
use weft_ir::{
    BindError, Binding, BindingId, BindingTable, EvalOutcome, NestedSlot, PathSeg, Value,
};

use crate::resolver::{evaluate, EvalOutput};
use crate::tests::{meta, CountingSandbox};
use crate::EvalConfig;

fn run(table: &BindingTable, committed: &FxHashMap<BindingId, EvalOutcome>) -> EvalOutput {
    evaluate(
        table,
        committed,
        &Value::empty_object(),
        &JsLikeSandbox,
        &EvalConfig::default(),
    )
}

fn outcome<'a>(output: &'a EvalOutput, id: &str) -> &'a EvalOutcome {
    output
        .results
        .get(&BindingId::from(id))
        .unwrap_or_else(|| panic!("no result for {id}"))
}

#[test]
fn test_constant_and_expression_resolution() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "n1.props.value".into(),
        Binding::expression("2 + 2").at("form.value"),
        meta("n1", "value"),
    );
    builder.insert(
        "n1.props.label".into(),
        Binding::constant(Value::str("static")),
        meta("n1", "label"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    assert_eq!(
        outcome(&output, "n1.props.value"),
        &EvalOutcome::value(Value::number(4.0))
    );
    assert_eq!(
        outcome(&output, "n1.props.label"),
        &EvalOutcome::value(Value::str("static"))
    );
}

#[test]
fn test_idempotence() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::expression("2 + 2").at("a"),
        meta("a", "value"),
    );
    builder.insert(
        "b".into(),
        Binding::expression("a * 10").at("b"),
        meta("b", "value"),
    );
    let table = builder.build();

    let first = run(&table, &FxHashMap::default());
    let second = run(&table, &FxHashMap::default());
    assert_eq!(first.results, second.results);
    assert_eq!(first.deps, second.deps);
}

#[test]
fn test_dependency_edges_are_recorded_in_discovery_order() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::expression("1").at("a"),
        meta("a", "value"),
    );
    builder.insert(
        "b".into(),
        Binding::expression("2").at("b"),
        meta("b", "value"),
    );
    builder.insert(
        "c".into(),
        Binding::expression("b + a + b").at("c"),
        meta("c", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    // Deduplicated, in the order the reads happened.
    assert_eq!(
        output.deps.get(&BindingId::from("c")),
        Some(&vec![BindingId::from("b"), BindingId::from("a")])
    );
}

#[test]
fn test_constants_register_as_dependencies_when_read() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "k".into(),
        Binding::constant(Value::number(10.0)).at("k"),
        meta("k", "value"),
    );
    builder.insert(
        "twice".into(),
        Binding::expression("k * 2").at("twice"),
        meta("twice", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    assert_eq!(
        outcome(&output, "twice"),
        &EvalOutcome::value(Value::number(20.0))
    );
    assert_eq!(
        output.deps.get(&BindingId::from("twice")),
        Some(&vec![BindingId::from("k")])
    );
}

#[test]
fn test_missing_scope_path_reads_as_undefined_not_error() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::expression("nothing.here == undefined ? 'absent' : 'present'"),
        meta("a", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());
    assert_eq!(
        outcome(&output, "a"),
        &EvalOutcome::value(Value::str("absent"))
    );
}

#[test]
fn test_mutual_cycle_yields_errors_not_divergence() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::expression("b + 1").at("a"),
        meta("a", "value"),
    );
    builder.insert(
        "b".into(),
        Binding::expression("a + 1").at("b"),
        meta("b", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    for id in ["a", "b"] {
        let out = outcome(&output, id);
        let err = out.error.as_ref().unwrap_or_else(|| panic!("{id} errors"));
        assert!(err.is_cycle(), "{id} should carry a cycle error, got {err}");
        assert_eq!(out.value, Value::Undefined);
    }
}

#[test]
fn test_self_cycle() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::expression("x + 1").at("x"),
        meta("a", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());
    assert!(outcome(&output, "a").error.as_ref().is_some_and(BindError::is_cycle));
}

#[test]
fn test_loading_propagates_transitively() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::controlled(None, true).at("a"),
        meta("a", "value"),
    );
    builder.insert(
        "b".into(),
        Binding::expression("a + 1").at("b"),
        meta("b", "value"),
    );
    builder.insert(
        "c".into(),
        Binding::expression("b + 1").at("c"),
        meta("c", "value"),
    );
    builder.mark_controlled("a".into());
    let output = run(&builder.build(), &FxHashMap::default());

    assert!(outcome(&output, "a").loading);
    assert!(outcome(&output, "b").loading, "direct dependent loads");
    assert!(outcome(&output, "c").loading, "transitive dependent loads");
}

#[test]
fn test_error_propagates_as_dependency_error() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "a".into(),
        Binding::controlled(None, false).at("a"),
        meta("a", "value"),
    );
    builder.insert(
        "b".into(),
        Binding::expression("a").at("b"),
        meta("b", "value"),
    );
    builder.mark_controlled("a".into());

    let upstream = BindError::expression("fetch failed");
    let mut committed = FxHashMap::default();
    committed.insert(BindingId::from("a"), EvalOutcome::error(upstream.clone()));
    let output = run(&builder.build(), &committed);

    let err = outcome(&output, "b").error.clone().expect("b errors");
    assert_eq!(
        err,
        BindError::dependency(BindingId::from("a"), upstream)
    );
    assert_eq!(outcome(&output, "b").value, Value::Undefined);
}

#[test]
fn test_first_discovered_error_wins() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "bad1".into(),
        Binding::expression("1 +").at("bad1"),
        meta("bad1", "value"),
    );
    builder.insert(
        "bad2".into(),
        Binding::expression("2 +").at("bad2"),
        meta("bad2", "value"),
    );
    builder.insert(
        "c".into(),
        Binding::expression("bad1 + bad2").at("c"),
        meta("c", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    // No aggregation: the first dependency in discovery order supplies
    // the error.
    let err = outcome(&output, "c").error.clone().expect("c errors");
    let BindError::Dependency { source, .. } = err else {
        panic!("expected a dependency error");
    };
    assert_eq!(source, BindingId::from("bad1"));
}

#[test]
fn test_sandbox_failure_is_stored_never_thrown() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "broken".into(),
        Binding::expression("1 + * 2"),
        meta("broken", "value"),
    );
    builder.insert(
        "fine".into(),
        Binding::expression("40 + 2"),
        meta("fine", "value"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    assert!(matches!(
        outcome(&output, "broken").error,
        Some(BindError::Expression { .. })
    ));
    // The failure never aborts the rest of the pass.
    assert_eq!(
        outcome(&output, "fine"),
        &EvalOutcome::value(Value::number(42.0))
    );
}

#[test]
fn test_controlled_initializer_expression_and_loading_flag() {
    let mut builder = BindingTable::builder();
    builder.insert(
        "seed".into(),
        Binding::expression("21").at("seed"),
        meta("seed", "value"),
    );
    builder.insert(
        "pending".into(),
        Binding::controlled(Some(weft_ir::Initializer::Expr("seed * 2".to_owned())), true)
            .at("pending"),
        meta("pending", "value"),
    );
    builder.mark_controlled("pending".into());
    let table = builder.build();

    let output = run(&table, &FxHashMap::default());
    let out = outcome(&output, "pending");
    assert_eq!(out.value, Value::number(42.0));
    assert!(out.loading, "uncommitted in-flight slot reads as loading");

    // A committed result replaces the initializer entirely.
    let mut committed = FxHashMap::default();
    committed.insert(
        BindingId::from("pending"),
        EvalOutcome::value(Value::number(7.0)),
    );
    let output = run(&table, &committed);
    assert_eq!(
        outcome(&output, "pending"),
        &EvalOutcome::value(Value::number(7.0))
    );
}

#[test]
fn test_memo_shares_identical_expression_text() {
    let mut builder = BindingTable::builder();
    builder.insert("x".into(), Binding::expression("2 + 3"), meta("x", "value"));
    builder.insert("y".into(), Binding::expression("2 + 3"), meta("y", "value"));
    let sandbox = CountingSandbox::default();
    let output = evaluate(
        &builder.build(),
        &FxHashMap::default(),
        &Value::empty_object(),
        &sandbox,
        &EvalConfig::default(),
    );

    assert_eq!(outcome(&output, "x"), outcome(&output, "y"));
    assert_eq!(sandbox.count_of("2 + 3"), 1);
}

#[test]
fn test_depth_limit_errors_instead_of_overflowing() {
    let mut builder = BindingTable::builder();
    let chain = 32;
    for i in 0..chain {
        builder.insert(
            BindingId::new(format!("v{i}")),
            Binding::expression(format!("v{} + 1", i + 1)).at(format!("v{i}").as_str()),
            meta("chain", "value"),
        );
    }
    builder.insert(
        BindingId::new(format!("v{chain}")),
        Binding::constant(Value::number(0.0)).at(format!("v{chain}").as_str()),
        meta("chain", "value"),
    );
    let output = evaluate(
        &builder.build(),
        &FxHashMap::default(),
        &Value::empty_object(),
        &JsLikeSandbox,
        &EvalConfig { max_depth: 8 },
    );

    let head = outcome(&output, "v0");
    assert!(head.error.is_some(), "deep chain must error, not overflow");
}

#[test]
fn test_nested_flatten_round_trip() {
    // Default value {a: 1, b: [{c: <placeholder>}]} with b[0].c bound to
    // the expression "5": the merged result restores the full container.
    let slot_path = vec![PathSeg::key("b"), PathSeg::Index(0), PathSeg::key("c")];
    let mut parent = Binding::constant(Value::object([
        ("a", Value::number(1.0)),
        (
            "b",
            Value::list(vec![Value::object([("c", Value::Undefined)])]),
        ),
    ]));
    parent.nested.push(NestedSlot {
        path: slot_path,
        id: "n1.props.data.b.0.c".into(),
    });

    let mut builder = BindingTable::builder();
    builder.insert("n1.props.data".into(), parent, meta("n1", "data"));
    builder.insert(
        "n1.props.data.b.0.c".into(),
        Binding::expression("5"),
        meta("n1", "data.b.0.c"),
    );
    let output = run(&builder.build(), &FxHashMap::default());

    assert_eq!(
        outcome(&output, "n1.props.data"),
        &EvalOutcome::value(Value::object([
            ("a", Value::number(1.0)),
            (
                "b",
                Value::list(vec![Value::object([("c", Value::number(5.0))])])
            ),
        ]))
    );
}

#[test]
fn test_nested_leaf_error_and_loading_reach_the_container() {
    let mut parent = Binding::constant(Value::object([("c", Value::Undefined)]));
    parent.nested.push(NestedSlot {
        path: vec![PathSeg::key("c")],
        id: "p.c".into(),
    });
    let mut builder = BindingTable::builder();
    builder.insert("p".into(), parent, meta("p", "data"));
    builder.insert("p.c".into(), Binding::expression("1 +"), meta("p", "data.c"));
    let output = run(&builder.build(), &FxHashMap::default());

    let merged = outcome(&output, "p");
    assert!(matches!(
        merged.error,
        Some(BindError::Dependency { ref source, .. }) if source == &BindingId::from("p.c")
    ));
}
