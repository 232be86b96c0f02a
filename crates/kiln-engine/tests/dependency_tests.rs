//! Dependency resolution: ordering, cycles, soft edges, sticky failures.

use kiln_engine::{DirectiveSet, EngineError, Runtime};
use serde_json::json;

fn define(rt: &mut Runtime, path: &str, body: serde_json::Value) -> Result<(), EngineError> {
    rt.define(path, DirectiveSet::from_value(body).unwrap())
}

#[test]
fn requires_defined_later_unblocks_dependent() {
    let mut rt = Runtime::new();
    define(&mut rt, "App.Main", json!({ "requires": ["Util.Format", "Util.Ajax"] })).unwrap();
    define(&mut rt, "Util.Format", json!({})).unwrap();

    // One hard dependency still missing
    match rt.create("App.Main", None) {
        Err(EngineError::UnresolvedDependency { missing, .. }) => {
            assert_eq!(missing, "Util.Ajax");
        }
        other => panic!("expected UnresolvedDependency, got {:?}", other),
    }

    define(&mut rt, "Util.Ajax", json!({})).unwrap();
    assert!(rt.create("App.Main", None).is_ok());
}

#[test]
fn deep_chain_finalizes_in_one_worklist_pass() {
    let mut rt = Runtime::new();
    define(&mut rt, "D", json!({ "extend": "C" })).unwrap();
    define(&mut rt, "C", json!({ "extend": "B" })).unwrap();
    define(&mut rt, "B", json!({ "extend": "A" })).unwrap();
    // Everything is waiting on A; its arrival cascades
    define(&mut rt, "A", json!({ "root": true })).unwrap();

    let d = rt.descriptor("D").unwrap();
    assert!(d.exports_member("root"));
}

#[test]
fn direct_cycle_reported_once_and_stays_pending() {
    let mut rt = Runtime::new();
    define(&mut rt, "A", json!({ "requires": ["B"] })).unwrap();
    let err = define(&mut rt, "B", json!({ "requires": ["A"] })).unwrap_err();
    assert_eq!(err.kind(), "CyclicDependency");

    // Neither side ever finalizes
    assert!(rt.create("A", None).is_err());
    assert!(rt.create("B", None).is_err());
    // B carries the sticky cycle error; it re-surfaces on create
    match rt.create("B", None) {
        Err(EngineError::CyclicDependency { .. }) => {}
        other => panic!("expected sticky CyclicDependency, got {:?}", other),
    }
}

#[test]
fn transitive_cycle_through_extend_and_mixins() {
    let mut rt = Runtime::new();
    define(&mut rt, "A", json!({ "extend": "B" })).unwrap();
    define(&mut rt, "B", json!({ "mixins": { "m": "C" } })).unwrap();
    let err = define(&mut rt, "C", json!({ "requires": "A" })).unwrap_err();
    assert_eq!(err.kind(), "CyclicDependency");
}

#[test]
fn uses_never_blocks_finalization() {
    let mut rt = Runtime::new();
    define(&mut rt, "App.Main", json!({ "uses": ["Util.NeverDefined"] })).unwrap();
    // Soft dependency unsatisfied forever, yet the node finalizes
    assert!(rt.create("App.Main", None).is_ok());
    // The soft target itself is simply unknown at the point of use
    assert_eq!(
        rt.create("Util.NeverDefined", None).unwrap_err().kind(),
        "UnknownType"
    );
}

#[test]
fn mutual_uses_is_legal() {
    let mut rt = Runtime::new();
    define(&mut rt, "A", json!({ "uses": "B" })).unwrap();
    define(&mut rt, "B", json!({ "uses": "A" })).unwrap();
    assert!(rt.create("A", None).is_ok());
    assert!(rt.create("B", None).is_ok());
}

#[test]
fn failed_class_does_not_poison_unrelated_paths() {
    let mut rt = Runtime::new();
    define(&mut rt, "A", json!({ "requires": "B" })).unwrap();
    define(&mut rt, "B", json!({ "requires": "A" })).unwrap_err();

    // The registry stays usable for everything else
    define(&mut rt, "C", json!({ "config": { "ok": true } })).unwrap();
    let inst = rt.create("C", None).unwrap();
    assert_eq!(inst.get("ok").unwrap(), json!(true));
}

#[test]
fn self_extend_rejected_at_validation() {
    let mut rt = Runtime::new();
    let err = define(&mut rt, "A", json!({ "extend": "A" })).unwrap_err();
    assert_eq!(err.kind(), "CyclicDependency");
}
