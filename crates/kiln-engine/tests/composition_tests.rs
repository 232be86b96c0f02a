//! Class composition through the runtime: inheritance, mixins, statics.

use kiln_engine::{DirectiveSet, MemberOrigin, Runtime};
use serde_json::json;

fn define(rt: &mut Runtime, path: &str, body: serde_json::Value) {
    rt.define(path, DirectiveSet::from_value(body).unwrap())
        .unwrap();
}

#[test]
fn inherited_members_reachable_on_subclass() {
    let mut rt = Runtime::new();
    define(
        &mut rt,
        "Widget.Base",
        json!({
            "show": "fn:show",
            "hide": "fn:hide",
            "privates": { "renderBuffer": "fn:renderBuffer" }
        }),
    );
    define(&mut rt, "Widget.Panel", json!({ "extend": "Widget.Base", "show": "fn:panelShow" }));

    let panel = rt.descriptor("Widget.Panel").unwrap();
    // Not overridden: inherited and reachable
    assert!(panel.exports_member("hide"));
    assert_eq!(
        panel.member("hide").unwrap().origin,
        MemberOrigin::Inherited("Widget.Base".to_string())
    );
    // Overridden: own wins
    assert_eq!(panel.member("show").unwrap().value, json!("fn:panelShow"));
    assert_eq!(panel.member("show").unwrap().origin, MemberOrigin::Own);
    // Privates absent from the subclass surface entirely
    assert!(panel.member("renderBuffer").is_none());
}

#[test]
fn privates_visible_on_declaring_class_but_not_exported() {
    let mut rt = Runtime::new();
    define(&mut rt, "Widget.Base", json!({ "privates": { "sync": "fn:sync" } }));

    let base = rt.descriptor("Widget.Base").unwrap();
    assert!(base.member("sync").is_some());
    assert!(!base.exports_member("sync"));
}

#[test]
fn mixin_collision_later_wins_own_wins_over_all() {
    let mut rt = Runtime::new();
    define(&mut rt, "Mix.Observable", json!({ "fire": "m1:fire", "on": "m1:on" }));
    define(&mut rt, "Mix.Stateful", json!({ "fire": "m2:fire", "save": "m2:save" }));
    define(
        &mut rt,
        "Widget.A",
        json!({
            "mixins": { "observable": "Mix.Observable", "stateful": "Mix.Stateful" },
            "on": "own:on"
        }),
    );

    let a = rt.descriptor("Widget.A").unwrap();
    // M2 is later in declaration order, so its `fire` wins
    assert_eq!(a.member("fire").unwrap().value, json!("m2:fire"));
    assert_eq!(
        a.member("fire").unwrap().origin,
        MemberOrigin::Mixin("Mix.Stateful".to_string())
    );
    // Own declaration beats both mixins
    assert_eq!(a.member("on").unwrap().value, json!("own:on"));
    assert_eq!(a.member("save").unwrap().value, json!("m2:save"));
}

#[test]
fn mixin_privates_not_exported_to_consumer() {
    let mut rt = Runtime::new();
    define(
        &mut rt,
        "Mix.Observable",
        json!({ "fire": "fn:fire", "privates": { "queue": "fn:queue" } }),
    );
    define(&mut rt, "Widget.A", json!({ "mixins": { "observable": "Mix.Observable" } }));

    let a = rt.descriptor("Widget.A").unwrap();
    assert!(a.exports_member("fire"));
    assert!(a.member("queue").is_none());
}

#[test]
fn statics_stay_on_declaring_class() {
    let mut rt = Runtime::new();
    define(
        &mut rt,
        "Widget.Base",
        json!({
            "statics": { "idSeed": 0 },
            "inheritableStatics": { "category": "widget" }
        }),
    );
    define(
        &mut rt,
        "Widget.Panel",
        json!({ "extend": "Widget.Base", "inheritableStatics": { "category": "panel" } }),
    );

    let base = rt.descriptor("Widget.Base").unwrap();
    let panel = rt.descriptor("Widget.Panel").unwrap();
    assert_eq!(base.statics.get("idSeed"), Some(&json!(0)));
    // statics are not inherited
    assert!(panel.statics.get("idSeed").is_none());
    // inheritableStatics follow member precedence in their own namespace
    assert_eq!(panel.inheritable_statics.get("category"), Some(&json!("panel")));
    // and never leak into the member table
    assert!(panel.member("category").is_none());
}

#[test]
fn three_level_chain_merges_root_first() {
    let mut rt = Runtime::new();
    define(&mut rt, "A", json!({ "x": "a", "y": "a", "z": "a" }));
    define(&mut rt, "B", json!({ "extend": "A", "y": "b" }));
    define(&mut rt, "C", json!({ "extend": "B", "z": "c" }));

    let c = rt.descriptor("C").unwrap();
    assert_eq!(c.member("x").unwrap().value, json!("a"));
    assert_eq!(c.member("y").unwrap().value, json!("b"));
    assert_eq!(c.member("z").unwrap().value, json!("c"));
}
