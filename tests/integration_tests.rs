//! Integration tests for Stackstore

use proptest::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};
use stackstore::{connect, Composition, Error, Operation, Props, Snapshot, StoreUnit};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Clone, Serialize)]
struct Counter {
    count: i64,
}

impl StoreUnit for Counter {
    fn construct() -> Self {
        Counter { count: 0 }
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::new("inc", |counter: &mut Counter, _| {
                counter.count += 1;
                Ok(())
            }),
            Operation::new("add", |counter: &mut Counter, args| {
                let n = args
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| Error::invalid_argument("add", "expected an integer"))?;
                counter.count += n;
                Ok(())
            }),
        ]
    }
}

#[derive(Clone, Serialize)]
struct Toggle {
    on: bool,
}

impl StoreUnit for Toggle {
    fn construct() -> Self {
        Toggle { on: false }
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![Operation::new("flip", |toggle: &mut Toggle, _| {
            toggle.on = !toggle.on;
            Ok(())
        })]
    }
}

#[derive(Clone, Serialize)]
struct TodoList {
    filter: String,
    items: Vec<String>,
}

impl StoreUnit for TodoList {
    fn construct() -> Self {
        TodoList {
            filter: "all".to_string(),
            items: Vec::new(),
        }
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![Operation::new("push", |list: &mut TodoList, args| {
            for arg in args {
                let item = arg
                    .as_str()
                    .ok_or_else(|| Error::invalid_argument("push", "expected strings"))?;
                list.items.push(item.to_string());
            }
            Ok(())
        })]
    }
}

#[derive(Clone, Serialize)]
struct Session {
    user: Option<String>,
}

impl StoreUnit for Session {
    fn construct() -> Self {
        Session { user: None }
    }
}

// Tuple keys have no JSON object form, so `set` leaves the unit unserializable.
#[derive(Clone, Serialize)]
struct Grid {
    size: i64,
    cells: HashMap<(i32, i32), bool>,
}

impl StoreUnit for Grid {
    fn construct() -> Self {
        Grid {
            size: 1,
            cells: HashMap::new(),
        }
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::new("set", |grid: &mut Grid, args| {
                let coord = |i: usize| {
                    args.get(i)
                        .and_then(Value::as_i64)
                        .map(|n| n as i32)
                        .ok_or_else(|| Error::invalid_argument("set", "expected two integers"))
                };
                grid.cells.insert((coord(0)?, coord(1)?), true);
                Ok(())
            }),
            Operation::new("grow", |grid: &mut Grid, _| {
                grid.size += 1;
                Ok(())
            }),
        ]
    }
}

fn counter_toggle() -> Composition<Snapshot> {
    Composition::builder()
        .unit::<Counter>()
        .unit::<Toggle>()
        .children(|consumer| consumer.current())
        .build()
        .unwrap()
}

#[test]
fn counter_toggle_scenario() {
    let app = counter_toggle();

    let initial = app.render();
    assert_eq!(
        initial.state_json(),
        json!({"counter": {"count": 0}, "toggle": {"on": false}})
    );
    assert!(initial["counter"].method("inc").is_some());
    assert!(initial["toggle"].method("flip").is_some());

    initial["counter"].method("inc").unwrap().call().unwrap();

    let next = app.render();
    assert_eq!(
        next.state_json(),
        json!({"counter": {"count": 1}, "toggle": {"on": false}})
    );
    // The toggle entry is shared, the top-level snapshot is new.
    assert!(Arc::ptr_eq(
        initial.get("toggle").unwrap(),
        next.get("toggle").unwrap()
    ));
    assert!(!initial.ptr_eq(&next));
}

#[test]
fn additivity() {
    let app = Composition::builder()
        .unit::<Counter>()
        .unit::<Toggle>()
        .unit::<TodoList>()
        .unit::<Session>()
        .children(|consumer| consumer.current())
        .build()
        .unwrap();

    let snapshot = app.render();
    assert_eq!(snapshot.len(), 4);
    assert_eq!(snapshot["counter"].keys().collect::<Vec<_>>(), vec!["count", "inc", "add"]);
    assert_eq!(snapshot["toggle"].keys().collect::<Vec<_>>(), vec!["on", "flip"]);
    assert_eq!(
        snapshot["todoList"].keys().collect::<Vec<_>>(),
        vec!["filter", "items", "push"]
    );
    assert_eq!(snapshot["session"].keys().collect::<Vec<_>>(), vec!["user"]);
}

#[test]
fn binding_touches_only_its_unit() {
    let app = counter_toggle();
    let consumer = app.consumer();
    let published = Arc::new(AtomicUsize::new(0));
    let _sub = consumer.subscribe({
        let published = published.clone();
        move |_: &Snapshot| {
            published.fetch_add(1, Ordering::SeqCst);
        }
    });

    let before = app.snapshot();
    before["toggle"].method("flip").unwrap().call().unwrap();
    let after = app.snapshot();

    assert_eq!(published.load(Ordering::SeqCst), 1);
    assert_eq!(after["toggle"].value("on"), Some(&json!(true)));
    assert!(Arc::ptr_eq(
        before.get("counter").unwrap(),
        after.get("counter").unwrap()
    ));
}

#[test]
fn methods_from_old_snapshots_still_hit_the_live_instance() {
    let app = counter_toggle();
    let stale = app.snapshot();

    stale["counter"].method("inc").unwrap().call().unwrap();
    stale["counter"].method("add").unwrap().invoke(&[json!(5)]).unwrap();

    assert_eq!(app.snapshot()["counter"].value("count"), Some(&json!(6)));
    // An earlier snapshot never changes.
    assert_eq!(stale["counter"].value("count"), Some(&json!(0)));
}

#[test]
fn sequential_snapshots_are_distinct_objects() {
    let app = counter_toggle();
    let mut seen: Vec<Snapshot> = vec![app.snapshot()];

    for _ in 0..3 {
        app.snapshot()["counter"].method("inc").unwrap().call().unwrap();
        let current = app.snapshot();
        assert!(seen.iter().all(|old| !old.ptr_eq(&current)));
        seen.push(current);
    }

    let counts = seen
        .iter()
        .map(|s| s["counter"].value("count").cloned())
        .collect::<Vec<_>>();
    assert_eq!(
        counts,
        vec![Some(json!(0)), Some(json!(1)), Some(json!(2)), Some(json!(3))]
    );
}

#[test]
fn key_order_is_stable_across_rerenders() {
    let app = counter_toggle();
    let keys = |s: &Snapshot| s.keys().map(|k| k.to_string()).collect::<Vec<_>>();

    assert_eq!(keys(&app.snapshot()), vec!["counter", "toggle"]);
    app.snapshot()["toggle"].method("flip").unwrap().call().unwrap();
    assert_eq!(keys(&app.snapshot()), vec!["counter", "toggle"]);
    app.snapshot()["counter"].method("inc").unwrap().call().unwrap();
    assert_eq!(keys(&app.snapshot()), vec!["counter", "toggle"]);
}

#[test]
fn connect_defaults_to_whole_snapshot() {
    let app = counter_toggle();
    let leaf = connect(|props: &Props| {
        props
            .iter()
            .map(|(name, prop)| (name.clone(), prop.as_namespace().map(|e| e.state_json())))
            .collect::<Vec<_>>()
    });

    let rendered = leaf.render_in(&app.consumer(), Props::new());
    assert_eq!(
        rendered,
        vec![
            ("counter".to_string(), Some(json!({"count": 0}))),
            ("toggle".to_string(), Some(json!({"on": false}))),
        ]
    );
}

#[test]
fn connected_leaf_follows_updates() {
    let app = counter_toggle();
    let leaf = connect(|props: &Props| {
        props["counter"]
            .as_namespace()
            .and_then(|counter| counter.value("count").cloned())
    });
    let mounted = leaf.mount(&app.consumer(), Props::new());

    app.snapshot()["counter"].method("inc").unwrap().call().unwrap();
    app.snapshot()["counter"].method("inc").unwrap().call().unwrap();

    assert_eq!(mounted.output(), Some(json!(2)));
    assert_eq!(mounted.render_count(), 3);
}

#[test]
fn leaf_can_call_methods_while_rendering() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = Composition::builder()
        .unit::<TodoList>()
        .children({
            let log = log.clone();
            move |consumer| {
                let snapshot = consumer.current();
                let list = &snapshot["todoList"];
                list.method("push")
                    .unwrap()
                    .invoke(&[json!("write tests")])
                    .unwrap();
                log.lock().unwrap().push(list.value("items").cloned());
            }
        })
        .build()
        .unwrap();

    app.render();

    assert_eq!(*log.lock().unwrap(), vec![Some(json!([]))]);
    assert_eq!(
        app.snapshot()["todoList"].value("items"),
        Some(&json!(["write tests"]))
    );
}

#[test]
fn failed_operation_keeps_snapshot() {
    let app = counter_toggle();
    let before = app.snapshot();

    let err = before["counter"]
        .method("add")
        .unwrap()
        .invoke(&[json!("ten")])
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { operation: "add", .. }));
    assert!(before.ptr_eq(&app.snapshot()));

    // The live state was not touched either.
    before["counter"].method("inc").unwrap().call().unwrap();
    assert_eq!(app.snapshot()["counter"].value("count"), Some(&json!(1)));
}

#[test]
fn unserializable_state_is_not_committed() {
    let app = Composition::builder()
        .unit::<Grid>()
        .children(|consumer| consumer.current())
        .build()
        .unwrap();
    let consumer = app.consumer();
    let published = Arc::new(AtomicUsize::new(0));
    let _sub = consumer.subscribe({
        let published = published.clone();
        move |_: &Snapshot| {
            published.fetch_add(1, Ordering::SeqCst);
        }
    });
    let before = app.snapshot();

    let err = before["grid"]
        .method("set")
        .unwrap()
        .invoke(&[json!(0), json!(0)])
        .unwrap_err();

    assert!(matches!(err, Error::StateSerialization { unit: "Grid", .. }));
    assert!(err.to_string().contains("key must be a string"));
    assert!(before.ptr_eq(&app.snapshot()));
    assert_eq!(published.load(Ordering::SeqCst), 0);

    // A later valid change publishes, built on the uncommitted state.
    before["grid"].method("grow").unwrap().call().unwrap();
    assert_eq!(
        app.snapshot()["grid"].state_json(),
        json!({"cells": {}, "size": 2})
    );
    assert_eq!(published.load(Ordering::SeqCst), 1);
}

#[test]
fn unmounted_composition_ignores_calls() {
    let app = counter_toggle();
    let snapshot = app.snapshot();
    let inc = snapshot["counter"].method("inc").unwrap().clone();
    let consumer = app.consumer();

    drop(app);

    assert!(matches!(
        inc.call(),
        Err(Error::UnboundOperation {
            unit: "Counter",
            operation: "inc"
        })
    ));
    assert_eq!(consumer.current()["counter"].value("count"), Some(&json!(0)));
}

fn compose_subset(mask: u8) -> Composition<Snapshot> {
    let mut builder = Composition::builder();
    if mask & 1 != 0 {
        builder = builder.unit::<Counter>();
    }
    if mask & 2 != 0 {
        builder = builder.unit::<Toggle>();
    }
    if mask & 4 != 0 {
        builder = builder.unit::<TodoList>();
    }
    if mask & 8 != 0 {
        builder = builder.unit::<Session>();
    }
    builder.children(|consumer| consumer.current()).build().unwrap()
}

proptest! {
    #[test]
    fn snapshot_has_one_namespace_per_unit(mask in 0u8..16) {
        let app = compose_subset(mask);
        let snapshot = app.render();
        prop_assert_eq!(snapshot.len(), mask.count_ones() as usize);
        prop_assert_eq!(snapshot.contains_key("counter"), mask & 1 != 0);
        prop_assert_eq!(snapshot.contains_key("toggle"), mask & 2 != 0);
        prop_assert_eq!(snapshot.contains_key("todoList"), mask & 4 != 0);
        prop_assert_eq!(snapshot.contains_key("session"), mask & 8 != 0);
    }
}
