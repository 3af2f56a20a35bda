//! Two independent stores composed into one snapshot, with a connected leaf
//! that re-renders on every change.
//!
//! Run with `RUST_LOG=stackstore=trace` to see mounts and folds.

use serde::Serialize;
use serde_json::Value;
use stackstore::{connect, Composition, Error, Operation, Props, StoreUnit};
use tracing_subscriber::EnvFilter;

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

fn display(props: &Props) -> String {
    let count = props["counter"]
        .as_namespace()
        .and_then(|counter| counter.value("count").cloned())
        .unwrap_or(Value::Null);
    let on = props["toggle"]
        .as_namespace()
        .and_then(|toggle| toggle.value("on").cloned())
        .unwrap_or(Value::Null);
    format!("count = {count}, on = {on}")
}

fn main() -> stackstore::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let display = connect(display);
    let app = Composition::builder()
        .unit::<Counter>()
        .unit::<Toggle>()
        .children(|consumer| consumer.current().state_json())
        .build()?;

    println!("=== Initial ===");
    println!("{}", app.render());

    let mounted = display.mount(&app.consumer(), Props::new());
    println!("Display: {}", mounted.output());

    println!("\n=== After inc, add(10), flip ===");
    let snapshot = app.snapshot();
    snapshot["counter"].method("inc").expect("declared operation").call()?;
    snapshot["counter"]
        .method("add")
        .expect("declared operation")
        .invoke(&[Value::from(10)])?;
    snapshot["toggle"].method("flip").expect("declared operation").call()?;
    println!("{}", app.render());
    println!("Display: {} ({} renders)", mounted.output(), mounted.render_count());

    println!("\n=== Invalid argument ===");
    if let Err(e) = snapshot["counter"]
        .method("add")
        .expect("declared operation")
        .invoke(&[Value::from("ten")])
    {
        println!("Rejected: {e}");
    }

    println!("\n=== After unmount ===");
    let inc = snapshot["counter"].method("inc").cloned();
    app.unmount();
    if let Some(Err(e)) = inc.map(|inc| inc.call()) {
        println!("Rejected: {e}");
    }

    Ok(())
}
