//! # Stackstore
//!
//! Compose independent stateful store units into one namespaced snapshot.
//!
//! Each unit owns its own state and declares the operations that change it.
//! A [`Composition`] mounts the units in order, merges every unit's state and
//! bound methods under a key derived from its type name, and publishes the
//! result through a single broadcast channel.
//!
//! ## Building blocks
//!
//! - [`StoreUnit`] - an independent piece of state with named operations
//! - [`NamespaceKey`] - the key a unit lives under (`Counter` becomes `counter`)
//! - [`bind_methods`] - operations bound to one live instance
//! - [`Snapshot`] - the immutable merged view, rebuilt on every change
//! - [`channel`](channel::channel) - the provider/consumer pair carrying it
//! - [`connect`] - project the snapshot into a leaf's inputs
//!
//! ```
//! use serde::Serialize;
//! use stackstore::{connect, Composition, Operation, Props, StoreUnit};
//!
//! #[derive(Clone, Serialize)]
//! struct Toggle {
//!     on: bool,
//! }
//!
//! impl StoreUnit for Toggle {
//!     fn construct() -> Self {
//!         Toggle { on: false }
//!     }
//!
//!     fn operations() -> Vec<Operation<Self>> {
//!         vec![Operation::new("flip", |t: &mut Toggle, _| {
//!             t.on = !t.on;
//!             Ok(())
//!         })]
//!     }
//! }
//!
//! let light = connect(|props: &Props| {
//!     let toggle = props["toggle"].as_namespace().unwrap();
//!     toggle.value("on").and_then(|on| on.as_bool()).unwrap_or(false)
//! });
//!
//! let app = Composition::builder()
//!     .unit::<Toggle>()
//!     .children(move |_| light.render(Props::new()))
//!     .build()
//!     .unwrap();
//!
//! assert!(!app.render().unwrap());
//! app.snapshot()["toggle"].method("flip").unwrap().call().unwrap();
//! assert!(app.render().unwrap());
//! ```

pub mod aggregator;
pub mod binder;
pub mod channel;
pub mod error;
pub mod namespace;
pub mod runtime;
pub mod selector;
pub mod snapshot;
pub mod unit;

// Re-export main types for convenience
pub use aggregator::{Composition, CompositionBuilder};
pub use binder::{bind_methods, BoundMethod, MethodTable};
pub use channel::{Consumer, Provider, Subscription};
pub use error::{Error, Result};
pub use namespace::NamespaceKey;
pub use selector::{connect, connect_with, Connected, MountedLeaf, Prop, Props};
pub use snapshot::{Field, NamespaceEntry, Snapshot};
pub use unit::{Instance, Operation, StoreUnit};
