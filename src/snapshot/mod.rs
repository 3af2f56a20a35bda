//! The merged, namespaced view of every unit's state and methods.
//!
//! Snapshots are immutable. Folding a unit's entry in produces a new snapshot
//! that shares every untouched entry with the old one.

mod snapshot;

pub use snapshot::{Field, NamespaceEntry, Snapshot};
