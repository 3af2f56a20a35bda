//! Namespace keys for the merged snapshot.
//!
//! Each store unit contributes exactly one namespace, keyed by its type name
//! with the first letter lower-cased (`Counter` becomes `counter`).

mod key;

pub use key::{unit_type_name, NamespaceKey};
