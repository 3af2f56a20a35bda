//! Binding a unit's operations to its live instance.

mod binder;

pub use binder::{bind_methods, BoundMethod, MethodTable};
