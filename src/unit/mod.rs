//! The store unit contract.
//!
//! A store unit is an independent piece of state with a fixed set of named
//! operations. The engine never looks inside it: it serializes the unit to read
//! its state and calls its declared operations to change it.

mod instance;
mod unit;

pub use instance::Instance;
pub(crate) use instance::ReadyHook;
pub use unit::{Operation, StoreUnit, RESERVED_OPERATIONS};
