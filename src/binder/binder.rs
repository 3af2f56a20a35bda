use crate::error::Result;
use crate::unit::{Instance, StoreUnit};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Operation name to bound callable, in declaration order.
pub type MethodTable = IndexMap<String, BoundMethod>;

type BoundFn = Arc<dyn Fn(&[Value]) -> Result<()> + Send + Sync>;

/// An operation bound to one mounted instance.
///
/// Invoking it mutates exactly that instance and re-renders it, regardless of
/// which snapshot or consumer the method was taken from.
#[derive(Clone)]
pub struct BoundMethod {
    unit: &'static str,
    name: &'static str,
    call: BoundFn,
}

impl BoundMethod {
    /// Invoke the operation with arguments.
    pub fn invoke(&self, args: &[Value]) -> Result<()> {
        (self.call)(args)
    }

    /// Invoke the operation without arguments.
    pub fn call(&self) -> Result<()> {
        self.invoke(&[])
    }

    /// The operation name this method was bound under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the unit this method is bound to.
    pub fn unit(&self) -> &'static str {
        self.unit
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.unit, self.name)
    }
}

/// Build a fresh method table for `instance`.
///
/// Every declared operation except the reserved lifecycle names gets one entry.
/// Binding has no side effects; a unit without operations yields an empty table.
pub fn bind_methods<S: StoreUnit>(instance: &Instance<S>) -> MethodTable {
    let mut table = MethodTable::new();
    for operation in S::operations() {
        if operation.is_reserved() {
            warn!(
                unit = S::type_name(),
                operation = operation.name(),
                "skipping reserved operation name"
            );
            continue;
        }

        let name = operation.name();
        let instance = instance.clone();
        let call: BoundFn = Arc::new(move |args: &[Value]| instance.invoke(&operation, args));
        table.insert(
            name.to_string(),
            BoundMethod {
                unit: S::type_name(),
                name,
                call,
            },
        );
    }
    table
}
