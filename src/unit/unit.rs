use crate::error::Result;
use crate::namespace::unit_type_name;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Lifecycle operation names that never appear in a method table.
pub const RESERVED_OPERATIONS: [&str; 2] = ["construct", "render"];

type OperationFn<S> = Arc<dyn Fn(&mut S, &[Value]) -> Result<()> + Send + Sync>;

/// An independent stateful unit that contributes one namespace to a snapshot.
///
/// The unit's state is whatever it serializes to, which must be a JSON object.
/// Operations are declared explicitly, one [`Operation`] per caller-facing
/// method. An operation runs on a copy of the state; the copy replaces the
/// live state only if the operation succeeds and the result serializes.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
/// use stackstore::{Operation, StoreUnit};
///
/// #[derive(Clone, Serialize)]
/// struct Counter {
///     count: i64,
/// }
///
/// impl StoreUnit for Counter {
///     fn construct() -> Self {
///         Counter { count: 0 }
///     }
///
///     fn operations() -> Vec<Operation<Self>> {
///         vec![Operation::new("inc", |counter: &mut Counter, _| {
///             counter.count += 1;
///             Ok(())
///         })]
///     }
/// }
///
/// assert_eq!(Counter::type_name(), "Counter");
/// ```
pub trait StoreUnit: Clone + Serialize + Send + Sync + 'static {
    /// Build the unit's initial state.
    fn construct() -> Self
    where
        Self: Sized;

    /// The operations callers may invoke on a mounted instance.
    fn operations() -> Vec<Operation<Self>>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// The unit's identity, from which its namespace key is derived.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        unit_type_name::<Self>()
    }
}

/// A named operation on a store unit.
pub struct Operation<S> {
    name: &'static str,
    run: OperationFn<S>,
}

impl<S> Operation<S> {
    /// Declare an operation. It receives the unit's state mutably and the
    /// arguments the caller passed.
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&mut S, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Arc::new(run),
        }
    }

    /// The name the operation is bound under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the name is one of [`RESERVED_OPERATIONS`].
    pub fn is_reserved(&self) -> bool {
        RESERVED_OPERATIONS.contains(&self.name)
    }

    pub(crate) fn apply(&self, state: &mut S, args: &[Value]) -> Result<()> {
        (self.run)(state, args)
    }
}

impl<S> Clone for Operation<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            run: Arc::clone(&self.run),
        }
    }
}

impl<S> fmt::Debug for Operation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish()
    }
}
