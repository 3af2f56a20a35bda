use crate::error::{Error, Result};
use crate::unit::{Operation, StoreUnit};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Receives a unit's state after construction and after every change.
pub(crate) trait ReadyHook<S>: Send + Sync {
    /// Take the newly committed state. Runs while the instance's state lock
    /// is held, so the folds of one instance happen in commit order.
    fn fold(&self, instance: &Instance<S>, state: Map<String, Value>) -> Result<()>;

    /// Tell readers about the fold. Runs after the state lock is released.
    fn publish(&self) {}
}

pub(crate) type OnReady<S> = Arc<dyn ReadyHook<S>>;

struct InstanceInner<S> {
    state: RwLock<S>,
    mounted: AtomicBool,
    on_ready: OnReady<S>,
}

/// A mounted store unit.
///
/// Cloning an `Instance` shares the same underlying state. Bound methods hold
/// a clone, so they keep mutating the instance they were bound to no matter
/// where they are called from.
pub struct Instance<S> {
    inner: Arc<InstanceInner<S>>,
}

impl<S: StoreUnit> Instance<S> {
    /// Construct the unit and report its initial state through `on_ready`.
    pub(crate) fn mount(on_ready: OnReady<S>) -> Result<Self> {
        let state = S::construct();
        let fields = harvest(&state)?;
        let instance = Self {
            inner: Arc::new(InstanceInner {
                state: RwLock::new(state),
                mounted: AtomicBool::new(true),
                on_ready,
            }),
        };
        debug!(unit = S::type_name(), "mounted store unit");

        {
            let _state = instance.inner.state.write();
            instance.inner.on_ready.fold(&instance, fields)?;
        }
        instance.inner.on_ready.publish();
        Ok(instance)
    }

    /// Read the unit's state without triggering a re-render.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = self.inner.state.read();
        f(&state)
    }

    /// The unit's current state as a JSON object.
    pub fn state(&self) -> Result<Map<String, Value>> {
        harvest(&*self.inner.state.read())
    }

    /// Mutate the unit's state and re-render it.
    ///
    /// `f` works on a copy. If it fails, or the copy does not serialize to a
    /// JSON object, the live state is left as it was and nothing re-renders.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.mutate("update", f)
    }

    pub(crate) fn invoke(&self, operation: &Operation<S>, args: &[Value]) -> Result<()> {
        self.mutate(operation.name(), |state| operation.apply(state, args))
    }

    fn mutate<F>(&self, operation: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        if !self.is_mounted() {
            warn!(
                unit = S::type_name(),
                operation, "ignoring operation on unmounted store unit"
            );
            return Err(Error::UnboundOperation {
                unit: S::type_name(),
                operation,
            });
        }

        {
            let mut state = self.inner.state.write();
            let mut next = S::clone(&state);
            if let Err(e) = f(&mut next) {
                warn!(unit = S::type_name(), operation, error = %e, "operation failed");
                return Err(e);
            }
            let fields = match harvest(&next) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(unit = S::type_name(), operation, error = %e, "state change rejected");
                    return Err(e);
                }
            };
            *state = next;
            self.inner.on_ready.fold(self, fields)?;
        }
        self.inner.on_ready.publish();
        Ok(())
    }
}

impl<S> Instance<S> {
    /// Whether the instance still accepts operations. Unmounting is permanent.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// End the instance's lifecycle. Returns `false` if it was already unmounted.
    pub(crate) fn unmount(&self) -> bool {
        self.inner.mounted.swap(false, Ordering::SeqCst)
    }

    /// Whether two handles refer to the same mounted unit.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S> Clone for Instance<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

/// Serialize a unit's state into the fields of its namespace entry.
fn harvest<S: StoreUnit>(state: &S) -> Result<Map<String, Value>> {
    let value = serde_json::to_value(state).map_err(|source| Error::StateSerialization {
        unit: S::type_name(),
        source,
    })?;
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::StateNotObject {
            unit: S::type_name(),
            found: value_kind(&other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
