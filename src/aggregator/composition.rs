use crate::binder::bind_methods;
use crate::channel::{channel, Consumer, Provider};
use crate::error::{Error, Result};
use crate::namespace::NamespaceKey;
use crate::runtime::ProviderScope;
use crate::snapshot::{NamespaceEntry, Snapshot};
use crate::unit::{Instance, ReadyHook, StoreUnit};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

type Children<R> = Box<dyn Fn(&Consumer<Snapshot>) -> R + Send + Sync>;

/// A unit type waiting to be mounted.
trait UnitSlot: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn mount(&self, key: NamespaceKey, provider: &Arc<Provider<Snapshot>>) -> Result<Box<dyn MountedUnit>>;
}

/// A mounted unit, type-erased so the composition can end its lifecycle.
trait MountedUnit: Send + Sync {
    fn unmount(&self) -> bool;
}

struct UnitType<S>(PhantomData<fn() -> S>);

impl<S: StoreUnit> UnitSlot for UnitType<S> {
    fn type_name(&self) -> &'static str {
        S::type_name()
    }

    fn mount(&self, key: NamespaceKey, provider: &Arc<Provider<Snapshot>>) -> Result<Box<dyn MountedUnit>> {
        let fold = Fold {
            key,
            provider: Arc::downgrade(provider),
        };
        Ok(Box::new(Instance::<S>::mount(Arc::new(fold))?))
    }
}

/// Folds one unit's entry into the composition's snapshot.
struct Fold {
    key: NamespaceKey,
    provider: Weak<Provider<Snapshot>>,
}

impl<S: StoreUnit> ReadyHook<S> for Fold {
    fn fold(&self, instance: &Instance<S>, state: Map<String, Value>) -> Result<()> {
        let Some(provider) = self.provider.upgrade() else {
            return Ok(());
        };
        // Methods are bound fresh against the instance that just rendered.
        let entry = NamespaceEntry::new(state, bind_methods(instance));
        let snapshot = provider.store(|snapshot| snapshot.with_entry(self.key.clone(), entry));
        trace!(namespace = %self.key, version = snapshot.version(), "folded store unit");
        Ok(())
    }

    fn publish(&self) {
        if let Some(provider) = self.provider.upgrade() {
            provider.notify();
        }
    }
}

impl<S: StoreUnit> MountedUnit for Instance<S> {
    fn unmount(&self) -> bool {
        Instance::unmount(self)
    }
}

/// Builder for a [`Composition`].
pub struct CompositionBuilder<R> {
    units: Vec<Box<dyn UnitSlot>>,
    children: Option<Children<R>>,
}

impl<R> Default for CompositionBuilder<R> {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            children: None,
        }
    }
}

impl<R> CompositionBuilder<R> {
    /// Append a unit type. Units are folded in the order they are added.
    pub fn unit<S: StoreUnit>(mut self) -> Self {
        self.units.push(Box::new(UnitType::<S>(PhantomData)));
        self
    }

    /// The subtree rendered beneath the provider.
    pub fn children<F>(mut self, children: F) -> Self
    where
        F: Fn(&Consumer<Snapshot>) -> R + Send + Sync + 'static,
    {
        self.children = Some(Box::new(children));
        self
    }

    /// Validate the configuration, then mount every unit.
    ///
    /// Fails with [`Error::MissingChildren`] or [`Error::NamespaceCollision`]
    /// before any unit is mounted. If a unit fails to report its state, the
    /// units mounted before it are unmounted again.
    pub fn build(self) -> Result<Composition<R>> {
        let children = self.children.ok_or(Error::MissingChildren)?;

        let mut owners: IndexMap<NamespaceKey, &'static str> = IndexMap::new();
        for unit in &self.units {
            let key = NamespaceKey::derive(unit.type_name());
            if let Some(&first) = owners.get(&key) {
                return Err(Error::NamespaceCollision {
                    key,
                    first,
                    second: unit.type_name(),
                });
            }
            owners.insert(key, unit.type_name());
        }

        let (provider, _) = channel(Snapshot::empty());
        let provider = Arc::new(provider);
        let keys = owners.into_keys().collect::<Vec<_>>();

        let mounted = mount_all(&self.units, &keys, &provider)?;

        debug!(units = mounted.len(), "composed store units");
        Ok(Composition {
            provider,
            children,
            keys,
            units: mounted,
        })
    }
}

/// Mount every unit in order. If one fails, the units mounted before it are
/// unmounted again.
fn mount_all(
    units: &[Box<dyn UnitSlot>],
    keys: &[NamespaceKey],
    provider: &Arc<Provider<Snapshot>>,
) -> Result<Vec<Box<dyn MountedUnit>>> {
    let mut mounted = Vec::with_capacity(units.len());
    if let Err(e) = stack(units, keys, provider, &mut mounted) {
        let unmounted = mounted.iter().filter(|unit| unit.unmount()).count();
        debug!(units = unmounted, error = %e, "rolled back composition");
        return Err(e);
    }
    Ok(mounted)
}

/// Mount the head unit, let it fold into the provider, then stack the tail.
fn stack(
    units: &[Box<dyn UnitSlot>],
    keys: &[NamespaceKey],
    provider: &Arc<Provider<Snapshot>>,
    mounted: &mut Vec<Box<dyn MountedUnit>>,
) -> Result<()> {
    let (Some((unit, units)), Some((key, keys))) = (units.split_first(), keys.split_first()) else {
        return Ok(());
    };
    debug!(unit = unit.type_name(), namespace = %key, "mounting store unit");
    mounted.push(unit.mount(key.clone(), provider)?);
    stack(units, keys, provider, mounted)
}

/// A set of mounted store units published as one snapshot.
///
/// Dropping the composition unmounts every unit; methods bound to them stop
/// mutating state.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
/// use stackstore::{Composition, Operation, StoreUnit};
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
///         vec![Operation::new("inc", |c: &mut Counter, _| {
///             c.count += 1;
///             Ok(())
///         })]
///     }
/// }
///
/// let composition = Composition::builder()
///     .unit::<Counter>()
///     .children(|consumer| consumer.current().state_json())
///     .build()
///     .unwrap();
///
/// let snapshot = composition.snapshot();
/// snapshot["counter"].method("inc").unwrap().call().unwrap();
/// assert_eq!(composition.render()["counter"]["count"], 1);
/// ```
pub struct Composition<R> {
    provider: Arc<Provider<Snapshot>>,
    children: Children<R>,
    keys: Vec<NamespaceKey>,
    units: Vec<Box<dyn MountedUnit>>,
}

impl<R> Composition<R> {
    pub fn builder() -> CompositionBuilder<R> {
        CompositionBuilder::default()
    }

    /// Render the children with this composition as the nearest provider.
    pub fn render(&self) -> R {
        let consumer = self.consumer();
        ProviderScope::with(consumer.clone(), || (self.children)(&consumer))
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.provider.current()
    }

    /// A consumer subscribed to this composition's provider.
    pub fn consumer(&self) -> Consumer<Snapshot> {
        self.provider.consumer()
    }

    /// Namespace keys in fold order.
    pub fn keys(&self) -> &[NamespaceKey] {
        &self.keys
    }

    /// Unmount every unit now rather than on drop.
    pub fn unmount(self) {}
}

impl<R> Drop for Composition<R> {
    fn drop(&mut self) {
        let unmounted = self.units.iter().filter(|unit| unit.unmount()).count();
        debug!(units = unmounted, "unmounted store units");
    }
}
