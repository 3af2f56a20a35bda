use crate::binder::BoundMethod;
use crate::channel::{Consumer, Subscription};
use crate::error::{Error, Result};
use crate::runtime::ProviderScope;
use crate::snapshot::{Field, NamespaceEntry, Snapshot};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One input handed to a connected leaf.
#[derive(Clone, Debug)]
pub enum Prop {
    Value(Value),
    Method(BoundMethod),
    /// A whole namespace entry.
    Namespace(Arc<NamespaceEntry>),
}

impl Prop {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self {
            Prop::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceEntry> {
        match self {
            Prop::Namespace(entry) => Some(&**entry),
            _ => None,
        }
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Prop::Value(value)
    }
}

impl From<BoundMethod> for Prop {
    fn from(method: BoundMethod) -> Self {
        Prop::Method(method)
    }
}

impl From<Arc<NamespaceEntry>> for Prop {
    fn from(entry: Arc<NamespaceEntry>) -> Self {
        Prop::Namespace(entry)
    }
}

impl From<Field> for Prop {
    fn from(field: Field) -> Self {
        match field {
            Field::Value(value) => Prop::Value(value),
            Field::Method(method) => Prop::Method(method),
        }
    }
}

/// A leaf's inputs, by name.
pub type Props = IndexMap<String, Prop>;

/// The default projection.
pub type Identity = fn(&Snapshot) -> Props;

/// Pass the whole snapshot through: one prop per namespace.
pub fn snapshot_props(snapshot: &Snapshot) -> Props {
    snapshot
        .iter()
        .map(|(key, entry)| (key.to_string(), Prop::Namespace(Arc::clone(entry))))
        .collect()
}

/// Connect a leaf to the nearest provider, passing it the whole snapshot.
pub fn connect<L>(leaf: L) -> Connected<L, Identity> {
    connect_with(leaf, snapshot_props as Identity)
}

/// Connect a leaf to the nearest provider through a projection.
///
/// # Examples
///
/// ```
/// use stackstore::selector::{connect_with, Prop, Props};
/// use stackstore::channel::channel;
/// use stackstore::Snapshot;
///
/// let size = connect_with(
///     |props: &Props| props["size"].as_value().cloned(),
///     |snapshot: &Snapshot| {
///         Props::from([("size".to_string(), Prop::from(serde_json::json!(snapshot.len())))])
///     },
/// );
///
/// let (_provider, consumer) = channel(Snapshot::empty());
/// assert_eq!(size.render_in(&consumer, Props::new()), Some(serde_json::json!(0)));
/// ```
pub fn connect_with<L, P>(leaf: L, projection: P) -> Connected<L, P> {
    Connected {
        leaf: Arc::new(leaf),
        projection: Arc::new(projection),
    }
}

/// A leaf wired to the snapshot through a projection.
///
/// Explicit props passed at render time win over projected ones.
pub struct Connected<L, P> {
    leaf: Arc<L>,
    projection: Arc<P>,
}

impl<L, P> Clone for Connected<L, P> {
    fn clone(&self) -> Self {
        Self {
            leaf: Arc::clone(&self.leaf),
            projection: Arc::clone(&self.projection),
        }
    }
}

impl<L, P> Connected<L, P>
where
    P: Fn(&Snapshot) -> Props,
{
    /// Render against the nearest provider in scope.
    pub fn render<R>(&self, props: Props) -> Result<R>
    where
        L: Fn(&Props) -> R,
    {
        let consumer = ProviderScope::current().ok_or(Error::NoProvider)?;
        Ok(self.render_in(&consumer, props))
    }

    /// Render against a specific consumer.
    pub fn render_in<R>(&self, consumer: &Consumer<Snapshot>, props: Props) -> R
    where
        L: Fn(&Props) -> R,
    {
        consumer.render(|snapshot| (self.leaf)(&merge(&*self.projection, snapshot, props)))
    }

    /// The props the leaf would receive for `snapshot`.
    pub fn props_for(&self, snapshot: &Snapshot, props: Props) -> Props {
        merge(&*self.projection, snapshot, props)
    }
}

impl<L, P> Connected<L, P>
where
    L: Send + Sync + 'static,
    P: Fn(&Snapshot) -> Props + Send + Sync + 'static,
{
    /// Mount the leaf: render it now and again on every publish.
    pub fn mount<R>(&self, consumer: &Consumer<Snapshot>, props: Props) -> MountedLeaf<R>
    where
        L: Fn(&Props) -> R,
        R: Send + Sync + 'static,
    {
        let output = Arc::new(RwLock::new(self.render_in(consumer, props.clone())));
        let renders = Arc::new(AtomicUsize::new(1));

        let subscription = consumer.subscribe({
            let leaf = Arc::clone(&self.leaf);
            let projection = Arc::clone(&self.projection);
            let output = Arc::clone(&output);
            let renders = Arc::clone(&renders);
            move |snapshot: &Snapshot| {
                let rendered = leaf(&merge(&*projection, snapshot, props.clone()));
                *output.write() = rendered;
                renders.fetch_add(1, Ordering::SeqCst);
            }
        });

        MountedLeaf {
            output,
            renders,
            _subscription: subscription,
        }
    }
}

fn merge<P>(projection: &P, snapshot: &Snapshot, explicit: Props) -> Props
where
    P: Fn(&Snapshot) -> Props + ?Sized,
{
    let mut props = projection(snapshot);
    props.extend(explicit);
    props
}

/// A mounted connected leaf. Dropping it unsubscribes.
pub struct MountedLeaf<R> {
    output: Arc<RwLock<R>>,
    renders: Arc<AtomicUsize>,
    _subscription: Subscription,
}

impl<R> MountedLeaf<R> {
    /// Read the latest output.
    pub fn with_output<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R) -> T,
    {
        f(&self.output.read())
    }

    /// How many times the leaf has rendered, including the first mount.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl<R: Clone> MountedLeaf<R> {
    pub fn output(&self) -> R {
        self.output.read().clone()
    }
}
