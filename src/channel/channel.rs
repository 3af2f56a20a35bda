use parking_lot::{ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Current<T> {
    value: T,
    seq: u64,
}

struct Shared<T> {
    current: RwLock<Current<T>>,
    // One notification pass at a time. Reentrant so subscribers can publish.
    publishing: ReentrantMutex<()>,
    subscribers: RwLock<Vec<(usize, Subscriber<T>)>>,
    next_id: AtomicUsize,
}

/// The publishing half of a broadcast channel.
///
/// Every subscriber reached by one notification pass sees the same value. A
/// pass stops early once a newer value is stored, since the pass for the newer
/// value reaches every subscriber.
pub struct Provider<T> {
    shared: Arc<Shared<T>>,
}

/// The reading half of a broadcast channel. Clones read the same value.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

/// Create a channel holding `initial`.
///
/// # Examples
///
/// ```
/// use stackstore::channel::channel;
/// use std::sync::{Arc, Mutex};
///
/// let (provider, consumer) = channel(1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let _sub = consumer.subscribe({
///     let seen = seen.clone();
///     move |value: &i32| seen.lock().unwrap().push(*value)
/// });
///
/// provider.publish(2);
/// assert_eq!(consumer.current(), 2);
/// assert_eq!(*seen.lock().unwrap(), vec![2]);
/// ```
pub fn channel<T>(initial: T) -> (Provider<T>, Consumer<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let shared = Arc::new(Shared {
        current: RwLock::new(Current {
            value: initial,
            seq: 0,
        }),
        publishing: ReentrantMutex::new(()),
        subscribers: RwLock::new(Vec::new()),
        next_id: AtomicUsize::new(0),
    });
    (
        Provider {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

impl<T: Clone + Send + Sync + 'static> Provider<T> {
    /// Replace the current value and notify every subscriber.
    pub fn publish(&self, value: T) {
        self.store(|_| value);
        self.notify();
    }

    /// Derive the next value from the current one, store it and notify.
    ///
    /// Returns the value that was published.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let next = self.store(f);
        self.notify();
        next
    }

    /// Derive and store the next value without notifying anyone.
    pub(crate) fn store<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut current = self.shared.current.write();
        let next = f(&current.value);
        current.value = next.clone();
        current.seq += 1;
        next
    }

    /// Get a clone of the current value.
    pub fn current(&self) -> T {
        self.shared.current.read().value.clone()
    }

    /// A new consumer reading from this provider.
    pub fn consumer(&self) -> Consumer<T> {
        Consumer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Deliver the stored value to every subscriber.
    pub(crate) fn notify(&self) {
        let _publishing = self.shared.publishing.lock();
        let (value, seq) = {
            let current = self.shared.current.read();
            (current.value.clone(), current.seq)
        };
        // Subscribers may publish again, so only the reentrant lock is held
        // while they run.
        let subscribers = self
            .shared
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect::<Vec<_>>();
        trace!(subscribers = subscribers.len(), seq, "publishing");
        for subscriber in subscribers {
            if self.shared.current.read().seq != seq {
                trace!(seq, "publish superseded");
                break;
            }
            subscriber(&value);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Consumer<T> {
    /// Get a clone of the current value.
    pub fn current(&self) -> T {
        self.shared.current.read().value.clone()
    }

    /// Invoke a rendering function with the current value.
    pub fn render<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let value = self.current();
        f(&value)
    }

    /// Subscribe to published values.
    ///
    /// The callback is not invoked for the current value, only for later
    /// ones. Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared
            .subscribers
            .write()
            .push((id, Arc::new(callback)));

        let shared = Arc::downgrade(&self.shared);
        Subscription {
            id,
            unsubscribe: Box::new(move |id| {
                if let Some(shared) = Weak::upgrade(&shared) {
                    shared.subscribers.write().retain(|(sub_id, _)| *sub_id != id);
                }
            }),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// RAII guard for a consumer subscription.
pub struct Subscription {
    id: usize,
    unsubscribe: Box<dyn Fn(usize) + Send + Sync>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        (self.unsubscribe)(self.id);
    }
}
