use crate::channel::Consumer;
use crate::snapshot::Snapshot;
use std::cell::RefCell;

// Thread-local stack of active providers, innermost last.
thread_local! {
    static PROVIDER_STACK: RefCell<Vec<Consumer<Snapshot>>> = const { RefCell::new(Vec::new()) };
}

/// Ambient provider lookup for the current thread.
///
/// # Examples
///
/// ```
/// use stackstore::channel::channel;
/// use stackstore::runtime::ProviderScope;
/// use stackstore::Snapshot;
///
/// let (_provider, consumer) = channel(Snapshot::empty());
/// assert!(ProviderScope::current().is_none());
///
/// ProviderScope::with(consumer, || {
///     assert!(ProviderScope::current().is_some());
/// });
/// // The scope is popped here
/// assert!(ProviderScope::current().is_none());
/// ```
pub struct ProviderScope;

impl ProviderScope {
    /// Run a function with `consumer` as the nearest provider.
    ///
    /// Scopes nest; the innermost one wins. The scope is popped even if `f`
    /// panics.
    pub fn with<F, R>(consumer: Consumer<Snapshot>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().push(consumer);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The nearest provider's consumer, if any scope is active.
    pub fn current() -> Option<Consumer<Snapshot>> {
        PROVIDER_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Number of nested provider scopes on this thread.
    pub fn depth() -> usize {
        PROVIDER_STACK.with(|stack| stack.borrow().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::channel;
    use crate::namespace::NamespaceKey;
    use crate::snapshot::NamespaceEntry;

    #[test]
    fn innermost_scope_wins() {
        let (_outer_provider, outer) = channel(Snapshot::empty());
        let (_inner_provider, inner) = channel(Snapshot::empty().with_entry(
            NamespaceKey::derive("Inner"),
            NamespaceEntry::default(),
        ));

        ProviderScope::with(outer, || {
            assert_eq!(ProviderScope::depth(), 1);
            ProviderScope::with(inner, || {
                assert_eq!(ProviderScope::depth(), 2);
                let current = ProviderScope::current().unwrap().current();
                assert!(current.contains_key("inner"));
            });
            let current = ProviderScope::current().unwrap().current();
            assert!(current.is_empty());
        });

        assert_eq!(ProviderScope::depth(), 0);
    }

    #[test]
    fn scope_is_popped_on_panic() {
        let (_provider, consumer) = channel(Snapshot::empty());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ProviderScope::with(consumer, || panic!("render failed"));
        }));

        assert!(result.is_err());
        assert_eq!(ProviderScope::depth(), 0);
    }
}
