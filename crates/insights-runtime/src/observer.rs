//! Explicit listener registration for values that change over time.
//!
//! An [`Observable`] holds the latest value and a registry of listeners.
//! [`Observable::subscribe`] returns a [`Subscription`]; dropping it (or
//! calling [`Subscription::unsubscribe`]) removes the listener. Listeners
//! are invoked synchronously, in registration order, after the registry
//! lock has been released.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Listeners never run while these locks are held.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Observable ────────────────────────────────────────────────────────────────

/// A shared, observable value. Clones share the same value and listeners.
pub struct Observable<T> {
    value: Arc<Mutex<Option<T>>>,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self {
            value: Arc::new(Mutex::new(None)),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// An observable with no value yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// An observable seeded with `value`.
    pub fn with_value(value: T) -> Self {
        let observable = Self::default();
        *lock(&observable.value) = Some(value);
        observable
    }

    /// Latest value, if one has been set.
    pub fn get(&self) -> Option<T> {
        lock(&self.value).clone()
    }

    /// Store `value` and notify every current listener.
    pub fn set(&self, value: T) {
        *lock(&self.value) = Some(value.clone());

        let listeners: Vec<Listener<T>> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&value);
        }
    }

    /// Register `listener` for future [`set`](Self::set) calls.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    lock(&registry).listeners.retain(|(other, _)| *other != id);
                }
            })),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

// ── Subscription ──────────────────────────────────────────────────────────────

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_and_set() {
        let observable: Observable<u32> = Observable::new();
        assert_eq!(observable.get(), None);

        observable.set(7);
        assert_eq!(observable.get(), Some(7));

        let seeded = Observable::with_value("month".to_string());
        assert_eq!(seeded.get().as_deref(), Some("month"));
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let observable = Observable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            observable.subscribe(move |v: &u32| seen.lock().unwrap().push(("first", *v)))
        };
        let second = {
            let seen = Arc::clone(&seen);
            observable.subscribe(move |v: &u32| seen.lock().unwrap().push(("second", *v)))
        };

        observable.set(1);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 1), ("second", 1)]);
        drop((first, second));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let observable = Observable::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let subscription = {
            let calls = Arc::clone(&calls);
            observable.subscribe(move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        observable.set(1);
        subscription.unsubscribe();
        observable.set(2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observable.listener_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let observable: Observable<u32> = Observable::new();
        {
            let _subscription = observable.subscribe(|_| {});
            assert_eq!(observable.listener_count(), 1);
        }
        assert_eq!(observable.listener_count(), 0);
    }

    #[test]
    fn test_clones_share_listeners() {
        let observable = Observable::new();
        let clone = observable.clone();
        let calls = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let calls = Arc::clone(&calls);
            observable.subscribe(move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        clone.set(3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observable.get(), Some(3));
    }

    #[test]
    fn test_listener_may_subscribe_without_deadlock() {
        let observable: Observable<u32> = Observable::new();
        let inner = observable.clone();
        let nested = Arc::new(Mutex::new(Vec::new()));

        let _subscription = {
            let nested = Arc::clone(&nested);
            observable.subscribe(move |_| {
                nested.lock().unwrap().push(inner.subscribe(|_| {}));
            })
        };

        observable.set(1);
        assert_eq!(observable.listener_count(), 2);
    }

    #[test]
    fn test_subscription_outliving_observable_is_harmless() {
        let observable: Observable<u32> = Observable::new();
        let subscription = observable.subscribe(|_| {});
        drop(observable);
        subscription.unsubscribe();
    }
}
