//! An ordered invocation list for mixed synchronous and asynchronous
//! subscribers.
//!
//! This is the primitive behind the `on_*` registration surface of
//! [`crate::page::Page`] and the shutdown notifications of
//! [`crate::browser::Browser`]. Unlike the channel based
//! [`crate::listeners::EventStream`] subscriptions, subscribers registered
//! here are invoked in place, strictly in registration order, one at a time.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

type SyncFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
type AsyncFn<T> = Arc<dyn Fn(&T) -> BoxFuture<'static, ()> + Send + Sync>;

/// A single subscriber of an [`InvocationList`].
///
/// Two clones of the same subscriber share the identity of the underlying
/// callable, which is what [`InvocationList::remove`] matches on.
pub enum Subscriber<T> {
    Sync(SyncFn<T>),
    Async(AsyncFn<T>),
}

impl<T> Subscriber<T> {
    /// A subscriber that runs inline during dispatch.
    pub fn sync(f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Subscriber::Sync(Arc::new(f))
    }

    /// A subscriber whose returned future is awaited before the next
    /// subscriber runs.
    pub fn async_fn(f: impl Fn(&T) -> BoxFuture<'static, ()> + Send + Sync + 'static) -> Self {
        Subscriber::Async(Arc::new(f))
    }

    /// Whether both refer to the same underlying callable.
    fn same_callable(&self, other: &Self) -> bool {
        match (self, other) {
            (Subscriber::Sync(a), Subscriber::Sync(b)) => Arc::ptr_eq(a, b),
            (Subscriber::Async(a), Subscriber::Async(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Sync(f) => Subscriber::Sync(Arc::clone(f)),
            Subscriber::Async(f) => Subscriber::Async(Arc::clone(f)),
        }
    }
}

impl<T> std::fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Sync(_) => f.debug_tuple("Sync").finish(),
            Subscriber::Async(_) => f.debug_tuple("Async").finish(),
        }
    }
}

/// An ordered list of subscribers that is safe to mutate from within a
/// dispatch.
///
/// Dispatch iterates over a snapshot taken at invoke entry: a subscriber that
/// removes itself mid-dispatch still finishes the current dispatch but is
/// never invoked again afterwards.
pub struct InvocationList<T> {
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
}

impl<T> Clone for InvocationList<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for InvocationList<T> {
    fn default() -> Self {
        Self {
            subscribers: Default::default(),
        }
    }
}

impl<T> std::fmt::Debug for InvocationList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationList").finish()
    }
}

impl<T> InvocationList<T> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a subscriber to the end of the list.
    pub fn add(&self, subscriber: Subscriber<T>) {
        self.subscribers.lock().unwrap().push(subscriber)
    }

    /// Removes the first occurrence matching the identity of the underlying
    /// callable. Returns `true` if a subscriber was removed.
    pub fn remove(&self, subscriber: &Subscriber<T>) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(idx) = subscribers.iter().position(|s| s.same_callable(subscriber)) {
            subscribers.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().unwrap().is_empty()
    }

    /// The current subscribers, in registration order.
    pub fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.subscribers.lock().unwrap().clone()
    }

    /// Invokes all subscribers in registration order, awaiting each
    /// asynchronous subscriber before moving on.
    ///
    /// A panicking subscriber does not abort the dispatch, the remaining
    /// subscribers still run.
    pub async fn invoke_async(&self, event: &T) {
        for subscriber in self.snapshot() {
            match subscriber {
                Subscriber::Sync(f) => {
                    if std::panic::catch_unwind(AssertUnwindSafe(|| f(event))).is_err() {
                        tracing::warn!("event subscriber panicked");
                    }
                }
                Subscriber::Async(f) => {
                    if AssertUnwindSafe(f(event)).catch_unwind().await.is_err() {
                        tracing::warn!("event subscriber panicked");
                    }
                }
            }
        }
    }

    /// Invokes all subscribers, blocking the current thread on asynchronous
    /// ones.
    ///
    /// Blocking on a subscriber that needs the current task to make progress
    /// deadlocks; this is only meant for shutdown paths where the event loop
    /// is already quiesced.
    pub fn invoke_sync(&self, event: &T) {
        for subscriber in self.snapshot() {
            match subscriber {
                Subscriber::Sync(f) => {
                    if std::panic::catch_unwind(AssertUnwindSafe(|| f(event))).is_err() {
                        tracing::warn!("event subscriber panicked");
                    }
                }
                Subscriber::Async(f) => {
                    if std::panic::catch_unwind(AssertUnwindSafe(|| {
                        futures::executor::block_on(f(event))
                    }))
                    .is_err()
                    {
                        tracing::warn!("event subscriber panicked");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscribers_run_in_registration_order() {
        let list = InvocationList::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let slow = Arc::clone(&order);
        list.add(Subscriber::async_fn(move |_| {
            let order = Arc::clone(&slow);
            async move {
                futures_timer::Delay::new(Duration::from_millis(100)).await;
                order.lock().unwrap().push(1);
            }
            .boxed()
        }));

        let medium = Arc::clone(&order);
        list.add(Subscriber::async_fn(move |_| {
            let order = Arc::clone(&medium);
            async move {
                futures_timer::Delay::new(Duration::from_millis(50)).await;
                order.lock().unwrap().push(2);
            }
            .boxed()
        }));

        let fast = Arc::clone(&order);
        list.add(Subscriber::sync(move |_| {
            fast.lock().unwrap().push(3);
        }));

        list.invoke_async(&()).await;
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn self_removal_drops_all_copies_sharing_identity() {
        let list = InvocationList::<()>::new();
        let calls = Arc::new(Mutex::new(0usize));

        let subscriber_slot: Arc<Mutex<Option<Subscriber<()>>>> = Default::default();
        let slot = Arc::clone(&subscriber_slot);
        let list_handle = list.clone();
        let counted = Arc::clone(&calls);
        let subscriber = Subscriber::sync(move |_| {
            *counted.lock().unwrap() += 1;
            if let Some(me) = slot.lock().unwrap().as_ref() {
                list_handle.remove(me);
            }
        });
        *subscriber_slot.lock().unwrap() = Some(subscriber.clone());

        // registered twice, sharing one callable
        list.add(subscriber.clone());
        list.add(subscriber.clone());

        list.invoke_async(&()).await;

        // each snapshot entry ran once and removed one occurrence
        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(list.is_empty());

        list.invoke_async(&()).await;
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_abort_dispatch() {
        let list = InvocationList::<()>::new();
        let reached = Arc::new(Mutex::new(false));

        list.add(Subscriber::sync(|_| panic!("boom")));
        let flag = Arc::clone(&reached);
        list.add(Subscriber::sync(move |_| {
            *flag.lock().unwrap() = true;
        }));

        list.invoke_async(&()).await;
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn invoke_sync_blocks_on_async_subscribers() {
        let list = InvocationList::<()>::new();
        let done = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&done);
        list.add(Subscriber::async_fn(move |_| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().unwrap() = true;
            }
            .boxed()
        }));

        list.invoke_sync(&());
        assert!(*done.lock().unwrap());
    }
}
