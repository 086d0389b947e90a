use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use deferrable_codec::Item;
use parking_lot::RwLock;
use tracing::error;

/// Observes the nine lifecycle events the engine emits.
///
/// Implement only the handlers you care about; the rest default to
/// no-ops. Handlers run synchronously, in registration order, on whichever
/// thread emitted the event (the producer's for `push`/`debounce_*`, the
/// worker's for the rest).
pub trait EventObserver: Send + Sync {
    /// An item was pushed to the main queue.
    fn on_push(&self, _item: &Item) {}
    /// An item was popped from the main queue.
    fn on_pop(&self, _item: &Item) {}
    /// `run_once` found no item available.
    fn on_empty(&self) {}
    /// An envelope was acknowledged (main or error queue).
    fn on_complete(&self, _item: &Item) {}
    /// An item's TTL had elapsed before it could be invoked.
    fn on_expire(&self, _item: &Item) {}
    /// A retriable failure caused the item to be re-pushed.
    fn on_retry(&self, _item: &Item) {}
    /// A failure routed the item to the error queue.
    fn on_error(&self, _item: &Item) {}
    /// A push was skipped because an identical item is already pending.
    fn on_debounce_hit(&self, _item: &Item) {}
    /// A push proceeded (immediately or delayed) after a debounce decision.
    fn on_debounce_miss(&self, _item: &Item) {}
    /// The debounce store failed; the push fell back to immediate delivery.
    fn on_debounce_error(&self, _item: &Item) {}
}

/// The ordered list of observers an engine notifies.
///
/// A handler that panics is caught and logged rather than allowed to
/// unwind into the engine's retry/complete bookkeeping — emission always
/// completes for every registered observer.
#[derive(Default)]
pub struct EventRegistrar {
    observers: RwLock<Vec<Arc<dyn EventObserver>>>,
}

macro_rules! emit_with_item {
    ($name:ident, $handler:ident) => {
        /// Invokes
        #[doc = concat!("[`EventObserver::", stringify!($handler), "`]")]
        /// on every registered observer, in order.
        pub fn $name(&self, item: &Item) {
            for observer in self.observers.read().iter() {
                let outcome = catch_unwind(AssertUnwindSafe(|| observer.$handler(item)));
                if outcome.is_err() {
                    error!(event = stringify!($handler), "event observer panicked");
                }
            }
        }
    };
}

impl EventRegistrar {
    /// Creates an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer` to the end of the notification order.
    pub fn register(&self, observer: Arc<dyn EventObserver>) {
        self.observers.write().push(observer);
    }

    emit_with_item!(emit_push, on_push);
    emit_with_item!(emit_pop, on_pop);
    emit_with_item!(emit_complete, on_complete);
    emit_with_item!(emit_expire, on_expire);
    emit_with_item!(emit_retry, on_retry);
    emit_with_item!(emit_error, on_error);
    emit_with_item!(emit_debounce_hit, on_debounce_hit);
    emit_with_item!(emit_debounce_miss, on_debounce_miss);
    emit_with_item!(emit_debounce_error, on_debounce_error);

    /// Invokes [`EventObserver::on_empty`] on every registered observer.
    pub fn emit_empty(&self) {
        for observer in self.observers.read().iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_empty()));
            if outcome.is_err() {
                error!(event = "on_empty", "event observer panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct Counter {
        pushes: AtomicUsize,
    }

    impl EventObserver for Counter {
        fn on_push(&self, _item: &Item) {
            self.pushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn invokes_registered_observers_in_order() {
        let registrar = EventRegistrar::new();
        let counter = StdArc::new(Counter {
            pushes: AtomicUsize::new(0),
        });
        registrar.register(counter.clone());

        let item = Item::new("f", vec![], []);
        registrar.emit_push(&item);
        registrar.emit_push(&item);

        assert_eq!(counter.pushes.load(Ordering::SeqCst), 2);
    }

    struct Panicky;
    impl EventObserver for Panicky {
        fn on_push(&self, _item: &Item) {
            panic!("boom");
        }
    }

    #[test]
    fn a_panicking_observer_does_not_stop_emission() {
        let registrar = EventRegistrar::new();
        registrar.register(StdArc::new(Panicky));
        let counter = StdArc::new(Counter {
            pushes: AtomicUsize::new(0),
        });
        registrar.register(counter.clone());

        let item = Item::new("f", vec![], []);
        registrar.emit_push(&item);

        assert_eq!(counter.pushes.load(Ordering::SeqCst), 1);
    }
}
