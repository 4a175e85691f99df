//! Listener registry and asynchronous fan-out of progress events.
//!
//! [`ProgressHub::notify`] snapshots the registered listeners and hands the
//! event to a dedicated dispatcher thread, so the numeric pipeline never
//! waits on a slow listener.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::progress::ProgressEvent;

/// Receiver of progress events.
///
/// Called from the dispatcher thread; implementations must not block for long.
pub trait ProgressListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &ProgressEvent);
}

enum Dispatch {
    Deliver {
        listeners: Vec<Arc<dyn ProgressListener>>,
        event: ProgressEvent,
    },
    Flush(Sender<()>),
}

fn deliver(listeners: &[Arc<dyn ProgressListener>], event: &ProgressEvent) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
            warn!(kind = event.kind(), "progress listener panicked");
        }
    }
}

fn same_listener<L: ?Sized>(a: &Arc<dyn ProgressListener>, b: &Arc<L>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Registry of listeners plus the dispatcher feeding them.
pub struct ProgressHub {
    listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
    dispatcher: Option<Sender<Dispatch>>,
}

impl ProgressHub {
    /// Create a hub and start its dispatcher thread.
    ///
    /// If the thread cannot be spawned, events are delivered inline.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded::<Dispatch>();
        let spawned = std::thread::Builder::new()
            .name("picalc-progress".into())
            .spawn(move || {
                for message in rx {
                    match message {
                        Dispatch::Deliver { listeners, event } => deliver(&listeners, &event),
                        Dispatch::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            });
        let dispatcher = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                warn!(error = %e, "progress dispatcher unavailable, delivering inline");
                None
            }
        };
        Self {
            listeners: RwLock::new(Vec::new()),
            dispatcher,
        }
    }

    /// Register `listener`. Returns `false` if it was already registered.
    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister `listener`. Returns `false` if it was not registered.
    pub fn remove_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    /// Whether `listener` is registered.
    pub fn has_listener<L: ?Sized>(&self, listener: &Arc<L>) -> bool {
        self.listeners
            .read()
            .iter()
            .any(|l| same_listener(l, listener))
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Whether any listener is registered.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        !self.listeners.read().is_empty()
    }

    /// Deliver `event` to every listener registered at the time of the call.
    pub fn notify(&self, event: ProgressEvent) {
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        trace!(kind = event.kind(), index = ?event.index(), "notify");
        match &self.dispatcher {
            Some(tx) => {
                if let Err(e) = tx.send(Dispatch::Deliver { listeners, event }) {
                    // Dispatcher gone: deliver on the caller.
                    if let Dispatch::Deliver { listeners, event } = e.into_inner() {
                        deliver(&listeners, &event);
                    }
                }
            }
            None => deliver(&listeners, &event),
        }
    }

    /// Build and deliver an event only if someone is listening.
    pub fn emit<F>(&self, make_event: F)
    where
        F: FnOnce() -> ProgressEvent,
    {
        if self.is_observed() {
            self.notify(make_event());
        }
    }

    /// Block until every event notified before this call has been delivered.
    pub fn flush(&self) {
        if let Some(tx) = &self.dispatcher {
            let (ack_tx, ack_rx) = bounded(1);
            if tx.send(Dispatch::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::observers::NoOpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        count: AtomicUsize,
    }

    impl ProgressListener for Counting {
        fn on_event(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event(index: u32) -> ProgressEvent {
        ProgressEvent::IterationCompleted {
            index,
            value: Decimal::one(),
        }
    }

    #[test]
    fn add_is_deduplicated() {
        let hub = ProgressHub::new();
        let listener: Arc<dyn ProgressListener> = Arc::new(NoOpListener::new());
        assert!(hub.add_listener(Arc::clone(&listener)));
        assert!(!hub.add_listener(Arc::clone(&listener)));
        assert_eq!(hub.count(), 1);
    }

    #[test]
    fn remove_and_query_by_concrete_arc() {
        let hub = ProgressHub::new();
        let listener = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        assert!(!hub.has_listener(&listener));
        hub.add_listener(listener.clone());
        assert!(hub.has_listener(&listener));
        assert!(hub.remove_listener(&listener));
        assert!(!hub.remove_listener(&listener));
        assert!(!hub.is_observed());
    }

    #[test]
    fn notify_reaches_every_listener() {
        let hub = ProgressHub::new();
        let a = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        let b = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        hub.add_listener(a.clone());
        hub.add_listener(b.clone());
        for i in 0..10 {
            hub.notify(event(i));
        }
        hub.flush();
        assert_eq!(a.count.load(Ordering::SeqCst), 10);
        assert_eq!(b.count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn snapshot_excludes_later_listeners() {
        let hub = ProgressHub::new();
        let early = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        hub.add_listener(early.clone());
        hub.notify(event(0));
        let late = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        hub.add_listener(late.clone());
        hub.flush();
        assert_eq!(early.count.load(Ordering::SeqCst), 1);
        assert_eq!(late.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        struct Panicking;
        impl ProgressListener for Panicking {
            fn on_event(&self, _event: &ProgressEvent) {
                panic!("listener failure");
            }
        }

        let hub = ProgressHub::new();
        let counting = Arc::new(Counting {
            count: AtomicUsize::new(0),
        });
        hub.add_listener(Arc::new(Panicking));
        hub.add_listener(counting.clone());
        hub.notify(event(1));
        hub.notify(event(2));
        hub.flush();
        assert_eq!(counting.count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn emit_skips_construction_without_listeners() {
        let hub = ProgressHub::new();
        let mut built = false;
        hub.emit(|| {
            built = true;
            event(0)
        });
        assert!(!built);
    }

    #[test]
    fn clear_removes_all() {
        let hub = ProgressHub::new();
        hub.add_listener(Arc::new(NoOpListener::new()));
        hub.add_listener(Arc::new(NoOpListener::new()));
        assert_eq!(hub.count(), 2);
        hub.clear();
        assert_eq!(hub.count(), 0);
    }
}
