//! Scoped suppression of diagnostic events.
//!
//! Model fitting emits `tracing` debug events. A [`QuietScope`] installs a
//! silent subscriber as the thread-local default for its lifetime and
//! restores the previous default when dropped, which also happens while
//! unwinding. Other threads are unaffected, so fits running in parallel
//! never share redirection state.

use tracing::subscriber::{self, DefaultGuard, NoSubscriber};

/// Guard that silences `tracing` output on the current thread until dropped.
#[must_use = "diagnostics are only suppressed while the scope is alive"]
pub struct QuietScope {
    _guard: DefaultGuard,
}

impl QuietScope {
    pub fn enter() -> Self {
        Self {
            _guard: subscriber::set_default(NoSubscriber::default()),
        }
    }
}

/// Run `f` with diagnostics suppressed on this thread.
pub fn quietly<T>(f: impl FnOnce() -> T) -> T {
    let _scope = QuietScope::enter();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata, Subscriber};

    struct CountingSubscriber(Arc<AtomicUsize>);

    impl Subscriber for CountingSubscriber {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, _: &Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn events_inside_scope_are_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        subscriber::with_default(CountingSubscriber(count.clone()), || {
            tracing::info!("before");
            let value = quietly(|| {
                tracing::info!("hidden");
                42
            });
            assert_eq!(value, 42);
            tracing::info!("after");
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn output_is_restored_after_panic() {
        let count = Arc::new(AtomicUsize::new(0));
        subscriber::with_default(CountingSubscriber(count.clone()), || {
            let outcome = std::panic::catch_unwind(|| {
                quietly(|| {
                    tracing::info!("hidden");
                    panic!("fit exploded");
                })
            });
            assert!(outcome.is_err());
            tracing::info!("visible again");
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
