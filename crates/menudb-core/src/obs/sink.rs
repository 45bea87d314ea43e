//! Metrics sink boundary.
//!
//! Repository and cascade code never touch `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::{obs::metrics, traits::EntityKind};
use std::{cell::RefCell, marker::PhantomData};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Lookup,
    Save,
    Update,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        entity_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        entity_path: &'static str,
        docs_touched: u64,
    },
    MetaLinkWrites {
        entity_path: &'static str,
        writes: u64,
    },
    /// Meta-links whose target document did not exist.
    MetaLinkSkips {
        entity_path: &'static str,
        skipped: u64,
    },
    CascadeFanout {
        entity_path: &'static str,
        parents: u64,
    },
    TransactionRetry {
        attempt: u32,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counters.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    match kind {
                        ExecKind::Load => {
                            m.ops.load_calls = m.ops.load_calls.saturating_add(1);
                            entry.load_calls = entry.load_calls.saturating_add(1);
                        }
                        ExecKind::Lookup => {
                            m.ops.lookup_calls = m.ops.lookup_calls.saturating_add(1);
                            entry.lookup_calls = entry.lookup_calls.saturating_add(1);
                        }
                        ExecKind::Save => {
                            m.ops.save_calls = m.ops.save_calls.saturating_add(1);
                            entry.save_calls = entry.save_calls.saturating_add(1);
                        }
                        ExecKind::Update => {
                            m.ops.update_calls = m.ops.update_calls.saturating_add(1);
                            entry.update_calls = entry.update_calls.saturating_add(1);
                        }
                        ExecKind::Delete => {
                            m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                            entry.delete_calls = entry.delete_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                entity_path,
                docs_touched,
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    match kind {
                        ExecKind::Load | ExecKind::Lookup => {
                            m.ops.docs_loaded = m.ops.docs_loaded.saturating_add(docs_touched);
                            entry.docs_loaded = entry.docs_loaded.saturating_add(docs_touched);
                        }
                        ExecKind::Save | ExecKind::Update => {
                            m.ops.docs_written = m.ops.docs_written.saturating_add(docs_touched);
                            entry.docs_written = entry.docs_written.saturating_add(docs_touched);
                        }
                        ExecKind::Delete => {
                            m.ops.docs_deleted = m.ops.docs_deleted.saturating_add(docs_touched);
                            entry.docs_deleted = entry.docs_deleted.saturating_add(docs_touched);
                        }
                    }
                });
            }

            MetricsEvent::MetaLinkWrites {
                entity_path,
                writes,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.meta_link_writes = m.ops.meta_link_writes.saturating_add(writes);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.meta_link_writes = entry.meta_link_writes.saturating_add(writes);
                });
            }

            MetricsEvent::MetaLinkSkips {
                entity_path,
                skipped,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.meta_link_skips = m.ops.meta_link_skips.saturating_add(skipped);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.meta_link_skips = entry.meta_link_skips.saturating_add(skipped);
                });
            }

            MetricsEvent::CascadeFanout {
                entity_path,
                parents,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.cascade_parent_writes =
                        m.ops.cascade_parent_writes.saturating_add(parents);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.cascade_parent_writes =
                        entry.cascade_parent_writes.saturating_add(parents);
                });
            }

            MetricsEvent::TransactionRetry { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.transaction_retries = m.ops.transaction_retries.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // `ptr` was installed by `with_metrics_sink` from a live shared borrow,
        // and that function restores the previous slot on every exit
        // (including unwind) before the borrow ends. `record` dereferences
        // synchronously and never stores the pointer.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's counters.
///
/// `window_start_ms` filters by window start, not by event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<i64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // The erased pointer is only reachable through SINK_OVERRIDE for the
    // dynamic extent of this call; `Guard` restores the previous slot on
    // every exit, and `record` uses it synchronously as a shared reference.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one repository call.
/// Finish accounting happens even on early return or unwind.

pub(crate) struct Span<E: EntityKind> {
    kind: ExecKind,
    docs: u64,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Span<E> {
    /// Start a metrics span for one entity type and operation kind.
    #[must_use]
    pub(crate) fn new(kind: ExecKind) -> Self {
        record(MetricsEvent::ExecStart {
            kind,
            entity_path: E::TYPE.name,
        });

        Self {
            kind,
            docs: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn set_docs(&mut self, docs: u64) {
        self.docs = docs;
    }
}

impl<E: EntityKind> Drop for Span<E> {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            entity_path: E::TYPE.name,
            docs_touched: self.docs,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BaseRecord;
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn retry() -> MetricsEvent {
        MetricsEvent::TransactionRetry { attempt: 1 }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        with_metrics_sink(&outer, || {
            record(retry());
            with_metrics_sink(&inner, || record(retry()));
            record(retry());
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(retry());
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn span_records_start_and_finish_per_entity() {
        metrics_reset_all();

        {
            let mut span = Span::<BaseRecord>::new(ExecKind::Save);
            span.set_docs(3);
        }
        record(MetricsEvent::CascadeFanout {
            entity_path: "BaseRecord",
            parents: 2,
        });

        let counters = metrics_report(None)
            .counters
            .expect("report without window should include counters");
        assert_eq!(counters.ops.save_calls, 1);
        assert_eq!(counters.ops.docs_written, 3);
        assert_eq!(counters.ops.cascade_parent_writes, 2);

        let entity = counters
            .entities
            .get("BaseRecord")
            .expect("entity counters should be present");
        assert_eq!(entity.save_calls, 1);
        assert_eq!(entity.cascade_parent_writes, 2);
    }

    #[test]
    fn report_after_window_start_is_empty() {
        metrics_reset_all();
        let window_start = metrics::with_state(|m| m.window_start_ms);
        record(retry());

        assert!(metrics_report(Some(window_start + 1)).counters.is_none());
        let counters = metrics_report(Some(window_start))
            .counters
            .expect("window start at the boundary should include counters");
        assert_eq!(counters.ops.transaction_retries, 1);
    }
}
