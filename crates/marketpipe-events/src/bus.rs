//! In-process publish/subscribe (§4.7). Explicit bootstrap, no import-time
//! side effects: callers construct a bus with [`EventBus::new`] and wire
//! handlers onto it themselves, the way `mqk-daemon::AppState::new`
//! wires its own heartbeat rather than relying on a lazily-initialized
//! global.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use crate::event::Event;

pub type Handler = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<&'static str, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event discriminant (`EventKind::discriminant`).
    /// Handlers for the same discriminant fire in subscription order.
    pub fn subscribe(&self, event_type: &'static str, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event_type)
            .or_default()
            .push(Box::new(handler));
    }

    /// Synchronously invoke every handler subscribed to `event`'s
    /// discriminant, in subscription order. A handler that panics is
    /// caught and logged; it never aborts the publisher or later
    /// handlers (§4.7).
    pub fn publish(&self, event: &Event) {
        let discriminant = event.kind.discriminant();
        let guard = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = guard.get(discriminant) else { return };
        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(
                    event_id = %event.event_id,
                    discriminant,
                    %message,
                    "event handler panicked"
                );
            }
        }
    }

    /// Drop every registered handler. Paired with `new()` as the bus's
    /// explicit lifecycle bookend; the bus itself has no other resources
    /// to release.
    pub fn teardown(&self) {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use chrono::NaiveDate;
    use marketpipe_core::{IngestionJobId, Symbol};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn job_id() -> IngestionJobId {
        IngestionJobId::new(&Symbol::new("AAPL").unwrap(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
    }

    #[test]
    fn publish_invokes_matching_handlers_in_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe("ingestion_job_completed", move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        bus.subscribe("ingestion_job_completed", move |_| o2.lock().unwrap().push(2));

        bus.publish(&Event::new(
            job_id().as_str(),
            EventKind::IngestionJobCompleted { job_id: job_id(), symbols: vec![], bar_count: 0 },
        ));

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn publish_skips_unrelated_discriminants() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        bus.subscribe("validation_completed", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&Event::new(
            job_id().as_str(),
            EventKind::IngestionJobFailed { job_id: job_id(), reason: "x".to_string() },
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_handler_does_not_abort_other_handlers() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe("ingestion_job_failed", |_| panic!("boom"));
        let c = calls.clone();
        bus.subscribe("ingestion_job_failed", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&Event::new(
            job_id().as_str(),
            EventKind::IngestionJobFailed { job_id: job_id(), reason: "x".to_string() },
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn teardown_clears_handlers() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        bus.subscribe("ingestion_job_failed", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.teardown();

        bus.publish(&Event::new(
            job_id().as_str(),
            EventKind::IngestionJobFailed { job_id: job_id(), reason: "x".to_string() },
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
