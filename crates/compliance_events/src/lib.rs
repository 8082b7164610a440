//! Domain event publication (C12, §4.12). Synchronous, best-effort
//! fan-out: one subscriber's failure is logged and does not affect the
//! publisher or any other subscriber. Delivery is at-most-once per
//! logical operation — duplicate delivery for the same publish call must
//! not happen, but a subscriber panicking on one event must not prevent
//! the next event from reaching the others.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use compliance_core::model::Format;
use compliance_ids::{CorrelationId, FileId};
use tracing::warn;

/// Tagged union of events the pipeline publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    DocumentDownloaded {
        file_id: FileId,
        correlation_id: CorrelationId,
        source_url: String,
        format: Format,
        at: DateTime<Utc>,
    },
    DocumentClassified {
        file_id: FileId,
        correlation_id: CorrelationId,
        level1: compliance_core::model::ClassificationLabel,
        confidence: u8,
    },
    ReviewCaseOpened {
        file_id: FileId,
        correlation_id: CorrelationId,
        reason: String,
    },
    SlaEscalated {
        file_id: FileId,
        level: compliance_core::model::EscalationLevel,
    },
}

/// A subscriber callback. Boxed so the bus can hold a heterogeneous list.
pub type Subscriber = Box<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Synchronous, in-process event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    /// Publish `event` to every subscriber. A subscriber that panics is
    /// caught and logged; it does not stop delivery to the rest.
    pub fn publish(&self, event: PipelineEvent) {
        let subscribers = self.subscribers.lock().unwrap();
        for subscriber in subscribers.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| subscriber(&event)));
            if let Err(_panic) = result {
                warn!("event subscriber panicked while handling {:?}", event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn publish_reaches_all_subscribers_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            bus.subscribe(Box::new(move |_event| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        bus.publish(PipelineEvent::DocumentDownloaded {
            file_id: FileId::new(),
            correlation_id: CorrelationId::new(),
            source_url: "https://example.gov/a.pdf".to_string(),
            format: Format::Pdf,
            at: Utc::now(),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn a_panicking_subscriber_does_not_block_the_others() {
        let bus = EventBus::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.subscribe(Box::new(|_event| panic!("broken subscriber")));
        let delivered_clone = Arc::clone(&delivered);
        bus.subscribe(Box::new(move |_event| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(PipelineEvent::ReviewCaseOpened {
            file_id: FileId::new(),
            correlation_id: CorrelationId::new(),
            reason: "low confidence".to_string(),
        });

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
