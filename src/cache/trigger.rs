//! Cache trigger service.
//!
//! Publishes invalidation events for completed writes and applies them
//! immediately.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::consumer::{CacheConsumer, ConsumeOutcome};
use super::events::{EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publishes `kind` and drains the queue so that the invalidation is in
    /// effect when this returns.
    pub fn trigger(&self, kind: EventKind) -> ConsumeOutcome {
        if !self.config.enabled {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return ConsumeOutcome::default();
        }

        self.queue.publish(kind);
        let mut outcome = self.consumer.consume();
        while !self.queue.is_empty() {
            outcome.absorb(self.consumer.consume());
        }
        outcome
    }

    pub fn product_updated(&self, product_id: u64) -> ConsumeOutcome {
        self.trigger(EventKind::ProductUpdated { product_id })
    }
}
