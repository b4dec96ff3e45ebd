//! Cache consumer applying invalidation plans.
//!
//! Drains the event queue and marks every affected entry stale: fetches still
//! in flight are matched by key shape, finished ones through the registry.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use super::config::CacheConfig;
use super::events::EventQueue;
use super::keys::QueryKey;
use super::planner::InvalidationPlan;
use super::registry::CacheRegistry;
use super::store::{Invalidation, QueryStore};

const METRIC_CACHE_INVALIDATED: &str = "catalog_cache_invalidated_total";
const METRIC_CACHE_CONSUME_MS: &str = "catalog_cache_consume_ms";

/// Result of one consumption pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// Every key marked stale.
    pub invalidated: BTreeSet<QueryKey>,
    /// Stale keys that have active subscribers and must be refetched now.
    pub refetch: Vec<QueryKey>,
}

impl ConsumeOutcome {
    fn record(&mut self, key: QueryKey, invalidation: Invalidation) {
        if !self.invalidated.insert(key) {
            return;
        }
        debug!(query_key = %key, refetch = invalidation.refetch, "Query marked stale");
        if invalidation.refetch {
            self.refetch.push(key);
        }
    }

    /// Folds a later pass into this one.
    pub fn absorb(&mut self, other: ConsumeOutcome) {
        self.invalidated.extend(other.invalidated);
        for key in other.refetch {
            if !self.refetch.contains(&key) {
                self.refetch.push(key);
            }
        }
    }
}

pub struct CacheConsumer {
    config: CacheConfig,
    store: Arc<QueryStore>,
    registry: Arc<CacheRegistry>,
    queue: Arc<EventQueue>,
}

impl CacheConsumer {
    pub fn new(
        config: CacheConfig,
        store: Arc<QueryStore>,
        registry: Arc<CacheRegistry>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            queue,
        }
    }

    /// Applies up to one batch of pending events.
    #[instrument(skip(self))]
    pub fn consume(&self) -> ConsumeOutcome {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit.get());
        if events.is_empty() {
            return ConsumeOutcome::default();
        }

        let plan = InvalidationPlan::from_events(events, self.config.invalidate_lists_on_update);
        info!(plan = %plan, "Cache invalidation starting");

        let mut outcome = ConsumeOutcome::default();

        // In-flight entries first: a fetch finishing after this point stores
        // its result stale, one finishing before it is already registered.
        let in_flight = self
            .store
            .invalidate_in_flight(|key| plan.tags.iter().any(|tag| key.may_provide(tag)));
        for (key, invalidation) in in_flight {
            outcome.record(key, invalidation);
        }

        for key in self.registry.keys_for_tags(&plan.tags) {
            if outcome.invalidated.contains(&key) {
                continue;
            }
            let Some(invalidation) = self.store.invalidate(&key) else {
                // Pruned from the store but still registered.
                self.registry.unregister(&key);
                continue;
            };
            outcome.record(key, invalidation);
        }

        counter!(METRIC_CACHE_INVALIDATED).increment(outcome.invalidated.len() as u64);
        histogram!(METRIC_CACHE_CONSUME_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(
            invalidated = outcome.invalidated.len(),
            refetch = outcome.refetch.len(),
            "Cache invalidation complete"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use catalog_types::Category;

    use super::*;
    use crate::cache::events::EventKind;
    use crate::cache::keys::Tag;
    use crate::cache::store::{CachedValue, Completion, FetchTicket, Lookup};

    struct Fixture {
        store: Arc<QueryStore>,
        registry: Arc<CacheRegistry>,
        queue: Arc<EventQueue>,
        consumer: CacheConsumer,
    }

    impl Fixture {
        fn product_updated(&self, product_id: u64) -> ConsumeOutcome {
            self.queue.publish(EventKind::ProductUpdated { product_id });
            self.consumer.consume()
        }
    }

    fn fixture(config: CacheConfig) -> Fixture {
        let store = Arc::new(QueryStore::new());
        let registry = Arc::new(CacheRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = CacheConsumer::new(config, store.clone(), registry.clone(), queue.clone());
        Fixture {
            store,
            registry,
            queue,
            consumer,
        }
    }

    fn value() -> CachedValue {
        CachedValue::Categories(vec![Category::from("x")])
    }

    fn start(fixture: &Fixture, key: QueryKey) -> FetchTicket {
        let Lookup::Fetch(ticket) = fixture.store.begin(key, false) else {
            panic!("expected fetch");
        };
        ticket
    }

    fn cache(fixture: &Fixture, key: QueryKey, tags: &[Tag]) {
        let ticket = start(fixture, key);
        fixture.store.complete(ticket, Ok(value()));
        fixture
            .registry
            .register(key, tags.iter().copied().collect::<HashSet<_>>());
    }

    #[test]
    fn product_update_marks_detail_and_containing_pages() {
        let fixture = fixture(CacheConfig::default());
        let page = QueryKey::Products { limit: 2, skip: 0 };
        let other_page = QueryKey::Products { limit: 2, skip: 2 };

        cache(&fixture, page, &[Tag::product(1), Tag::product(2), Tag::PRODUCT_LIST]);
        cache(&fixture, other_page, &[Tag::product(3), Tag::product(4), Tag::PRODUCT_LIST]);
        cache(&fixture, QueryKey::ProductById(1), &[Tag::product(1)]);
        cache(&fixture, QueryKey::AllProducts, &[Tag::PRODUCT_LIST]);
        cache(&fixture, QueryKey::Categories, &[]);

        let outcome = fixture.product_updated(1);

        assert_eq!(
            outcome.invalidated,
            BTreeSet::from([page, QueryKey::ProductById(1)])
        );
        assert!(outcome.refetch.is_empty());
        assert!(fixture.queue.is_empty());
    }

    #[test]
    fn list_sentinel_follows_config() {
        let fixture = fixture(CacheConfig {
            invalidate_lists_on_update: true,
            ..Default::default()
        });
        cache(&fixture, QueryKey::AllProducts, &[Tag::PRODUCT_LIST]);

        let outcome = fixture.product_updated(9);

        assert!(outcome.invalidated.contains(&QueryKey::AllProducts));
    }

    #[test]
    fn subscribed_entries_are_scheduled_for_refetch() {
        let fixture = fixture(CacheConfig::default());
        let key = QueryKey::ProductById(5);
        let _rx = fixture.store.subscribe(key);
        cache(&fixture, key, &[Tag::product(5)]);

        let outcome = fixture.product_updated(5);

        assert_eq!(outcome.refetch, vec![key]);
    }

    #[test]
    fn first_fetch_in_flight_is_stored_stale() {
        let fixture = fixture(CacheConfig::default());
        let detail = start(&fixture, QueryKey::ProductById(1));
        let page = start(&fixture, QueryKey::Products { limit: 2, skip: 0 });
        let unrelated = start(&fixture, QueryKey::ProductById(2));
        let categories = start(&fixture, QueryKey::Categories);

        let outcome = fixture.product_updated(1);

        assert_eq!(
            outcome.invalidated,
            BTreeSet::from([QueryKey::ProductById(1), QueryKey::Products { limit: 2, skip: 0 }])
        );
        let store = &fixture.store;
        assert_eq!(store.complete(detail, Ok(value())), Completion::StoredStale);
        assert_eq!(store.complete(page, Ok(value())), Completion::StoredStale);
        assert_eq!(store.complete(unrelated, Ok(value())), Completion::Stored);
        assert_eq!(store.complete(categories, Ok(value())), Completion::Stored);
    }

    #[test]
    fn refetch_in_flight_over_registered_entry_is_counted_once() {
        let fixture = fixture(CacheConfig::default());
        let key = QueryKey::ProductById(6);
        let _rx = fixture.store.subscribe(key);
        cache(&fixture, key, &[Tag::product(6)]);
        let _refetch = fixture.store.begin(key, true);

        let outcome = fixture.product_updated(6);

        assert_eq!(outcome.invalidated, BTreeSet::from([key]));
        assert_eq!(outcome.refetch, vec![key]);
    }

    #[test]
    fn pruned_keys_are_unregistered() {
        let fixture = fixture(CacheConfig::default());
        let key = QueryKey::ProductById(8);
        cache(&fixture, key, &[Tag::product(8)]);
        assert_eq!(fixture.store.prune(Duration::ZERO), vec![key]);

        let outcome = fixture.product_updated(8);

        assert!(outcome.invalidated.is_empty());
        assert!(fixture.registry.keys_for_tags(&[Tag::product(8)]).is_empty());
    }

    #[test]
    fn empty_queue_is_a_no_op() {
        let fixture = fixture(CacheConfig::default());
        assert_eq!(fixture.consumer.consume(), ConsumeOutcome::default());
    }
}
