//! Invalidation plan generation.
//!
//! Merges a batch of events into the set of tags to invalidate.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::events::{EventKind, InvalidationEvent};
use super::keys::Tag;

#[derive(Debug, Default)]
pub struct InvalidationPlan {
    pub tags: HashSet<Tag>,
    /// Number of events merged into this plan.
    pub event_count: usize,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<String> = self.tags.iter().map(ToString::to_string).collect();
        tags.sort();
        write!(
            f,
            "InvalidationPlan {{ events: {}, tags: [{}] }}",
            self.event_count,
            tags.join(", ")
        )
    }
}

impl InvalidationPlan {
    /// Unions the tags a batch of events invalidates.
    ///
    /// A product update invalidates only that product's tag unless
    /// `invalidate_lists_on_update` is set, in which case the collection
    /// sentinel goes with it.
    pub fn from_events(events: Vec<InvalidationEvent>, invalidate_lists_on_update: bool) -> Self {
        let mut plan = Self::default();

        for event in events {
            debug!(
                event_id = %event.id,
                event_epoch = event.epoch,
                "Invalidation event planned"
            );
            plan.event_count += 1;

            match event.kind {
                EventKind::ProductUpdated { product_id } => {
                    plan.tags.insert(Tag::product(product_id));
                    if invalidate_lists_on_update {
                        plan.tags.insert(Tag::PRODUCT_LIST);
                    }
                }
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updated(product_id: u64, epoch: u64) -> InvalidationEvent {
        InvalidationEvent::new(EventKind::ProductUpdated { product_id }, epoch)
    }

    #[test]
    fn product_update_invalidates_only_its_tag_by_default() {
        let plan = InvalidationPlan::from_events(vec![updated(4, 0)], false);

        assert_eq!(plan.tags, HashSet::from([Tag::product(4)]));
        assert_eq!(plan.event_count, 1);
    }

    #[test]
    fn list_invalidation_is_opt_in() {
        let plan = InvalidationPlan::from_events(vec![updated(4, 0)], true);

        assert!(plan.tags.contains(&Tag::product(4)));
        assert!(plan.tags.contains(&Tag::PRODUCT_LIST));
    }

    #[test]
    fn repeated_updates_merge_into_one_tag() {
        let plan = InvalidationPlan::from_events(
            vec![updated(1, 3), updated(1, 4), updated(2, 7)],
            false,
        );

        assert_eq!(plan.event_count, 3);
        assert_eq!(plan.tags, HashSet::from([Tag::product(1), Tag::product(2)]));
    }

    #[test]
    fn display_lists_sorted_tags() {
        let plan = InvalidationPlan::from_events(vec![updated(2, 0)], true);
        assert_eq!(
            plan.to_string(),
            "InvalidationPlan { events: 1, tags: [Product:2, Product:LIST] }"
        );
    }

    #[test]
    fn empty_batch_yields_empty_plan() {
        let plan = InvalidationPlan::from_events(Vec::new(), true);
        assert!(plan.tags.is_empty());
        assert_eq!(plan.event_count, 0);
    }
}
