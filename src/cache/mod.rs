//! Catalog query cache.
//!
//! Every cached query result is keyed by a [`QueryKey`] and registered with
//! the [`Tag`]s it provides. Writes publish invalidation events; the consumer
//! resolves the tags to keys and marks those entries stale:
//!
//! - **store**: entries and their `Idle -> Fetching -> {Success, Error}` state
//! - **registry**: tag ↔ query key mappings
//! - **events / planner / consumer / trigger**: the invalidation pipeline

mod config;
mod consumer;
mod events;
mod keys;
mod lock;
mod planner;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::{CacheConsumer, ConsumeOutcome};
pub use events::{Epoch, EventKind, EventQueue, InvalidationEvent};
pub use keys::{QueryKey, Tag, TagId, TagKind};
pub use planner::InvalidationPlan;
pub use registry::CacheRegistry;
pub use store::{
    CachedValue, Completion, EntryState, FetchTicket, Invalidation, Lookup, QueryStatus, QueryStore,
};
pub use trigger::CacheTrigger;
