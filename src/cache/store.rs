//! Query result storage.
//!
//! One entry per `QueryKey`, each driving the `Idle -> Fetching ->
//! {Success, Error}` state machine and broadcasting its state to
//! subscribers over a `tokio::sync::watch` channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use catalog_types::{Category, Product, ProductsResponse};
use metrics::gauge;
use tokio::sync::watch;

use crate::api::FetchError;

use super::keys::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_ENTRIES: &str = "catalog_cache_entries";

/// A decoded query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Products(ProductsResponse),
    Product(Product),
    Categories(Vec<Category>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Fetching,
    Success,
    Error,
}

/// Observable state of one cached query.
#[derive(Debug, Clone)]
pub struct EntryState {
    pub status: QueryStatus,
    /// Last successfully fetched value; kept while a refetch is in flight.
    pub data: Option<Arc<CachedValue>>,
    pub error: Option<FetchError>,
    /// Set when a tag this entry provides was invalidated after the data was
    /// fetched.
    pub stale: bool,
}

impl EntryState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            stale: false,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Fetching
    }
}

/// Permission to run one fetch for a key; handed back on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: QueryKey,
    seq: u64,
    generation: u64,
}

/// What a reader should do for a key.
#[derive(Debug)]
pub enum Lookup {
    /// Fresh data, serve it.
    Hit(Arc<CachedValue>),
    /// The entry is in the error state and stays there until refetched.
    Failed(FetchError),
    /// Another caller is already fetching; wait on the receiver.
    InFlight(watch::Receiver<EntryState>),
    /// The caller must fetch and report back with the ticket.
    Fetch(FetchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Stored and current.
    Stored,
    /// Stored, but the key was invalidated while the request was in flight.
    StoredStale,
    /// A newer fetch for the same key was started; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation {
    /// The entry has subscribers and data worth refreshing right away.
    pub refetch: bool,
}

struct QueryEntry {
    state: watch::Sender<EntryState>,
    subscribers: usize,
    /// Bumped by every invalidation.
    generation: u64,
    /// Sequence number of the most recently started fetch.
    fetch_seq: u64,
    /// `generation` at the time the most recent fetch started.
    fetch_generation: u64,
    last_used: Instant,
}

impl QueryEntry {
    fn new() -> Self {
        let (state, _) = watch::channel(EntryState::idle());
        Self {
            state,
            subscribers: 0,
            generation: 0,
            fetch_seq: 0,
            fetch_generation: 0,
            last_used: Instant::now(),
        }
    }

    fn start_fetch(&mut self, key: QueryKey) -> FetchTicket {
        self.fetch_seq += 1;
        self.fetch_generation = self.generation;
        self.state.send_modify(|state| {
            state.status = QueryStatus::Fetching;
            state.error = None;
        });
        FetchTicket {
            key,
            seq: self.fetch_seq,
            generation: self.generation,
        }
    }
}

/// Process-wide store of query entries.
#[derive(Default)]
pub struct QueryStore {
    entries: Mutex<HashMap<QueryKey, QueryEntry>>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides how a read of `key` proceeds, starting a fetch when needed.
    ///
    /// With `force` a new fetch is started whatever the entry holds. A fetch
    /// in flight since before the last invalidation is not joined; a new one
    /// supersedes it.
    pub fn begin(&self, key: QueryKey, force: bool) -> Lookup {
        let mut entries = mutex_lock(&self.entries, SOURCE, "begin");
        let entry = entries.entry(key).or_insert_with(QueryEntry::new);
        entry.last_used = Instant::now();

        if force {
            return Lookup::Fetch(entry.start_fetch(key));
        }

        let lookup = {
            let state = entry.state.borrow();
            match state.status {
                QueryStatus::Success if !state.stale => state.data.clone().map(Lookup::Hit),
                QueryStatus::Error => state.error.clone().map(Lookup::Failed),
                QueryStatus::Fetching if entry.fetch_generation == entry.generation => {
                    Some(Lookup::InFlight(entry.state.subscribe()))
                }
                QueryStatus::Success | QueryStatus::Fetching | QueryStatus::Idle => None,
            }
        };

        let lookup = lookup.unwrap_or_else(|| Lookup::Fetch(entry.start_fetch(key)));
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        lookup
    }

    /// Records the outcome of a fetch started with `ticket`.
    pub fn complete<V>(&self, ticket: FetchTicket, result: Result<V, FetchError>) -> Completion
    where
        V: Into<Arc<CachedValue>>,
    {
        self.complete_with(ticket, result, |_| {})
    }

    /// Like [`complete`](Self::complete), running `on_stored` with a value
    /// that is about to be stored while the store lock is still held.
    pub fn complete_with<V>(
        &self,
        ticket: FetchTicket,
        result: Result<V, FetchError>,
        on_stored: impl FnOnce(&CachedValue),
    ) -> Completion
    where
        V: Into<Arc<CachedValue>>,
    {
        let mut entries = mutex_lock(&self.entries, SOURCE, "complete");
        let Some(entry) = entries.get_mut(&ticket.key) else {
            return Completion::Superseded;
        };
        if entry.fetch_seq != ticket.seq {
            return Completion::Superseded;
        }

        entry.last_used = Instant::now();
        let stale = entry.generation != ticket.generation;
        let result: Result<Arc<CachedValue>, FetchError> = result.map(Into::into);
        if let Ok(value) = &result {
            on_stored(value.as_ref());
        }
        entry.state.send_modify(|state| match result {
            Ok(value) => {
                state.status = QueryStatus::Success;
                state.data = Some(value);
                state.error = None;
                state.stale = stale;
            }
            Err(error) => {
                state.status = QueryStatus::Error;
                state.error = Some(error);
            }
        });

        if stale {
            Completion::StoredStale
        } else {
            Completion::Stored
        }
    }

    /// Marks `key` stale after one of its tags was invalidated.
    ///
    /// Entries in the error state are left alone.
    pub fn invalidate(&self, key: &QueryKey) -> Option<Invalidation> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "invalidate");
        let entry = entries.get_mut(key)?;

        entry.generation += 1;
        let status = entry.state.borrow().status;
        if status == QueryStatus::Success {
            entry.state.send_modify(|state| state.stale = true);
        }

        let refreshable = matches!(status, QueryStatus::Success | QueryStatus::Fetching);
        Some(Invalidation {
            refetch: refreshable && entry.subscribers > 0,
        })
    }

    /// Bumps the generation of every in-flight entry `affected` selects, so
    /// that their results are stored stale.
    pub fn invalidate_in_flight(
        &self,
        affected: impl Fn(&QueryKey) -> bool,
    ) -> Vec<(QueryKey, Invalidation)> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "invalidate_in_flight");
        let mut invalidated = Vec::new();
        for (key, entry) in entries.iter_mut() {
            if !entry.state.borrow().is_fetching() || !affected(key) {
                continue;
            }
            entry.generation += 1;
            invalidated.push((
                *key,
                Invalidation {
                    refetch: entry.subscribers > 0,
                },
            ));
        }
        invalidated
    }

    /// Registers an observer of `key`, creating an idle entry if needed.
    pub fn subscribe(&self, key: QueryKey) -> watch::Receiver<EntryState> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "subscribe");
        let entry = entries.entry(key).or_insert_with(QueryEntry::new);
        entry.subscribers += 1;
        entry.last_used = Instant::now();
        entry.state.subscribe()
    }

    pub fn release(&self, key: &QueryKey) {
        let mut entries = mutex_lock(&self.entries, SOURCE, "release");
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }

    /// Drops entries nobody observes that have been unused for
    /// `keep_unused_for`, returning their keys. In-flight entries survive.
    pub fn prune(&self, keep_unused_for: Duration) -> Vec<QueryKey> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "prune");
        let expired: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| {
                entry.subscribers == 0
                    && !entry.state.borrow().is_fetching()
                    && entry.last_used.elapsed() >= keep_unused_for
            })
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        if !expired.is_empty() {
            gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        }
        expired
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        mutex_lock(&self.entries, SOURCE, "state")
            .get(key)
            .map(|entry| entry.state.borrow().clone())
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        mutex_lock(&self.entries, SOURCE, "subscriber_count")
            .get(key)
            .map_or(0, |entry| entry.subscribers)
    }
}
