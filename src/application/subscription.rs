//! Observed queries.
//!
//! A [`Subscription`] keeps its query alive in the cache, gets refetched when
//! one of the query's tags is invalidated, and exposes the tri-state result
//! views render from.

use std::marker::PhantomData;
use std::sync::Arc;

use catalog_types::{Category, Product, ProductsResponse};
use tokio::sync::watch;

use super::catalog::{CatalogClient, QueryOutput};
use crate::api::FetchError;
use crate::cache::{EntryState, QueryKey, QueryStatus, QueryStore};

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    /// No data yet.
    Loading,
    Error(FetchError),
    Data(T),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub result: QueryResult<T>,
    /// A request is in flight, possibly a background refetch over `Data`.
    pub is_fetching: bool,
}

impl<T: QueryOutput> QueryState<T> {
    fn from_entry(entry: &EntryState) -> Self {
        let data = entry.data.as_deref().and_then(T::from_cached);
        let result = match (entry.status, &entry.error, data) {
            (QueryStatus::Error, Some(error), _) => QueryResult::Error(error.clone()),
            (_, _, Some(data)) => QueryResult::Data(data),
            _ => QueryResult::Loading,
        };
        Self {
            result,
            is_fetching: entry.is_fetching(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.result, QueryResult::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match &self.result {
            QueryResult::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.result {
            QueryResult::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// An active observer of one query. Dropping it releases the query; a request
/// already in flight still completes and populates the cache.
pub struct Subscription<T> {
    key: QueryKey,
    receiver: watch::Receiver<EntryState>,
    store: Arc<QueryStore>,
    _output: PhantomData<fn() -> T>,
}

impl<T: QueryOutput> Subscription<T> {
    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn state(&self) -> QueryState<T> {
        QueryState::from_entry(&self.receiver.borrow())
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&mut self) -> QueryState<T> {
        if self.receiver.changed().await.is_err() {
            // Entry dropped from the store; the last state is all there is.
            return self.state();
        }
        QueryState::from_entry(&self.receiver.borrow_and_update())
    }

    /// Waits until no request is in flight.
    pub async fn settled(&mut self) -> QueryState<T> {
        let settled = self
            .receiver
            .wait_for(|entry| !entry.is_fetching())
            .await
            .map(|entry| QueryState::from_entry(&entry));
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

impl CatalogClient {
    pub fn watch_products(&self, limit: u32, skip: u32) -> Subscription<ProductsResponse> {
        self.watch(QueryKey::Products { limit, skip })
    }

    pub fn watch_all_products(&self) -> Subscription<ProductsResponse> {
        self.watch(QueryKey::AllProducts)
    }

    pub fn watch_product(&self, id: u64) -> Subscription<Product> {
        self.watch(QueryKey::ProductById(id))
    }

    pub fn watch_categories(&self) -> Subscription<Vec<Category>> {
        self.watch(QueryKey::Categories)
    }

    fn watch<T: QueryOutput>(&self, key: QueryKey) -> Subscription<T> {
        Subscription {
            key,
            receiver: self.observe(key),
            store: self.store().clone(),
            _output: PhantomData,
        }
    }
}
