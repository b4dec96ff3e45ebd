//! Cache-coherent catalog client.
//!
//! Reads go through the query store: a fresh entry is served from memory, a
//! key that is already being fetched is joined, anything else is fetched and
//! registered with the tags it provides. A successful write publishes an
//! invalidation and refetches every affected query that is being observed.

use std::sync::Arc;

use catalog_types::{Category, Product, ProductsResponse, UpdateProductRequest};
use futures::future::join_all;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{CatalogBackend, FetchError, HttpBackend, endpoints};
use crate::cache::{
    CacheConfig, CacheConsumer, CacheRegistry, CacheTrigger, CachedValue, Completion, EntryState,
    EventQueue, FetchTicket, Lookup, QueryKey, QueryStatus, QueryStore,
};
use crate::config::Settings;

const METRIC_CACHE_HIT: &str = "catalog_cache_hit_total";
const METRIC_CACHE_MISS: &str = "catalog_cache_miss_total";

/// A typed view of a cached query result.
pub trait QueryOutput: Clone + Send + Sync + 'static {
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl QueryOutput for ProductsResponse {
    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Products(page) => Some(page.clone()),
            _ => None,
        }
    }
}

impl QueryOutput for Product {
    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Product(product) => Some(product.clone()),
            _ => None,
        }
    }
}

impl QueryOutput for Vec<Category> {
    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Categories(categories) => Some(categories.clone()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    backend: Arc<dyn CatalogBackend>,
    store: Arc<QueryStore>,
    registry: Arc<CacheRegistry>,
    trigger: Arc<CacheTrigger>,
    config: CacheConfig,
}

impl CatalogClient {
    pub fn new(backend: Arc<dyn CatalogBackend>, config: CacheConfig) -> Self {
        let store = Arc::new(QueryStore::new());
        let registry = Arc::new(CacheRegistry::new());
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(CacheConsumer::new(
            config.clone(),
            store.clone(),
            registry.clone(),
            queue.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(config.clone(), queue, consumer));

        Self {
            backend,
            store,
            registry,
            trigger,
            config,
        }
    }

    /// Builds a client talking HTTP to the configured catalog service.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let backend = HttpBackend::new(&settings.api)?;
        Ok(Self::new(
            Arc::new(backend),
            CacheConfig::from(&settings.cache),
        ))
    }

    /// One page of products. A `limit` of 0 asks the service for no limit:
    /// every product from `skip` on, with no check on the page length.
    pub async fn list_products(&self, limit: u32, skip: u32) -> Result<ProductsResponse, FetchError> {
        self.query(QueryKey::Products { limit, skip }).await
    }

    pub async fn list_all_products(&self) -> Result<ProductsResponse, FetchError> {
        self.query(QueryKey::AllProducts).await
    }

    pub async fn get_product_by_id(&self, id: u64) -> Result<Product, FetchError> {
        self.query(QueryKey::ProductById(id)).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        self.query(QueryKey::Categories).await
    }

    /// Sends `patch` for product `id`.
    ///
    /// On success every query providing `Product:<id>` is marked stale and the
    /// observed ones are refetched before this returns. A failed write leaves
    /// the cache untouched.
    #[instrument(skip_all, fields(product_id = id))]
    pub async fn update_product(
        &self,
        id: u64,
        patch: &UpdateProductRequest,
    ) -> Result<Product, FetchError> {
        let product = endpoints::update_product(self.backend.as_ref(), id, patch).await?;

        let outcome = self.trigger.product_updated(id);
        let refetched = join_all(outcome.refetch.iter().map(|key| self.load(*key, true))).await;
        for (key, result) in outcome.refetch.iter().zip(refetched) {
            if let Err(error) = result {
                warn!(query_key = %key, error = %error, "Refetch after update failed");
            }
        }

        info!(
            invalidated = outcome.invalidated.len(),
            refetched = outcome.refetch.len(),
            "Product updated"
        );
        Ok(product)
    }

    /// Fetches `key` again whatever its cached state, leaving the error state
    /// if the request succeeds.
    pub async fn refetch(&self, key: QueryKey) -> Result<Arc<CachedValue>, FetchError> {
        self.load(key, true).await
    }

    /// Current state of `key`, if it is cached.
    pub fn cached(&self, key: &QueryKey) -> Option<EntryState> {
        self.store.state(key)
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.config
    }

    async fn query<T: QueryOutput>(&self, key: QueryKey) -> Result<T, FetchError> {
        let value = self.load(key, false).await?;
        T::from_cached(&value)
            .ok_or_else(|| FetchError::decode(format!("cached value does not match query {key}")))
    }

    async fn load(&self, key: QueryKey, force: bool) -> Result<Arc<CachedValue>, FetchError> {
        if !self.config.enabled {
            counter!(METRIC_CACHE_MISS).increment(1);
            return endpoints::fetch(self.backend.as_ref(), &key).await.map(Arc::new);
        }

        self.prune();
        match self.store.begin(key, force) {
            Lookup::Hit(value) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(query_key = %key, "Cache hit");
                Ok(value)
            }
            Lookup::Failed(error) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(query_key = %key, error = %error, "Cached failure");
                Err(error)
            }
            Lookup::InFlight(receiver) => {
                debug!(query_key = %key, "Joining in-flight fetch");
                self.wait(key, receiver).await
            }
            Lookup::Fetch(ticket) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                debug!(query_key = %key, force, "Cache miss");
                self.join(self.spawn_fetch(ticket)).await
            }
        }
    }

    /// Runs the fetch for `ticket` on its own task so that it completes and
    /// populates the cache even if the caller goes away.
    fn spawn_fetch(&self, ticket: FetchTicket) -> JoinHandle<Result<Arc<CachedValue>, FetchError>> {
        let client = self.clone();
        tokio::spawn(async move {
            let key = ticket.key;
            let result = endpoints::fetch(client.backend.as_ref(), &key)
                .await
                .map(Arc::new);

            // Tags are registered before the result becomes visible, so an
            // invalidation either sees the entry in flight or registered.
            let registry = &client.registry;
            let completion = client.store.complete_with(ticket, result.clone(), |value| {
                registry.register(key, endpoints::provided_tags(&key, value));
            });
            match completion {
                Completion::StoredStale => {
                    debug!(query_key = %key, "Fetch result stored stale");
                }
                Completion::Superseded => {
                    debug!(query_key = %key, "Fetch superseded by a newer request");
                }
                Completion::Stored => {}
            }
            result
        })
    }

    async fn join(
        &self,
        handle: JoinHandle<Result<Arc<CachedValue>, FetchError>>,
    ) -> Result<Arc<CachedValue>, FetchError> {
        handle
            .await
            .map_err(|error| FetchError::network(format!("fetch task failed: {error}")))?
    }

    async fn wait(
        &self,
        key: QueryKey,
        mut receiver: watch::Receiver<EntryState>,
    ) -> Result<Arc<CachedValue>, FetchError> {
        let settled = receiver
            .wait_for(|state| !state.is_fetching())
            .await
            .map(|state| state.clone());

        match settled {
            Ok(EntryState {
                status: QueryStatus::Error,
                error: Some(error),
                ..
            }) => Err(error),
            Ok(EntryState {
                status: QueryStatus::Success,
                data: Some(value),
                ..
            }) => Ok(value),
            // The entry was dropped while we waited; go to the network.
            _ => {
                debug!(query_key = %key, "In-flight entry vanished, fetching directly");
                endpoints::fetch(self.backend.as_ref(), &key).await.map(Arc::new)
            }
        }
    }

    fn prune(&self) {
        for key in self.store.prune(self.config.keep_unused_for) {
            debug!(query_key = %key, "Pruned unused query");
            self.registry.unregister(&key);
        }
    }

    /// Registers an observer of `key` and starts a fetch when the entry is not
    /// fresh. Must be called from within a Tokio runtime.
    pub(super) fn observe(&self, key: QueryKey) -> watch::Receiver<EntryState> {
        self.prune();
        let receiver = self.store.subscribe(key);
        // Without a cache every subscription goes to the network.
        let force = !self.config.enabled;
        match self.store.begin(key, force) {
            Lookup::Fetch(ticket) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                drop(self.spawn_fetch(ticket));
            }
            Lookup::Hit(_) | Lookup::Failed(_) => {
                counter!(METRIC_CACHE_HIT).increment(1);
            }
            Lookup::InFlight(_) => {}
        }
        receiver
    }

    pub(super) fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }
}
