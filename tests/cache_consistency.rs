//! Cache consistency of the catalog client against a mocked catalog service.
//!
//! Covers read-through caching, invalidation after a successful update and
//! the cache surviving a failed one.

use std::sync::Arc;
use std::time::Duration;

use catalog::api::{FetchError, HttpBackend};
use catalog::application::CatalogClient;
use catalog::cache::CacheConfig;
use catalog_types::UpdateProductRequest;
use httpmock::MockServer;
use serde_json::{Value, json};

fn client(server: &MockServer) -> CatalogClient {
    let base = url::Url::parse(&server.base_url())
        .and_then(|url| url.join("/"))
        .expect("base url");
    let backend = HttpBackend::with_timeout(base, Duration::from_secs(5), HttpBackend::user_agent())
        .expect("backend");
    CatalogClient::new(Arc::new(backend), CacheConfig::default())
}

fn product(id: u64, title: &str, price: f64) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "Long-lasting and smudge-proof",
        "price": price,
        "discountPercentage": 7.17,
        "rating": 4.94,
        "stock": 5,
        "brand": "Essence",
        "category": "beauty",
        "thumbnail": format!("https://cdn.dummyjson.com/products/{id}/thumbnail.png"),
        "images": [format!("https://cdn.dummyjson.com/products/{id}/1.png")]
    })
}

fn page(products: Vec<Value>, total: u64, skip: u64, limit: u64) -> Value {
    json!({"products": products, "total": total, "skip": skip, "limit": limit})
}

#[tokio::test]
async fn repeated_read_is_served_from_cache() -> Result<(), FetchError> {
    let server = MockServer::start();
    let detail = server.mock(|when, then| {
        when.method("GET").path("/products/5");
        then.status(200).json_body(product(5, "Red Lipstick", 12.99));
    });
    let client = client(&server);

    let first = client.get_product_by_id(5).await?;
    let second = client.get_product_by_id(5).await?;

    assert_eq!(first, second);
    assert_eq!(detail.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn update_is_reflected_by_next_read() -> Result<(), FetchError> {
    let server = MockServer::start();
    let mut before = server.mock(|when, then| {
        when.method("GET").path("/products/5");
        then.status(200).json_body(product(5, "Red Lipstick", 12.99));
    });
    let client = client(&server);
    let original = client.get_product_by_id(5).await?;

    let patch = UpdateProductRequest {
        price: Some(9.5),
        ..Default::default()
    };
    let write = server.mock(|when, then| {
        when.method("PATCH")
            .path("/products/5")
            .json_body(json!({"price": 9.5}));
        then.status(200).json_body(product(5, "Red Lipstick", 9.5));
    });
    before.delete();
    let after = server.mock(|when, then| {
        when.method("GET").path("/products/5");
        then.status(200).json_body(product(5, "Red Lipstick", 9.5));
    });

    client.update_product(5, &patch).await?;
    let current = client.get_product_by_id(5).await?;

    write.assert();
    after.assert();
    assert_eq!(current, patch.apply_to(&original));
    Ok(())
}

#[tokio::test]
async fn observed_page_is_refetched_before_update_returns() -> Result<(), FetchError> {
    let server = MockServer::start();
    let mut stale_page = server.mock(|when, then| {
        when.method("GET").path("/products").query_param("limit", "2");
        then.status(200).json_body(page(
            vec![product(4, "Nail Polish", 8.99), product(5, "Red Lipstick", 12.99)],
            194,
            0,
            2,
        ));
    });
    let client = client(&server);
    let mut subscription = client.watch_products(2, 0);
    subscription.settled().await;

    server.mock(|when, then| {
        when.method("PATCH").path("/products/5");
        then.status(200).json_body(product(5, "Crimson Lipstick", 12.99));
    });
    stale_page.delete();
    let fresh_page = server.mock(|when, then| {
        when.method("GET").path("/products").query_param("limit", "2");
        then.status(200).json_body(page(
            vec![product(4, "Nail Polish", 8.99), product(5, "Crimson Lipstick", 12.99)],
            194,
            0,
            2,
        ));
    });

    let patch = UpdateProductRequest {
        title: Some("Crimson Lipstick".into()),
        ..Default::default()
    };
    client.update_product(5, &patch).await?;

    fresh_page.assert();
    let state = subscription.state();
    assert!(!state.is_fetching);
    let titles: Vec<String> = state
        .data()
        .map(|page| page.products.iter().map(|p| p.title.clone()).collect())
        .unwrap_or_default();
    assert_eq!(titles, vec!["Nail Polish", "Crimson Lipstick"]);
    Ok(())
}

#[tokio::test]
async fn failed_update_leaves_cache_intact() -> Result<(), FetchError> {
    let server = MockServer::start();
    let detail = server.mock(|when, then| {
        when.method("GET").path("/products/5");
        then.status(200).json_body(product(5, "Red Lipstick", 12.99));
    });
    let write = server.mock(|when, then| {
        when.method("PATCH").path("/products/5");
        then.status(500).body("internal error");
    });
    let client = client(&server);
    let before = client.get_product_by_id(5).await?;

    let error = client
        .update_product(
            5,
            &UpdateProductRequest {
                stock: Some(0),
                ..Default::default()
            },
        )
        .await
        .expect_err("server failure");

    assert_eq!(error.status(), Some(500));
    write.assert();
    assert_eq!(client.get_product_by_id(5).await?, before);
    assert_eq!(detail.hits(), 1);
    Ok(())
}

#[tokio::test]
async fn update_leaves_unrelated_queries_cached() -> Result<(), FetchError> {
    let server = MockServer::start();
    let categories = server.mock(|when, then| {
        when.method("GET").path("/products/categories");
        then.status(200).json_body(json!(["beauty", "fragrances"]));
    });
    let all = server.mock(|when, then| {
        when.method("GET").path("/products").query_param("limit", "0");
        then.status(200)
            .json_body(page(vec![product(5, "Red Lipstick", 12.99)], 1, 0, 0));
    });
    let other = server.mock(|when, then| {
        when.method("GET").path("/products/6");
        then.status(200).json_body(product(6, "Eyeshadow Palette", 19.99));
    });
    server.mock(|when, then| {
        when.method("PATCH").path("/products/5");
        then.status(200).json_body(product(5, "Red Lipstick", 1.0));
    });
    let client = client(&server);

    client.list_categories().await?;
    client.list_all_products().await?;
    client.get_product_by_id(6).await?;
    client
        .update_product(
            5,
            &UpdateProductRequest {
                price: Some(1.0),
                ..Default::default()
            },
        )
        .await?;
    client.list_categories().await?;
    client.list_all_products().await?;
    client.get_product_by_id(6).await?;

    assert_eq!(categories.hits(), 1);
    assert_eq!(all.hits(), 1);
    assert_eq!(other.hits(), 1);
    Ok(())
}
