use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catalog::api::HttpBackend;
use catalog::application::CatalogClient;
use catalog::cache::CacheConfig;
use catalog_types::UpdateProductRequest;
use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start();
    let product = json!({"id": 1, "title": "Mascara", "price": 9.99, "category": "beauty"});
    server.mock(|when, then| {
        when.method("GET").path("/products/1");
        then.status(200).json_body(product.clone());
    });
    server.mock(|when, then| {
        when.method("GET").path("/products/2");
        then.status(404).body("{}");
    });
    server.mock(|when, then| {
        when.method("PATCH").path("/products/1");
        then.status(200).json_body(product.clone());
    });

    let base = url::Url::parse(&server.base_url())
        .and_then(|url| url.join("/"))
        .expect("base url");
    let backend = HttpBackend::with_timeout(base, Duration::from_secs(5), HttpBackend::user_agent())
        .expect("backend");
    let client = CatalogClient::new(Arc::new(backend), CacheConfig::default());

    client.get_product_by_id(1).await.expect("miss");
    client.get_product_by_id(1).await.expect("hit");
    client.get_product_by_id(2).await.expect_err("not found");
    client
        .update_product(
            1,
            &UpdateProductRequest {
                stock: Some(2),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        "catalog_cache_hit_total",
        "catalog_cache_miss_total",
        "catalog_cache_invalidated_total",
        "catalog_cache_consume_ms",
        "catalog_cache_entries",
        "catalog_fetch_error_total",
        "catalog_fetch_ms",
    ] {
        assert!(names.contains(expected), "missing metric {expected}: {names:?}");
    }
}
