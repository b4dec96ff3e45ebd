use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::FetchError;
use crate::config::ApiSettings;

/// Transport to the catalog service. Paths are relative to the base URL.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError>;

    async fn patch(&self, path: &str, body: Value) -> Result<Value, FetchError>;
}

/// reqwest-backed transport.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(settings: &ApiSettings) -> Result<Self, reqwest::Error> {
        Self::with_timeout(settings.base_url.clone(), settings.timeout, &settings.user_agent)
    }

    pub fn with_timeout(base: Url, timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("catalog/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FetchError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| FetchError::network(format!("invalid request path {path}: {e}")))?;
        if !query.is_empty() {
            url.set_query(None);
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, FetchError> {
        debug!(%method, %url, "Sending catalog request");
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|error| {
            warn!(%method, %url, error = %error, "Catalog request failed without a response");
            FetchError::from(error)
        })?;
        Self::handle(response).await
    }

    async fn handle(response: Response) -> Result<Value, FetchError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                body: (!text.is_empty()).then_some(text),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CatalogBackend for HttpBackend {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let url = self.url(path, query)?;
        self.send(Method::GET, url, None).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, FetchError> {
        let url = self.url(path, &[])?;
        self.send(Method::PATCH, url, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn backend(server: &MockServer) -> HttpBackend {
        let base = Url::parse(&server.base_url())
            .and_then(|url| url.join("/"))
            .expect("base url");
        HttpBackend::with_timeout(base, Duration::from_secs(5), HttpBackend::user_agent())
            .expect("backend")
    }

    #[tokio::test]
    async fn get_sends_query_pairs() -> Result<(), FetchError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/products")
                .query_param("limit", "10")
                .query_param("skip", "20");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"ok":true}"#);
        });

        let value = backend(&server)
            .get("products", &[("limit", "10".into()), ("skip", "20".into())])
            .await?;
        mock.assert();
        assert_eq!(value, serde_json::json!({"ok": true}));
        Ok(())
    }

    #[tokio::test]
    async fn patch_sends_json_body() -> Result<(), FetchError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("PATCH")
                .path("/products/3")
                .json_body(serde_json::json!({"price": 1.5}));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"id":3}"#);
        });

        backend(&server)
            .patch("products/3", serde_json::json!({"price": 1.5}))
            .await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/products/9999");
            then.status(404)
                .header("content-type", "application/json")
                .body(r#"{"message":"Product with id '9999' not found"}"#);
        });

        let error = backend(&server)
            .get("products/9999", &[])
            .await
            .expect_err("404 should fail");
        match error {
            FetchError::HttpStatus { status, body } => {
                assert_eq!(status, 404);
                assert!(body.is_some_and(|b| b.contains("not found")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/products/categories");
            then.status(200).body("<html>maintenance</html>");
        });

        let error = backend(&server)
            .get("products/categories", &[])
            .await
            .expect_err("html should fail");
        assert!(matches!(error, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_failure() {
        let base = Url::parse("http://127.0.0.1:9/").expect("url");
        let backend = HttpBackend::with_timeout(base, Duration::from_secs(2), "test")
            .expect("backend");

        let error = backend.get("products", &[]).await.expect_err("refused");
        assert!(matches!(error, FetchError::Network { .. }));
    }
}
