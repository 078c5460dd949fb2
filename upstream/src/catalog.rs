use crate::config::SyncConfig;
use crate::errors::CatalogError;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    items: Vec<JsonValue>,
}

/// Fetches the website list published by a remote chat backend.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl CatalogClient {
    pub fn new(config: &SyncConfig) -> Self {
        CatalogClient {
            client: reqwest::Client::new(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// GET `<api_base_url>/api/websites` with the backend key as bearer token.
    /// Returns the raw `items` array.
    pub async fn fetch_websites(
        &self,
        api_base_url: &str,
        backend_api_key: &str,
    ) -> Result<Vec<JsonValue>, CatalogError> {
        let endpoint = format!("{}/api/websites", api_base_url.trim_end_matches('/'));
        let url = Url::parse(&endpoint).map_err(|e| CatalogError::InvalidUrl {
            url: api_base_url.to_string(),
            reason: e.to_string(),
        })?;

        let exchange = async {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(backend_api_key)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Status(status.as_u16()));
            }
            Ok::<_, CatalogError>(response.json::<CatalogResponse>().await?)
        };

        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), exchange)
            .await
            .map_err(|_| CatalogError::Timeout(self.timeout_secs))??;

        tracing::info!(url = %url, items = response.items.len(), "Fetched remote website catalog");
        Ok(response.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{TEST_BACKEND_KEY, start_test_server};

    fn client() -> CatalogClient {
        CatalogClient::new(&SyncConfig { timeout_secs: 5 })
    }

    #[tokio::test]
    async fn test_fetch_websites() {
        let base = start_test_server().await;

        let items = client()
            .fetch_websites(&format!("{base}/"), TEST_BACKEND_KEY)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "remote-1");

        let items = client().fetch_websites(&base, "empty").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_websites_errors() {
        let base = start_test_server().await;

        assert!(matches!(
            client().fetch_websites(&base, "wrong").await,
            Err(CatalogError::Status(401))
        ));
        assert!(matches!(
            client().fetch_websites("not a url", TEST_BACKEND_KEY).await,
            Err(CatalogError::InvalidUrl { .. })
        ));
    }
}
