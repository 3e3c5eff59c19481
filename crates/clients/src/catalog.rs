use crate::{CatalogStore, ClientError};
use async_trait::async_trait;
use reqwest::Client;
use tindabot_core::types::{PaymentMethod, Product, Property};

/// Catalog client against the dashboard's internal API.
#[derive(Clone)]
pub struct HttpCatalogStore {
    api_base: String,
    client: Client,
}

impl HttpCatalogStore {
    pub fn new(api_base: String) -> Self {
        Self {
            api_base,
            client: Client::new(),
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        limit: usize,
    ) -> Result<Vec<T>, ClientError> {
        let url = format!("{}/{}", self.api_base.trim_end_matches('/'), path);
        let res = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("active", "true".to_string())])
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        if !res.status().is_success() {
            let error_text = res.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::ApiError(error_text));
        }

        res.json()
            .await
            .map_err(|e| ClientError::ApiError(format!("Failed to parse {}: {}", path, e)))
    }

    async fn get_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        id: &str,
    ) -> Result<Option<T>, ClientError> {
        let url = format!("{}/{}/{}", self.api_base.trim_end_matches('/'), path, id);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        if res.status().as_u16() == 404 {
            return Ok(None);
        }
        if !res.status().is_success() {
            let error_text = res.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::ApiError(error_text));
        }

        let item: T = res
            .json()
            .await
            .map_err(|e| ClientError::ApiError(format!("Failed to parse {}: {}", path, e)))?;
        Ok(Some(item))
    }
}

#[async_trait]
impl CatalogStore for HttpCatalogStore {
    async fn products(&self, limit: usize) -> Result<Vec<Product>, ClientError> {
        self.get_list("products", limit).await
    }

    async fn properties(&self, limit: usize) -> Result<Vec<Property>, ClientError> {
        self.get_list("properties", limit).await
    }

    async fn payment_methods(&self, limit: usize) -> Result<Vec<PaymentMethod>, ClientError> {
        self.get_list("payment-methods", limit).await
    }

    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, ClientError> {
        self.get_one("products", id).await
    }

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, ClientError> {
        self.get_one("properties", id).await
    }
}
