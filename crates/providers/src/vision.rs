use crate::{ProviderError, ReceiptAnalyzer};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tindabot_core::types::ReceiptAnalysis;
use tracing::info;

/// HTTP client for the image-analysis service. The service reports whether an
/// image looks like a payment receipt and what it could extract from it; the
/// verification fields come back at their defaults and are filled in later by
/// the pipeline.
#[derive(Clone)]
pub struct HttpReceiptAnalyzer {
    api_base: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpReceiptAnalyzer {
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            api_base,
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ReceiptAnalyzer for HttpReceiptAnalyzer {
    async fn analyze(&self, image_url: &str) -> Result<ReceiptAnalysis, ProviderError> {
        let url = format!("{}/analyze", self.api_base.trim_end_matches('/'));

        let mut req = self.client.post(&url).json(&json!({ "image_url": image_url }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !res.status().is_success() {
            let error_text = res.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(error_text));
        }

        let analysis: ReceiptAnalysis = res
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse analysis: {}", e)))?;

        info!(
            is_receipt = analysis.is_receipt,
            confidence = analysis.confidence,
            "image analyzed"
        );
        Ok(analysis)
    }
}
