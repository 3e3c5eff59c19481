use crate::{ProviderError, ResponseGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// HTTP client for the hosted response-generation service.
#[derive(Clone)]
pub struct HttpResponseGenerator {
    api_base: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpResponseGenerator {
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            api_base,
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for HttpResponseGenerator {
    async fn generate(
        &self,
        user_text: &str,
        sender_id: &str,
        image_context: Option<&str>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/generate", self.api_base.trim_end_matches('/'));

        let mut body = json!({
            "message": user_text,
            "sender_id": sender_id,
        });
        if let Some(context) = image_context {
            body["image_context"] = json!(context);
        }

        let mut req = self.client.post(&url).json(&body);
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

        let json: Value = res
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let reply = json
            .get("reply")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if reply.is_empty() {
            return Err(ProviderError::ApiError(
                "generator returned an empty reply".to_string(),
            ));
        }

        Ok(reply)
    }
}
