use crate::{ClientError, LeadStore};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tindabot_core::types::Lead;
use tracing::info;

/// Lead/contact store client against the dashboard's internal API.
#[derive(Clone)]
pub struct HttpLeadStore {
    api_base: String,
    client: Client,
}

impl HttpLeadStore {
    pub fn new(api_base: String) -> Self {
        Self {
            api_base,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let res = self
            .client
            .post(self.url(path))
            .json(&body)
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
}

#[async_trait]
impl LeadStore for HttpLeadStore {
    async fn get_or_create(
        &self,
        sender_id: &str,
        page_id: Option<&str>,
    ) -> Result<Lead, ClientError> {
        let mut body = json!({ "sender_id": sender_id });
        if let Some(page) = page_id {
            body["page_id"] = json!(page);
        }

        let value = self.post_json("leads", body).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::ApiError(format!("Failed to parse lead: {}", e)))
    }

    async fn increment_message_count(&self, lead_id: &str) -> Result<u64, ClientError> {
        let value = self
            .post_json(&format!("leads/{}/messages", lead_id), json!({}))
            .await?;
        Ok(value.get("count").and_then(Value::as_u64).unwrap_or_default())
    }

    async fn advance_stage(
        &self,
        lead_id: &str,
        evidence_url: &str,
        reason: &str,
    ) -> Result<(), ClientError> {
        self.post_json(
            &format!("leads/{}/stage", lead_id),
            json!({
                "stage": "payment_submitted",
                "evidence_url": evidence_url,
                "reason": reason,
            }),
        )
        .await?;

        info!(lead_id = %lead_id, "lead advanced to payment_submitted");
        Ok(())
    }
}
