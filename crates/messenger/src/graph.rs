use crate::payload::{cards_payload, text_payload};
use crate::{SendApi, SendError, SenderAction, TokenResolver};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tindabot_core::types::Card;
use tracing::{info, warn};

/// Send API client against the platform's graph endpoint. One attempt per
/// call: failed sends are surfaced to the caller and never retried here —
/// the platform's own webhook retry is absorbed upstream by the idempotency
/// cache instead of producing a second response attempt.
#[derive(Clone)]
pub struct GraphSendClient {
    api_base: String,
    tokens: Arc<dyn TokenResolver>,
    client: Client,
}

impl GraphSendClient {
    pub fn new(api_base: Option<String>, tokens: Arc<dyn TokenResolver>) -> Self {
        Self {
            api_base: api_base
                .unwrap_or_else(|| "https://graph.facebook.com/v20.0".to_string()),
            tokens,
            client: Client::new(),
        }
    }

    async fn post_message(
        &self,
        body: Value,
        page_id: Option<&str>,
    ) -> Result<(), SendError> {
        let token = self
            .tokens
            .page_token(page_id)
            .await
            .ok_or(SendError::MissingToken)?;

        let url = format!("{}/me/messages", self.api_base.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, body = %body, "outbound send failed");
        Err(SendError::Api { status, body })
    }
}

#[async_trait]
impl SendApi for GraphSendClient {
    async fn send_text(
        &self,
        recipient_id: &str,
        text: &str,
        page_id: Option<&str>,
    ) -> Result<(), SendError> {
        let body = json!({
            "recipient": { "id": recipient_id },
            "messaging_type": "RESPONSE",
            "message": text_payload(text),
        });
        self.post_message(body, page_id).await?;
        info!(recipient = %recipient_id, "text message sent");
        Ok(())
    }

    async fn send_cards(
        &self,
        recipient_id: &str,
        cards: &[Card],
        page_id: Option<&str>,
    ) -> Result<(), SendError> {
        let body = json!({
            "recipient": { "id": recipient_id },
            "messaging_type": "RESPONSE",
            "message": cards_payload(cards),
        });
        self.post_message(body, page_id).await?;
        info!(recipient = %recipient_id, count = cards.len(), "card template sent");
        Ok(())
    }

    async fn sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
        page_id: Option<&str>,
    ) -> Result<(), SendError> {
        let body = json!({
            "recipient": { "id": recipient_id },
            "sender_action": action.as_str(),
        });
        self.post_message(body, page_id).await
    }
}
