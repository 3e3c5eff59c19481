use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use std::net::SocketAddr;
use std::sync::Arc;
use tindabot_core::metrics::{MetricsSnapshot, MetricsStore};
use tindabot_pipeline::classify::classify_messaging;
use tindabot_pipeline::Orchestrator;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<MetricsStore>,
    verify_token: String,
    app_secret: Option<String>,
}

pub struct Gateway {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<MetricsStore>,
    port: u16,
    verify_token: String,
    /// App secret for delivery signatures. If None, signature checks are
    /// skipped and the gateway binds to 127.0.0.1 only.
    app_secret: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

impl Gateway {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        metrics: Arc<MetricsStore>,
        port: u16,
        verify_token: String,
        app_secret: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            metrics,
            port,
            verify_token,
            app_secret,
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let state = AppState {
            orchestrator: self.orchestrator.clone(),
            metrics: self.metrics.clone(),
            verify_token: self.verify_token.clone(),
            app_secret: self.app_secret.clone(),
        };

        let app = Router::new()
            .route("/health", get(health_check))
            .route("/api/metrics", get(get_metrics))
            .route("/api/takeover/:sender_id/pause", post(takeover_pause))
            .route("/api/takeover/:sender_id/resume", post(takeover_resume))
            .route("/webhook", get(webhook_verify))
            .route("/webhook", post(webhook_receive))
            .with_state(state);

        // Security: without an app secret there is no way to authenticate
        // deliveries, so only accept local traffic.
        let addr = if self.app_secret.is_some() {
            SocketAddr::from(([0, 0, 0, 0], self.port))
        } else {
            warn!("No app secret configured, binding to 127.0.0.1 only");
            SocketAddr::from(([127, 0, 0, 1], self.port))
        };

        info!("Gateway listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: "0.1.0",
    })
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Dashboard action: silence the bot for this conversation now.
async fn takeover_pause(
    State(state): State<AppState>,
    Path(sender_id): Path<String>,
) -> Json<Value> {
    state.orchestrator.pause_takeover(&sender_id).await;
    Json(json!({ "status": "paused", "sender_id": sender_id }))
}

/// Dashboard action: hand the conversation back to the bot immediately.
async fn takeover_resume(
    State(state): State<AppState>,
    Path(sender_id): Path<String>,
) -> Json<Value> {
    state.orchestrator.resume_takeover(&sender_id).await;
    Json(json!({ "status": "resumed", "sender_id": sender_id }))
}

#[derive(Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// One-time channel-setup handshake: echo the challenge back when the shared
/// secret matches.
async fn webhook_verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, StatusCode> {
    let provided = query.verify_token.as_deref().unwrap_or_default();

    if query.mode.as_deref() != Some("subscribe") {
        warn!("webhook verification with invalid mode");
        return Err(StatusCode::BAD_REQUEST);
    }
    if state.verify_token.is_empty() || provided != state.verify_token {
        warn!("webhook verification with invalid token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(query.challenge.unwrap_or_default())
}

fn verify_delivery_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> bool {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    let expected_hex = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();
    expected_hex == sig_hex.to_ascii_lowercase()
}

/// Delivery intake. Classification and dedup run synchronously; everything
/// else is dispatched to detached tasks so the platform gets its
/// acknowledgment well inside the retry window. One malformed or failing
/// event never affects its siblings in the batch.
async fn webhook_receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    if let Some(secret) = state.app_secret.as_deref() {
        if !secret.is_empty() && !verify_delivery_signature(&headers, &body, secret) {
            warn!("delivery signature invalid");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable delivery");
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    if payload.get("object").and_then(Value::as_str) != Some("page") {
        return Ok(Json(json!({ "status": "ignored_non_page_object" })));
    }

    let mut accepted = 0usize;

    let entries = payload
        .get("entry")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for entry in entries {
        let page_id = entry.get("id").and_then(Value::as_str).unwrap_or_default();
        let messagings = entry
            .get("messaging")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for messaging in messagings {
            for event in classify_messaging(page_id, &messaging) {
                if state.orchestrator.clone().accept(event).await {
                    accepted += 1;
                }
            }
        }
    }

    Ok(Json(json!({ "status": "ok", "accepted": accepted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrip() {
        let secret = "app-secret";
        let body = br#"{"object":"page","entry":[]}"#;

        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac");
        mac.update(body);
        let hex = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-hub-signature-256",
            format!("sha256={}", hex).parse().expect("header"),
        );
        assert!(verify_delivery_signature(&headers, body, secret));
        assert!(!verify_delivery_signature(&headers, body, "wrong-secret"));
    }

    #[test]
    fn missing_or_malformed_signature_is_rejected() {
        let headers = HeaderMap::new();
        assert!(!verify_delivery_signature(&headers, b"{}", "secret"));

        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", "md5=abcdef".parse().expect("header"));
        assert!(!verify_delivery_signature(&headers, b"{}", "secret"));
    }
}
