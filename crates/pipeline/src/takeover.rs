use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tindabot_core::audit::log_audit;
use tokio::sync::Mutex;
use tracing::info;

/// Tracks which conversations a human agent is currently handling. While a
/// sender's entry is active the pipeline must stay silent: no catalog lookup,
/// no AI call, no outbound send.
///
/// Entries expire by TTL without explicit deletion — absence and expiry both
/// mean "not active". Expired entries are dropped lazily on read.
pub struct TakeoverGate {
    ttl: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl TakeoverGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn is_active(&self, sender_id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(sender_id) {
            Some(expires_at) if *expires_at > Instant::now() => true,
            Some(_) => {
                entries.remove(sender_id);
                false
            }
            None => false,
        }
    }

    /// Mark the conversation as human-handled, extending the window if it is
    /// already active. Called on every echo event — an agent reply is
    /// conclusive evidence of manual handling — and by explicit pause actions.
    pub async fn start_or_refresh(&self, sender_id: &str) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .lock()
            .await
            .insert(sender_id.to_string(), expires_at);
        info!(sender = %sender_id, ttl_secs = self.ttl.as_secs(), "human takeover active");
        log_audit(
            "takeover_started",
            sender_id,
            json!({ "ttl_secs": self.ttl.as_secs() }),
        );
    }

    /// Hand the conversation back to the bot immediately, without waiting for
    /// the TTL to lapse.
    pub async fn resume(&self, sender_id: &str) {
        if self.entries.lock().await.remove(sender_id).is_some() {
            info!(sender = %sender_id, "takeover resumed to bot");
            log_audit("takeover_resumed", sender_id, json!({}));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inactive_by_default() {
        let gate = TakeoverGate::new(Duration::from_secs(60));
        assert!(!gate.is_active("cust-1").await);
    }

    #[tokio::test]
    async fn start_activates_until_resume() {
        let gate = TakeoverGate::new(Duration::from_secs(60));
        gate.start_or_refresh("cust-1").await;
        assert!(gate.is_active("cust-1").await);
        assert!(!gate.is_active("cust-2").await);

        gate.resume("cust-1").await;
        assert!(!gate.is_active("cust-1").await);
    }

    #[tokio::test]
    async fn expired_entry_reads_as_inactive() {
        let gate = TakeoverGate::new(Duration::ZERO);
        gate.start_or_refresh("cust-1").await;
        assert!(!gate.is_active("cust-1").await);
    }
}
