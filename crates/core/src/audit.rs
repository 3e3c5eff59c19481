use serde::Serialize;
use serde_json::Value;
use std::time::SystemTime;
use tracing::info;

#[derive(Serialize)]
pub struct AuditEvent {
    pub timestamp: u64,
    pub event_type: String,
    pub sender_id: String,
    pub details: Value,
}

/// Emit a pipeline decision to the `audit` tracing target as one JSON line.
/// The binary routes this target to a dedicated JSONL file.
pub fn log_audit(event_type: &str, sender_id: &str, details: Value) {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let event = AuditEvent {
        timestamp: now,
        event_type: event_type.to_string(),
        sender_id: sender_id.to_string(),
        details,
    };

    // Serialize to JSON string immediately to ensure the log payload is clean JSON
    if let Ok(json_str) = serde_json::to_string(&event) {
        info!(target: "audit", "{}", json_str);
    }
}
