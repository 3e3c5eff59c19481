use serde_json::Value;
use tindabot_core::types::{EventKind, InboundEvent};

/// Classify one `messaging` entry from a platform delivery into events.
///
/// Precedence, first match wins — the real-world shapes overlap:
/// 1. a direct `referral` field;
/// 2. a `postback`, which is itself a referral when it carries one;
/// 3. an echoed agent message (`message.is_echo`);
/// 4. image attachments — one event per attachment, any accompanying text
///    travels with each of them and never becomes a separate text event;
/// 5. plain message text;
/// 6. anything else is Unknown and flows through as a no-op.
///
/// Malformed entries (no sender id) yield nothing; the rest of the batch is
/// unaffected.
pub fn classify_messaging(page_id: &str, raw: &Value) -> Vec<InboundEvent> {
    let sender_id = raw
        .pointer("/sender/id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let recipient_id = raw
        .pointer("/recipient/id")
        .and_then(Value::as_str)
        .unwrap_or(page_id);
    if sender_id.is_empty() {
        return Vec::new();
    }

    let message = raw.get("message");
    let event_id = message
        .and_then(|m| m.get("mid"))
        .and_then(Value::as_str);

    if let Some(ref_str) = raw.pointer("/referral/ref").and_then(Value::as_str) {
        let mut event = InboundEvent::new(EventKind::Referral, sender_id, recipient_id)
            .with_referral(ref_str);
        event.event_id = event_id.map(str::to_string);
        return vec![event];
    }

    if let Some(postback) = raw.get("postback") {
        // A postback from a referral-bearing entry point is still a referral.
        if let Some(ref_str) = postback.pointer("/referral/ref").and_then(Value::as_str) {
            return vec![
                InboundEvent::new(EventKind::Referral, sender_id, recipient_id)
                    .with_referral(ref_str),
            ];
        }
        let payload = postback
            .get("payload")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return vec![
            InboundEvent::new(EventKind::Postback, sender_id, recipient_id)
                .with_postback(payload),
        ];
    }

    let Some(message) = message else {
        return vec![InboundEvent::new(EventKind::Unknown, sender_id, recipient_id)];
    };

    if message
        .get("is_echo")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        // The page itself sent this, via a human agent. The counterparty —
        // the customer whose conversation was taken over — is the recipient.
        let mut event = InboundEvent::new(EventKind::Echo, recipient_id, page_id);
        event.event_id = event_id.map(str::to_string);
        return vec![event];
    }

    let text = message.get("text").and_then(Value::as_str);

    let image_urls: Vec<&str> = message
        .get("attachments")
        .and_then(Value::as_array)
        .map(|attachments| {
            attachments
                .iter()
                .filter(|a| a.get("type").and_then(Value::as_str) == Some("image"))
                .filter_map(|a| a.pointer("/payload/url").and_then(Value::as_str))
                .filter(|url| !url.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if !image_urls.is_empty() {
        return image_urls
            .iter()
            .enumerate()
            .map(|(idx, url)| {
                let mut event = InboundEvent::new(EventKind::Image, sender_id, recipient_id)
                    .with_attachment(url);
                // Each attachment carries its own dedup identity. The suffix
                // is deterministic, so a retried delivery still collapses.
                event.event_id = event_id.map(|id| format!("{}#{}", id, idx));
                if let Some(text) = text {
                    event.text = Some(text.to_string());
                }
                event
            })
            .collect();
    }

    if let Some(text) = text {
        let mut event =
            InboundEvent::new(EventKind::Text, sender_id, recipient_id).with_text(text);
        event.event_id = event_id.map(str::to_string);
        return vec![event];
    }

    vec![InboundEvent::new(EventKind::Unknown, sender_id, recipient_id)]
}
