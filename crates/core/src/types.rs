use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of one platform delivery event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Referral,
    Postback,
    Echo,
    Text,
    Image,
    Unknown,
}

/// One messaging-platform delivery event, constructed once by the classifier
/// and then owned by its background task. The image branch fans out one event
/// per attachment, so `attachment_url` is a single URL rather than a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Platform-assigned delivery id. Absent on some delivery shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// The customer. For echoes this is the counterparty the human agent
    /// replied to, not the page itself.
    pub sender_id: String,
    /// The page/channel identity the event arrived on.
    pub recipient_id: String,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postback_payload: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    #[serde(default = "default_timestamp")]
    pub received_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl InboundEvent {
    pub fn new(kind: EventKind, sender_id: &str, recipient_id: &str) -> Self {
        Self {
            event_id: None,
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            kind,
            text: None,
            attachment_url: None,
            referral: None,
            postback_payload: None,
            is_echo: kind == EventKind::Echo,
            received_at: Utc::now(),
        }
    }

    /// Builder-style method to set the platform event id
    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_attachment(mut self, url: &str) -> Self {
        self.attachment_url = Some(url.to_string());
        self
    }

    pub fn with_referral(mut self, referral: &str) -> Self {
        self.referral = Some(referral.to_string());
        self
    }

    pub fn with_postback(mut self, payload: &str) -> Self {
        self.postback_payload = Some(payload.to_string());
        self
    }
}

/// A payment destination the page accepts. Read-only configuration as far as
/// the pipeline is concerned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    /// Display name on the account. May carry platform masking (`JO*N AN***O`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Free-format account/mobile number, punctuation included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Mismatch,
    Unknown,
    #[default]
    NotApplicable,
}

/// Output of the image-analysis collaborator. `verification_status` and
/// `verification_details` are filled in by the receipt verifier afterwards,
/// not by the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReceiptAnalysis {
    #[serde(default)]
    pub is_receipt: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub extracted_amount: Option<String>,
    #[serde(default)]
    pub extracted_date: Option<String>,
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub receiver_number: Option<String>,
    #[serde(default)]
    pub payment_platform: Option<String>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub verification_details: Option<String>,
}

/// Generic rich-card shape rendered by the catalog responder and serialized
/// into the platform template payload by the messenger crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub buttons: Vec<CardButton>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CardButton {
    WebUrl { title: String, url: String },
    Postback { title: String, payload: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

/// A contact in the external lead store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    #[serde(default)]
    pub stage: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_echo_flag_from_kind() {
        let event = InboundEvent::new(EventKind::Echo, "cust-1", "page-1");
        assert!(event.is_echo);
        let event = InboundEvent::new(EventKind::Text, "cust-1", "page-1").with_text("hi");
        assert!(!event.is_echo);
        assert_eq!(event.text.as_deref(), Some("hi"));
    }

    #[test]
    fn verification_status_defaults_to_not_applicable() {
        let analysis: ReceiptAnalysis = serde_json::from_str("{}").expect("parse");
        assert_eq!(analysis.verification_status, VerificationStatus::NotApplicable);
        assert!(!analysis.is_receipt);
    }
}
