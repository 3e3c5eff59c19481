pub mod graph;
pub mod payload;
pub mod tokens;

use async_trait::async_trait;
use thiserror::Error;
use tindabot_core::types::Card;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("No access token available for this page")]
    MissingToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderAction {
    TypingOn,
    TypingOff,
    MarkSeen,
}

impl SenderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderAction::TypingOn => "typing_on",
            SenderAction::TypingOff => "typing_off",
            SenderAction::MarkSeen => "mark_seen",
        }
    }
}

/// Outbound side of the messaging platform. Errors are non-fatal to the
/// pipeline; callers log and move on.
#[async_trait]
pub trait SendApi: Send + Sync {
    async fn send_text(
        &self,
        recipient_id: &str,
        text: &str,
        page_id: Option<&str>,
    ) -> Result<(), SendError>;

    async fn send_cards(
        &self,
        recipient_id: &str,
        cards: &[Card],
        page_id: Option<&str>,
    ) -> Result<(), SendError>;

    async fn sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
        page_id: Option<&str>,
    ) -> Result<(), SendError>;
}

/// Per-page access token lookup. The platform requires a page-scoped token on
/// every outbound call; resolution falls back to a global default.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn page_token(&self, page_id: Option<&str>) -> Option<String>;
}
