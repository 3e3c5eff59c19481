pub mod responder;
pub mod vision;

use async_trait::async_trait;
use thiserror::Error;
use tindabot_core::types::ReceiptAnalysis;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// The AI response generator. Opaque to the pipeline: takes the user's text
/// (or a synthetic placeholder for image-only turns) plus optional image
/// context and returns the reply text.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        user_text: &str,
        sender_id: &str,
        image_context: Option<&str>,
    ) -> Result<String, ProviderError>;
}

/// The receipt-image analysis service.
#[async_trait]
pub trait ReceiptAnalyzer: Send + Sync {
    async fn analyze(&self, image_url: &str) -> Result<ReceiptAnalysis, ProviderError>;
}
