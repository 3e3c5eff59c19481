pub mod catalog;
pub mod leads;

use async_trait::async_trait;
use thiserror::Error;
use tindabot_core::types::{Lead, PaymentMethod, Product, Property};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Read-only view of the back-office catalog: products, properties and
/// payment methods maintained through the dashboard.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active products in display order, at most `limit`.
    async fn products(&self, limit: usize) -> Result<Vec<Product>, ClientError>;

    /// Active properties, most recent first, at most `limit`.
    async fn properties(&self, limit: usize) -> Result<Vec<Property>, ClientError>;

    /// Active payment methods in display order, at most `limit`.
    async fn payment_methods(&self, limit: usize) -> Result<Vec<PaymentMethod>, ClientError>;

    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, ClientError>;

    async fn property_by_id(&self, id: &str) -> Result<Option<Property>, ClientError>;
}

/// The external lead/contact store. Message counters on its side are
/// idempotent and tolerate reordering, so calls here are fire-and-report.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get_or_create(
        &self,
        sender_id: &str,
        page_id: Option<&str>,
    ) -> Result<Lead, ClientError>;

    async fn increment_message_count(&self, lead_id: &str) -> Result<u64, ClientError>;

    /// Move the lead to the payment-submitted stage, attaching the receipt
    /// image URL as evidence.
    async fn advance_stage(
        &self,
        lead_id: &str,
        evidence_url: &str,
        reason: &str,
    ) -> Result<(), ClientError>;
}
