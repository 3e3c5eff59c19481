use crate::catalog::{
    product_card, CatalogResponder, INQUIRE_PROPERTY_PREFIX, MAX_CARDS, PAYMENT_METHODS_PAYLOAD,
};
use crate::dedupe::IdempotencyCache;
use crate::dispatch::spawn_logged;
use crate::intent::{self, Intent};
use crate::receipt;
use crate::referral::{self, GENERIC_GREETING};
use crate::takeover::TakeoverGate;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tindabot_clients::{CatalogStore, LeadStore};
use tindabot_core::audit::log_audit;
use tindabot_core::metrics::MetricsStore;
use tindabot_core::types::{EventKind, InboundEvent, Lead, VerificationStatus};
use tindabot_messenger::{SendApi, SenderAction};
use tindabot_providers::{ReceiptAnalyzer, ResponseGenerator};
use tracing::{debug, info, warn};

/// Placeholder user text for image-only turns; the generator tolerates it.
const IMAGE_PLACEHOLDER: &str = "[customer sent a photo]";

const PROPERTY_INQUIRY_ACK: &str =
    "Thanks for your interest! One of our agents will reach out shortly with more details.";

/// Composes the pipeline end to end: dedup, kind branches, the takeover gate,
/// intent routing, receipt verification and outbound sends. One instance is
/// shared by every delivery; all mutable state lives in the synchronized
/// caches it owns.
pub struct Orchestrator {
    dedupe: IdempotencyCache,
    takeover: TakeoverGate,
    metrics: Arc<MetricsStore>,
    responder: CatalogResponder,
    send: Arc<dyn SendApi>,
    generator: Arc<dyn ResponseGenerator>,
    analyzer: Arc<dyn ReceiptAnalyzer>,
    catalog: Arc<dyn CatalogStore>,
    leads: Arc<dyn LeadStore>,
}

impl Orchestrator {
    pub fn new(
        metrics: Arc<MetricsStore>,
        send: Arc<dyn SendApi>,
        generator: Arc<dyn ResponseGenerator>,
        analyzer: Arc<dyn ReceiptAnalyzer>,
        catalog: Arc<dyn CatalogStore>,
        leads: Arc<dyn LeadStore>,
        dedupe_max_tracked: usize,
        takeover_ttl: Duration,
    ) -> Self {
        Self {
            dedupe: IdempotencyCache::new(dedupe_max_tracked),
            takeover: TakeoverGate::new(takeover_ttl),
            metrics,
            responder: CatalogResponder::new(catalog.clone(), send.clone()),
            send,
            generator,
            analyzer,
            catalog,
            leads,
        }
    }

    /// Synchronous intake: count, deduplicate, then fire the rest of the
    /// processing as a detached task so the webhook handler can acknowledge
    /// the delivery right away. Returns whether the event was accepted.
    pub async fn accept(self: Arc<Self>, event: InboundEvent) -> bool {
        self.metrics.inc_events_received();

        if let Some(id) = event.event_id.as_deref() {
            if self.dedupe.seen(id).await {
                self.metrics.inc_duplicates_skipped();
                debug!(event_id = %id, "duplicate delivery absorbed");
                return false;
            }
        }

        let metrics = self.metrics.clone();
        spawn_logged("process_event", metrics, async move {
            self.process(event).await
        });
        true
    }

    /// Full per-event flow. Errors terminate this event only; sibling events
    /// in the same delivery run in their own tasks and are unaffected.
    pub async fn process(&self, event: InboundEvent) -> anyhow::Result<()> {
        debug!(kind = ?event.kind, sender = %event.sender_id, "processing event");
        match event.kind {
            EventKind::Echo => self.handle_echo(&event).await,
            EventKind::Referral => self.handle_referral(&event).await,
            EventKind::Postback => self.handle_postback(&event).await,
            EventKind::Text => self.handle_text(&event).await,
            EventKind::Image => self.handle_image(&event).await,
            EventKind::Unknown => {
                debug!(sender = %event.sender_id, "unknown event shape, ignoring");
                Ok(())
            }
        }
    }

    /// Pause hook for the dashboard's explicit takeover action; uses the same
    /// gate an echo event refreshes.
    pub async fn pause_takeover(&self, sender_id: &str) {
        self.takeover.start_or_refresh(sender_id).await;
    }

    /// Resume hook for the dashboard's explicit "hand back to bot" action.
    pub async fn resume_takeover(&self, sender_id: &str) {
        self.takeover.resume(sender_id).await;
    }

    /// An echoed agent message proves a human is handling the conversation.
    /// Refresh the gate and stop; echoes never produce a response.
    async fn handle_echo(&self, event: &InboundEvent) -> anyhow::Result<()> {
        self.takeover.start_or_refresh(&event.sender_id).await;
        Ok(())
    }

    async fn handle_referral(&self, event: &InboundEvent) -> anyhow::Result<()> {
        let Some(raw) = event.referral.as_deref() else {
            return Ok(());
        };
        let page = Some(event.recipient_id.as_str());
        let ctx = referral::parse(raw);

        if let Some(product_id) = &ctx.product_id {
            match self.catalog.product_by_id(product_id).await {
                Ok(Some(product)) => {
                    let welcome =
                        referral::welcome_message(&product.name, ctx.variation.as_deref());
                    self.send
                        .send_text(&event.sender_id, &welcome, page)
                        .await?;
                    self.send
                        .send_cards(&event.sender_id, &[product_card(&product)], page)
                        .await?;
                    self.metrics.inc_responses_sent();
                    info!(sender = %event.sender_id, product = %product.id, "referral resolved");
                    return Ok(());
                }
                Ok(None) => {
                    debug!(product_id = %product_id, "referral product not found");
                }
                Err(e) => {
                    warn!(error = %e, "catalog lookup failed for referral, greeting generically");
                }
            }
        }

        self.send
            .send_text(&event.sender_id, GENERIC_GREETING, page)
            .await?;
        self.metrics.inc_responses_sent();
        Ok(())
    }

    /// Recognized button payloads get canned acknowledgments; the AI is never
    /// involved in a postback turn.
    async fn handle_postback(&self, event: &InboundEvent) -> anyhow::Result<()> {
        let Some(payload) = event.postback_payload.as_deref() else {
            return Ok(());
        };
        let page = Some(event.recipient_id.as_str());

        if let Some(property_id) = payload.strip_prefix(INQUIRE_PROPERTY_PREFIX) {
            let ack = match self.catalog.property_by_id(property_id).await {
                Ok(Some(property)) => format!(
                    "Thanks for your interest in {}! One of our agents will reach out shortly with more details.",
                    property.title
                ),
                _ => PROPERTY_INQUIRY_ACK.to_string(),
            };
            self.send.send_text(&event.sender_id, &ack, page).await?;
            self.metrics.inc_responses_sent();
            log_audit(
                "property_inquiry",
                &event.sender_id,
                json!({ "property_id": property_id }),
            );
            return Ok(());
        }

        if payload == PAYMENT_METHODS_PAYLOAD {
            if self
                .responder
                .respond(Intent::Payment, &event.sender_id, page)
                .await?
            {
                self.metrics.inc_responses_sent();
            }
            return Ok(());
        }

        debug!(payload = %payload, "unrecognized postback payload, ignoring");
        Ok(())
    }

    async fn handle_text(&self, event: &InboundEvent) -> anyhow::Result<()> {
        if self.suppressed_by_takeover(event).await {
            return Ok(());
        }
        self.track_lead(event).await;

        let page = Some(event.recipient_id.as_str());
        let text = event.text.as_deref().unwrap_or_default();

        let intent = intent::classify(text);
        if intent != Intent::None
            && self
                .responder
                .respond(intent, &event.sender_id, page)
                .await?
        {
            self.metrics.inc_responses_sent();
            return Ok(());
        }

        let reply = self.generate_reply(event, text, None).await?;
        self.send.send_text(&event.sender_id, &reply, page).await?;
        self.metrics.inc_responses_sent();
        Ok(())
    }

    async fn handle_image(&self, event: &InboundEvent) -> anyhow::Result<()> {
        if self.suppressed_by_takeover(event).await {
            return Ok(());
        }
        let lead = self.track_lead(event).await;

        let Some(image_url) = event.attachment_url.as_deref() else {
            return Ok(());
        };
        let page = Some(event.recipient_id.as_str());

        let mut analysis = self.analyzer.analyze(image_url).await?;

        if analysis.is_receipt && analysis.confidence >= receipt::MIN_RECEIPT_CONFIDENCE {
            let methods = self.catalog.payment_methods(MAX_CARDS).await?;
            receipt::verify(&mut analysis, &methods);
            log_audit(
                "receipt_verified",
                &event.sender_id,
                json!({
                    "status": analysis.verification_status,
                    "confidence": analysis.confidence,
                }),
            );
        } else {
            analysis.verification_status = VerificationStatus::NotApplicable;
        }

        // Stage transition fires on the confidence threshold alone: an
        // unmatched receipt still needs a human to look at it rather than
        // being dropped.
        if receipt::is_confirmed(&analysis) {
            if let Some(lead) = &lead {
                let reason = analysis
                    .verification_details
                    .clone()
                    .unwrap_or_else(|| "receipt submitted".to_string());
                match self.leads.advance_stage(&lead.id, image_url, &reason).await {
                    Ok(()) => log_audit(
                        "stage_advanced",
                        &event.sender_id,
                        json!({ "lead_id": lead.id, "evidence_url": image_url }),
                    ),
                    Err(e) => warn!(error = %e, lead_id = %lead.id, "stage transition failed"),
                }
            }
        }

        let context = receipt::image_context(&analysis);
        let text = event.text.as_deref().unwrap_or(IMAGE_PLACEHOLDER);
        let reply = self.generate_reply(event, text, Some(&context)).await?;
        self.send.send_text(&event.sender_id, &reply, page).await?;
        self.metrics.inc_responses_sent();
        Ok(())
    }

    async fn suppressed_by_takeover(&self, event: &InboundEvent) -> bool {
        if self.takeover.is_active(&event.sender_id).await {
            self.metrics.inc_takeover_suppressed();
            info!(sender = %event.sender_id, "takeover active, staying silent");
            return true;
        }
        false
    }

    /// Lead bookkeeping is best-effort: counters on the store side are
    /// idempotent and a failure here must not cost the customer their reply.
    async fn track_lead(&self, event: &InboundEvent) -> Option<Lead> {
        let page = Some(event.recipient_id.as_str());
        match self.leads.get_or_create(&event.sender_id, page).await {
            Ok(lead) => {
                if let Err(e) = self.leads.increment_message_count(&lead.id).await {
                    warn!(error = %e, lead_id = %lead.id, "message count increment failed");
                }
                Some(lead)
            }
            Err(e) => {
                warn!(error = %e, sender = %event.sender_id, "lead lookup failed");
                None
            }
        }
    }

    /// Typing indicators bracket the generation window. Both signals are
    /// fire-and-forget, and the off signal goes out even when generation
    /// fails, before the error propagates.
    async fn generate_reply(
        &self,
        event: &InboundEvent,
        text: &str,
        image_context: Option<&str>,
    ) -> anyhow::Result<String> {
        let page = Some(event.recipient_id.as_str());
        let _ = self
            .send
            .sender_action(&event.sender_id, SenderAction::TypingOn, page)
            .await;
        let result = self
            .generator
            .generate(text, &event.sender_id, image_context)
            .await;
        let _ = self
            .send
            .sender_action(&event.sender_id, SenderAction::TypingOff, page)
            .await;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tindabot_clients::ClientError;
    use tindabot_core::types::{Card, PaymentMethod, Product, Property, ReceiptAnalysis};
    use tindabot_messenger::SendError;
    use tindabot_providers::ProviderError;

    #[derive(Default)]
    struct RecordingSend {
        texts: Mutex<Vec<String>>,
        cards: Mutex<Vec<Vec<Card>>>,
        actions: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl SendApi for RecordingSend {
        async fn send_text(
            &self,
            _recipient_id: &str,
            text: &str,
            _page_id: Option<&str>,
        ) -> Result<(), SendError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_cards(
            &self,
            _recipient_id: &str,
            cards: &[Card],
            _page_id: Option<&str>,
        ) -> Result<(), SendError> {
            self.cards.lock().unwrap().push(cards.to_vec());
            Ok(())
        }

        async fn sender_action(
            &self,
            _recipient_id: &str,
            action: SenderAction,
            _page_id: Option<&str>,
        ) -> Result<(), SendError> {
            self.actions.lock().unwrap().push(action.as_str());
            Ok(())
        }
    }

    struct StubGenerator {
        calls: Mutex<usize>,
        fail: bool,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ResponseGenerator for StubGenerator {
        async fn generate(
            &self,
            _user_text: &str,
            _sender_id: &str,
            _image_context: Option<&str>,
        ) -> Result<String, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(ProviderError::ApiError("generator down".to_string()));
            }
            Ok("generated reply".to_string())
        }
    }

    struct StubAnalyzer {
        analysis: ReceiptAnalysis,
    }

    #[async_trait]
    impl ReceiptAnalyzer for StubAnalyzer {
        async fn analyze(&self, _image_url: &str) -> Result<ReceiptAnalysis, ProviderError> {
            Ok(self.analysis.clone())
        }
    }

    #[derive(Default)]
    struct StubCatalog {
        products: Vec<Product>,
        properties: Vec<Property>,
        methods: Vec<PaymentMethod>,
    }

    #[async_trait]
    impl CatalogStore for StubCatalog {
        async fn products(&self, limit: usize) -> Result<Vec<Product>, ClientError> {
            Ok(self.products.iter().take(limit).cloned().collect())
        }

        async fn properties(&self, limit: usize) -> Result<Vec<Property>, ClientError> {
            Ok(self.properties.iter().take(limit).cloned().collect())
        }

        async fn payment_methods(&self, limit: usize) -> Result<Vec<PaymentMethod>, ClientError> {
            Ok(self.methods.iter().take(limit).cloned().collect())
        }

        async fn product_by_id(&self, id: &str) -> Result<Option<Product>, ClientError> {
            Ok(self.products.iter().find(|p| p.id == id).cloned())
        }

        async fn property_by_id(&self, id: &str) -> Result<Option<Property>, ClientError> {
            Ok(self.properties.iter().find(|p| p.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct StubLeads {
        advanced: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LeadStore for StubLeads {
        async fn get_or_create(
            &self,
            sender_id: &str,
            _page_id: Option<&str>,
        ) -> Result<Lead, ClientError> {
            Ok(Lead {
                id: format!("lead-{}", sender_id),
                stage: None,
            })
        }

        async fn increment_message_count(&self, _lead_id: &str) -> Result<u64, ClientError> {
            Ok(1)
        }

        async fn advance_stage(
            &self,
            lead_id: &str,
            _evidence_url: &str,
            _reason: &str,
        ) -> Result<(), ClientError> {
            self.advanced.lock().unwrap().push(lead_id.to_string());
            Ok(())
        }
    }

    struct Fixture {
        orchestrator: Arc<Orchestrator>,
        send: Arc<RecordingSend>,
        generator: Arc<StubGenerator>,
        leads: Arc<StubLeads>,
    }

    fn fixture(catalog: StubCatalog, generator: StubGenerator, analysis: ReceiptAnalysis) -> Fixture {
        let send = Arc::new(RecordingSend::default());
        let generator = Arc::new(generator);
        let leads = Arc::new(StubLeads::default());
        let orchestrator = Arc::new(Orchestrator::new(
            MetricsStore::new(),
            send.clone(),
            generator.clone(),
            Arc::new(StubAnalyzer { analysis }),
            Arc::new(catalog),
            leads.clone(),
            1000,
            Duration::from_secs(480),
        ));
        Fixture {
            orchestrator,
            send,
            generator,
            leads,
        }
    }

    fn product() -> Product {
        Product {
            id: "42".to_string(),
            name: "Classic Tee".to_string(),
            description: Some("Soft cotton shirt".to_string()),
            price: Some(499.0),
            image_url: None,
            page_url: None,
        }
    }

    fn gcash() -> PaymentMethod {
        PaymentMethod {
            id: "pm-1".to_string(),
            name: "GCash".to_string(),
            account_name: Some("Maria Cruz".to_string()),
            account_number: Some("09171234567".to_string()),
            qr_code_url: None,
            page_url: None,
            active: true,
        }
    }

    fn text_event(text: &str) -> InboundEvent {
        InboundEvent::new(EventKind::Text, "cust-1", "page-1").with_text(text)
    }

    #[tokio::test]
    async fn duplicate_event_ids_are_accepted_once() {
        let f = fixture(StubCatalog::default(), StubGenerator::new(), ReceiptAnalysis::default());
        let event = text_event("hello").with_event_id("m.dup");
        assert!(f.orchestrator.clone().accept(event.clone()).await);
        assert!(!f.orchestrator.clone().accept(event).await);
    }

    #[tokio::test]
    async fn takeover_suppresses_text_turns_entirely() {
        let f = fixture(
            StubCatalog {
                products: vec![product()],
                ..Default::default()
            },
            StubGenerator::new(),
            ReceiptAnalysis::default(),
        );

        // The echo refreshes the gate; the follow-up text must stay silent.
        let echo = InboundEvent::new(EventKind::Echo, "cust-1", "page-1");
        f.orchestrator.process(echo).await.unwrap();
        f.orchestrator
            .process(text_event("ano tinda niyo"))
            .await
            .unwrap();

        assert_eq!(*f.generator.calls.lock().unwrap(), 0);
        assert!(f.send.texts.lock().unwrap().is_empty());
        assert!(f.send.cards.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resume_hands_the_conversation_back() {
        let f = fixture(StubCatalog::default(), StubGenerator::new(), ReceiptAnalysis::default());
        let echo = InboundEvent::new(EventKind::Echo, "cust-1", "page-1");
        f.orchestrator.process(echo).await.unwrap();
        f.orchestrator.resume_takeover("cust-1").await;

        f.orchestrator.process(text_event("hello")).await.unwrap();
        assert_eq!(*f.generator.calls.lock().unwrap(), 1);
        assert_eq!(f.send.texts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn product_intent_sends_cards_and_skips_the_ai() {
        let f = fixture(
            StubCatalog {
                products: vec![product()],
                ..Default::default()
            },
            StubGenerator::new(),
            ReceiptAnalysis::default(),
        );
        f.orchestrator
            .process(text_event("ano tinda niyo"))
            .await
            .unwrap();

        assert_eq!(f.send.cards.lock().unwrap().len(), 1);
        assert_eq!(*f.generator.calls.lock().unwrap(), 0);
        assert!(f.send.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_falls_through_to_the_ai() {
        let f = fixture(StubCatalog::default(), StubGenerator::new(), ReceiptAnalysis::default());
        f.orchestrator
            .process(text_event("ano tinda niyo"))
            .await
            .unwrap();

        assert!(f.send.cards.lock().unwrap().is_empty());
        assert_eq!(*f.generator.calls.lock().unwrap(), 1);
        assert_eq!(
            f.send.texts.lock().unwrap().as_slice(),
            ["generated reply"]
        );
    }

    #[tokio::test]
    async fn payment_cards_append_the_receipt_reminder() {
        let f = fixture(
            StubCatalog {
                methods: vec![gcash()],
                ..Default::default()
            },
            StubGenerator::new(),
            ReceiptAnalysis::default(),
        );
        f.orchestrator
            .process(text_event("paano magbayad"))
            .await
            .unwrap();

        assert_eq!(f.send.cards.lock().unwrap().len(), 1);
        let texts = f.send.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("screenshot"));
    }

    #[tokio::test]
    async fn referral_resolves_to_welcome_and_card() {
        let f = fixture(
            StubCatalog {
                products: vec![product()],
                ..Default::default()
            },
            StubGenerator::new(),
            ReceiptAnalysis::default(),
        );
        let event = InboundEvent::new(EventKind::Referral, "cust-1", "page-1")
            .with_referral("p_id:42|vars:Size-M,Color-Red");
        f.orchestrator.process(event).await.unwrap();

        let texts = f.send.texts.lock().unwrap();
        assert!(texts[0].contains("Classic Tee"));
        assert!(texts[0].contains("Size-M, Color-Red"));
        assert_eq!(f.send.cards.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_referral_greets_generically() {
        let f = fixture(StubCatalog::default(), StubGenerator::new(), ReceiptAnalysis::default());
        let event = InboundEvent::new(EventKind::Referral, "cust-1", "page-1")
            .with_referral("p_id:999");
        f.orchestrator.process(event).await.unwrap();

        assert_eq!(
            f.send.texts.lock().unwrap().as_slice(),
            [GENERIC_GREETING]
        );
    }

    #[tokio::test]
    async fn property_inquiry_postback_gets_a_canned_ack() {
        let f = fixture(
            StubCatalog {
                properties: vec![Property {
                    id: "11".to_string(),
                    title: "Vista Homes Unit 4".to_string(),
                    address: None,
                    bedrooms: None,
                    bathrooms: None,
                    image_url: None,
                    page_url: None,
                }],
                ..Default::default()
            },
            StubGenerator::new(),
            ReceiptAnalysis::default(),
        );
        let event = InboundEvent::new(EventKind::Postback, "cust-1", "page-1")
            .with_postback("INQUIRE_PROPERTY:11");
        f.orchestrator.process(event).await.unwrap();

        let texts = f.send.texts.lock().unwrap();
        assert!(texts[0].contains("Vista Homes Unit 4"));
        assert_eq!(*f.generator.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn confirmed_receipt_advances_the_lead_stage() {
        let analysis = ReceiptAnalysis {
            is_receipt: true,
            confidence: 0.9,
            receiver_number: Some("0917-123-4567".to_string()),
            ..Default::default()
        };
        let f = fixture(
            StubCatalog {
                methods: vec![gcash()],
                ..Default::default()
            },
            StubGenerator::new(),
            analysis,
        );
        let event = InboundEvent::new(EventKind::Image, "cust-1", "page-1")
            .with_attachment("https://cdn.example/receipt.jpg");
        f.orchestrator.process(event).await.unwrap();

        assert_eq!(
            f.leads.advanced.lock().unwrap().as_slice(),
            ["lead-cust-1"]
        );
        // The customer still gets an AI reply describing the verification.
        assert_eq!(f.send.texts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn low_confidence_image_skips_the_stage_transition() {
        let analysis = ReceiptAnalysis {
            is_receipt: true,
            confidence: 0.6,
            ..Default::default()
        };
        let f = fixture(
            StubCatalog {
                methods: vec![gcash()],
                ..Default::default()
            },
            StubGenerator::new(),
            analysis,
        );
        let event = InboundEvent::new(EventKind::Image, "cust-1", "page-1")
            .with_attachment("https://cdn.example/receipt.jpg");
        f.orchestrator.process(event).await.unwrap();

        assert!(f.leads.advanced.lock().unwrap().is_empty());
        assert_eq!(*f.generator.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn typing_off_is_sent_even_when_generation_fails() {
        let f = fixture(StubCatalog::default(), StubGenerator::failing(), ReceiptAnalysis::default());
        let result = f.orchestrator.process(text_event("hello")).await;
        assert!(result.is_err());

        let actions = f.send.actions.lock().unwrap();
        assert_eq!(actions.as_slice(), ["typing_on", "typing_off"]);
        assert!(f.send.texts.lock().unwrap().is_empty());
    }
}
