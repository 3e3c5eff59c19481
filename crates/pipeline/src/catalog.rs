use crate::intent::Intent;
use std::sync::Arc;
use tindabot_clients::CatalogStore;
use tindabot_core::types::{Card, CardButton, PaymentMethod, Product, Property};
use tindabot_messenger::SendApi;
use tracing::info;

/// Cap on catalog items fetched and rendered per turn.
pub const MAX_CARDS: usize = 10;

pub const INQUIRE_PROPERTY_PREFIX: &str = "INQUIRE_PROPERTY:";
pub const PAYMENT_METHODS_PAYLOAD: &str = "PAYMENT_METHODS";

/// Sent after payment-method cards on every payment turn.
pub const RECEIPT_REMINDER: &str =
    "Once you've paid, please send a screenshot of your receipt here so we can confirm your payment.";

const DESCRIPTION_PREVIEW_CHARS: usize = 80;

/// Turns a routed intent into rich cards. The short-circuit is opportunistic:
/// zero matching items means "no cards sent" and the caller falls through to
/// the default AI response instead.
pub struct CatalogResponder {
    catalog: Arc<dyn CatalogStore>,
    send: Arc<dyn SendApi>,
}

impl CatalogResponder {
    pub fn new(catalog: Arc<dyn CatalogStore>, send: Arc<dyn SendApi>) -> Self {
        Self { catalog, send }
    }

    /// Returns whether cards were sent. A successful card delivery completes
    /// the turn; payment turns additionally get the receipt reminder text.
    pub async fn respond(
        &self,
        intent: Intent,
        sender_id: &str,
        page_id: Option<&str>,
    ) -> anyhow::Result<bool> {
        let cards = match intent {
            Intent::Product => self
                .catalog
                .products(MAX_CARDS)
                .await?
                .iter()
                .map(product_card)
                .collect::<Vec<_>>(),
            Intent::Property => self
                .catalog
                .properties(MAX_CARDS)
                .await?
                .iter()
                .map(property_card)
                .collect::<Vec<_>>(),
            Intent::Payment => self
                .catalog
                .payment_methods(MAX_CARDS)
                .await?
                .iter()
                .map(payment_card)
                .collect::<Vec<_>>(),
            Intent::None => Vec::new(),
        };

        if cards.is_empty() {
            return Ok(false);
        }

        self.send.send_cards(sender_id, &cards, page_id).await?;
        info!(sender = %sender_id, intent = ?intent, count = cards.len(), "catalog cards sent");

        if intent == Intent::Payment {
            self.send
                .send_text(sender_id, RECEIPT_REMINDER, page_id)
                .await?;
        }

        Ok(true)
    }
}

pub fn product_card(product: &Product) -> Card {
    let price = product
        .price
        .map(|p| format!("₱{:.2}", p))
        .unwrap_or_else(|| "Price on request".to_string());
    let subtitle = match product.description.as_deref() {
        Some(desc) => format!("{} · {}", price, preview(desc)),
        None => price,
    };

    let mut buttons = Vec::new();
    if let Some(url) = &product.page_url {
        buttons.push(CardButton::WebUrl {
            title: "View details".to_string(),
            url: url.clone(),
        });
    }

    Card {
        title: product.name.clone(),
        subtitle,
        image_url: product.image_url.clone(),
        buttons,
    }
}

pub fn property_card(property: &Property) -> Card {
    let mut subtitle = property.address.clone().unwrap_or_default();
    if let (Some(beds), Some(baths)) = (property.bedrooms, property.bathrooms) {
        if !subtitle.is_empty() {
            subtitle.push_str(" · ");
        }
        subtitle.push_str(&format!("{} BR / {} BA", beds, baths));
    }

    let mut buttons = Vec::new();
    if let Some(url) = &property.page_url {
        buttons.push(CardButton::WebUrl {
            title: "View details".to_string(),
            url: url.clone(),
        });
    }
    // The payload round-trips through the platform and comes back as a
    // postback, which is how inquiries get routed to the right listing.
    buttons.push(CardButton::Postback {
        title: "Inquire".to_string(),
        payload: format!("{}{}", INQUIRE_PROPERTY_PREFIX, property.id),
    });

    Card {
        title: property.title.clone(),
        subtitle,
        image_url: property.image_url.clone(),
        buttons,
    }
}

pub fn payment_card(method: &PaymentMethod) -> Card {
    let subtitle = match (&method.account_name, &method.account_number) {
        (Some(name), Some(number)) => format!("{} · {}", name, number),
        (Some(name), None) => name.clone(),
        (None, Some(number)) => number.clone(),
        (None, None) => String::new(),
    };

    let mut buttons = Vec::new();
    if let Some(url) = &method.page_url {
        buttons.push(CardButton::WebUrl {
            title: "Pay here".to_string(),
            url: url.clone(),
        });
    }
    if let Some(qr) = &method.qr_code_url {
        buttons.push(CardButton::WebUrl {
            title: "View QR".to_string(),
            url: qr.clone(),
        });
    }

    Card {
        title: method.name.clone(),
        subtitle,
        image_url: method.qr_code_url.clone(),
        buttons,
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_card_renders_price_and_preview() {
        let product = Product {
            id: "1".to_string(),
            name: "Classic Tee".to_string(),
            description: Some("Soft cotton shirt. ".repeat(10)),
            price: Some(499.0),
            image_url: Some("https://img.example/tee.jpg".to_string()),
            page_url: Some("https://shop.example/p/1".to_string()),
        };
        let card = product_card(&product);
        assert_eq!(card.title, "Classic Tee");
        assert!(card.subtitle.starts_with("₱499.00"));
        assert!(card.subtitle.ends_with('…'));
        assert_eq!(card.buttons.len(), 1);
    }

    #[test]
    fn property_card_always_carries_the_inquire_postback() {
        let property = Property {
            id: "11".to_string(),
            title: "Vista Homes Unit 4".to_string(),
            address: Some("Dasmariñas, Cavite".to_string()),
            bedrooms: Some(3),
            bathrooms: Some(2),
            image_url: None,
            page_url: None,
        };
        let card = property_card(&property);
        assert!(card.subtitle.contains("3 BR / 2 BA"));
        assert_eq!(
            card.buttons,
            vec![CardButton::Postback {
                title: "Inquire".to_string(),
                payload: "INQUIRE_PROPERTY:11".to_string(),
            }]
        );
    }

    #[test]
    fn payment_card_gets_qr_button_only_when_qr_exists() {
        let mut method = PaymentMethod {
            id: "pm-1".to_string(),
            name: "GCash".to_string(),
            account_name: Some("Maria Cruz".to_string()),
            account_number: Some("09171234567".to_string()),
            qr_code_url: Some("https://img.example/qr.png".to_string()),
            page_url: Some("https://shop.example/pay/gcash".to_string()),
            active: true,
        };
        let card = payment_card(&method);
        assert_eq!(card.buttons.len(), 2);

        method.qr_code_url = None;
        let card = payment_card(&method);
        assert_eq!(card.buttons.len(), 1);
        assert!(matches!(
            &card.buttons[0],
            CardButton::WebUrl { title, .. } if title == "Pay here"
        ));
    }
}
