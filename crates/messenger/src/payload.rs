use serde_json::{json, Value};
use tindabot_core::types::{Card, CardButton};

/// The platform caps generic-template deliveries at ten elements.
pub const MAX_TEMPLATE_ELEMENTS: usize = 10;

pub fn text_payload(text: &str) -> Value {
    json!({ "text": text })
}

/// Render cards into the platform's generic-template message payload.
/// Anything past the element cap is dropped here rather than rejected upstream.
pub fn cards_payload(cards: &[Card]) -> Value {
    let elements = cards
        .iter()
        .take(MAX_TEMPLATE_ELEMENTS)
        .map(element)
        .collect::<Vec<_>>();

    json!({
        "attachment": {
            "type": "template",
            "payload": {
                "template_type": "generic",
                "elements": elements
            }
        }
    })
}

fn element(card: &Card) -> Value {
    let mut el = json!({
        "title": card.title,
        "subtitle": card.subtitle,
    });

    if let Some(url) = &card.image_url {
        el["image_url"] = json!(url);
    }

    if !card.buttons.is_empty() {
        let buttons = card
            .buttons
            .iter()
            .map(|b| match b {
                CardButton::WebUrl { title, url } => json!({
                    "type": "web_url",
                    "title": title,
                    "url": url,
                }),
                CardButton::Postback { title, payload } => json!({
                    "type": "postback",
                    "title": title,
                    "payload": payload,
                }),
            })
            .collect::<Vec<_>>();
        el["buttons"] = json!(buttons);
    }

    el
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str) -> Card {
        Card {
            title: title.to_string(),
            subtitle: "sub".to_string(),
            image_url: Some("https://img.example/1.jpg".to_string()),
            buttons: vec![
                CardButton::WebUrl {
                    title: "View details".to_string(),
                    url: "https://shop.example/p/1".to_string(),
                },
                CardButton::Postback {
                    title: "Inquire".to_string(),
                    payload: "INQUIRE_PROPERTY:1".to_string(),
                },
            ],
        }
    }

    #[test]
    fn generic_template_shape() {
        let payload = cards_payload(&[card("First")]);
        assert_eq!(payload["attachment"]["type"], "template");
        assert_eq!(
            payload["attachment"]["payload"]["template_type"],
            "generic"
        );
        let el = &payload["attachment"]["payload"]["elements"][0];
        assert_eq!(el["title"], "First");
        assert_eq!(el["image_url"], "https://img.example/1.jpg");
        assert_eq!(el["buttons"][0]["type"], "web_url");
        assert_eq!(el["buttons"][1]["type"], "postback");
        assert_eq!(el["buttons"][1]["payload"], "INQUIRE_PROPERTY:1");
    }

    #[test]
    fn elements_are_capped_at_platform_limit() {
        let cards: Vec<Card> = (0..15).map(|i| card(&format!("c{}", i))).collect();
        let payload = cards_payload(&cards);
        let elements = payload["attachment"]["payload"]["elements"]
            .as_array()
            .expect("elements");
        assert_eq!(elements.len(), MAX_TEMPLATE_ELEMENTS);
    }

    #[test]
    fn buttons_omitted_when_card_has_none() {
        let bare = Card {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            image_url: None,
            buttons: Vec::new(),
        };
        let payload = cards_payload(&[bare]);
        let el = &payload["attachment"]["payload"]["elements"][0];
        assert!(el.get("buttons").is_none());
        assert!(el.get("image_url").is_none());
    }
}
