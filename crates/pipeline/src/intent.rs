/// What a free-text message is asking about, as far as the catalog
/// short-circuit is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Product,
    Property,
    Payment,
    None,
}

// Compound heuristics pair two word classes because single keywords are too
// ambiguous on their own ("available" shows up in product, property and
// payment messages alike). The flat sets below each pair are the fallback.

const PRODUCT_INVENTORY: &[&str] = &["tinda", "paninda", "produkto", "product", "item"];
const PRODUCT_OFFER: &[&str] = &[
    "ano", "anong", "meron", "available", "benta", "selling", "sell", "order", "magkano",
];
const PRODUCT_KEYWORDS: &[&str] = &["tindahan", "catalog", "catalogue", "menu", "price list"];

const PROPERTY_NOUNS: &[&str] = &[
    "house", "bahay", "lot", "lupa", "condo", "apartment", "property", "unit", "townhouse",
];
const PROPERTY_INTEREST: &[&str] = &[
    "available",
    "sale",
    "rent",
    "rento",
    "presyo",
    "price",
    "magkano",
    "interested",
    "tour",
    "viewing",
    "tingin",
];
const PROPERTY_KEYWORDS: &[&str] = &["house and lot", "real estate", "subdivision", "pabahay"];

const PAYMENT_WORDS: &[&str] = &["bayad", "payment", "pay"];
const PAYMENT_QUESTION: &[&str] = &["paano", "how", "saan", "where", "pwede", "can i"];
const PAYMENT_KEYWORDS: &[&str] = &[
    "gcash",
    "maya",
    "bank transfer",
    "downpayment",
    "down payment",
    "installment",
    "hulugan",
    "magbayad",
    "magbabayad",
    "bayaran",
    "receipt",
    "resibo",
];

/// Route a text to an intent. Checked in a fixed priority order — Product,
/// then Property, then Payment — and a text matching several resolves to the
/// first checked. The ordering is an arbitrary but load-bearing tie-break;
/// keep it stable.
pub fn classify(text: &str) -> Intent {
    let text = text.to_lowercase();

    if matches_compound(&text, PRODUCT_INVENTORY, PRODUCT_OFFER)
        || contains_any(&text, PRODUCT_KEYWORDS)
    {
        return Intent::Product;
    }

    if matches_compound(&text, PROPERTY_NOUNS, PROPERTY_INTEREST)
        || contains_any(&text, PROPERTY_KEYWORDS)
    {
        return Intent::Property;
    }

    if matches_compound(&text, PAYMENT_WORDS, PAYMENT_QUESTION)
        || contains_any(&text, PAYMENT_KEYWORDS)
    {
        return Intent::Payment;
    }

    Intent::None
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn matches_compound(text: &str, first: &[&str], second: &[&str]) -> bool {
    contains_any(text, first) && contains_any(text, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_query_in_tagalog() {
        assert_eq!(classify("ano tinda niyo"), Intent::Product);
        assert_eq!(classify("Anong mga produkto meron kayo?"), Intent::Product);
    }

    #[test]
    fn property_query() {
        assert_eq!(classify("house and lot available"), Intent::Property);
        assert_eq!(classify("magkano po ang condo unit"), Intent::Property);
    }

    #[test]
    fn payment_query() {
        assert_eq!(classify("paano magbayad"), Intent::Payment);
        assert_eq!(classify("pwede po ba gcash?"), Intent::Payment);
    }

    #[test]
    fn greeting_routes_nowhere() {
        assert_eq!(classify("hello"), Intent::None);
        assert_eq!(classify("good morning po"), Intent::None);
    }

    #[test]
    fn inventory_word_alone_is_not_enough() {
        assert_eq!(classify("nice product photo"), Intent::None);
    }

    #[test]
    fn product_wins_the_tie_break() {
        // Mentions both an inventory word and a property noun; priority order
        // resolves it to Product.
        assert_eq!(
            classify("ano tinda niyo na bahay available"),
            Intent::Product
        );
    }
}
