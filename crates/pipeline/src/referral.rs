use std::collections::HashMap;

/// Parsed form of the merchant-defined referral string carried by deep-link
/// entry points. The micro-format is pipe-separated `key:value` pairs, e.g.
/// `p_id:42|vars:Size-M,Color-Red`. Unknown keys are kept but unused.
#[derive(Debug, Clone, Default)]
pub struct ReferralContext {
    pub product_id: Option<String>,
    pub variation: Option<String>,
    pub extra: HashMap<String, String>,
}

pub fn parse(raw: &str) -> ReferralContext {
    let mut ctx = ReferralContext::default();

    for part in raw.split('|') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "p_id" => ctx.product_id = Some(value.to_string()),
            "vars" => {
                ctx.variation = Some(
                    value
                        .split(',')
                        .map(str::trim)
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            }
            other => {
                ctx.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    ctx
}

/// Welcome line for a resolved referral, with the chosen variation spelled
/// out when the deep link carried one.
pub fn welcome_message(product_name: &str, variation: Option<&str>) -> String {
    match variation {
        Some(vars) => format!(
            "Hi! Thanks for checking out {} ({}). I can help with pricing, availability, and how to order.",
            product_name, vars
        ),
        None => format!(
            "Hi! Thanks for checking out {}. I can help with pricing, availability, and how to order.",
            product_name
        ),
    }
}

pub const GENERIC_GREETING: &str = "Hi! Welcome! How can we help you today?";
