use tindabot_core::types::{PaymentMethod, ReceiptAnalysis, VerificationStatus};
use tracing::debug;

/// Below this the analysis is not treated as a receipt at all.
pub const MIN_RECEIPT_CONFIDENCE: f64 = 0.5;
/// At or above this the lead is moved to the payment-submitted stage, match
/// or no match; ambiguous receipts go to a human instead of being dropped.
pub const CONFIRMED_CONFIDENCE: f64 = 0.8;

/// Match an analyzed receipt against the configured payment methods and fill
/// in `verification_status` / `verification_details` on the analysis.
///
/// Number matching runs first and alone decides when it hits: extracted
/// receiver numbers are far more reliable than display names, which the
/// platform frequently masks ("JO*N AN***O"). Name matching is only attempted
/// for unmasked names when no number matched.
pub fn verify(analysis: &mut ReceiptAnalysis, methods: &[PaymentMethod]) {
    if !analysis.is_receipt || analysis.confidence < MIN_RECEIPT_CONFIDENCE {
        analysis.verification_status = VerificationStatus::NotApplicable;
        analysis.verification_details = None;
        return;
    }

    let active: Vec<&PaymentMethod> = methods.iter().filter(|m| m.active).collect();
    if active.is_empty() {
        analysis.verification_status = VerificationStatus::Unknown;
        analysis.verification_details =
            Some("No payment methods are configured, so the receiver could not be checked.".to_string());
        return;
    }

    if let Some(number) = analysis.receiver_number.clone() {
        let extracted = normalize_number(&number);
        if !extracted.is_empty() {
            for method in &active {
                let Some(account) = method.account_number.as_deref() else {
                    continue;
                };
                let configured = normalize_number(account);
                if configured.is_empty() {
                    continue;
                }
                if numbers_match(&extracted, &configured) {
                    analysis.verification_status = VerificationStatus::Verified;
                    analysis.verification_details = Some(format!(
                        "Receiver number {} matches {} ({}).",
                        number, method.name, account
                    ));
                    return;
                }
            }
        }
    }

    if let Some(name) = analysis.receiver_name.clone() {
        // Masked names can collide with almost anything; skip them entirely.
        if !name.contains('*') {
            let extracted = normalize_name(&name);
            if !extracted.is_empty() {
                for method in &active {
                    let Some(account_name) = method.account_name.as_deref() else {
                        continue;
                    };
                    let configured = normalize_name(account_name);
                    if configured.is_empty() {
                        continue;
                    }
                    if extracted.contains(&configured) || configured.contains(&extracted) {
                        analysis.verification_status = VerificationStatus::Verified;
                        analysis.verification_details = Some(format!(
                            "Receiver name \"{}\" matches {}.",
                            name, method.name
                        ));
                        return;
                    }
                }
            }
        } else {
            debug!(name = %name, "receiver name is masked, skipping name match");
        }
    }

    if let Some(number) = &analysis.receiver_number {
        // Methods with no account number on file are left out of the listing.
        let configured = active
            .iter()
            .filter_map(|m| {
                m.account_number
                    .as_deref()
                    .map(|n| format!("{}: {}", m.name, n))
            })
            .collect::<Vec<_>>()
            .join(", ");
        analysis.verification_status = VerificationStatus::Mismatch;
        analysis.verification_details = Some(format!(
            "The receiver number {} does not match any of our accounts. Our account numbers are: {}.",
            number, configured
        ));
    } else {
        analysis.verification_status = VerificationStatus::Unknown;
        analysis.verification_details = Some(
            "Could not fully verify the receipt, but it looks like a valid payment screenshot."
                .to_string(),
        );
    }
}

/// Whether the analysis crosses the confirmed-receipt threshold that triggers
/// the lead stage transition.
pub fn is_confirmed(analysis: &ReceiptAnalysis) -> bool {
    analysis.is_receipt && analysis.confidence >= CONFIRMED_CONFIDENCE
}

/// Strip whitespace, hyphens and parentheses; keep everything else, including
/// an international prefix.
fn normalize_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
        .collect()
}

fn numbers_match(a: &str, b: &str) -> bool {
    if a.contains(b) || b.contains(a) {
        return true;
    }
    // Same account, different prefix formatting ("+63" vs "0"): compare the
    // last four characters once both sides are long enough to be real numbers.
    if a.len() >= 8 && b.len() >= 8 {
        return a.chars().rev().take(4).eq(b.chars().rev().take(4));
    }
    false
}

/// Lowercased alphabetic characters only; spacing, punctuation and digits in
/// display names vary too much between platforms to compare.
fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Human-readable context handed to the response generator for image turns.
pub fn image_context(analysis: &ReceiptAnalysis) -> String {
    if !analysis.is_receipt || analysis.confidence < MIN_RECEIPT_CONFIDENCE {
        return "The customer sent a photo that does not appear to be a payment receipt."
            .to_string();
    }

    let mut parts = vec![format!(
        "The customer sent a payment receipt (confidence {:.2}).",
        analysis.confidence
    )];
    if let Some(amount) = &analysis.extracted_amount {
        parts.push(format!("Amount: {}.", amount));
    }
    if let Some(date) = &analysis.extracted_date {
        parts.push(format!("Date: {}.", date));
    }
    if let Some(platform) = &analysis.payment_platform {
        parts.push(format!("Platform: {}.", platform));
    }
    let status = match analysis.verification_status {
        VerificationStatus::Verified => "verified",
        VerificationStatus::Mismatch => "mismatch",
        VerificationStatus::Unknown => "unknown",
        VerificationStatus::NotApplicable => "not applicable",
    };
    match &analysis.verification_details {
        Some(details) => parts.push(format!("Verification: {}. {}", status, details)),
        None => parts.push(format!("Verification: {}.", status)),
    }
    parts.join(" ")
}
