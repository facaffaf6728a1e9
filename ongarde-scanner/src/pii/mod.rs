//! The NLP / PII scanner: named-entity recognition for personal data
//! classes, gated by a length threshold computed by [`crate::calibrator`].
//! Dispatch is a flat list of [`Recognizer`] trait objects covering credit
//! cards, SSNs, email addresses, phone numbers, and crypto wallet addresses.

mod credit_card;
mod crypto_wallet;
mod email;
mod pattern_recognizer;
mod phone;
mod recognizer;
mod recognizer_result;
mod us_ssn;

use recognizer::Recognizer;
use recognizer_result::RecognizerResult;

use crate::result::{RiskLevel, ScanOrigin, ScanResult};
use crate::rules::{RuleClass, RULES};

/// Runs every registered recognizer over `text` and returns the raw matches,
/// highest-score first. Used directly by tests and by [`scan_to_result`].
pub fn recognize_all(text: &str) -> Vec<RecognizerResult> {
    let credit_card = credit_card::CreditCardRecognizer::new();
    let ssn = us_ssn::UsSsnRecognizer::new();
    let email = email::EmailRecognizer::new();
    let phone = phone::PhoneRecognizer::new();
    let wallet = crypto_wallet::CryptoWalletRecognizer::new();

    let recognizers: Vec<&dyn Recognizer> = vec![&credit_card, &ssn, &email, &phone, &wallet];
    let mut results: Vec<RecognizerResult> = recognizers.iter().flat_map(|r| r.recognize(text)).collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

fn rule_for_entity(entity_type: &str) -> Option<(&'static str, RiskLevel)> {
    RULES
        .iter()
        .find(|r| r.class == RuleClass::PiiNlp && r.pattern == entity_type)
        .map(|r| (r.rule_id, r.risk_level))
}

/// Runs the full NLP pass and converts the highest-confidence match (if any)
/// into a [`ScanResult`]. `origin` records whether this ran on the sync
/// request path or as an advisory background task.
pub fn scan(text: &str, origin: ScanOrigin) -> ScanResult {
    let matches = recognize_all(text);
    let Some(best) = matches.into_iter().find(|m| m.score >= 0.5) else {
        return ScanResult::pass(origin);
    };
    let Some((rule_id, risk_level)) = rule_for_entity(&best.entity_type) else {
        return ScanResult::pass(origin);
    };
    ScanResult::block(rule_id, risk_level, best.matched, origin, false)
}
