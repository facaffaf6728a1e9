//! Credit-card recognizer with Luhn checksum validation.

use regex::Regex;

use super::pattern_recognizer::PatternValidator;
use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct CreditCardRecognizer {
    pattern: Regex,
}

impl Default for CreditCardRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditCardRecognizer {
    pub fn new() -> Self {
        CreditCardRecognizer {
            pattern: Regex::new(
                r"\b(?:4\d{3}|5[1-5]\d{2}|6011|3[47]\d{2})[- ]?\d{4}[- ]?\d{4}[- ]?\d{1,4}\b",
            )
            .expect("static credit card pattern compiles"),
        }
    }

    fn sanitize(value: &str) -> String {
        value.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    pub fn luhn_checksum(digits: &str) -> bool {
        let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() < 12 {
            return false;
        }
        let mut sum = 0u32;
        for (i, digit) in digits.iter().rev().enumerate() {
            let mut n = *digit;
            if i % 2 == 1 {
                n *= 2;
                if n > 9 {
                    n -= 9;
                }
            }
            sum += n;
        }
        sum % 10 == 0
    }
}

impl PatternValidator for CreditCardRecognizer {
    fn validate(&self, candidate: &str) -> Option<bool> {
        Some(Self::luhn_checksum(&Self::sanitize(candidate)))
    }
}

impl Recognizer for CreditCardRecognizer {
    fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
        self.pattern
            .find_iter(text)
            .filter_map(|m| {
                let candidate = m.as_str();
                if Self::luhn_checksum(&Self::sanitize(candidate)) {
                    Some(RecognizerResult {
                        entity_type: "CREDIT_CARD".to_string(),
                        matched: candidate.to_string(),
                        start: m.start(),
                        end: m.end(),
                        score: 0.85,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "CREDIT_CARD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_luhn_checksum() {
        assert!(CreditCardRecognizer::luhn_checksum("4532015112830366")); // valid Visa
        assert!(!CreditCardRecognizer::luhn_checksum("4532015112830367"));
    }

    #[test]
    fn recognizes_valid_card_in_text() {
        let r = CreditCardRecognizer::new();
        let results = r.recognize("My card is 4532-0151-1283-0366, please charge it.");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched, "4532-0151-1283-0366");
    }

    #[test]
    fn rejects_invalid_checksum() {
        let r = CreditCardRecognizer::new();
        assert!(r.recognize("4532-0151-1283-0367").is_empty());
    }
}
