//! US SSN heuristic recognizer: a medium-confidence structural pattern
//! plus rejection heuristics for obviously-fake numbers (all-same-digit,
//! the well-known `078-05-1120` sample SSN, the `000`/`666` area prefixes).

use regex::Regex;

use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct UsSsnRecognizer {
    pattern: Regex,
}

impl Default for UsSsnRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl UsSsnRecognizer {
    pub fn new() -> Self {
        UsSsnRecognizer {
            pattern: Regex::new(r"\b([0-9]{3})[- .]([0-9]{2})[- .]([0-9]{4})\b").expect("static ssn pattern compiles"),
        }
    }

    pub fn is_implausible(candidate: &str) -> bool {
        let digits: String = candidate.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 9 {
            return true;
        }
        if digits.chars().all(|c| c == digits.chars().next().unwrap()) {
            return true;
        }
        if &digits[0..3] == "000" || &digits[0..3] == "666" || digits.starts_with('9') {
            return true;
        }
        if &digits[3..5] == "00" {
            return true;
        }
        if &digits[5..9] == "0000" {
            return true;
        }
        if digits == "078051120" {
            return true;
        }
        false
    }
}

impl Recognizer for UsSsnRecognizer {
    fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
        self.pattern
            .find_iter(text)
            .filter(|m| !Self::is_implausible(m.as_str()))
            .map(|m| RecognizerResult {
                entity_type: "US_SSN".to_string(),
                matched: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                score: 0.6,
            })
            .collect()
    }

    fn name(&self) -> &str {
        "US_SSN"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_implausible_numbers() {
        assert!(UsSsnRecognizer::is_implausible("111-11-1111"));
        assert!(UsSsnRecognizer::is_implausible("000-12-3456"));
        assert!(UsSsnRecognizer::is_implausible("078-05-1120"));
    }

    #[test]
    fn recognizes_plausible_ssn() {
        let r = UsSsnRecognizer::new();
        let results = r.recognize("my SSN is 123-45-6788 for the form");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched, "123-45-6788");
    }
}
