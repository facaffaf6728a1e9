//! A generic regex-backed recognizer: a named entity type backed by one or
//! more weighted patterns, with an optional validator hook used to discard
//! candidates that fail a structural check (e.g. a checksum).

use regex::Regex;

use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct Pattern {
    pub name: String,
    pub regex: Regex,
    pub score: f32,
}

pub trait PatternValidator {
    fn validate(&self, candidate: &str) -> Option<bool> {
        let _ = candidate;
        None
    }
    fn invalidate(&self, candidate: &str) -> Option<bool> {
        let _ = candidate;
        None
    }
}

pub struct PatternRecognizer<'a> {
    patterns: Vec<Pattern>,
    entity_type: String,
    validator: Option<&'a dyn PatternValidator>,
}

impl<'a> PatternRecognizer<'a> {
    pub fn new(entity_type: &str) -> Self {
        Self {
            patterns: Vec::new(),
            entity_type: entity_type.to_string(),
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: &'a dyn PatternValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn add_pattern(&mut self, name: &str, regex: &str, score: f32) {
        self.patterns.push(Pattern {
            name: name.to_string(),
            regex: Regex::new(regex).unwrap_or_else(|e| panic!("invalid pattern {name}: {e}")),
            score,
        });
    }
}

impl<'a> Recognizer for PatternRecognizer<'a> {
    fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
        let mut results = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                let candidate = m.as_str();
                let mut score = pattern.score;
                let mut valid = true;
                if let Some(validator) = self.validator {
                    if validator.validate(candidate) == Some(false) {
                        valid = false;
                        score = 0.0;
                    }
                    if validator.invalidate(candidate) == Some(true) {
                        valid = false;
                        score = 0.0;
                    }
                }
                if valid {
                    results.push(RecognizerResult {
                        entity_type: self.entity_type.clone(),
                        matched: candidate.to_string(),
                        start: m.start(),
                        end: m.end(),
                        score,
                    });
                }
            }
        }
        results
    }

    fn name(&self) -> &str {
        &self.entity_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectForbidden;
    impl PatternValidator for RejectForbidden {
        fn validate(&self, candidate: &str) -> Option<bool> {
            if candidate == "forbidden" { Some(false) } else { None }
        }
    }

    #[test]
    fn recognizes_plain_pattern() {
        let mut r = PatternRecognizer::new("TEST");
        r.add_pattern("test", r"\btest\b", 1.0);
        let results = r.recognize("this is a test string");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched, "test");
    }

    #[test]
    fn validator_can_reject_matches() {
        let mut r = PatternRecognizer::new("TEST").with_validator(&RejectForbidden);
        r.add_pattern("forbidden", r"forbidden", 1.0);
        assert!(r.recognize("this is forbidden").is_empty());
    }
}
