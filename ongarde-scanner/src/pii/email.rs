//! Email address recognizer.

use super::pattern_recognizer::PatternRecognizer;
use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct EmailRecognizer<'a> {
    inner: PatternRecognizer<'a>,
}

impl<'a> Default for EmailRecognizer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> EmailRecognizer<'a> {
    pub fn new() -> Self {
        let mut inner = PatternRecognizer::new("EMAIL_ADDRESS");
        inner.add_pattern("standard email", r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+", 0.85);
        EmailRecognizer { inner }
    }
}

impl<'a> Recognizer for EmailRecognizer<'a> {
    fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
        self.inner.recognize(text)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_email() {
        let r = EmailRecognizer::new();
        let results = r.recognize("contact me at jane.doe@example.com for details");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched, "jane.doe@example.com");
    }
}
