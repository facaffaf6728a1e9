//! Phone-number recognizer, a `PatternRecognizer` instance matching North
//! American Numbering Plan formats.

use super::pattern_recognizer::PatternRecognizer;
use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct PhoneRecognizer<'a> {
    inner: PatternRecognizer<'a>,
}

impl<'a> Default for PhoneRecognizer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PhoneRecognizer<'a> {
    pub fn new() -> Self {
        let mut inner = PatternRecognizer::new("PHONE_NUMBER");
        inner.add_pattern(
            "NANP phone",
            r"(\+?1[- .]?)?\(?\d{3}\)?[- .]\d{3}[- .]\d{4}\b",
            0.6,
        );
        PhoneRecognizer { inner }
    }
}

impl<'a> Recognizer for PhoneRecognizer<'a> {
    fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
        self.inner.recognize(text)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
