//! Crypto wallet address recognizer, built on the same `PatternRecognizer`
//! shape as the other pii recognizers in this module.
//! Covers the three most common address families: Bitcoin (legacy/P2SH and
//! bech32), and Ethereum-style hex addresses.

use super::pattern_recognizer::PatternRecognizer;
use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

pub struct CryptoWalletRecognizer<'a> {
    inner: PatternRecognizer<'a>,
}

impl<'a> Default for CryptoWalletRecognizer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CryptoWalletRecognizer<'a> {
    pub fn new() -> Self {
        let mut inner = PatternRecognizer::new("CRYPTO_WALLET");
        inner.add_pattern("bitcoin legacy/P2SH", r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b", 0.5);
        inner.add_pattern("bitcoin bech32", r"\bbc1[a-z0-9]{25,39}\b", 0.6);
        inner.add_pattern("ethereum", r"\b0x[a-fA-F0-9]{40}\b", 0.7);
        CryptoWalletRecognizer { inner }
    }
}

impl<'a> Recognizer for CryptoWalletRecognizer<'a> {
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
    fn recognizes_ethereum_address() {
        let r = CryptoWalletRecognizer::new();
        let results = r.recognize("send it to 0x0123456789abcdef0123456789abcdef01234567 please");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn recognizes_bitcoin_bech32() {
        let r = CryptoWalletRecognizer::new();
        let results = r.recognize("my address is bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq ok");
        assert_eq!(results.len(), 1);
    }
}
