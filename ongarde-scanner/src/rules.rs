//! The static rule catalog.
//!
//! Rules are a tagged variant over `{regex, nlp-entity}`: fast-path rules
//! carry a compiled pattern and are evaluated by [`crate::fast_path`];
//! `pii_nlp` rules are markers consumed by [`crate::pii`] instead of being
//! compiled here. There is no class hierarchy, just a `match` on `class`.

use crate::result::RiskLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleClass {
    Credential,
    Shell,
    File,
    PromptInjection,
    PiiNlp,
}

/// One entry in the static catalog. `pattern` is a regex source string for
/// every class except `PiiNlp`, where it names the NLP entity type instead.
#[derive(Clone, Copy, Debug)]
pub struct RuleDef {
    pub rule_id: &'static str,
    pub class: RuleClass,
    pub pattern: &'static str,
    pub risk_level: RiskLevel,
    /// Matches are audited and still block the request, but are tagged
    /// `test: true` and excluded from user-visible block counters.
    pub is_test_credential: bool,
    /// Matches are recorded but never block the request.
    pub advisory_only: bool,
}

const fn rule(rule_id: &'static str, class: RuleClass, pattern: &'static str, risk_level: RiskLevel) -> RuleDef {
    RuleDef {
        rule_id,
        class,
        pattern,
        risk_level,
        is_test_credential: false,
        advisory_only: false,
    }
}

const fn test_credential(rule_id: &'static str, pattern: &'static str) -> RuleDef {
    RuleDef {
        rule_id,
        class: RuleClass::Credential,
        pattern,
        risk_level: RiskLevel::Critical,
        is_test_credential: true,
        advisory_only: false,
    }
}

/// The full, static catalog. Order is irrelevant here; [`crate::fast_path`]
/// sorts by `rule_id` to get a deterministic evaluation order.
pub static RULES: &[RuleDef] = &[
    // --- credentials -----------------------------------------------------
    rule(
        "CRED_OPENAI_KEY",
        RuleClass::Credential,
        r"sk-proj-[A-Za-z0-9_-]{20,}|sk-[A-Za-z0-9]{20,}",
        RiskLevel::Critical,
    ),
    rule(
        "CRED_ANTHROPIC_KEY",
        RuleClass::Credential,
        r"sk-ant-(api03|admin01)-[A-Za-z0-9_-]{20,}",
        RiskLevel::Critical,
    ),
    rule(
        "CRED_AWS_ACCESS_KEY",
        RuleClass::Credential,
        r"\b(AKIA|ASIA)[0-9A-Z]{16}\b",
        RiskLevel::Critical,
    ),
    rule(
        "CRED_GITHUB_TOKEN",
        RuleClass::Credential,
        r"\bgh[pousr]_[A-Za-z0-9]{36,}\b",
        RiskLevel::Critical,
    ),
    rule(
        "CRED_SLACK_TOKEN",
        RuleClass::Credential,
        r"\bxox[baprs]-[A-Za-z0-9-]{10,}\b",
        RiskLevel::High,
    ),
    rule(
        "CRED_GOOGLE_API_KEY",
        RuleClass::Credential,
        r"\bAIza[A-Za-z0-9_-]{35}\b",
        RiskLevel::High,
    ),
    rule(
        "CRED_STRIPE_KEY",
        RuleClass::Credential,
        r"\b(sk|rk)_live_[A-Za-z0-9]{24,}\b",
        RiskLevel::Critical,
    ),
    rule(
        "CRED_PRIVATE_KEY_BLOCK",
        RuleClass::Credential,
        r"-----BEGIN (RSA |EC |OPENSSH |)PRIVATE KEY-----",
        RiskLevel::Critical,
    ),
    test_credential("CRED_TEST_ONGARDE_KEY", r"sk-ongarde-test-[A-Za-z0-9-]+"),
    // --- shell commands ----------------------------------------------------
    rule("SHELL_RM_RF_ROOT", RuleClass::Shell, r"\brm\s+(-[a-zA-Z]*r[a-zA-Z]*f[a-zA-Z]*|-[a-zA-Z]*f[a-zA-Z]*r[a-zA-Z]*)\s+/(?:\s|$)", RiskLevel::Critical),
    rule("SHELL_RM_RF_SUBPATH", RuleClass::Shell, r"\brm\s+(-[a-zA-Z]*r[a-zA-Z]*f[a-zA-Z]*|-[a-zA-Z]*f[a-zA-Z]*r[a-zA-Z]*)\s+\S+", RiskLevel::High),
    rule("SHELL_SUDO_DESTRUCTIVE", RuleClass::Shell, r"\bsudo\s+(rm|dd|mkfs|shutdown|reboot)\b", RiskLevel::High),
    rule("SHELL_PIPE_TO_SHELL", RuleClass::Shell, r"curl[^\n]{0,80}\|\s*(sudo\s+)?(bash|sh|zsh)\b|wget[^\n]{0,80}\|\s*(sudo\s+)?(bash|sh|zsh)\b", RiskLevel::High),
    rule("SHELL_FORK_BOMB", RuleClass::Shell, r":\(\)\s*\{\s*:\|:&\s*\}\s*;\s*:", RiskLevel::Critical),
    rule("SHELL_CHMOD_WORLD_WRITABLE", RuleClass::Shell, r"\bchmod\s+(-R\s+)?0?777\b", RiskLevel::Medium),
    rule("SHELL_DD_DEVICE_WRITE", RuleClass::Shell, r"\bdd\s+if=.*\s+of=/dev/(sd|nvme|hd)", RiskLevel::Critical),
    rule("SHELL_NETCAT_REVERSE", RuleClass::Shell, r"\bnc\s+-[a-zA-Z]*e[a-zA-Z]*\s", RiskLevel::High),
    // --- sensitive file references ----------------------------------------
    rule("FILE_ETC_PASSWD", RuleClass::File, r"/etc/(passwd|shadow|sudoers)\b", RiskLevel::High),
    rule("FILE_SSH_PRIVATE_KEY", RuleClass::File, r"~?/\.ssh/id_(rsa|ed25519|ecdsa)\b", RiskLevel::Critical),
    rule("FILE_AWS_CREDENTIALS", RuleClass::File, r"~?/\.aws/credentials\b", RiskLevel::Critical),
    rule("FILE_DOTENV", RuleClass::File, r"(^|[/\s])\.env(\.[a-zA-Z]+)?\b", RiskLevel::Medium),
    rule("FILE_KUBE_CONFIG", RuleClass::File, r"~?/\.kube/config\b", RiskLevel::High),
    // --- prompt injection markers -----------------------------------------
    rule(
        "INJECTION_IGNORE_INSTRUCTIONS",
        RuleClass::PromptInjection,
        r"(?i)\b(ignore|disregard|forget)\s+(all\s+|your\s+)?(previous|prior|above|earlier)\s+(instructions|prompts|rules)\b",
        RiskLevel::High,
    ),
    rule(
        "INJECTION_REVEAL_SYSTEM_PROMPT",
        RuleClass::PromptInjection,
        r"(?i)\b(reveal|print|show|repeat)\s+(your\s+|the\s+)?(system\s+prompt|hidden\s+instructions)\b",
        RiskLevel::Medium,
    ),
    rule(
        "INJECTION_ROLEPLAY_JAILBREAK",
        RuleClass::PromptInjection,
        r"(?i)\byou\s+are\s+now\s+(DAN|in\s+developer\s+mode|unrestricted)\b",
        RiskLevel::Medium,
    ),
    // --- NLP PII markers (dispatched to crate::pii, not compiled here) -----
    rule("PII_CREDIT_CARD", RuleClass::PiiNlp, "CREDIT_CARD", RiskLevel::High),
    rule("PII_US_SSN", RuleClass::PiiNlp, "US_SSN", RiskLevel::High),
    rule("PII_EMAIL", RuleClass::PiiNlp, "EMAIL_ADDRESS", RiskLevel::Medium),
    rule("PII_PHONE", RuleClass::PiiNlp, "PHONE_NUMBER", RiskLevel::Medium),
    rule("PII_CRYPTO_WALLET", RuleClass::PiiNlp, "CRYPTO_WALLET", RiskLevel::Medium),
];

pub fn fast_path_rules() -> impl Iterator<Item = &'static RuleDef> {
    RULES.iter().filter(|r| r.class != RuleClass::PiiNlp)
}

pub fn find(rule_id: &str) -> Option<&'static RuleDef> {
    RULES.iter().find(|r| r.rule_id == rule_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_are_unique() {
        let mut ids: Vec<&str> = RULES.iter().map(|r| r.rule_id).collect();
        ids.sort_unstable();
        let mut dedup = ids.clone();
        dedup.dedup();
        assert_eq!(ids.len(), dedup.len(), "duplicate rule_id in catalog");
    }

    #[test]
    fn test_credentials_are_critical_and_flagged() {
        let r = find("CRED_TEST_ONGARDE_KEY").unwrap();
        assert!(r.is_test_credential);
        assert_eq!(r.risk_level, RiskLevel::Critical);
    }
}
