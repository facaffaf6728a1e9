//! The error taxonomy shared by every request-path component.
//!
//! `ScannerError` and `ScannerBlock` are deliberately indistinguishable once
//! rendered: the client never learns whether a subsystem failed or a rule
//! actually matched, only that the request was blocked.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OngardeError {
    #[error("authentication failed")]
    AuthFailure,

    #[error("request body exceeds the configured cap")]
    BodyTooLarge,

    #[error("upstream unreachable")]
    UpstreamUnreachable,

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("scanner error")]
    ScannerError,

    #[error("scanner block")]
    ScannerBlock {
        rule_id: String,
        risk_level: String,
        scan_id: String,
        redacted_excerpt: String,
        test: bool,
    },

    #[error("malformed request")]
    MalformedRequest,

    #[error("rate limited")]
    RateLimited,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("upstream URL forbidden")]
    UpstreamURLForbidden,

    #[error("internal error")]
    InternalError,
}

impl OngardeError {
    /// HTTP status this error renders as.
    pub fn status_code(&self) -> u16 {
        match self {
            OngardeError::AuthFailure => 401,
            OngardeError::BodyTooLarge => 413,
            OngardeError::UpstreamUnreachable | OngardeError::UpstreamTimeout => 502,
            OngardeError::ScannerError | OngardeError::ScannerBlock { .. } => 400,
            OngardeError::MalformedRequest => 400,
            OngardeError::RateLimited => 429,
            OngardeError::ConfigInvalid(_) => 500,
            OngardeError::UpstreamURLForbidden => 400,
            OngardeError::InternalError => 500,
        }
    }

    /// True when this error must be treated as a BLOCK by every consumer —
    /// the fail-safe invariant: a subsystem failure never fails open.
    pub fn is_fail_safe_block(&self) -> bool {
        matches!(
            self,
            OngardeError::ScannerError | OngardeError::ScannerBlock { .. }
        )
    }
}
