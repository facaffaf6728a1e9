//! Shared primitives used by every other `ongarde-*` crate: structured
//! logging setup, graceful drain/shutdown, startup readiness tracking,
//! sortable identifiers, and the proxy-wide error taxonomy.

pub mod drain;
pub mod error;
pub mod ids;
pub mod readiness;
pub mod signal;
pub mod statedir;
pub mod telemetry;

pub use error::OngardeError;
pub use ids::Sid;
