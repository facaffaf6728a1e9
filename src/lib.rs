//! Crate root for the `ongarde` binary. Thin: everything the process does
//! lives in `ongarde-proxy` and friends; this crate just re-exports the
//! pieces `main.rs` and integration tests wire together.

pub use ongarde_config::Config;
pub use ongarde_proxy::app;
