//! The proxy engine crate: request admission, upstream
//! dispatch, response-mode selection, the dashboard surface, and the
//! top-level wiring that turns a loaded [`ongarde_config::Config`] into a
//! bound, running listener.

pub mod admission;
pub mod app;
pub mod dashboard;
pub mod error_response;
pub mod gateway;
pub mod health;
pub mod loopback;
pub mod response;
pub mod scanning;
pub mod sse;
pub mod state;

pub use state::AppState;
