//! Library definitions.
//!
//! Exports the configuration types and the proxy service implementation.

pub mod config;
pub mod proxy;

pub use config::ProxyConfig;
pub use proxy::{build_router, run_server, ProxyError, ProxyState};
