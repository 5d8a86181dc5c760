//! HTTP server for Yan.
//!
//! Serves branch pull (`GET`) and push (`POST`) over the transfer stream
//! protocol, plus a health check.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::YanServer;
