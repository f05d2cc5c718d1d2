//! Graph research library crate
//!
//! Re-exports core modules for integration tests and the collector binary.

pub mod collector;
pub mod config;
pub mod error;
pub mod graph_client;
pub mod output;

// Re-export commonly used types
pub use collector::*;
pub use config::Config;
pub use error::{Error, Result};
pub use graph_client::GraphClient;
