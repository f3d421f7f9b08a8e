//! Domain core of the ABIA assistant.
//!
//! Holds the session model and its manager, the agent routing contract,
//! plugin registry, configuration model and the shared error type.
//! Nothing here touches the network; storage is reached through traits.

pub mod config;
pub mod error;
pub mod integration;
pub mod memory;
pub mod plugin;
pub mod session;
pub mod state;
pub mod usage;

// Re-export common error type
pub use error::{AbiaError, Result};
