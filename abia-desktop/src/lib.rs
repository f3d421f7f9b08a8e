//! ABIA desktop host.
//!
//! Builds the services once, then bridges UI requests arriving as JSON lines
//! on stdin to the session manager and the agents, writing responses and
//! events to stdout.

pub mod app;
pub mod commands;
pub mod ipc;
pub mod logging;

pub use app::{AppState, BootstrapOptions, Services};
