//! Application layer for ABIA.
//!
//! Coordinates the session manager, the agent router and the stores into
//! the operations the desktop host exposes.

pub mod assistant_usecase;
pub mod plugins;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use assistant_usecase::{AssistantUseCase, DEFAULT_CONTEXT_WINDOW};
pub use plugins::{SamplePlugin, builtin_plugins};
pub use scheduler::{Job, TaskScheduler};
