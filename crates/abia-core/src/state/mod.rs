//! Persisted preferences and application bookkeeping.

pub mod model;
pub mod repository;

pub use model::{AppState, WindowState, DEFAULT_LANGUAGE};
pub use repository::StateRepository;
