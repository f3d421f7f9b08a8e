//! Filesystem persistence for the ABIA assistant.
//!
//! Implements the repository traits from `abia-core` on top of atomic
//! JSON files under a single data directory.

pub mod async_dir_session_repository;
pub mod config_service;
pub mod paths;
pub mod state_repository;
pub mod storage;
pub mod token_stats_store;
pub mod vector_store;

pub use async_dir_session_repository::AsyncDirSessionRepository;
pub use config_service::ConfigService;
pub use paths::{AbiaPaths, translations_dir};
pub use state_repository::StateRepositoryImpl;
pub use storage::{AtomicJsonError, AtomicJsonFile};
pub use token_stats_store::TokenStatsStore;
pub use vector_store::VectorStore;
