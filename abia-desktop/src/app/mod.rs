pub mod bootstrap;
pub mod state;

pub use bootstrap::{BootstrapOptions, VECTOR_FLUSH_TASK, bootstrap};
pub use state::{AppState, Services, TranslationJobs};
