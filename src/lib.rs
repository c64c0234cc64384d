pub mod core;
pub mod models;

pub use crate::core::concurrency_controller::{ConcurrencyController, RunProgress};
pub use crate::models::outcome::{FailureKind, Outcome};
pub use crate::models::result::{Diagnosis, RunSummary};
pub use crate::models::run_config::RunConfig;
