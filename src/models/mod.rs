pub mod args;
pub mod failure_stats;
pub mod outcome;
pub mod request_spec;
pub mod result;
pub mod run_config;
pub mod target;
