pub mod abort_scheduler;
pub mod byte_sink;
pub(crate) mod check_run_config;
pub mod concurrency_controller;
pub mod result_aggregator;
pub mod show_result_with_table;
pub mod stream_error;
pub mod stream_executor;
#[cfg(test)]
pub(crate) mod test_server;
pub mod transport;
