use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::models::target::Target;

/// Everything one round needs. Built by the controller right before dispatch
/// and moved into the worker task.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub index: u64,
    pub target: Arc<Target>,
    pub body: Arc<[u8]>,
    pub timeout: Duration,
    // None 表示本轮不主动断开
    pub abort_after: Option<Duration>,
    pub output_path: Option<PathBuf>,
}
