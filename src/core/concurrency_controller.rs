use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::core::abort_scheduler::AbortScheduler;
use crate::core::byte_sink::ByteSink;
use crate::core::result_aggregator::ResultAggregator;
use crate::core::stream_executor::StreamExecutor;
use crate::core::transport::Connector;
use crate::models::request_spec::RequestSpec;
use crate::models::result::RunSummary;
use crate::models::run_config::RunConfig;
use crate::models::target::Target;

// 回收已完成任务的轮询间隔
pub const REAP_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub completed: u64,
    pub dispatched: u64,
    pub in_flight: usize,
}

/// Keeps at most `concurrency` rounds in flight until `rounds` have been
/// dispatched and every one of them has recorded its outcome.
pub struct ConcurrencyController {
    config: RunConfig,
    target: Arc<Target>,
    body: Arc<[u8]>,
    executor: StreamExecutor,
    scheduler: AbortScheduler,
    aggregator: Arc<ResultAggregator>,
}

impl ConcurrencyController {
    pub fn new(config: RunConfig) -> anyhow::Result<Self> {
        let body: Arc<[u8]> = Arc::from(config.payload().context("序列化请求体失败")?.into_bytes());
        let target = Arc::new(config.target.clone());
        let aggregator = Arc::new(ResultAggregator::new());
        let executor = StreamExecutor::new(Connector::for_target(&target)?)
            .with_connect_tracker(aggregator.connect_tracker());
        let scheduler = AbortScheduler::from_config(&config);
        Ok(ConcurrencyController {
            config,
            target,
            body,
            executor,
            scheduler,
            aggregator,
        })
    }

    pub fn aggregator(&self) -> Arc<ResultAggregator> {
        self.aggregator.clone()
    }

    fn request_spec(&mut self, index: u64) -> RequestSpec {
        RequestSpec {
            index,
            target: self.target.clone(),
            body: self.body.clone(),
            timeout: self.config.timeout(),
            abort_after: self.scheduler.decide(),
            output_path: self
                .config
                .out_dir
                .as_deref()
                .map(|dir| ByteSink::round_path(dir, index)),
        }
    }

    fn dispatch(&mut self, index: u64) -> JoinHandle<()> {
        let spec = self.request_spec(index);
        debug!(index, abort_after = ?spec.abort_after, "dispatching round");
        // 派发即计为待建连，直到executor结清
        self.aggregator.connect_tracker().begin();
        let executor = self.executor.clone();
        let aggregator = self.aggregator.clone();
        tokio::spawn(async move {
            let outcome = executor.execute(&spec).await;
            aggregator.record(outcome);
        })
    }

    pub async fn run<F>(mut self, mut on_progress: Option<F>) -> anyhow::Result<RunSummary>
    where
        F: FnMut(RunProgress),
    {
        if let Some(dir) = &self.config.out_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("创建输出目录失败: {}", dir.display()))?;
        }
        info!(
            url = %self.config.url,
            concurrency = self.config.concurrency,
            rounds = self.config.rounds,
            "starting run"
        );

        let run_start = Instant::now();
        let rounds = self.config.rounds;
        let slots = usize::try_from(rounds)
            .unwrap_or(usize::MAX)
            .min(self.config.concurrency);
        let mut active: Vec<JoinHandle<()>> = Vec::with_capacity(slots);
        let mut next_index = 1u64;

        loop {
            // 清理已结束的任务
            let (finished, running): (Vec<_>, Vec<_>) =
                active.drain(..).partition(|handle| handle.is_finished());
            active = running;
            for handle in finished {
                if let Err(e) = handle.await {
                    abort_all(&active);
                    warn!("worker task failed: {}", e);
                    return Err(anyhow!(e).context("请求任务异常退出"));
                }
            }
            // 在补派新轮次之前判断，此时待建连数只包含已派发的轮次
            if next_index > 1 && self.aggregator.exhausted() {
                // 剩余任务都已建连失败，等它们记录完结果再退出
                for handle in active {
                    let _ = handle.await;
                }
                warn!("no connection could be opened, local resources exhausted");
                return Err(anyhow!("本地资源耗尽，无法建立任何连接"));
            }

            if let Some(callback) = on_progress.as_mut() {
                callback(RunProgress {
                    completed: self.aggregator.len() as u64,
                    dispatched: next_index - 1,
                    in_flight: active.len(),
                });
            }

            if next_index > rounds && active.is_empty() {
                break;
            }

            // 补满并发
            while next_index <= rounds && active.len() < self.config.concurrency {
                active.push(self.dispatch(next_index));
                next_index += 1;
            }
            sleep(REAP_INTERVAL).await;
        }

        let summary = self.aggregator.summarize(run_start.elapsed());
        info!(
            total = summary.total,
            ok = summary.ok,
            failed = summary.failed,
            aborted = summary.aborted,
            "run drained"
        );
        Ok(summary)
    }
}

fn abort_all(handles: &[JoinHandle<()>]) {
    for handle in handles {
        handle.abort();
    }
}
