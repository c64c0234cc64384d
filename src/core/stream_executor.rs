use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::core::byte_sink::ByteSink;
use crate::core::result_aggregator::ConnectTracker;
use crate::core::stream_error::StreamError;
use crate::core::transport::Connector;
use crate::models::outcome::Outcome;
use crate::models::request_spec::RequestSpec;
use crate::models::target::Target;

const READ_CHUNK: usize = 4096;
// 主动断开时给半关闭留的时间
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Raw HTTP/1.1 request bytes. The response is never parsed, so the request
/// is written by hand to keep it byte-exact.
pub fn build_request(target: &Target, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        target.path,
        target.authority(),
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}

struct Transfer {
    started: Instant,
    bytes_read: u64,
    first_byte: Option<Instant>,
    aborted: bool,
}

/// Runs one streaming exchange per call and always yields an `Outcome`.
#[derive(Clone)]
pub struct StreamExecutor {
    connector: Connector,
    connects: Option<Arc<ConnectTracker>>,
}

impl StreamExecutor {
    pub fn new(connector: Connector) -> Self {
        StreamExecutor {
            connector,
            connects: None,
        }
    }

    /// Report how each connect attempt ended; the caller marks the round
    /// pending when it dispatches it.
    pub fn with_connect_tracker(mut self, connects: Arc<ConnectTracker>) -> Self {
        self.connects = Some(connects);
        self
    }

    fn settle_connect(&self, connected: bool) {
        if let Some(connects) = &self.connects {
            connects.settle(connected);
        }
    }

    pub async fn execute(&self, spec: &RequestSpec) -> Outcome {
        let mut transfer = Transfer {
            started: Instant::now(),
            bytes_read: 0,
            first_byte: None,
            aborted: false,
        };
        let result = self.exchange(spec, &mut transfer).await;
        let duration = transfer.started.elapsed();

        let (ok, error_text, failure_kind) = match result {
            Ok(()) => (true, String::new(), None),
            Err(e) => (false, e.to_string(), Some(e.kind())),
        };
        let outcome = Outcome {
            index: spec.index,
            ok,
            aborted: transfer.aborted,
            bytes_read: transfer.bytes_read,
            duration_secs: duration.as_secs_f64(),
            ttfb_secs: transfer
                .first_byte
                .map(|t| t.saturating_duration_since(transfer.started).as_secs_f64()),
            error_text,
            failure_kind,
            abort_after_secs: spec.abort_after.map(|d| d.as_secs_f64()),
        };
        debug!(
            index = outcome.index,
            ok = outcome.ok,
            aborted = outcome.aborted,
            bytes = outcome.bytes_read,
            duration_secs = outcome.duration_secs,
            "round finished"
        );
        outcome
    }

    // 连接在所有返回路径上随作用域结束被释放，且只释放一次
    async fn exchange(&self, spec: &RequestSpec, transfer: &mut Transfer) -> Result<(), StreamError> {
        let mut sink = match &spec.output_path {
            Some(path) => match ByteSink::create(path).await {
                Ok(sink) => Some(sink),
                Err(e) => {
                    // 没走到建连这一步，也要结清
                    self.settle_connect(false);
                    return Err(e);
                }
            },
            None => None,
        };
        let connected = self.connector.connect(&spec.target, spec.timeout).await;
        self.settle_connect(connected.is_ok());
        let mut stream = connected?;
        let request = build_request(&spec.target, &spec.body);

        // 从发送请求开始计时
        transfer.started = Instant::now();
        let abort_deadline = spec.abort_after.map(|delay| transfer.started + delay);

        match timeout(spec.timeout, stream.write_all(&request)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(StreamError::transfer(e)),
            Err(_) => {
                return Err(StreamError::Timeout {
                    phase: "sending request",
                    after: spec.timeout,
                })
            }
        }

        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            // 每次阻塞读之前先检查断开时间
            let now = Instant::now();
            let wait = match abort_deadline {
                Some(deadline) if now >= deadline => {
                    transfer.aborted = true;
                    let _ = timeout(SHUTDOWN_GRACE, stream.shutdown()).await;
                    drop(stream);
                    return Ok(());
                }
                Some(deadline) => spec.timeout.min(deadline - now),
                None => spec.timeout,
            };

            match timeout(wait, stream.read(&mut buf)).await {
                Ok(Ok(0)) => return Ok(()),
                Ok(Ok(n)) => {
                    transfer.first_byte.get_or_insert_with(Instant::now);
                    transfer.bytes_read += n as u64;
                    if let Some(sink) = sink.as_mut() {
                        sink.append(&buf[..n]).await?;
                    }
                }
                Ok(Err(e)) => return Err(StreamError::transfer(e)),
                // 等待被断开时间截短，回到循环顶部执行断开
                Err(_) if wait < spec.timeout => continue,
                Err(_) if abort_deadline.is_some_and(|d| Instant::now() >= d) => continue,
                Err(_) => {
                    return Err(StreamError::Timeout {
                        phase: "reading response",
                        after: spec.timeout,
                    })
                }
            }
        }
    }
}
