//! Loopback servers the executor and controller tests run against.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone, Copy)]
pub(crate) enum Behavior {
    // 等待后回复固定字节数并关闭
    Reply { bytes: usize, delay: Duration },
    // 持续推送直到客户端断开
    Endless { chunk: usize, every: Duration },
    // 读完请求后不回任何数据
    Silent,
}

pub(crate) struct TestServer {
    pub(crate) addr: SocketAddr,
    pub(crate) accepted: Arc<AtomicUsize>,
    pub(crate) peak_concurrent: Arc<AtomicUsize>,
}

impl TestServer {
    pub(crate) fn url(&self) -> String {
        format!("http://{}/v1/chat/completions?stream=true", self.addr)
    }
}

pub(crate) async fn spawn(behavior: Behavior) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let peak_concurrent = Arc::new(AtomicUsize::new(0));
    let current = Arc::new(AtomicUsize::new(0));

    let accepted_clone = accepted.clone();
    let peak_clone = peak_concurrent.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            accepted_clone.fetch_add(1, Ordering::SeqCst);
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak_clone.fetch_max(now, Ordering::SeqCst);
            let current = current.clone();
            tokio::spawn(handle(socket, behavior, current));
        }
    });

    TestServer {
        addr,
        accepted,
        peak_concurrent,
    }
}

async fn handle(mut socket: TcpStream, behavior: Behavior, current: Arc<AtomicUsize>) {
    // 先读完整个请求，避免带着未读数据关闭时触发RST
    if read_request(&mut socket).await.is_err() {
        current.fetch_sub(1, Ordering::SeqCst);
        return;
    }
    match behavior {
        Behavior::Reply { bytes, delay } => {
            tokio::time::sleep(delay).await;
            // 在客户端看到EOF之前离开计数
            current.fetch_sub(1, Ordering::SeqCst);
            let _ = socket.write_all(&vec![b'x'; bytes]).await;
            let _ = socket.shutdown().await;
            let mut rest = [0u8; 64];
            let _ = socket.read(&mut rest).await;
        }
        Behavior::Endless { chunk, every } => {
            let payload = vec![b'd'; chunk];
            while socket.write_all(&payload).await.is_ok() {
                tokio::time::sleep(every).await;
            }
            current.fetch_sub(1, Ordering::SeqCst);
        }
        Behavior::Silent => {
            let mut rest = [0u8; 64];
            let _ = socket.read(&mut rest).await;
            current.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub(crate) async fn read_request(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buf[..n]);
        if let Some(end) = find_header_end(&request) {
            let head = String::from_utf8_lossy(&request[..end]).to_string();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("Content-Length: "))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < end + length {
                let n = socket.read(&mut buf).await?;
                if n == 0 {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                request.extend_from_slice(&buf[..n]);
            }
            return Ok(request);
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

pub(crate) async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
