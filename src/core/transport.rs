use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::TlsConnector;

use crate::core::stream_error::StreamError;
use crate::models::target::Target;

pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

pub type BoxedTransport = Box<dyn Transport>;

/// Opens one fresh connection per round. The TLS context is built once per
/// run and shared; certificates are validated against the target host.
#[derive(Clone)]
pub struct Connector {
    tls: Option<TlsConnector>,
}

impl Connector {
    pub fn for_target(target: &Target) -> anyhow::Result<Self> {
        let tls = if target.is_tls() {
            let connector = native_tls::TlsConnector::new().context("初始化TLS失败")?;
            Some(TlsConnector::from(connector))
        } else {
            None
        };
        Ok(Connector { tls })
    }

    pub async fn connect(
        &self,
        target: &Target,
        limit: Duration,
    ) -> Result<BoxedTransport, StreamError> {
        let addr = target.authority();
        let tcp = match timeout(limit, TcpStream::connect((target.host.as_str(), target.port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(StreamError::connect(addr, e)),
            Err(_) => {
                return Err(StreamError::Timeout {
                    phase: "connecting",
                    after: limit,
                })
            }
        };
        let _ = tcp.set_nodelay(true);

        if !target.is_tls() {
            return Ok(Box::new(tcp));
        }
        let Some(tls) = &self.tls else {
            return Err(StreamError::Tls {
                host: target.host.clone(),
                message: "tls connector not configured".to_string(),
            });
        };
        match timeout(limit, tls.connect(&target.host, tcp)).await {
            Ok(Ok(stream)) => Ok(Box::new(stream)),
            Ok(Err(e)) => Err(StreamError::Tls {
                host: target.host.clone(),
                message: e.to_string(),
            }),
            Err(_) => Err(StreamError::Timeout {
                phase: "tls handshake",
                after: limit,
            }),
        }
    }
}
