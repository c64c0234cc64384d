use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::models::outcome::FailureKind;

// EMFILE / ENFILE
#[cfg(unix)]
const FD_EXHAUSTED: [i32; 2] = [24, 23];
#[cfg(not(unix))]
const FD_EXHAUSTED: [i32; 0] = [];

/// A failure inside one round. Never leaves the executor: it is rendered
/// into the round's `Outcome` instead.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connection refused by {addr}")]
    Refused { addr: String },
    #[error("connection reset: {0}")]
    Reset(#[source] io::Error),
    #[error("timed out after {:.3}s while {phase}", .after.as_secs_f64())]
    Timeout { phase: &'static str, after: Duration },
    #[error("tls with {host} failed: {message}")]
    Tls { host: String, message: String },
    #[error("io error: {0}")]
    Io(#[source] io::Error),
    #[error("output sink {path} failed: {source}")]
    Sink {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("local resources exhausted: {0}")]
    ResourceExhausted(#[source] io::Error),
}

impl StreamError {
    pub(crate) fn connect(addr: String, err: io::Error) -> Self {
        if is_resource_exhaustion(&err) {
            return StreamError::ResourceExhausted(err);
        }
        match err.kind() {
            io::ErrorKind::ConnectionRefused => StreamError::Refused { addr },
            _ => StreamError::Connect { addr, source: err },
        }
    }

    /// Errors while writing the request or reading the body.
    pub(crate) fn transfer(err: io::Error) -> Self {
        if is_resource_exhaustion(&err) {
            return StreamError::ResourceExhausted(err);
        }
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => StreamError::Reset(err),
            io::ErrorKind::TimedOut => StreamError::Timeout {
                phase: "transferring",
                after: Duration::ZERO,
            },
            _ => StreamError::Io(err),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            StreamError::Connect { .. } => FailureKind::Connect,
            StreamError::Refused { .. } => FailureKind::Refused,
            StreamError::Reset(_) => FailureKind::Reset,
            StreamError::Timeout { .. } => FailureKind::Timeout,
            StreamError::Tls { .. } => FailureKind::Tls,
            StreamError::Io(_) => FailureKind::Io,
            StreamError::Sink { .. } => FailureKind::Sink,
            StreamError::ResourceExhausted(_) => FailureKind::ResourceExhausted,
        }
    }
}

fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::AddrNotAvailable
        || err
            .raw_os_error()
            .is_some_and(|code| FD_EXHAUSTED.contains(&code))
}
