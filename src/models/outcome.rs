use serde::Serialize;

/// Why a round ended with `ok == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connect,
    Refused,
    Reset,
    Timeout,
    Tls,
    Io,
    Sink,
    ResourceExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connect => "connect",
            FailureKind::Refused => "refused",
            FailureKind::Reset => "reset",
            FailureKind::Timeout => "timeout",
            FailureKind::Tls => "tls",
            FailureKind::Io => "io",
            FailureKind::Sink => "sink",
            FailureKind::ResourceExhausted => "resource_exhausted",
        }
    }

    /// The server could not be reached at all, as opposed to a stream that broke mid-flight.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FailureKind::Connect | FailureKind::Refused)
    }
}

/// Result of one round. Produced once by the executor and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub index: u64,
    pub ok: bool,
    pub aborted: bool,
    pub bytes_read: u64,
    pub duration_secs: f64,
    pub ttfb_secs: Option<f64>,
    pub error_text: String,
    pub failure_kind: Option<FailureKind>,
    pub abort_after_secs: Option<f64>,
}
