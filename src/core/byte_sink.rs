use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::core::stream_error::StreamError;

/// Append-only file holding the raw bytes of one round.
pub struct ByteSink {
    path: PathBuf,
    file: File,
}

impl ByteSink {
    pub fn round_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("req_{index}.bin"))
    }

    // 每轮开始时清空
    pub async fn create(path: &Path) -> Result<Self, StreamError> {
        let file = File::create(path).await.map_err(|e| StreamError::Sink {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(ByteSink {
            path: path.to_path_buf(),
            file,
        })
    }

    pub async fn append(&mut self, chunk: &[u8]) -> Result<(), StreamError> {
        let written = match self.file.write_all(chunk).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| StreamError::Sink {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}
