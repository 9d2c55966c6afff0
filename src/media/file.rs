use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::device::{CaptureConstraints, CaptureDevice, MediaChunk};

/// Replays a media file as if it were the camera + microphone stream
///
/// The file is cut into fixed-size pieces emitted at a steady pace. The stream
/// ends when the file is exhausted or the device is released.
pub struct FileCaptureDevice {
    path: PathBuf,
    chunk_bytes: usize,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl FileCaptureDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: 64 * 1024,
            interval: Duration::from_millis(250),
            task: None,
        }
    }

    pub fn with_pacing(mut self, chunk_bytes: usize, interval: Duration) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self.interval = interval;
        self
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileCaptureDevice {
    async fn open(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<MediaChunk>> {
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read capture file: {}", self.path.display()))?;
        let data = Bytes::from(data);

        info!(
            "Replaying {} ({} bytes) as capture stream",
            self.path.display(),
            data.len()
        );

        let (tx, rx) = mpsc::channel(32);
        let chunk_bytes = self.chunk_bytes;
        let step_ms = self.interval.as_millis() as u64;
        let interval = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut offset = 0;
            let mut timestamp_ms = 0;

            while offset < data.len() {
                let end = (offset + chunk_bytes).min(data.len());
                let chunk = MediaChunk {
                    data: data.slice(offset..end),
                    timestamp_ms,
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }

                offset = end;
                timestamp_ms += step_ms;
                tokio::time::sleep(interval).await;
            }
        }));

        Ok(rx)
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "file"
    }
}
