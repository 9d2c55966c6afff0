use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::device::{CaptureConstraints, CaptureDevice, NullPreview, PreviewSink};
use super::recorder::{RecorderConfig, RecordingBuffer, SegmentedRecorder};
use crate::error::{InterviewError, Result};

/// Owns the single capture stream shared by the preview and the recorder.
///
/// No other component touches the device; it is reachable only through
/// [`MediaPipeline::start`] and [`MediaPipeline::stop`].
pub struct MediaPipeline {
    /// Camera + microphone source
    device: Box<dyn CaptureDevice>,

    /// Local view; held by the fan-out task while live
    preview: Option<Box<dyn PreviewSink>>,

    /// Requested tracks and resolution
    constraints: CaptureConstraints,

    /// Slice length and container type for the recorder
    recorder_config: RecorderConfig,

    /// Forwards each chunk to the preview and the recorder; returns the preview
    fanout_task: Option<JoinHandle<Box<dyn PreviewSink>>>,

    recorder_task: Option<JoinHandle<RecordingBuffer>>,
}

impl MediaPipeline {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        preview: Box<dyn PreviewSink>,
        constraints: CaptureConstraints,
        recorder_config: RecorderConfig,
    ) -> Self {
        Self {
            device,
            preview: Some(preview),
            constraints,
            recorder_config,
            fanout_task: None,
            recorder_task: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.fanout_task.is_some()
    }

    /// Acquire camera + microphone, attach the muted preview and start recording
    pub async fn start(&mut self) -> Result<()> {
        if self.is_live() {
            warn!("Media pipeline already started");
            return Ok(());
        }

        info!(
            "Opening {} at {}x{}",
            self.device.name(),
            self.constraints.width,
            self.constraints.height
        );

        let mut chunk_rx = self
            .device
            .open(&self.constraints)
            .await
            .map_err(|e| {
                error!("Failed to open {}: {:#}", self.device.name(), e);
                InterviewError::DeviceUnavailable(format!("{:#}", e))
            })?;

        let mut preview = self
            .preview
            .take()
            .unwrap_or_else(|| Box::new(NullPreview));
        preview.attach(true);

        let (record_tx, record_rx) = mpsc::channel(256);
        let recorder = SegmentedRecorder::new(self.recorder_config.clone());
        self.recorder_task = Some(tokio::spawn(recorder.record(record_rx)));

        self.fanout_task = Some(tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                preview.render(&chunk);

                if record_tx.send(chunk).await.is_err() {
                    warn!("Recorder stopped before the capture stream");
                    break;
                }
            }

            // Dropping record_tx lets the recorder flush its tail slice
            preview
        }));

        info!("Media pipeline started");
        Ok(())
    }

    /// Release the devices and wait for the recorder to flush
    ///
    /// A pipeline that never started yields an empty buffer.
    pub async fn stop(&mut self) -> RecordingBuffer {
        let Some(fanout) = self.fanout_task.take() else {
            return RecordingBuffer::empty(self.recorder_config.mime_type.clone());
        };

        info!("Stopping media pipeline");

        if let Err(e) = self.device.release().await {
            error!("Failed to release {}: {:#}", self.device.name(), e);
            // The stream may never close on its own
            fanout.abort();
        } else if self.device.is_capturing() {
            warn!("{} still capturing after release; cutting the stream", self.device.name());
            fanout.abort();
        }

        match fanout.await {
            Ok(mut preview) => {
                preview.detach();
                self.preview = Some(preview);
            }
            Err(e) if e.is_cancelled() => warn!("Preview fan-out cancelled"),
            Err(e) => error!("Preview fan-out task panicked: {}", e),
        }

        let buffer = match self.recorder_task.take() {
            Some(task) => match task.await {
                Ok(buffer) => buffer,
                Err(e) => {
                    error!("Recorder task panicked: {}", e);
                    RecordingBuffer::empty(self.recorder_config.mime_type.clone())
                }
            },
            None => RecordingBuffer::empty(self.recorder_config.mime_type.clone()),
        };

        info!(
            "Media pipeline stopped ({} bytes over {:.1}s)",
            buffer.total_bytes(),
            buffer.duration_ms() as f64 / 1000.0
        );

        buffer
    }
}
