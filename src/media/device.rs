use anyhow::Result;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::MediaConfig;

/// One encoded piece of the muxed camera + microphone stream
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Encoded payload
    pub data: Bytes,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// What the pipeline asks the device for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            width: 1280,
            height: 720,
        }
    }
}

impl From<&MediaConfig> for CaptureConstraints {
    fn from(config: &MediaConfig) -> Self {
        Self {
            audio: true,
            video: true,
            width: config.width,
            height: config.height,
        }
    }
}

/// Camera + microphone capture trait
///
/// Implementations:
/// - Browser: getUserMedia bindings (outside this crate)
/// - File: replay a media file (headless runs)
/// - Tests: scripted devices
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the devices and start capturing
    ///
    /// Returns a channel receiver that yields chunks until the device is released.
    /// Fails if permission is denied or no device exists.
    async fn open(&mut self, constraints: &CaptureConstraints)
        -> Result<mpsc::Receiver<MediaChunk>>;

    /// Release every track; the chunk channel closes afterwards
    async fn release(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Local live view of the capture stream
pub trait PreviewSink: Send {
    /// Bind the sink to the stream. `muted` keeps playback out of the speech channel.
    fn attach(&mut self, muted: bool);

    fn render(&mut self, chunk: &MediaChunk);

    fn detach(&mut self);
}

/// Preview that discards frames (headless runs)
#[derive(Debug, Default)]
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn attach(&mut self, _muted: bool) {}

    fn render(&mut self, _chunk: &MediaChunk) {}

    fn detach(&mut self) {}
}

/// Capture that opens an empty stream (typed-only runs without a media file)
///
/// The stream stays open until released, so the pipeline lifecycle is the same
/// as with a real device. Nothing is recorded.
#[derive(Debug, Default)]
pub struct NullCapture {
    tx: Option<mpsc::Sender<MediaChunk>>,
}

#[async_trait::async_trait]
impl CaptureDevice for NullCapture {
    async fn open(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<mpsc::Receiver<MediaChunk>> {
        let (tx, rx) = mpsc::channel(1);
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn release(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "none"
    }
}
