use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::device::MediaChunk;
use crate::config::MediaConfig;

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Duration of each buffered slice in milliseconds (default: 1000)
    pub slice_ms: u64,
    /// Container type of the assembled clip
    pub mime_type: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            slice_ms: 1000,
            mime_type: "video/webm".to_string(),
        }
    }
}

impl From<&MediaConfig> for RecorderConfig {
    fn from(config: &MediaConfig) -> Self {
        Self {
            slice_ms: config.slice_ms.max(1),
            mime_type: config.mime_type.clone(),
        }
    }
}

/// One time slice of recorded media
#[derive(Debug, Clone)]
pub struct RecordedSegment {
    /// Slice number (0-indexed)
    pub index: usize,
    /// Timestamp of the first chunk in the slice
    pub start_ms: u64,
    /// Timestamp of the last chunk in the slice
    pub end_ms: u64,
    pub data: Bytes,
}

/// Ordered slices captured during a session
#[derive(Debug, Clone)]
pub struct RecordingBuffer {
    pub segments: Vec<RecordedSegment>,
    pub mime_type: String,
}

impl RecordingBuffer {
    pub fn empty(mime_type: impl Into<String>) -> Self {
        Self {
            segments: Vec::new(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.end_ms.saturating_sub(first.start_ms),
            _ => 0,
        }
    }

    /// Concatenate every slice, in order, into a single clip
    pub fn assemble(&self, file_name: impl Into<String>) -> Clip {
        let mut data = BytesMut::with_capacity(self.total_bytes());
        for segment in &self.segments {
            data.extend_from_slice(&segment.data);
        }

        Clip {
            data: data.freeze(),
            mime_type: self.mime_type.clone(),
            file_name: file_name.into(),
        }
    }
}

/// Assembled recording ready for upload
#[derive(Debug, Clone)]
pub struct Clip {
    pub data: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

/// Time-sliced in-memory recorder
///
/// Receives chunks from the capture stream and groups them into fixed-duration
/// slices. Slices already closed survive even if the stream never stops cleanly.
pub struct SegmentedRecorder {
    config: RecorderConfig,
    current: Option<SegmentWriter>,
    next_index: usize,
}

impl SegmentedRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        debug!("Segmented recorder initialized ({}ms slices)", config.slice_ms);

        Self {
            config,
            current: None,
            next_index: 0,
        }
    }

    /// Consume chunks until the channel closes, then flush the tail slice
    pub async fn record(mut self, mut chunk_rx: mpsc::Receiver<MediaChunk>) -> RecordingBuffer {
        let mut buffer = RecordingBuffer::empty(self.config.mime_type.clone());

        while let Some(chunk) = chunk_rx.recv().await {
            if self.should_start_new_slice(&chunk) {
                if let Some(writer) = self.current.take() {
                    buffer.segments.push(writer.finish());
                }
                self.current = Some(SegmentWriter::new(self.next_index, chunk.timestamp_ms));
                self.next_index += 1;
            }

            if let Some(writer) = &mut self.current {
                writer.write(&chunk);
            }
        }

        if let Some(writer) = self.current.take() {
            buffer.segments.push(writer.finish());
        }

        info!(
            "Recording stopped: {} slices, {} bytes",
            buffer.segments.len(),
            buffer.total_bytes()
        );

        buffer
    }

    fn should_start_new_slice(&self, chunk: &MediaChunk) -> bool {
        match &self.current {
            None => true,
            Some(writer) => {
                chunk.timestamp_ms.saturating_sub(writer.start_ms) >= self.config.slice_ms
            }
        }
    }
}

struct SegmentWriter {
    index: usize,
    start_ms: u64,
    end_ms: u64,
    data: BytesMut,
}

impl SegmentWriter {
    fn new(index: usize, start_ms: u64) -> Self {
        Self {
            index,
            start_ms,
            end_ms: start_ms,
            data: BytesMut::new(),
        }
    }

    fn write(&mut self, chunk: &MediaChunk) {
        self.data.extend_from_slice(&chunk.data);
        self.end_ms = chunk.timestamp_ms;
    }

    fn finish(self) -> RecordedSegment {
        RecordedSegment {
            index: self.index,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            data: self.data.freeze(),
        }
    }
}
