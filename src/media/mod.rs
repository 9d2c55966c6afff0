pub mod device;
pub mod file;
pub mod pipeline;
pub mod recorder;

pub use device::{
    CaptureConstraints, CaptureDevice, MediaChunk, NullCapture, NullPreview, PreviewSink,
};
pub use file::FileCaptureDevice;
pub use pipeline::MediaPipeline;
pub use recorder::{Clip, RecordedSegment, RecorderConfig, RecordingBuffer, SegmentedRecorder};
