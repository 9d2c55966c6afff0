pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod speech;

pub use api::{HttpInterviewApi, InterviewApi, JoinResponse};
pub use config::Config;
pub use error::InterviewError;
pub use media::{
    CaptureConstraints, CaptureDevice, Clip, FileCaptureDevice, MediaChunk, MediaPipeline,
    NullCapture, NullPreview, PreviewSink, RecorderConfig, RecordingBuffer, SegmentedRecorder,
};
pub use session::{
    CompletionSummary, Devices, InterviewController, Message, Phase, Role, SessionEvent,
    SessionInfo, Transcript,
};
pub use speech::{
    ConsoleSynthesizer, RecognitionError, RecognitionEvent, SpeechChannel, SpeechRecognizer,
    SpeechSynthesizer, TurnState, Voice,
};
