use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Why recognition stopped without a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    NoSpeech,
    /// Microphone permission revoked
    NotAllowed,
    /// Runtime cannot recognize speech
    Unsupported,
    Other(String),
}

/// Output of one recognition run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Partial hypothesis for live feedback
    Interim(String),
    /// Exactly one per utterance
    Final(String),
    Error(RecognitionError),
    /// The recognizer stopped on its own (silence timeout)
    Ended,
}

/// Speech-to-text input
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin capturing; the channel closes when recognition stops
    async fn start(&self) -> Result<mpsc::Receiver<RecognitionEvent>>;

    async fn stop(&self) -> Result<()>;
}
