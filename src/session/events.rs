use serde::Serialize;

use super::completion::CompletionSummary;
use super::transcript::Message;

/// Lifecycle phase of an interview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Live,
    Ended,
}

/// Notifications for whatever renders the session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged { phase: Phase },

    /// Once per second while live
    Tick { remaining_secs: u64, clock: String },

    /// Partial recognition result
    Interim { text: String },

    /// A line was appended to the transcript
    Message { message: Message },

    ListeningStarted,

    ListeningStopped { dormant: bool },

    /// Recoverable problem worth showing (device denied, chat hiccup)
    Notice { message: String },

    /// Scoring succeeded; the summary view can render now
    Completed { score: Option<f64> },

    /// Best-effort upload result, after `Completed`
    RecordingUploaded { uploaded: bool },

    /// Scoring failed; no terminal view
    CompletionFailed { message: String },

    /// Final summary once teardown is done
    Finished { summary: CompletionSummary },
}
