use thiserror::Error;

/// Failures the interview controller surfaces to its caller.
///
/// Only link-level and completion-level errors are blocking; the rest are
/// reported so a UI can show them while the session carries on.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// Join token rejected by the backend (or blank). Fatal for the page.
    #[error("{0}")]
    InvalidOrExpiredLink(String),

    /// Camera/microphone denied or missing. The session stays not-started.
    #[error("Camera or microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// Another turn (speaking or sending) owns the channel.
    #[error("Please wait for the interviewer to finish")]
    TurnBusy,

    #[error("Message is empty")]
    EmptyUtterance,

    #[error("Interview is not live")]
    NotLive,

    /// Non-2xx backend response; `detail` is shown verbatim.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Final scoring call failed; the terminal view is not reached.
    #[error("Could not complete interview: {0}")]
    Completion(String),
}

impl InterviewError {
    /// Message for the user, without the variant prefix for backend errors.
    pub fn detail(&self) -> String {
        match self {
            InterviewError::Api { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = InterviewError> = std::result::Result<T, E>;
