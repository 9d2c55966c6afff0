//! Live interview session management
//!
//! This module provides the `InterviewController` that coordinates:
//! - Session lifecycle (join, start, countdown, end)
//! - The conversation exchange with the interviewer backend
//! - Transcript collection in structured and flattened form
//! - Completion (scoring) and best-effort recording upload

pub mod completion;
mod controller;
pub mod countdown;
mod events;
pub mod transcript;

pub use completion::CompletionSummary;
pub use controller::{Devices, InterviewController, SessionInfo};
pub use countdown::{format_clock, Countdown};
pub use events::{Phase, SessionEvent};
pub use transcript::{Message, Role, Transcript};
