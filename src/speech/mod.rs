//! Voice I/O for the interview
//!
//! - `turn`: the mutual-exclusion gate (idle / speaking / listening / sending)
//! - `synth`: text-to-speech trait and voice selection
//! - `recognizer`: speech-to-text trait and its events
//! - `channel`: the alternating speak/listen channel built on the gate

pub mod channel;
pub mod recognizer;
pub mod synth;
pub mod turn;

pub use channel::{ListenRun, SpeechChannel};
pub use recognizer::{RecognitionError, RecognitionEvent, SpeechRecognizer};
pub use synth::{select_voice, ConsoleSynthesizer, SpeechSynthesizer, Voice};
pub use turn::{TurnGate, TurnState};
