use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::recognizer::{RecognitionEvent, SpeechRecognizer};
use super::synth::{select_voice, SpeechSynthesizer};
use super::turn::{TurnGate, TurnState};

/// One recognizer run that owns the listening turn
pub struct ListenRun {
    /// Identifies the turn; a stale run cannot release a newer one
    pub epoch: u64,
    pub events: mpsc::Receiver<RecognitionEvent>,
}

/// Strictly alternating voice I/O: the interviewer speaks, then the candidate.
///
/// Owns the turn gate. Synthesis and recognition are optional; without them
/// the channel degrades to silent output and typed-only input.
pub struct SpeechChannel {
    /// Who owns the voice channel
    gate: TurnGate,

    /// Text-to-speech output; `None` means interviewer lines are text only
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,

    /// Speech-to-text input; `None` means typed input only
    recognizer: Option<Arc<dyn SpeechRecognizer>>,

    /// BCP 47 tag used to pick a voice
    preferred_language: String,

    /// Recognition failed; stay quiet until the next interviewer line
    dormant: AtomicBool,

    /// Consecutive recognizer runs that ended without a final result
    empty_runs: AtomicU32,

    /// Empty runs allowed before listening pauses
    max_restarts: u32,
}

impl SpeechChannel {
    pub fn new(
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        preferred_language: impl Into<String>,
        max_restarts: u32,
    ) -> Self {
        if recognizer.is_none() {
            info!("Speech recognition unavailable; typed input only");
        }
        if synthesizer.is_none() {
            info!("Speech synthesis unavailable; interviewer lines are text only");
        }

        Self {
            gate: TurnGate::new(),
            synthesizer,
            recognizer,
            preferred_language: preferred_language.into(),
            dormant: AtomicBool::new(false),
            empty_runs: AtomicU32::new(0),
            max_restarts,
        }
    }

    pub fn gate(&self) -> &TurnGate {
        &self.gate
    }

    pub fn turn(&self) -> TurnState {
        self.gate.state()
    }

    /// Fixed at construction
    pub fn recognition_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_dormant(&self) -> bool {
        self.dormant.load(Ordering::SeqCst)
    }

    /// Speak from an idle channel. Never fails; returns whether the turn was taken.
    pub async fn speak(&self, text: &str) -> bool {
        self.speak_from(&[TurnState::Idle], text).await
    }

    /// Hand the turn from an in-flight send straight to playback
    pub async fn speak_reply(&self, text: &str) -> bool {
        self.speak_from(&[TurnState::Sending], text).await
    }

    async fn speak_from(&self, from: &[TurnState], text: &str) -> bool {
        if self.gate.begin(from, TurnState::Speaking).is_err() {
            return false;
        }

        // A fresh interviewer line re-arms listening after a failure
        self.dormant.store(false, Ordering::SeqCst);
        self.empty_runs.store(0, Ordering::SeqCst);

        self.play(text).await;

        self.gate.release(TurnState::Speaking);
        true
    }

    async fn play(&self, text: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };

        let voices = synthesizer.voices();
        let Some(voice) = select_voice(&voices, &self.preferred_language) else {
            debug!("No voice installed; skipping playback");
            return;
        };

        debug!("Speaking with {} ({})", voice.name, voice.lang);
        if let Err(e) = synthesizer.speak(text, voice).await {
            warn!("Speech synthesis failed: {:#}", e);
        }
    }

    /// Start recognition if the channel is idle, open, supported and not dormant
    pub async fn begin_listening(&self) -> Option<ListenRun> {
        let recognizer = self.recognizer.as_ref()?;
        if self.is_dormant() {
            return None;
        }

        let epoch = self.gate.enter(&[TurnState::Idle], TurnState::Listening).ok()?;

        match recognizer.start().await {
            // Shutdown or a send may have taken the turn while the recognizer started
            Ok(_) if !self.gate.owns(TurnState::Listening, epoch) => {
                debug!("Listening run {} lost its turn while starting", epoch);
                self.stop_recognizer().await;
                None
            }
            Ok(events) => {
                debug!("Listening (run {})", epoch);
                Some(ListenRun { epoch, events })
            }
            Err(e) => {
                warn!("Speech recognition failed to start: {:#}", e);
                self.go_dormant(epoch);
                None
            }
        }
    }

    /// Take the turn for a network send. Listening is stopped first.
    pub async fn begin_send(&self) -> Result<(), TurnState> {
        let previous = self
            .gate
            .begin(&[TurnState::Idle, TurnState::Listening], TurnState::Sending)?;

        if previous == TurnState::Listening {
            self.stop_recognizer().await;
        }
        Ok(())
    }

    pub fn finish_send(&self) {
        self.gate.release(TurnState::Sending);
    }

    /// A final result arrived; the silence budget starts over
    pub fn note_final(&self) {
        self.empty_runs.store(0, Ordering::SeqCst);
    }

    /// Recognition ended with nothing heard. Returns whether listening may re-arm.
    ///
    /// Only true if this run still owned the turn and the restart budget is not
    /// spent; otherwise the channel goes dormant.
    pub fn end_listening_quietly(&self, epoch: u64) -> bool {
        if !self.gate.release_turn(TurnState::Listening, epoch) {
            return false;
        }

        let runs = self.empty_runs.fetch_add(1, Ordering::SeqCst) + 1;
        if runs > self.max_restarts {
            info!("No speech after {} attempts; listening paused", runs);
            self.dormant.store(true, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Recognition error: release the run's turn and stop auto-restarting
    pub fn go_dormant(&self, epoch: u64) {
        self.dormant.store(true, Ordering::SeqCst);
        self.gate.release_turn(TurnState::Listening, epoch);
    }

    async fn stop_recognizer(&self) {
        if let Some(recognizer) = &self.recognizer {
            if let Err(e) = recognizer.stop().await {
                warn!("Failed to stop speech recognition: {:#}", e);
            }
        }
    }

    /// Close the gate, stop recognition, then cancel playback
    pub async fn shutdown(&self) {
        let previous = self.gate.close();
        debug!("Speech channel closed (was {:?})", previous);

        self.stop_recognizer().await;

        if let Some(synthesizer) = &self.synthesizer {
            synthesizer.cancel();
        }
    }
}
