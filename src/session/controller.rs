use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::completion::{self, CompletionSummary};
use super::countdown::{format_clock, Countdown};
use super::events::{Phase, SessionEvent};
use super::transcript::{Message, Role, Transcript};
use crate::api::{InterviewApi, JoinResponse};
use crate::config::{Config, SessionConfig};
use crate::error::{InterviewError, Result};
use crate::media::{CaptureConstraints, CaptureDevice, MediaPipeline, PreviewSink, RecorderConfig};
use crate::speech::{
    ListenRun, RecognitionEvent, SpeechChannel, SpeechRecognizer, SpeechSynthesizer, TurnState,
};

const MAX_QUESTIONS: usize = 10;

/// Read-only session data obtained when joining
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub token: String,
    pub job_id: Option<i64>,
    pub job_candidate_id: Option<i64>,
    pub job_title: String,
    pub description_md: String,
    pub candidate_name: String,
    pub profile_summary: serde_json::Value,
    /// Suggested questions (at most 10)
    pub questions: Vec<String>,
    pub question_video_urls: Vec<String>,
}

impl SessionInfo {
    fn from_join(token: &str, mut joined: JoinResponse) -> Self {
        joined.questions.truncate(MAX_QUESTIONS);

        Self {
            token: token.to_string(),
            job_id: joined.job_id,
            job_candidate_id: joined.job_candidate_id,
            job_title: joined.job_title,
            description_md: joined.description_md,
            candidate_name: joined.candidate_name,
            profile_summary: joined.profile_summary,
            questions: joined.questions,
            question_video_urls: joined.question_video_urls,
        }
    }
}

/// Device handles the controller takes ownership of
pub struct Devices {
    pub capture: Box<dyn CaptureDevice>,
    pub preview: Box<dyn PreviewSink>,
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
}

/// Drives one live interview from join to completion.
///
/// Phase moves `NotStarted → Live → Ended` only. Voice turns go through the
/// speech channel's gate, and the `ending` latch makes teardown run once no
/// matter how many paths (button, countdown) ask for it.
pub struct InterviewController {
    /// Session data from the join call
    info: SessionInfo,

    /// Duration, restart budget and fallback line
    config: SessionConfig,

    /// Interview backend
    api: Arc<dyn InterviewApi>,

    /// Sole owner of the capture device and recorder
    media: tokio::sync::Mutex<MediaPipeline>,

    /// Voice I/O and the turn gate
    speech: SpeechChannel,

    /// Structured and flattened conversation record
    transcript: Mutex<Transcript>,

    /// Current lifecycle phase
    phase: Mutex<Phase>,

    /// Set while `start` acquires devices; cleared again on failure
    starting: AtomicBool,

    /// Set once by the first `end`; never cleared
    ending: AtomicBool,

    /// Seconds left on the clock, shared with the countdown task
    remaining: Arc<AtomicU64>,

    /// Running countdown, taken by `end`
    countdown: Mutex<Option<Countdown>>,

    /// Filled only after a successful completion
    summary: Mutex<Option<CompletionSummary>>,

    /// Fan-out of session events to any UI
    events: broadcast::Sender<SessionEvent>,
}

impl InterviewController {
    /// Validate the join token and load the session
    ///
    /// Nothing is created when the backend rejects the token.
    pub async fn join(
        token: &str,
        api: Arc<dyn InterviewApi>,
        devices: Devices,
        config: &Config,
    ) -> Result<Arc<Self>> {
        let token = token.trim();
        if token.is_empty() {
            return Err(InterviewError::InvalidOrExpiredLink(
                "Token is required.".to_string(),
            ));
        }

        let joined = api.join(token).await.map_err(|e| match e {
            InterviewError::Api { detail, .. } => InterviewError::InvalidOrExpiredLink(detail),
            other => other,
        })?;

        let info = SessionInfo::from_join(token, joined);
        info!(
            "Joined interview: {} for {} ({} suggested questions)",
            info.job_title,
            info.candidate_name,
            info.questions.len()
        );

        let pipeline = MediaPipeline::new(
            devices.capture,
            devices.preview,
            CaptureConstraints::from(&config.media),
            RecorderConfig::from(&config.media),
        );

        let speech = SpeechChannel::new(
            devices.synthesizer,
            devices.recognizer,
            config.speech.preferred_language.clone(),
            config.session.max_listen_restarts,
        );

        let (events, _) = broadcast::channel(256);

        Ok(Arc::new(Self {
            info,
            config: config.session.clone(),
            api,
            media: tokio::sync::Mutex::new(pipeline),
            speech,
            transcript: Mutex::new(Transcript::new()),
            phase: Mutex::new(Phase::NotStarted),
            starting: AtomicBool::new(false),
            ending: AtomicBool::new(false),
            remaining: Arc::new(AtomicU64::new(config.session.duration_secs)),
            countdown: Mutex::new(None),
            summary: Mutex::new(None),
            events,
        }))
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn turn(&self) -> TurnState {
        self.speech.turn()
    }

    pub fn watch_turn(&self) -> watch::Receiver<TurnState> {
        self.speech.gate().subscribe()
    }

    pub fn recognition_supported(&self) -> bool {
        self.speech.recognition_supported()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.transcript).messages().to_vec()
    }

    pub fn flattened_transcript(&self) -> String {
        lock(&self.transcript).flattened().to_string()
    }

    /// Present only after a successful completion
    pub fn summary(&self) -> Option<CompletionSummary> {
        lock(&self.summary).clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Acquire devices, go live, start the clock and ask the opening question
    ///
    /// A no-op once starting or live. Device failure leaves the session
    /// not-started so the user can retry.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.phase() != Phase::NotStarted || self.starting.swap(true, Ordering::SeqCst) {
            debug!("Interview already started");
            return Ok(());
        }

        info!("Starting interview for token {}", self.info.token);

        // Acquire camera + microphone
        let started = self.media.lock().await.start().await;
        if let Err(e) = started {
            self.starting.store(false, Ordering::SeqCst);
            self.emit(SessionEvent::Notice {
                message: e.to_string(),
            });
            return Err(e);
        }

        // Acknowledge the start with the backend
        if let Err(e) = self.api.start(&self.info.token).await {
            warn!("Start acknowledgement failed: {}", e);
        }

        self.set_phase(Phase::Live);
        self.start_countdown();

        // Seed turn: ask for the opening question
        if let Err(e) = self.exchange(None).await {
            debug!("Opening question skipped: {}", e);
        }

        Ok(())
    }

    fn start_countdown(self: &Arc<Self>) {
        let events = self.events.clone();
        let (countdown, expired) = Countdown::start(
            self.config.duration_secs,
            Arc::clone(&self.remaining),
            move |left| {
                let _ = events.send(SessionEvent::Tick {
                    remaining_secs: left,
                    clock: format_clock(left),
                });
            },
        );

        {
            let mut slot = lock(&self.countdown);
            if self.ending.load(Ordering::SeqCst) {
                // end() already ran its timer step; dropping stops this one
                return;
            }
            *slot = Some(countdown);
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Err means the countdown was stopped first
            if expired.await.is_ok() {
                info!("Interview time is up");
                if let Err(e) = this.end().await {
                    warn!("Automatic end failed: {}", e);
                }
            }
        });
    }

    /// Typed candidate input; works whether or not recognition is available
    pub async fn submit_text(self: &Arc<Self>, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InterviewError::EmptyUtterance);
        }

        self.exchange(Some(text.to_string())).await
    }

    /// One round-trip with the interviewer. `None` is the seed turn.
    ///
    /// Refused unless the channel is idle or listening; never queued.
    async fn exchange(self: &Arc<Self>, utterance: Option<String>) -> Result<()> {
        if self.phase() != Phase::Live || self.is_ending() {
            return Err(InterviewError::NotLive);
        }

        if let Err(state) = self.speech.begin_send().await {
            debug!("Utterance refused while {:?}", state);
            return Err(InterviewError::TurnBusy);
        }

        // Record the candidate line; the backend gets exactly the stored text
        let (prior, candidate_text) = {
            let mut transcript = lock(&self.transcript);
            let prior = transcript.flattened().to_string();
            let appended = utterance
                .as_deref()
                .map(|text| transcript.append(Role::Candidate, text).clone());
            drop(transcript);

            let candidate_text = appended.as_ref().map(|message| message.text.clone());
            if let Some(message) = appended {
                self.emit(SessionEvent::Message { message });
            }
            (prior, candidate_text)
        };

        let reply = match self
            .api
            .chat(&self.info.token, &prior, candidate_text.as_deref())
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                warn!("Interviewer returned an empty reply");
                self.config.fallback_reply.clone()
            }
            Err(e) => {
                warn!("Chat round-trip failed: {}", e);
                self.config.fallback_reply.clone()
            }
        };

        if self.is_ending() {
            // Completion already took its transcript snapshot
            debug!("Session ending; dropping interviewer reply");
            self.speech.finish_send();
            return Ok(());
        }

        let line = {
            let mut transcript = lock(&self.transcript);
            transcript.append(Role::Interviewer, &reply).clone()
        };
        let spoken = line.text.clone();
        self.emit(SessionEvent::Message { message: line });

        if !self.speech.speak_reply(&spoken).await {
            self.speech.finish_send();
        }

        self.arm_listening().await;
        Ok(())
    }

    /// Re-enter listening if the session is live and the channel allows it
    async fn arm_listening(self: &Arc<Self>) {
        if self.is_ending() {
            return;
        }

        if let Some(run) = self.speech.begin_listening().await {
            self.emit(SessionEvent::ListeningStarted);
            tokio::spawn(Arc::clone(self).pump_recognition(run));
        } else if self.speech.is_dormant() {
            self.emit(SessionEvent::ListeningStopped { dormant: true });
        }
    }

    /// Route one recognition run: interim text to the UI, the final utterance
    /// to the exchange. A quiet end re-arms listening while the budget lasts.
    fn pump_recognition(self: Arc<Self>, run: ListenRun) -> BoxFuture<'static, ()> {
        let ListenRun { epoch, mut events } = run;
        Box::pin(async move {
            while let Some(event) = events.recv().await {
                match event {
                    RecognitionEvent::Interim(text) => {
                        self.emit(SessionEvent::Interim { text });
                    }
                    RecognitionEvent::Final(text) => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        self.speech.note_final();
                        if let Err(e) = self.exchange(Some(text.trim().to_string())).await {
                            debug!("Recognized utterance dropped: {}", e);
                        }
                        return;
                    }
                    RecognitionEvent::Error(kind) => {
                        warn!("Speech recognition error: {:?}", kind);
                        self.speech.go_dormant(epoch);
                        self.emit(SessionEvent::ListeningStopped { dormant: true });
                        return;
                    }
                    RecognitionEvent::Ended => break,
                }
            }

            if self.is_ending() {
                return;
            }

            if self.speech.end_listening_quietly(epoch) {
                self.arm_listening().await;
            } else if self.speech.is_dormant() {
                self.emit(SessionEvent::ListeningStopped { dormant: true });
            }
        })
    }

    /// End the interview and run completion, exactly once
    ///
    /// Teardown order: recognition, synthesis, countdown, recorder and tracks,
    /// then scoring and upload. Later or concurrent calls return `Ok(None)`.
    pub async fn end(self: &Arc<Self>) -> Result<Option<CompletionSummary>> {
        if self.phase() == Phase::NotStarted {
            debug!("End requested before start; ignoring");
            return Ok(None);
        }

        if self.ending.swap(true, Ordering::SeqCst) {
            debug!("Interview already ending");
            return Ok(None);
        }

        let transcript = self.flattened_transcript();
        info!(
            "Ending interview with {}s left ({} transcript lines)",
            self.remaining_secs(),
            lock(&self.transcript).len()
        );
        self.set_phase(Phase::Ended);

        // Stop recognition and playback
        self.speech.shutdown().await;

        // Stop the clock
        if let Some(mut countdown) = lock(&self.countdown).take() {
            countdown.stop();
        }

        // Release devices and wait for the last recorded slice
        let recording = self.media.lock().await.stop().await;

        // Submit for scoring
        let score = match completion::submit_transcript(
            self.api.as_ref(),
            &self.info.token,
            &transcript,
        )
        .await
        {
            Ok(score) => score,
            Err(e) => {
                self.emit(SessionEvent::CompletionFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        self.emit(SessionEvent::Completed { score });

        // Upload the recording (best-effort)
        let uploaded =
            completion::upload_recording(self.api.as_ref(), &self.info.token, &recording).await;
        self.emit(SessionEvent::RecordingUploaded { uploaded });

        let summary = CompletionSummary {
            score,
            recording_uploaded: uploaded,
            recording_bytes: recording.total_bytes(),
        };
        *lock(&self.summary) = Some(summary.clone());
        self.emit(SessionEvent::Finished {
            summary: summary.clone(),
        });

        Ok(Some(summary))
    }

    fn is_ending(&self) -> bool {
        self.ending.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: Phase) {
        *lock(&self.phase) = phase;
        info!("Interview phase: {:?}", phase);
        self.emit(SessionEvent::PhaseChanged { phase });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
