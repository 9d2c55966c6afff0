// Test doubles for the interview controller
//
// A scripted backend plus fake capture, preview, synthesizer and recognizer.
// Each fake exposes shared state so tests can observe what the controller did.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use live_interview::api::JoinResponse;
use live_interview::config::Config;
use live_interview::error::{InterviewError, Result as ApiResult};
use live_interview::media::{CaptureConstraints, CaptureDevice, Clip, MediaChunk, PreviewSink};
use live_interview::session::{Devices, InterviewController, SessionEvent};
use live_interview::speech::{RecognitionEvent, SpeechRecognizer, SpeechSynthesizer, Voice};
use live_interview::InterviewApi;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Semaphore};

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
pub struct FakeApi {
    /// `None` entries make that chat call fail
    replies: Mutex<VecDeque<Option<String>>>,
    reject_join: Mutex<Option<String>>,
    score: Mutex<Option<f64>>,
    fail_complete: AtomicBool,
    fail_upload: AtomicBool,

    /// When set, each chat call waits for a permit
    chat_hold: Mutex<Option<Arc<Semaphore>>>,

    pub join_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub chat_calls: Mutex<Vec<(String, Option<String>)>>,
    pub complete_calls: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<Clip>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.replies.lock().unwrap() = replies.into_iter().map(|r| Some(r.into())).collect();
        self
    }

    pub fn push_failure(&self) {
        self.replies.lock().unwrap().push_back(None);
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Some(reply.to_string()));
    }

    pub fn rejecting_join(self, detail: &str) -> Self {
        *self.reject_join.lock().unwrap() = Some(detail.to_string());
        self
    }

    pub fn with_score(self, score: f64) -> Self {
        *self.score.lock().unwrap() = Some(score);
        self
    }

    pub fn failing_complete(self) -> Self {
        self.fail_complete.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_upload(self) -> Self {
        self.fail_upload.store(true, Ordering::SeqCst);
        self
    }

    pub fn hold_chat(&self) -> Arc<Semaphore> {
        let hold = Arc::new(Semaphore::new(0));
        *self.chat_hold.lock().unwrap() = Some(Arc::clone(&hold));
        hold
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn completed_transcripts(&self) -> Vec<String> {
        self.complete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterviewApi for FakeApi {
    async fn join(&self, _token: &str) -> ApiResult<JoinResponse> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(detail) = self.reject_join.lock().unwrap().clone() {
            return Err(InterviewError::Api {
                status: 404,
                detail,
            });
        }

        Ok(JoinResponse {
            job_title: "Backend Engineer".to_string(),
            candidate_name: "Sam Rivera".to_string(),
            questions: (1..=12).map(|i| format!("Question {}", i)).collect(),
            ..Default::default()
        })
    }

    async fn start(&self, _token: &str) -> ApiResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn chat(
        &self,
        _token: &str,
        transcript_so_far: &str,
        candidate_message: Option<&str>,
    ) -> ApiResult<String> {
        self.chat_calls.lock().unwrap().push((
            transcript_so_far.to_string(),
            candidate_message.map(str::to_string),
        ));

        let hold = self.chat_hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(InterviewError::Api {
                status: 500,
                detail: "Failed to generate interviewer response.".to_string(),
            }),
            None => Ok("Can you tell me more?".to_string()),
        }
    }

    async fn complete(&self, _token: &str, transcript: &str) -> ApiResult<Option<f64>> {
        self.complete_calls
            .lock()
            .unwrap()
            .push(transcript.to_string());

        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(InterviewError::Api {
                status: 400,
                detail: "Interview already completed.".to_string(),
            });
        }
        Ok(*self.score.lock().unwrap())
    }

    async fn upload_recording(&self, _token: &str, clip: Clip) -> ApiResult<()> {
        self.uploads.lock().unwrap().push(clip);

        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(InterviewError::Api {
                status: 500,
                detail: "Storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Capture + preview
// ============================================================================

#[derive(Default)]
pub struct CaptureState {
    pub opens: AtomicUsize,
    pub releases: AtomicUsize,
    pub deny: AtomicBool,
    /// Release reports success but leaves the stream open
    pub stuck: AtomicBool,
    pub constraints: Mutex<Option<CaptureConstraints>>,
}

/// Emits a fixed list of chunks, then holds the stream open until released
pub struct ScriptedCapture {
    chunks: Vec<MediaChunk>,
    state: Arc<CaptureState>,
    tx: Option<mpsc::Sender<MediaChunk>>,
}

impl ScriptedCapture {
    pub fn new(chunks: Vec<MediaChunk>, state: Arc<CaptureState>) -> Self {
        Self {
            chunks,
            state,
            tx: None,
        }
    }
}

#[async_trait]
impl CaptureDevice for ScriptedCapture {
    async fn open(&mut self, constraints: &CaptureConstraints) -> Result<mpsc::Receiver<MediaChunk>> {
        if self.state.deny.load(Ordering::SeqCst) {
            bail!("Permission denied");
        }

        self.state.opens.fetch_add(1, Ordering::SeqCst);
        *self.state.constraints.lock().unwrap() = Some(constraints.clone());

        let (tx, rx) = mpsc::channel(self.chunks.len() + 1);
        for chunk in &self.chunks {
            tx.try_send(chunk.clone())?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn release(&mut self) -> Result<()> {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
        if !self.state.stuck.load(Ordering::SeqCst) {
            self.tx = None;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Default)]
pub struct PreviewLog {
    pub muted: Option<bool>,
    pub rendered: usize,
    pub detached: bool,
}

pub struct RecordingPreview(pub Arc<Mutex<PreviewLog>>);

impl PreviewSink for RecordingPreview {
    fn attach(&mut self, muted: bool) {
        self.0.lock().unwrap().muted = Some(muted);
    }

    fn render(&mut self, _chunk: &MediaChunk) {
        self.0.lock().unwrap().rendered += 1;
    }

    fn detach(&mut self) {
        self.0.lock().unwrap().detached = true;
    }
}

pub fn chunk(data: &'static [u8], timestamp_ms: u64) -> MediaChunk {
    MediaChunk {
        data: Bytes::from_static(data),
        timestamp_ms,
    }
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Default)]
pub struct FakeSynth {
    pub spoken: Mutex<Vec<(String, String)>>,
    voices: Vec<Voice>,
    fail: AtomicBool,
    pub cancels: AtomicUsize,
    /// When set, playback lasts until a permit is added or the synth is cancelled
    hold: Option<Arc<Semaphore>>,
}

impl FakeSynth {
    pub fn new() -> Self {
        Self {
            voices: vec![Voice::new("Samantha", "en-US")],
            ..Default::default()
        }
    }

    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        let synth = Self::new();
        synth.fail.store(true, Ordering::SeqCst);
        synth
    }

    pub fn held() -> (Self, Arc<Semaphore>) {
        let hold = Arc::new(Semaphore::new(0));
        let synth = Self {
            hold: Some(Arc::clone(&hold)),
            ..Self::new()
        };
        (synth, hold)
    }

    pub fn lines(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    async fn speak(&self, text: &str, voice: &Voice) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("audio output busy");
        }

        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), voice.name.clone()));

        if let Some(hold) = &self.hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.close();
        }
    }
}

/// Recognizer driven by the test through the sender of the current run
#[derive(Default)]
pub struct FakeRecognizer {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    current: Mutex<Option<mpsc::Sender<RecognitionEvent>>>,
    /// When set, each start waits for a permit before the run exists
    start_hold: Option<Arc<Semaphore>>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow_start() -> (Self, Arc<Semaphore>) {
        let hold = Arc::new(Semaphore::new(0));
        let recognizer = Self {
            start_hold: Some(Arc::clone(&hold)),
            ..Self::default()
        };
        (recognizer, hold)
    }

    /// A run was started and not yet stopped or finished
    pub fn is_running(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Push an event into the active run; false if nothing is listening
    pub async fn emit(&self, event: RecognitionEvent) -> bool {
        let tx = self.current.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Simulate the recognizer ending a run on its own
    pub async fn finish_run(&self) {
        let tx = self.current.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.send(RecognitionEvent::Ended).await;
        }
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start(&self) -> Result<mpsc::Receiver<RecognitionEvent>> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        if let Some(hold) = &self.start_hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }

        let (tx, rx) = mpsc::channel(16);
        *self.current.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().take();
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: Arc<InterviewController>,
    pub api: Arc<FakeApi>,
    pub capture: Arc<CaptureState>,
    pub preview: Arc<Mutex<PreviewLog>>,
    pub synth: Arc<FakeSynth>,
    pub recognizer: Option<Arc<FakeRecognizer>>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub struct HarnessBuilder {
    api: FakeApi,
    synth: FakeSynth,
    recognizer: bool,
    chunks: Vec<MediaChunk>,
    config: Config,
}

impl HarnessBuilder {
    pub fn new(api: FakeApi) -> Self {
        Self {
            api,
            synth: FakeSynth::new(),
            recognizer: false,
            chunks: vec![chunk(b"webm-header", 0), chunk(b"-frame-1", 500), chunk(b"-frame-2", 1200)],
            config: Config::default(),
        }
    }

    pub fn synth(mut self, synth: FakeSynth) -> Self {
        self.synth = synth;
        self
    }

    pub fn with_recognizer(mut self) -> Self {
        self.recognizer = true;
        self
    }

    pub fn chunks(mut self, chunks: Vec<MediaChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.config.session.duration_secs = secs;
        self
    }

    pub fn max_listen_restarts(mut self, restarts: u32) -> Self {
        self.config.session.max_listen_restarts = restarts;
        self
    }

    pub async fn join(self) -> Result<Harness> {
        let api = Arc::new(self.api);
        let capture = Arc::new(CaptureState::default());
        let preview = Arc::new(Mutex::new(PreviewLog::default()));
        let synth = Arc::new(self.synth);
        let recognizer = self.recognizer.then(|| Arc::new(FakeRecognizer::new()));

        let devices = Devices {
            capture: Box::new(ScriptedCapture::new(self.chunks, Arc::clone(&capture))),
            preview: Box::new(RecordingPreview(Arc::clone(&preview))),
            synthesizer: Some(Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>),
            recognizer: recognizer
                .clone()
                .map(|r| r as Arc<dyn SpeechRecognizer>),
        };

        let controller = InterviewController::join(
            "abc123",
            Arc::clone(&api) as Arc<dyn InterviewApi>,
            devices,
            &self.config,
        )
        .await?;
        let events = controller.subscribe();

        Ok(Harness {
            controller,
            api,
            capture,
            preview,
            synth,
            recognizer,
            events,
        })
    }
}

/// Wait (bounded) for the first event matching `pred`
pub async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, mut pred: F) -> Result<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Duration::from_secs(30);
    tokio::time::timeout(deadline, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Ok(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("event stream closed"),
            }
        }
    })
    .await?
}

/// Flattened transcript must equal the structured list, line by line
pub fn assert_transcript_consistent(controller: &InterviewController) {
    let flattened = controller.flattened_transcript();
    let lines: Vec<String> = controller.messages().iter().map(|m| m.line()).collect();

    if lines.is_empty() {
        assert!(flattened.is_empty());
    } else {
        let split: Vec<&str> = flattened.split('\n').collect();
        assert_eq!(split, lines.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
