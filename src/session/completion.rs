use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::InterviewApi;
use crate::error::{InterviewError, Result};
use crate::media::RecordingBuffer;

/// Terminal view data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionSummary {
    /// `None` when the backend could not score
    pub score: Option<f64>,
    pub recording_uploaded: bool,
    pub recording_bytes: usize,
}

/// Submit the final transcript for scoring. Failure keeps the user out of the
/// terminal view.
pub async fn submit_transcript(
    api: &dyn InterviewApi,
    token: &str,
    transcript: &str,
) -> Result<Option<f64>> {
    info!("Completing interview ({} transcript bytes)", transcript.len());

    match api.complete(token, transcript).await {
        Ok(score) => {
            info!("Interview completed, score: {:?}", score);
            Ok(score)
        }
        Err(e) => {
            error!("Failed to complete interview: {}", e);
            Err(InterviewError::Completion(e.detail()))
        }
    }
}

/// Assemble and upload the recording. Best-effort: returns whether it landed.
pub async fn upload_recording(
    api: &dyn InterviewApi,
    token: &str,
    recording: &RecordingBuffer,
) -> bool {
    if recording.is_empty() {
        info!("No recording captured; skipping upload");
        return false;
    }

    let file_name = format!(
        "interview-{}.{}",
        Uuid::new_v4(),
        extension_for(&recording.mime_type)
    );
    let clip = recording.assemble(file_name);

    match api.upload_recording(token, clip).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Recording upload failed: {}", e);
            false
        }
    }
}

fn extension_for(mime_type: &str) -> &str {
    let subtype = mime_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(str::trim)
        .unwrap_or_default();

    match subtype {
        "" => "bin",
        "x-matroska" => "mkv",
        "quicktime" => "mov",
        other => other,
    }
}
