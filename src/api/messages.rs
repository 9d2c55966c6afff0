use serde::{Deserialize, Serialize};

/// Session metadata returned by `GET /interview/join`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinResponse {
    pub job_id: Option<i64>,
    pub job_candidate_id: Option<i64>,
    pub job_title: String,
    pub description_md: String,
    pub candidate_name: String,
    pub profile_summary: serde_json::Value,
    pub questions: Vec<String>,
    pub question_video_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRequest {
    pub token: String,
}

/// Body of `POST /interview/chat`
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub token: String,
    pub transcript_so_far: String,
    /// `None` only for the seed turn
    pub candidate_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub token: String,
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Error body convention: `{"detail": "..."}` or a list of validation items
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s.clone()),
                        other => other.get("msg").and_then(|m| m.as_str()).map(str::to_string),
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        }
    }
}
