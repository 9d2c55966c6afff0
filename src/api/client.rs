use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::messages::{
    ChatRequest, ChatResponse, CompleteRequest, CompleteResponse, ErrorBody, JoinResponse,
    StartRequest,
};
use crate::config::ApiConfig;
use crate::error::{InterviewError, Result};
use crate::media::Clip;

/// The interview endpoints the controller consumes.
///
/// Implemented over HTTP by [`HttpInterviewApi`]; tests provide scripted fakes.
#[async_trait]
pub trait InterviewApi: Send + Sync {
    async fn join(&self, token: &str) -> Result<JoinResponse>;

    async fn start(&self, token: &str) -> Result<()>;

    /// One conversation round-trip. `candidate_message` is `None` for the seed turn.
    async fn chat(
        &self,
        token: &str,
        transcript_so_far: &str,
        candidate_message: Option<&str>,
    ) -> Result<String>;

    async fn complete(&self, token: &str, transcript: &str) -> Result<Option<f64>>;

    async fn upload_recording(&self, token: &str, clip: Clip) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpInterviewApi {
    client: Client,
    base_url: String,
}

impl HttpInterviewApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-2xx into `Api { detail }`, falling back to a generic status line
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message())
            .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));

        debug!("Backend returned {}: {}", status, detail);

        Err(InterviewError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }
}

#[async_trait]
impl InterviewApi for HttpInterviewApi {
    async fn join(&self, token: &str) -> Result<JoinResponse> {
        let response = self
            .client
            .get(self.url("/interview/join"))
            .query(&[("token", token)])
            .send()
            .await?;

        let joined: JoinResponse = Self::json(response).await?;
        info!(
            "Joined interview for {} ({} questions)",
            joined.job_title,
            joined.questions.len()
        );
        Ok(joined)
    }

    async fn start(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/interview/start"))
            .json(&StartRequest {
                token: token.to_string(),
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn chat(
        &self,
        token: &str,
        transcript_so_far: &str,
        candidate_message: Option<&str>,
    ) -> Result<String> {
        let body = ChatRequest {
            token: token.to_string(),
            transcript_so_far: transcript_so_far.to_string(),
            candidate_message: candidate_message.map(str::to_string),
        };

        let response = self
            .client
            .post(self.url("/interview/chat"))
            .json(&body)
            .send()
            .await?;

        let chat: ChatResponse = Self::json(response).await?;
        Ok(chat.reply)
    }

    async fn complete(&self, token: &str, transcript: &str) -> Result<Option<f64>> {
        let response = self
            .client
            .post(self.url("/interview/complete"))
            .json(&CompleteRequest {
                token: token.to_string(),
                transcript: transcript.to_string(),
            })
            .send()
            .await?;

        let completed: CompleteResponse = Self::json(response).await?;
        Ok(completed.score)
    }

    async fn upload_recording(&self, token: &str, clip: Clip) -> Result<()> {
        let size = clip.data.len();
        let file_part = reqwest::multipart::Part::bytes(clip.data.to_vec())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime_type)?;

        let form = reqwest::multipart::Form::new()
            .text("token", token.to_string())
            .part("file", file_part);

        let response = self
            .client
            .post(self.url("/interview/upload-recording"))
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await?;
        info!("Uploaded recording {} ({} bytes)", clip.file_name, size);
        Ok(())
    }
}
