use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Interview backend root, e.g. `http://localhost:8000`
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Countdown budget for a live interview
    pub duration_secs: u64,

    /// Consecutive recognizer restarts allowed without a final result
    pub max_listen_restarts: u32,

    /// Interviewer line used when a chat round-trip fails
    pub fallback_reply: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 600, // 10 minutes
            max_listen_restarts: 3,
            fallback_reply:
                "Sorry, I had trouble responding. Could you please repeat or continue?"
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub width: u32,
    pub height: u32,

    /// Length of each recorded time slice
    pub slice_ms: u64,

    /// Container type of the assembled clip
    pub mime_type: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            slice_ms: 1000,
            mime_type: "video/webm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub preferred_language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            preferred_language: "en-US".to_string(),
        }
    }
}

impl Config {
    /// Load from `<path>.toml` (optional) with `INTERVIEW__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
