use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;

/// An installed text-to-speech voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. "en-US"
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Text-to-speech output
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<Voice>;

    /// Play `text`; resolves once playback has finished or was cancelled
    async fn speak(&self, text: &str, voice: &Voice) -> Result<()>;

    /// Cut any playback in progress short
    fn cancel(&self);
}

/// Pick the voice to speak with.
///
/// Order: exact `preferred` tag, then any voice sharing its primary language
/// (`en` for `en-US`), then the first voice. `None` when no voice is installed.
pub fn select_voice<'a>(voices: &'a [Voice], preferred: &str) -> Option<&'a Voice> {
    let preferred = normalize_tag(preferred);
    let primary = preferred.split('-').next().unwrap_or_default().to_string();

    voices
        .iter()
        .find(|v| normalize_tag(&v.lang) == preferred)
        .or_else(|| {
            voices
                .iter()
                .find(|v| !primary.is_empty() && normalize_tag(&v.lang).starts_with(&primary))
        })
        .or_else(|| voices.first())
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// Prints interviewer lines to stdout (text-only sessions)
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("console", "en-US")]
    }

    async fn speak(&self, text: &str, _voice: &Voice) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\nInterviewer: {}", text)?;
        stdout.flush()?;
        Ok(())
    }

    fn cancel(&self) {}
}
