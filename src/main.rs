use anyhow::{bail, Result};
use clap::Parser;
use live_interview::{
    CaptureDevice, Config, ConsoleSynthesizer, Devices, FileCaptureDevice, HttpInterviewApi,
    InterviewController, NullCapture, NullPreview, Phase, SessionEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run a live interview from the terminal (typed answers, printed questions)
#[derive(Parser, Debug)]
#[command(name = "live-interview", version)]
struct Args {
    /// Join token from the interview link
    #[arg(long)]
    token: String,

    /// Config file (without extension)
    #[arg(long, default_value = "config/live-interview")]
    config: String,

    /// Override the backend base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Media file replayed as the camera + microphone stream (nothing is recorded without it)
    #[arg(long)]
    media_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(url) = args.api_url {
        cfg.api.base_url = url;
    }
    info!("Interview backend: {}", cfg.api.base_url);

    let api = Arc::new(HttpInterviewApi::new(&cfg.api)?);

    // Replay a file as the capture stream, or run typed-only
    let capture: Box<dyn CaptureDevice> = match &args.media_file {
        Some(path) => Box::new(FileCaptureDevice::new(path)),
        None => {
            info!("No media file given; the interview will not be recorded");
            Box::new(NullCapture::default())
        }
    };

    let devices = Devices {
        capture,
        preview: Box::new(NullPreview),
        synthesizer: Some(Arc::new(ConsoleSynthesizer)),
        recognizer: None,
    };

    let controller = InterviewController::join(&args.token, api, devices, &cfg).await?;
    let session = controller.info();
    println!(
        "Interview for {} with {} ({} minutes). Type your answers; /end to finish.",
        session.job_title,
        session.candidate_name,
        cfg.session.duration_secs / 60
    );

    let mut events = controller.subscribe();
    controller.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim() == "/end" => break,
                Some(line) => {
                    if let Err(e) = controller.submit_text(&line).await {
                        println!("{}", e);
                    }
                }
                None => break,
            },
            event = events.recv() => match event {
                Ok(SessionEvent::Tick { remaining_secs, clock }) if remaining_secs % 60 == 0 => {
                    println!("[{} left]", clock);
                }
                Ok(SessionEvent::PhaseChanged { phase: Phase::Ended }) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(summary) = controller.end().await? {
        print_score(summary.score);
        return Ok(());
    }

    // The countdown got there first; wait for its completion
    loop {
        match events.recv().await {
            Ok(SessionEvent::Finished { summary }) => {
                print_score(summary.score);
                return Ok(());
            }
            Ok(SessionEvent::CompletionFailed { message }) => bail!(message),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} session events", skipped),
            Err(RecvError::Closed) => bail!("Interview ended without a result"),
        }
    }
}

fn print_score(score: Option<f64>) {
    match score {
        Some(score) => println!("Interview complete. Score: {:.0}", score),
        None => println!("Interview complete. Score is not available yet."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_file_is_optional() {
        let args = Args::try_parse_from(["live-interview", "--token", "abc123"]).unwrap();

        assert_eq!(args.token, "abc123");
        assert!(args.media_file.is_none());
        assert_eq!(args.config, "config/live-interview");
    }

    #[test]
    fn test_media_file_flag() {
        let args = Args::try_parse_from([
            "live-interview",
            "--token",
            "abc123",
            "--media-file",
            "capture.webm",
        ])
        .unwrap();

        assert_eq!(args.media_file, Some(PathBuf::from("capture.webm")));
    }
}
