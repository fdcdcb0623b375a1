use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use voxstream::audio::{AudioCapture, MicrophoneCapture, WavFileCapture};
use voxstream::session::{SessionObserver, SessionOrchestrator};
use voxstream::stt::TranscriptSegment;
use voxstream::Config;

#[derive(Parser, Debug)]
#[command(name = "voxstream", about = "Real-time speech-to-text streaming client")]
struct Args {
    /// Config profile path (TOML, extension omitted)
    #[arg(short, long, default_value = "config/voxstream")]
    config: String,

    /// Transcribe a WAV file instead of the microphone
    #[arg(long)]
    wav: Option<String>,

    /// Override the recognition language
    #[arg(short, long)]
    language: Option<String>,

    /// Override the recognition model
    #[arg(short, long)]
    model: Option<String>,

    /// Write the transcript as JSON when the session ends
    #[arg(long)]
    json_out: Option<String>,

    /// Write the transcript as SRT subtitles when the session ends
    #[arg(long)]
    srt_out: Option<String>,
}

/// Prints interim results in place and finals on their own line.
struct ConsolePrinter;

impl SessionObserver for ConsolePrinter {
    fn on_transcript_interim(&self, text: &str, _confidence: f32) {
        print!("\r\x1b[K… {}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_transcript_final(&self, segment: &TranscriptSegment) {
        println!("\r\x1b[K{}", segment.text);
    }

    fn on_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let mut stt = cfg.stt.clone();
    if let Some(language) = args.language {
        stt.language = language;
    }
    if let Some(model) = args.model {
        stt.model = model;
    }

    let capture: Box<dyn AudioCapture> = match &args.wav {
        Some(path) => Box::new(WavFileCapture::new(path, cfg.capture_config())),
        None => Box::new(MicrophoneCapture::new(cfg.capture_config())),
    };

    let orchestrator = Arc::new(SessionOrchestrator::new());
    orchestrator.register_observer(Arc::new(ConsolePrinter));

    let session_id = orchestrator.start_session(stt, capture).await?;
    info!("Session {} running, press Ctrl-C to stop", session_id);

    // For file replay the session drains on its own; either way Ctrl-C
    // ends it.
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    println!();

    let summary = orchestrator.stop_session().await?;
    if let Some(summary) = &summary {
        info!(
            "Transcribed {} words in {:.1}s",
            summary.word_count, summary.duration_secs
        );
    } else {
        warn!("Session ended without a summary");
    }

    if let Some(path) = &args.json_out {
        std::fs::write(path, orchestrator.export_json()?)
            .with_context(|| format!("failed to write {}", path))?;
        info!("Wrote {}", path);
    }
    if let Some(path) = &args.srt_out {
        std::fs::write(path, orchestrator.export_srt())
            .with_context(|| format!("failed to write {}", path))?;
        info!("Wrote {}", path);
    }

    Ok(())
}
