#![deny(warnings)]

mod synthetic;

use anyhow::Context;
use behavior_analysis_core::classifier::{CapabilityScript, Frame, ScriptedClassifier};
use behavior_analysis_core::config::{AnalysisConfig, ConfigOverrides, Env, StdEnv};
use behavior_analysis_core::manager::{AnalysisError, AnalysisManager};
use behavior_analysis_core::source::{FrameSlot, ScriptedAudioStream};
use behavior_analysis_core::util::{retry_with_backoff, RetryConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant};
use tracing_subscriber::EnvFilter;

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

#[derive(Parser, Debug)]
#[command(name = "behavior-analysis")]
#[command(about = "Real-time stress, emotion, gesture and tone analysis of a recording session")]
struct Args {
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one recorded answer against a scripted capture backend and print
    /// the resulting answer record as JSON.
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Session length after start, including calibration.
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,

    /// JSON capability script (expressions, poses, spectra). Generated when absent.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Transcript chunks, pushed evenly over the session.
    #[arg(long)]
    speech: Vec<String>,

    #[arg(long, default_value = "Tell me about a project you are proud of.")]
    question: String,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 3)]
    start_attempts: u32,

    #[arg(long)]
    detection_interval_ms: Option<u64>,

    #[arg(long)]
    calibration_ms: Option<u64>,

    #[arg(long)]
    emotion_interval_ms: Option<u64>,

    #[arg(long)]
    pose_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    match args.command {
        Command::Run(run) => {
            let env = StdEnv;
            let cfg = build_config(&run, &env)?;
            tracing::info!(
                detection_interval_ms = cfg.stress.detection_interval.as_millis() as u64,
                calibration_ms = cfg.stress.calibration_duration.as_millis() as u64,
                "config loaded"
            );
            run_session(run, cfg).await
        }
    }
}

fn build_config(run: &RunArgs, env: &impl Env) -> anyhow::Result<AnalysisConfig> {
    let overrides = ConfigOverrides {
        detection_interval_ms: run.detection_interval_ms,
        calibration_ms: run.calibration_ms,
        emotion_interval_ms: run.emotion_interval_ms,
        pose_interval_ms: run.pose_interval_ms,
    };
    AnalysisConfig::resolve(overrides, env).context("invalid analysis configuration")
}

fn load_backend(
    script: Option<&PathBuf>,
) -> anyhow::Result<(ScriptedClassifier, ScriptedAudioStream)> {
    let Some(path) = script else {
        let mut rng = rand::rng();
        let audio = ScriptedAudioStream::new(synthetic::spectra(&mut rng));
        return Ok((synthetic::classifier(), audio));
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading capability script {}", path.display()))?;
    let script = CapabilityScript::from_json(&raw)
        .with_context(|| format!("parsing capability script {}", path.display()))?;
    let classifier = ScriptedClassifier::from_script(&script)
        .with_context(|| format!("invalid capability script {}", path.display()))?;
    Ok((classifier, ScriptedAudioStream::new(script.spectra)))
}

async fn run_session(run: RunArgs, cfg: AnalysisConfig) -> anyhow::Result<()> {
    let (classifier, audio) = load_backend(run.script.as_ref())?;
    let manager = AnalysisManager::new(Arc::new(classifier), cfg);

    let slot = FrameSlot::new();
    let publisher = tokio::spawn(publish_frames(slot.clone(), run.fps.max(1)));
    let video = Arc::new(slot);

    let retry = RetryConfig::new(run.start_attempts, Duration::from_millis(500));
    retry_with_backoff(
        &retry,
        || manager.start(video.clone(), &audio),
        AnalysisError::is_retryable,
    )
    .await
    .context("failed to start analysis")?;

    let duration = Duration::from_secs(run.duration_secs);
    let started = Instant::now();
    let mut transcript = String::new();
    let mut pushed = 0usize;
    let mut report = interval(Duration::from_secs(1));

    while started.elapsed() < duration {
        report.tick().await;
        let elapsed = started.elapsed();

        let due = speech_chunks_due(run.speech.len(), elapsed, duration);
        while pushed < due {
            if !transcript.is_empty() {
                transcript.push(' ');
            }
            transcript.push_str(&run.speech[pushed]);
            pushed += 1;
            manager.update_speech_text(&transcript);
        }

        let stress = manager.stress();
        if stress.is_calibration_active() {
            tracing::info!(
                progress = stress.get_calibration_progress(),
                "calibrating baseline"
            );
        } else {
            let level = stress.get_current_stress_level();
            tracing::info!(
                stress = level.stress,
                confidence = level.confidence,
                features = ?level.features,
                "stress level"
            );
        }
    }

    let record = manager.record_answer(&run.question, &transcript);
    manager.stop();
    publisher.abort();

    println!(
        "{}",
        serde_json::to_string_pretty(&record).context("serializing answer record")?
    );
    Ok(())
}

/// Number of transcript chunks that should have been spoken by `elapsed`.
fn speech_chunks_due(total: usize, elapsed: Duration, duration: Duration) -> usize {
    if total == 0 || duration.is_zero() {
        return total;
    }
    let fraction = elapsed.as_secs_f64() / duration.as_secs_f64();
    ((fraction * total as f64).ceil() as usize).min(total)
}

async fn publish_frames(slot: FrameSlot, fps: u32) {
    let mut tick = interval(Duration::from_secs(1) / fps);
    let mut sequence = 0u64;
    loop {
        tick.tick().await;
        let pixels = synthetic::pixels((FRAME_WIDTH * FRAME_HEIGHT) as usize);
        slot.publish(Frame::new(sequence, FRAME_WIDTH, FRAME_HEIGHT, pixels));
        sequence += 1;
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use behavior_analysis_core::config::{MapEnv, ENV_CALIBRATION_MS};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["behavior-analysis", "run"];
        argv.extend_from_slice(extra);
        match Args::parse_from(argv).command {
            Command::Run(run) => run,
        }
    }

    #[test]
    fn flag_beats_environment() {
        let env = MapEnv::default().with_var(ENV_CALIBRATION_MS, "3000");
        let cfg = build_config(&run_args(&["--calibration-ms", "4000"]), &env).unwrap();
        assert_eq!(cfg.stress.calibration_duration, Duration::from_millis(4000));

        let cfg = build_config(&run_args(&[]), &env).unwrap();
        assert_eq!(cfg.stress.calibration_duration, Duration::from_millis(3000));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let env = MapEnv::default();
        assert!(build_config(&run_args(&["--detection-interval-ms", "0"]), &env).is_err());
    }

    #[test]
    fn speech_is_spread_over_the_session() {
        let d = Duration::from_secs(10);
        assert_eq!(speech_chunks_due(4, Duration::ZERO, d), 0);
        assert_eq!(speech_chunks_due(4, Duration::from_secs(3), d), 2);
        assert_eq!(speech_chunks_due(4, Duration::from_secs(12), d), 4);
        assert_eq!(speech_chunks_due(0, Duration::from_secs(3), d), 0);
    }

    #[test]
    fn missing_script_file_is_reported() {
        let path = PathBuf::from("/nonexistent/capability-script.json");
        match load_backend(Some(&path)) {
            Ok(_) => panic!("missing script should fail"),
            Err(err) => assert!(format!("{err:#}").contains("reading capability script")),
        }
    }
}
