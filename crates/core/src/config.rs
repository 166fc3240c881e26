use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CALIBRATION_MS: u64 = 5_000;
pub const DEFAULT_CALIBRATION_SAMPLES_TARGET: usize = 15;
pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 333;
pub const DEFAULT_STRESS_THRESHOLD: f32 = 0.25;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;
pub const DEFAULT_STRESS_TIMELINE_WINDOW_MS: u64 = 5 * 60 * 1_000;
pub const DEFAULT_STRESS_TIMELINE_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_EMOTION_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_EMOTION_TIMELINE_CAP: usize = 60;
pub const DEFAULT_GESTURE_SAMPLE_CAP: usize = 30;
pub const DEFAULT_PITCH_SAMPLE_CAP: usize = 100;
pub const DEFAULT_TONE_INTERVAL_MS: u64 = 16;
pub const DEFAULT_POSE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_INITIAL_CONFIDENCE_SCORE: f32 = 50.0;

pub const ENV_DETECTION_INTERVAL_MS: &str = "BEHAVIOR_DETECTION_INTERVAL_MS";
pub const ENV_CALIBRATION_MS: &str = "BEHAVIOR_CALIBRATION_MS";
pub const ENV_EMOTION_INTERVAL_MS: &str = "BEHAVIOR_EMOTION_INTERVAL_MS";
pub const ENV_POSE_INTERVAL_MS: &str = "BEHAVIOR_POSE_INTERVAL_MS";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StressConfig {
    pub calibration_duration: Duration,
    pub calibration_samples_target: usize,
    pub detection_interval: Duration,
    /// Minimum deviation from baseline (exclusive) for a label to contribute.
    pub stress_threshold: f32,
    /// Minimum confidence (inclusive) for a tick to count as stress.
    pub confidence_threshold: f32,
    pub smoothing_window: usize,
    pub timeline_window: Duration,
    pub timeline_interval: Duration,
}

impl StressConfig {
    pub fn history_capacity(&self) -> usize {
        self.smoothing_window * 2
    }

    /// Pause between calibration samples so the target count spans the deadline.
    pub fn calibration_sample_interval(&self) -> Duration {
        let target = u32::try_from(self.calibration_samples_target.max(1)).unwrap_or(u32::MAX);
        self.calibration_duration / target
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            calibration_duration: Duration::from_millis(DEFAULT_CALIBRATION_MS),
            calibration_samples_target: DEFAULT_CALIBRATION_SAMPLES_TARGET,
            detection_interval: Duration::from_millis(DEFAULT_DETECTION_INTERVAL_MS),
            stress_threshold: DEFAULT_STRESS_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            timeline_window: Duration::from_millis(DEFAULT_STRESS_TIMELINE_WINDOW_MS),
            timeline_interval: Duration::from_millis(DEFAULT_STRESS_TIMELINE_INTERVAL_MS),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionConfig {
    pub interval: Duration,
    pub timeline_capacity: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_EMOTION_INTERVAL_MS),
            timeline_capacity: DEFAULT_EMOTION_TIMELINE_CAP,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GestureConfig {
    pub sample_capacity: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            sample_capacity: DEFAULT_GESTURE_SAMPLE_CAP,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToneConfig {
    pub interval: Duration,
    pub pitch_capacity: usize,
    pub initial_confidence: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_TONE_INTERVAL_MS),
            pitch_capacity: DEFAULT_PITCH_SAMPLE_CAP,
            initial_confidence: DEFAULT_INITIAL_CONFIDENCE_SCORE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Period of the pose capture loop feeding the gesture analyzer.
    pub pose_interval: Duration,
    pub pose_channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pose_interval: Duration::from_millis(DEFAULT_POSE_INTERVAL_MS),
            pose_channel_capacity: 8,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub stress: StressConfig,
    pub emotion: EmotionConfig,
    pub gesture: GestureConfig,
    pub tone: ToneConfig,
    pub capture: CaptureConfig,
}

/// Values supplied on the command line; `None` falls through to the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub detection_interval_ms: Option<u64>,
    pub calibration_ms: Option<u64>,
    pub emotion_interval_ms: Option<u64>,
    pub pose_interval_ms: Option<u64>,
}

impl AnalysisConfig {
    pub fn resolve(overrides: ConfigOverrides, env: &impl Env) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.stress.detection_interval = resolve_millis(
            overrides.detection_interval_ms,
            ENV_DETECTION_INTERVAL_MS,
            env,
            DEFAULT_DETECTION_INTERVAL_MS,
        )?;
        cfg.stress.calibration_duration = resolve_millis(
            overrides.calibration_ms,
            ENV_CALIBRATION_MS,
            env,
            DEFAULT_CALIBRATION_MS,
        )?;
        cfg.emotion.interval = resolve_millis(
            overrides.emotion_interval_ms,
            ENV_EMOTION_INTERVAL_MS,
            env,
            DEFAULT_EMOTION_INTERVAL_MS,
        )?;
        cfg.capture.pose_interval = resolve_millis(
            overrides.pose_interval_ms,
            ENV_POSE_INTERVAL_MS,
            env,
            DEFAULT_POSE_INTERVAL_MS,
        )?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("stress.calibration_duration", self.stress.calibration_duration),
            ("stress.detection_interval", self.stress.detection_interval),
            ("stress.timeline_interval", self.stress.timeline_interval),
            ("stress.timeline_window", self.stress.timeline_window),
            ("emotion.interval", self.emotion.interval),
            ("tone.interval", self.tone.interval),
            ("capture.pose_interval", self.capture.pose_interval),
        ];
        for (name, d) in durations {
            if d.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        let capacities = [
            ("stress.calibration_samples_target", self.stress.calibration_samples_target),
            ("stress.smoothing_window", self.stress.smoothing_window),
            ("emotion.timeline_capacity", self.emotion.timeline_capacity),
            ("gesture.sample_capacity", self.gesture.sample_capacity),
            ("tone.pitch_capacity", self.tone.pitch_capacity),
            ("capture.pose_channel_capacity", self.capture.pose_channel_capacity),
        ];
        for (name, c) in capacities {
            if c == 0 {
                return Err(ConfigError::ZeroCapacity(name));
            }
        }

        let unit = [
            ("stress.stress_threshold", self.stress.stress_threshold),
            ("stress.confidence_threshold", self.stress.confidence_threshold),
        ];
        for (name, v) in unit {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::OutOfUnitRange(name, v));
            }
        }

        if !(0.0..=100.0).contains(&self.tone.initial_confidence) {
            return Err(ConfigError::InitialConfidence(self.tone.initial_confidence));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
    #[error("{0} must be > 0")]
    ZeroCapacity(&'static str),
    #[error("{0} must be within [0, 1], got {1}")]
    OutOfUnitRange(&'static str, f32),
    #[error("tone.initial_confidence must be within [0, 100], got {0}")]
    InitialConfidence(f32),
    #[error("{key} is not a valid millisecond value: {value:?}")]
    InvalidMillis { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_millis(
    cli_value: Option<u64>,
    env_key: &str,
    env: &impl Env,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let ms = match cli_value {
        Some(v) => v,
        None => match env.var(env_key) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidMillis {
                    key: env_key.to_owned(),
                    value: raw.clone(),
                })?,
            None => default_ms,
        },
    };
    Ok(Duration::from_millis(ms))
}
