//! Session orchestration across the four analyzers.

mod record;

use crate::classifier::{ClassifierError, FrameClassifier};
use crate::config::AnalysisConfig;
use crate::emotion::{EmotionAnalysis, EmotionAnalyzer};
use crate::gesture::{spawn_pose_capture, GestureAnalysis, GestureAnalyzer};
use crate::source::{AudioError, AudioStream, VideoSource};
use crate::stress::{StressAnalysis, StressAnalyzer};
use crate::tone::{ToneAnalysis, ToneAnalyzer};
use crate::util::sync::lock_or_recover;
use crate::util::TickerHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub use record::AnswerRecord;

const LOG_TARGET: &str = "analysis::manager";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalyzerKind {
    Stress,
    Emotion,
    Gesture,
    Tone,
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalyzerKind::Stress => "stress",
            AnalyzerKind::Emotion => "emotion",
            AnalyzerKind::Gesture => "gesture",
            AnalyzerKind::Tone => "tone",
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("analysis session already running")]
    AlreadyRunning,

    #[error("inference capability failed to load: {0}")]
    ClassifierLoad(#[from] ClassifierError),

    #[error("audio acquisition failed: {0}")]
    Audio(#[from] AudioError),

    #[error("{0} analyzer failed to start")]
    AnalyzerStart(AnalyzerKind),
}

impl AnalysisError {
    /// Whether the caller may reasonably try `start` again.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::ClassifierLoad(_) => true,
            AnalysisError::Audio(AudioError::Unavailable(_)) => true,
            AnalysisError::Audio(AudioError::PermissionDenied(_)) => false,
            AnalysisError::AlreadyRunning | AnalysisError::AnalyzerStart(_) => false,
        }
    }
}

/// The four analyzer snapshots, side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub tone_analysis: ToneAnalysis,
    pub emotion_analysis: EmotionAnalysis,
    pub gesture_analysis: GestureAnalysis,
    pub stress_analysis: StressAnalysis,
}

#[derive(Default)]
struct ManagerState {
    active: bool,
    pose_capture: Option<TickerHandle>,
}

/// Starts, stops and aggregates the stress, emotion, gesture and tone
/// analyzers for one recording session.
pub struct AnalysisManager {
    config: AnalysisConfig,
    classifier: Arc<dyn FrameClassifier>,
    stress: StressAnalyzer,
    emotion: EmotionAnalyzer,
    gesture: GestureAnalyzer,
    tone: ToneAnalyzer,
    state: Mutex<ManagerState>,
}

impl AnalysisManager {
    pub fn new(classifier: Arc<dyn FrameClassifier>, config: AnalysisConfig) -> Self {
        Self {
            stress: StressAnalyzer::new(classifier.clone(), config.stress.clone()),
            emotion: EmotionAnalyzer::new(classifier.clone(), config.emotion.clone()),
            gesture: GestureAnalyzer::new(config.gesture.clone()),
            tone: ToneAnalyzer::new(config.tone.clone()),
            classifier,
            config,
            state: Mutex::new(ManagerState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManagerState> {
        lock_or_recover(&self.state, "manager state")
    }

    /// Loads the shared classifier once and starts all four analyzers.
    ///
    /// Start is all-or-nothing: if any analyzer fails, every analyzer that
    /// did start is stopped again before the error is returned.
    pub async fn start(
        &self,
        video: Arc<dyn VideoSource>,
        audio: &dyn AudioStream,
    ) -> Result<(), AnalysisError> {
        {
            let mut st = self.state();
            if st.active {
                tracing::warn!(target: LOG_TARGET, "start requested while running");
                return Err(AnalysisError::AlreadyRunning);
            }
            st.active = true;
        }

        match self.start_all(video, audio).await {
            Ok(pose_capture) => {
                self.state().pose_capture = Some(pose_capture);
                tracing::info!(target: LOG_TARGET, "analysis session started");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    target: LOG_TARGET,
                    error = %e,
                    "analysis start failed; rolling back"
                );
                self.stop();
                Err(e)
            }
        }
    }

    async fn start_all(
        &self,
        video: Arc<dyn VideoSource>,
        audio: &dyn AudioStream,
    ) -> Result<TickerHandle, AnalysisError> {
        if !self.classifier.is_loaded() {
            self.classifier.load().await?;
        }

        let (pose_tx, pose_rx) = mpsc::channel(self.config.capture.pose_channel_capacity.max(1));
        let gesture = &self.gesture;
        let tone = &self.tone;
        let (stress, emotion, gesture, tone) = futures::join!(
            self.stress.start(video.clone()),
            self.emotion.start(video.clone()),
            async move { gesture.start(pose_rx) },
            async move { tone.start(audio) },
        );

        match tone {
            Ok(true) => {}
            Ok(false) => return Err(AnalysisError::AnalyzerStart(AnalyzerKind::Tone)),
            Err(e) => return Err(e.into()),
        }
        for (kind, ok) in [
            (AnalyzerKind::Stress, stress),
            (AnalyzerKind::Emotion, emotion),
            (AnalyzerKind::Gesture, gesture),
        ] {
            if !ok {
                return Err(AnalysisError::AnalyzerStart(kind));
            }
        }

        Ok(spawn_pose_capture(
            self.classifier.clone(),
            video,
            pose_tx,
            self.config.capture.pose_interval,
        ))
    }

    /// Stops every analyzer, whether or not it was started.
    pub fn stop(&self) {
        let pose_capture = {
            let mut st = self.state();
            st.active = false;
            st.pose_capture.take()
        };
        drop(pose_capture);

        self.stress.stop();
        self.emotion.stop();
        self.gesture.stop();
        self.tone.stop();
        tracing::info!(target: LOG_TARGET, "analysis session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state().active
    }

    pub fn get_analysis_results(&self) -> AnalysisResults {
        AnalysisResults {
            tone_analysis: self.tone.get_analysis(),
            emotion_analysis: self.emotion.get_analysis(),
            gesture_analysis: self.gesture.get_analysis(),
            stress_analysis: self.stress.get_analysis(),
        }
    }

    pub fn update_speech_text(&self, text: &str) {
        self.tone.update_speech_text(text);
    }

    /// Snapshot of the current session in the persisted per-answer shape.
    pub fn record_answer(&self, question: &str, answer_text: &str) -> AnswerRecord {
        AnswerRecord::new(
            question,
            answer_text,
            self.get_analysis_results(),
            self.stress.get_stress_timeline(),
        )
    }

    /// Direct access for calibration progress reporting.
    pub fn stress(&self) -> &StressAnalyzer {
        &self.stress
    }

    pub fn tone(&self) -> &ToneAnalyzer {
        &self.tone
    }
}

impl Drop for AnalysisManager {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
