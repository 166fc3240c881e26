use crate::classifier::{ExpressionVector, FrameClassifier};
use crate::config::StressConfig;
use crate::source::VideoSource;
use crate::stress::{
    detection_stats, score_frame, smooth, stress_feedback, BaselineCalibration, DetectionStats,
    StressAnalysis, StressDetectionResult, StressTimeline, StressTimelineEntry,
};
use crate::util::sync::lock_or_recover;
use crate::util::{epoch_ms, spawn_periodic, RingBuffer, TickerHandle};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

const LOG_TARGET: &str = "analysis::stress";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StressPhase {
    Uninitialized,
    Initialized,
    Calibrating,
    BaselineReady,
    Detecting,
}

struct StressState {
    initialized: bool,
    video: Option<Arc<dyn VideoSource>>,

    calibrating: bool,
    calibration_generation: u64,
    calibration_samples: Vec<ExpressionVector>,
    calibration_task: Option<JoinHandle<()>>,
    detect_after_calibration: bool,
    baseline: Option<BaselineCalibration>,

    detecting: bool,
    detection_generation: u64,
    detection_task: Option<TickerHandle>,
    history: RingBuffer<StressDetectionResult>,
    timeline: StressTimeline,
    last_timeline_at: Option<Instant>,
}

impl StressState {
    fn new(config: &StressConfig) -> Self {
        Self {
            initialized: false,
            video: None,
            calibrating: false,
            calibration_generation: 0,
            calibration_samples: Vec::with_capacity(config.calibration_samples_target),
            calibration_task: None,
            detect_after_calibration: false,
            baseline: None,
            detecting: false,
            detection_generation: 0,
            detection_task: None,
            history: RingBuffer::new(config.history_capacity().max(1)),
            timeline: StressTimeline::new(config.timeline_window),
            last_timeline_at: None,
        }
    }

    fn calibration_is(&self, generation: u64) -> bool {
        self.calibrating && self.calibration_generation == generation
    }

    fn detection_is(&self, generation: u64) -> bool {
        self.detecting && self.detection_generation == generation
    }
}

/// Baseline calibration plus periodic stress detection for one subject.
///
/// Cloning yields another handle to the same analyzer. Preconditions that
/// are not met (detecting without a baseline, calibrating twice, ...) are
/// reported as `false` and logged; they never panic or error.
#[derive(Clone)]
pub struct StressAnalyzer {
    config: StressConfig,
    classifier: Arc<dyn FrameClassifier>,
    state: Arc<Mutex<StressState>>,
}

impl StressAnalyzer {
    pub fn new(classifier: Arc<dyn FrameClassifier>, config: StressConfig) -> Self {
        let state = StressState::new(&config);
        Self {
            config,
            classifier,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, StressState> {
        lock_or_recover(&self.state, "stress state")
    }

    /// Loads the classifier unless it already is, and binds the video source.
    pub async fn initialize(&self, video: Arc<dyn VideoSource>) -> bool {
        if !self.classifier.is_loaded() {
            if let Err(e) = self.classifier.load().await {
                tracing::error!(
                    target: LOG_TARGET,
                    error = %e,
                    "stress analyzer initialization failed"
                );
                return false;
            }
        }
        let mut st = self.state();
        st.video = Some(video);
        st.initialized = true;
        tracing::info!(target: LOG_TARGET, "stress analyzer initialized");
        true
    }

    pub fn start_calibration(&self) -> bool {
        let mut st = self.state();
        if !st.initialized {
            tracing::warn!(target: LOG_TARGET, "calibration requested before initialization");
            return false;
        }
        if st.calibrating {
            tracing::warn!(target: LOG_TARGET, "calibration already in progress");
            return false;
        }
        let Some(video) = st.video.clone() else {
            return false;
        };

        st.calibrating = true;
        st.calibration_generation += 1;
        st.calibration_samples.clear();
        let generation = st.calibration_generation;

        let analyzer = self.clone();
        st.calibration_task = Some(tokio::spawn(async move {
            analyzer.run_calibration(video, generation).await;
        }));
        tracing::info!(
            target: LOG_TARGET,
            duration_ms = self.config.calibration_duration.as_millis() as u64,
            target_samples = self.config.calibration_samples_target,
            "calibration started"
        );
        true
    }

    /// Number of samples collected so far, or `None` once this run was cancelled.
    fn calibration_samples_collected(&self, generation: u64) -> Option<usize> {
        let st = self.state();
        st.calibration_is(generation)
            .then_some(st.calibration_samples.len())
    }

    // Each sample is awaited before the next is scheduled, so calibration
    // never has two inference calls in flight.
    async fn run_calibration(self, video: Arc<dyn VideoSource>, generation: u64) {
        let deadline = Instant::now() + self.config.calibration_duration;
        let pause = self.config.calibration_sample_interval();
        let target = self.config.calibration_samples_target;

        loop {
            let Some(collected) = self.calibration_samples_collected(generation) else {
                tracing::debug!(target: LOG_TARGET, "calibration loop cancelled");
                return;
            };
            if collected >= target || Instant::now() >= deadline {
                break;
            }

            match video.current_frame() {
                Some(frame) => match self.classifier.detect_expressions(frame).await {
                    Ok(Some(expressions)) => {
                        let mut st = self.state();
                        if !st.calibration_is(generation) {
                            return;
                        }
                        st.calibration_samples.push(expressions);
                    }
                    Ok(None) => {
                        tracing::trace!(target: LOG_TARGET, "no face in calibration sample");
                    }
                    Err(e) => {
                        tracing::debug!(
                            target: LOG_TARGET,
                            error = %e,
                            "calibration sample failed"
                        );
                    }
                },
                None => {
                    tracing::trace!(target: LOG_TARGET, "no frame available for calibration");
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                sleep(pause.min(remaining)).await;
            }
        }

        self.finish_calibration(generation);
    }

    fn finish_calibration(&self, generation: u64) {
        let detect_now = {
            let mut st = self.state();
            if !st.calibration_is(generation) {
                return;
            }
            st.calibrating = false;
            st.calibration_task = None;

            let samples = std::mem::take(&mut st.calibration_samples);
            let count = samples.len();
            match BaselineCalibration::from_samples(samples) {
                Some(baseline) => {
                    tracing::info!(target: LOG_TARGET, samples = count, "baseline captured");
                    st.baseline = Some(baseline);
                }
                None => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        "calibration found no face in any sample; no baseline captured"
                    );
                }
            }
            std::mem::take(&mut st.detect_after_calibration) && st.baseline.is_some()
        };

        if detect_now {
            self.start_detection();
        }
    }

    pub fn stop_calibration(&self) {
        let task = {
            let mut st = self.state();
            if !st.calibrating {
                return;
            }
            st.calibrating = false;
            st.detect_after_calibration = false;
            st.calibration_samples.clear();
            st.calibration_task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        tracing::info!(target: LOG_TARGET, "calibration stopped");
    }

    pub fn start_detection(&self) -> bool {
        let mut st = self.state();
        if st.baseline.is_none() {
            tracing::warn!(target: LOG_TARGET, "detection requested without a baseline");
            return false;
        }
        if st.detecting {
            tracing::warn!(target: LOG_TARGET, "detection already running");
            return false;
        }
        let Some(video) = st.video.clone() else {
            return false;
        };

        st.detecting = true;
        st.detection_generation += 1;
        st.last_timeline_at = None;

        let worker = DetectionWorker {
            analyzer: self.clone(),
            video,
            generation: st.detection_generation,
        };
        st.detection_task = Some(spawn_periodic(
            "stress-detection",
            self.config.detection_interval,
            move || {
                let worker = worker.clone();
                async move { worker.tick().await }
            },
        ));
        tracing::info!(
            target: LOG_TARGET,
            interval_ms = self.config.detection_interval.as_millis() as u64,
            "stress detection started"
        );
        true
    }

    pub fn stop_detection(&self) {
        let task = {
            let mut st = self.state();
            if !st.detecting {
                return;
            }
            st.detecting = false;
            st.detection_task.take()
        };
        drop(task);
        tracing::info!(target: LOG_TARGET, "stress detection stopped");
    }

    /// Calibrates and then detects automatically once a baseline exists.
    pub async fn start(&self, video: Arc<dyn VideoSource>) -> bool {
        if !self.initialize(video).await {
            return false;
        }
        self.state().detect_after_calibration = true;
        if !self.start_calibration() {
            self.state().detect_after_calibration = false;
            return false;
        }
        true
    }

    /// Stops calibration and detection and clears the session timeline.
    pub fn stop(&self) {
        self.stop_calibration();
        self.stop_detection();
        let mut st = self.state();
        st.timeline.clear();
        st.last_timeline_at = None;
    }

    /// Returns to the uninitialized state, discarding every derived value.
    pub fn reset(&self) {
        let (calibration, detection) = {
            let mut st = self.state();
            let calibration = st.calibration_task.take();
            let detection = st.detection_task.take();
            let calibration_generation = st.calibration_generation;
            let detection_generation = st.detection_generation;

            *st = StressState::new(&self.config);
            // Generations stay monotonic so stale tasks never match a new run.
            st.calibration_generation = calibration_generation;
            st.detection_generation = detection_generation;
            (calibration, detection)
        };
        if let Some(task) = calibration {
            task.abort();
        }
        drop(detection);
        tracing::info!(target: LOG_TARGET, "stress analyzer reset");
    }

    pub fn phase(&self) -> StressPhase {
        let st = self.state();
        if !st.initialized {
            StressPhase::Uninitialized
        } else if st.calibrating {
            StressPhase::Calibrating
        } else if st.detecting {
            StressPhase::Detecting
        } else if st.baseline.is_some() {
            StressPhase::BaselineReady
        } else {
            StressPhase::Initialized
        }
    }

    /// Fraction of the target sample count collected, in `[0, 1]`.
    pub fn get_calibration_progress(&self) -> f32 {
        let st = self.state();
        if st.calibrating {
            let target = self.config.calibration_samples_target.max(1) as f32;
            (st.calibration_samples.len() as f32 / target).min(1.0)
        } else if st.baseline.is_some() {
            1.0
        } else {
            0.0
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn is_baseline_ready(&self) -> bool {
        self.state().baseline.is_some()
    }

    pub fn is_calibration_active(&self) -> bool {
        self.state().calibrating
    }

    pub fn is_detection_active(&self) -> bool {
        self.state().detecting
    }

    pub fn baseline(&self) -> Option<BaselineCalibration> {
        self.state().baseline.clone()
    }

    /// Smoothed result over the trailing window of raw detections.
    pub fn get_current_stress_level(&self) -> StressDetectionResult {
        smooth(&self.state().history, self.config.smoothing_window)
    }

    pub fn get_detection_stats(&self) -> DetectionStats {
        let st = self.state();
        detection_stats(&st.history, st.baseline.as_ref().map(BaselineCalibration::age))
    }

    pub fn get_stress_timeline(&self) -> Vec<StressTimelineEntry> {
        self.state().timeline.entries()
    }

    pub fn get_analysis(&self) -> StressAnalysis {
        let current = self.get_current_stress_level();
        let baseline_ready = self.is_baseline_ready();
        StressAnalysis {
            feedback: stress_feedback(&current, baseline_ready),
            current,
            stats: self.get_detection_stats(),
            baseline_ready,
            calibration_progress: self.get_calibration_progress(),
            timeline: self.get_stress_timeline(),
        }
    }
}

#[derive(Clone)]
struct DetectionWorker {
    analyzer: StressAnalyzer,
    video: Arc<dyn VideoSource>,
    generation: u64,
}

impl DetectionWorker {
    async fn tick(self) -> ControlFlow<()> {
        let baseline = {
            let st = self.analyzer.state();
            if !st.detection_is(self.generation) {
                return ControlFlow::Break(());
            }
            match &st.baseline {
                Some(b) => *b.average_expressions(),
                None => return ControlFlow::Break(()),
            }
        };

        let Some(frame) = self.video.current_frame() else {
            tracing::trace!(target: LOG_TARGET, "no frame available for detection");
            return ControlFlow::Continue(());
        };
        let current = match self.analyzer.classifier.detect_expressions(frame).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::trace!(target: LOG_TARGET, "no face in frame; tick skipped");
                return ControlFlow::Continue(());
            }
            Err(e) => {
                tracing::debug!(target: LOG_TARGET, error = %e, "detection tick failed");
                return ControlFlow::Continue(());
            }
        };

        let config = &self.analyzer.config;
        let result = score_frame(&baseline, &current, config);

        let mut st = self.analyzer.state();
        if !st.detection_is(self.generation) {
            tracing::debug!(target: LOG_TARGET, "discarding detection finished after stop");
            return ControlFlow::Break(());
        }
        tracing::trace!(
            target: LOG_TARGET,
            stress = result.stress,
            confidence = result.confidence,
            "detection tick"
        );
        st.history.push(result);

        let now = Instant::now();
        let due = st
            .last_timeline_at
            .map_or(true, |t| now.saturating_duration_since(t) >= config.timeline_interval);
        if due {
            let smoothed = smooth(&st.history, config.smoothing_window);
            st.timeline.push(StressTimelineEntry {
                stress: smoothed.stress,
                confidence: smoothed.confidence,
                timestamp: epoch_ms(),
            });
            st.last_timeline_at = Some(now);
        }
        ControlFlow::Continue(())
    }
}
