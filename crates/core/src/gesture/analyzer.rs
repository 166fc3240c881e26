use crate::classifier::LandmarkSet;
use crate::config::GestureConfig;
use crate::gesture::{
    classify_pose, gesture_feedback, most_frequent, BodyLanguage, FacialEngagement,
    GestureAnalysis, GestureSample, HandMovement, Posture,
};
use crate::util::sync::lock_or_recover;
use crate::util::RingBuffer;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "analysis::gesture";

struct GestureState {
    running: bool,
    generation: u64,
    posture: RingBuffer<Posture>,
    hand_movement: RingBuffer<HandMovement>,
    facial_engagement: RingBuffer<FacialEngagement>,
    body_language: RingBuffer<BodyLanguage>,
    task: Option<JoinHandle<()>>,
}

impl GestureState {
    fn clear_samples(&mut self) {
        self.posture.clear();
        self.hand_movement.clear();
        self.facial_engagement.clear();
        self.body_language.clear();
    }

    fn push(&mut self, sample: GestureSample) {
        self.posture.push(sample.posture);
        self.hand_movement.push(sample.hand_movement);
        self.facial_engagement.push(sample.facial_engagement);
        self.body_language.push(sample.body_language);
    }
}

/// Classifies pose frames into posture, hand, face and body buckets.
///
/// Samples are kept after [`stop`](Self::stop) so a final summary can be
/// read; they are cleared on the next start.
#[derive(Clone)]
pub struct GestureAnalyzer {
    state: Arc<Mutex<GestureState>>,
}

impl GestureAnalyzer {
    pub fn new(config: GestureConfig) -> Self {
        let capacity = config.sample_capacity.max(1);
        let state = GestureState {
            running: false,
            generation: 0,
            posture: RingBuffer::new(capacity),
            hand_movement: RingBuffer::new(capacity),
            facial_engagement: RingBuffer::new(capacity),
            body_language: RingBuffer::new(capacity),
            task: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, GestureState> {
        lock_or_recover(&self.state, "gesture state")
    }

    /// Consumes pose frames from `poses` until stopped or the sender closes.
    pub fn start(&self, mut poses: mpsc::Receiver<LandmarkSet>) -> bool {
        let mut st = self.state();
        if st.running {
            tracing::warn!(target: LOG_TARGET, "gesture analysis already running");
            return false;
        }
        st.running = true;
        st.generation += 1;
        st.clear_samples();

        let generation = st.generation;
        let analyzer = self.clone();
        st.task = Some(tokio::spawn(async move {
            while let Some(pose) = poses.recv().await {
                if !analyzer.record(generation, &pose) {
                    break;
                }
            }
            tracing::debug!(target: LOG_TARGET, "pose stream ended");
        }));
        tracing::info!(target: LOG_TARGET, "gesture analysis started");
        true
    }

    /// Returns false once the session that produced the frame is over.
    fn record(&self, generation: u64, pose: &LandmarkSet) -> bool {
        let sample = classify_pose(pose);
        let mut st = self.state();
        if !st.running || st.generation != generation {
            return false;
        }
        st.push(sample);
        true
    }

    pub fn stop(&self) {
        let task = {
            let mut st = self.state();
            if !st.running {
                return;
            }
            st.running = false;
            st.task.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        tracing::info!(target: LOG_TARGET, "gesture analysis stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn sample_count(&self) -> usize {
        self.state().posture.len()
    }

    pub fn get_analysis(&self) -> GestureAnalysis {
        let st = self.state();
        let posture = most_frequent(st.posture.iter());
        let hand_movement = most_frequent(st.hand_movement.iter());
        let facial_engagement = most_frequent(st.facial_engagement.iter());
        let body_language = most_frequent(st.body_language.iter());
        GestureAnalysis {
            posture,
            hand_movement,
            facial_engagement,
            body_language,
            feedback: gesture_feedback(posture, hand_movement, facial_engagement, body_language)
                .to_string(),
            samples: st.posture.len(),
        }
    }
}
