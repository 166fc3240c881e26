use crate::classifier::FrameClassifier;
use crate::config::EmotionConfig;
use crate::emotion::{dominant_emotion, summarize, EmotionAnalysis, EmotionTimelineEntry};
use crate::source::VideoSource;
use crate::util::sync::lock_or_recover;
use crate::util::{epoch_ms, spawn_periodic, RingBuffer, TickerHandle};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};

const LOG_TARGET: &str = "analysis::emotion";

struct EmotionState {
    running: bool,
    generation: u64,
    timeline: RingBuffer<EmotionTimelineEntry>,
    task: Option<TickerHandle>,
}

/// Samples the dominant facial emotion once per interval.
#[derive(Clone)]
pub struct EmotionAnalyzer {
    config: EmotionConfig,
    classifier: Arc<dyn FrameClassifier>,
    state: Arc<Mutex<EmotionState>>,
}

impl EmotionAnalyzer {
    pub fn new(classifier: Arc<dyn FrameClassifier>, config: EmotionConfig) -> Self {
        let state = EmotionState {
            running: false,
            generation: 0,
            timeline: RingBuffer::new(config.timeline_capacity.max(1)),
            task: None,
        };
        Self {
            config,
            classifier,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, EmotionState> {
        lock_or_recover(&self.state, "emotion state")
    }

    pub async fn start(&self, video: Arc<dyn VideoSource>) -> bool {
        if !self.classifier.is_loaded() {
            if let Err(e) = self.classifier.load().await {
                tracing::error!(target: LOG_TARGET, error = %e, "emotion analyzer failed to start");
                return false;
            }
        }

        let mut st = self.state();
        if st.running {
            tracing::warn!(target: LOG_TARGET, "emotion analysis already running");
            return false;
        }
        st.running = true;
        st.generation += 1;
        st.timeline.clear();

        let generation = st.generation;
        let analyzer = self.clone();
        st.task = Some(spawn_periodic("emotion", self.config.interval, move || {
            let analyzer = analyzer.clone();
            let video = video.clone();
            async move { analyzer.tick(video, generation).await }
        }));
        tracing::info!(target: LOG_TARGET, "emotion analysis started");
        true
    }

    async fn tick(self, video: Arc<dyn VideoSource>, generation: u64) -> ControlFlow<()> {
        let Some(frame) = video.current_frame() else {
            return ControlFlow::Continue(());
        };
        let expressions = match self.classifier.detect_expressions(frame).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::trace!(target: LOG_TARGET, "no face in frame; tick skipped");
                return ControlFlow::Continue(());
            }
            Err(e) => {
                tracing::debug!(target: LOG_TARGET, error = %e, "emotion tick failed");
                return ControlFlow::Continue(());
            }
        };

        let emotion = dominant_emotion(&expressions);
        let mut st = self.state();
        if !st.running || st.generation != generation {
            return ControlFlow::Break(());
        }
        st.timeline.push(EmotionTimelineEntry {
            emotion,
            timestamp: epoch_ms(),
        });
        ControlFlow::Continue(())
    }

    /// Stops sampling and clears the timeline. Safe to call when not running.
    pub fn stop(&self) {
        let task = {
            let mut st = self.state();
            if !st.running {
                return;
            }
            st.running = false;
            st.timeline.clear();
            st.task.take()
        };
        drop(task);
        tracing::info!(target: LOG_TARGET, "emotion analysis stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn timeline(&self) -> Vec<EmotionTimelineEntry> {
        self.state().timeline.to_vec()
    }

    pub fn get_analysis(&self) -> EmotionAnalysis {
        summarize(self.state().timeline.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ExpressionLabel, ExpressionVector, Frame, ScriptedClassifier};
    use crate::emotion::Emotion;
    use crate::source::FrameSlot;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::time::sleep;

    fn video() -> Arc<FrameSlot> {
        let slot = FrameSlot::new();
        slot.publish(Frame::new(1, 1, 1, Bytes::from_static(&[0])));
        Arc::new(slot)
    }

    fn happy() -> ExpressionVector {
        ExpressionVector::default().with(ExpressionLabel::Happy, 0.8)
    }

    #[tokio::test(start_paused = true)]
    async fn samples_once_per_second_and_caps_timeline() {
        let c = Arc::new(ScriptedClassifier::constant(happy(), None));
        let a = EmotionAnalyzer::new(c, EmotionConfig::default());
        assert!(a.start(video()).await);

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(a.timeline().len(), 3);

        sleep(Duration::from_secs(70)).await;
        assert_eq!(a.timeline().len(), 60);

        let analysis = a.get_analysis();
        assert_eq!(analysis.dominant_emotion, Emotion::Happiness);
        assert_eq!(analysis.intensity, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn faceless_frames_are_skipped() {
        let neutral = ExpressionVector::default().with(ExpressionLabel::Neutral, 0.9);
        let c = Arc::new(ScriptedClassifier::new(vec![Some(neutral), None], vec![]));
        let a = EmotionAnalyzer::new(c, EmotionConfig::default());
        assert!(a.start(video()).await);
        sleep(Duration::from_millis(4_500)).await;
        assert_eq!(a.timeline().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_timeline_and_tolerates_repeat() {
        let c = Arc::new(ScriptedClassifier::constant(happy(), None));
        let a = EmotionAnalyzer::new(c, EmotionConfig::default());
        a.stop();
        assert!(a.start(video()).await);
        assert!(!a.start(video()).await);
        sleep(Duration::from_millis(2_500)).await;

        a.stop();
        a.stop();
        assert!(!a.is_running());
        assert!(a.timeline().is_empty());
        sleep(Duration::from_secs(2)).await;
        assert!(a.timeline().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_fails_when_classifier_cannot_load() {
        let c = Arc::new(ScriptedClassifier::constant(happy(), None));
        c.fail_next_load(true);
        let a = EmotionAnalyzer::new(c, EmotionConfig::default());
        assert!(!a.start(video()).await);
        assert!(!a.is_running());
    }
}
