use crate::config::ToneConfig;
use crate::source::{AudioError, AudioStream};
use crate::tone::{
    confidence_label, count_words, pitch_from_spectrum, tone_feedback, ToneAnalysis,
    MAX_CONFIDENCE_SCORE, MIN_CONFIDENCE_SCORE,
};
use crate::util::sync::lock_or_recover;
use crate::util::{spawn_periodic, RingBuffer, TickerHandle};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

const LOG_TARGET: &str = "analysis::tone";

struct ToneState {
    running: bool,
    generation: u64,
    pitch: RingBuffer<f32>,
    word_count: usize,
    confidence: f32,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    task: Option<TickerHandle>,
}

impl ToneState {
    fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(start) => self
                .stopped_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }

    fn words_per_minute(&self) -> u32 {
        let minutes = self.elapsed().as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0;
        }
        (self.word_count as f64 / minutes).round() as u32
    }

    fn mean_pitch(&self) -> f32 {
        if self.pitch.is_empty() {
            return 0.0;
        }
        self.pitch.iter().sum::<f32>() / self.pitch.len() as f32
    }
}

/// Samples the audio spectrum every frame interval and tracks speaking pace.
#[derive(Clone)]
pub struct ToneAnalyzer {
    config: ToneConfig,
    state: Arc<Mutex<ToneState>>,
}

impl ToneAnalyzer {
    pub fn new(config: ToneConfig) -> Self {
        let state = ToneState {
            running: false,
            generation: 0,
            pitch: RingBuffer::new(config.pitch_capacity.max(1)),
            word_count: 0,
            confidence: config
                .initial_confidence
                .clamp(MIN_CONFIDENCE_SCORE, MAX_CONFIDENCE_SCORE),
            started_at: None,
            stopped_at: None,
            task: None,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, ToneState> {
        lock_or_recover(&self.state, "tone state")
    }

    /// Attaches an analyser to `audio` and starts sampling.
    ///
    /// Returns `Ok(false)` if already running; acquisition failures are
    /// returned to the caller.
    pub fn start(&self, audio: &dyn AudioStream) -> Result<bool, AudioError> {
        if self.is_running() {
            tracing::warn!(target: LOG_TARGET, "tone analysis already running");
            return Ok(false);
        }
        let mut analyser = audio.create_analyser().inspect_err(|e| {
            tracing::error!(target: LOG_TARGET, error = %e, "audio acquisition failed");
        })?;

        let mut st = self.state();
        if st.running {
            return Ok(false);
        }
        st.running = true;
        st.generation += 1;
        st.pitch.clear();
        st.word_count = 0;
        st.confidence = self
            .config
            .initial_confidence
            .clamp(MIN_CONFIDENCE_SCORE, MAX_CONFIDENCE_SCORE);
        st.started_at = Some(Instant::now());
        st.stopped_at = None;

        let generation = st.generation;
        let analyzer = self.clone();
        let mut bins = vec![0u8; analyser.frequency_bin_count().max(1)];
        st.task = Some(spawn_periodic("tone", self.config.interval, move || {
            analyser.byte_frequency_data(&mut bins);
            let pitch = pitch_from_spectrum(&bins);
            let flow = analyzer.record(generation, pitch);
            std::future::ready(flow)
        }));
        tracing::info!(target: LOG_TARGET, "tone analysis started");
        Ok(true)
    }

    fn record(&self, generation: u64, pitch: f32) -> ControlFlow<()> {
        let mut st = self.state();
        if !st.running || st.generation != generation {
            return ControlFlow::Break(());
        }
        st.pitch.push(pitch);
        ControlFlow::Continue(())
    }

    /// Stops sampling. Samples and word count stay readable until the next start.
    pub fn stop(&self) {
        let task = {
            let mut st = self.state();
            if !st.running {
                return;
            }
            st.running = false;
            st.stopped_at = Some(Instant::now());
            st.task.take()
        };
        drop(task);
        tracing::info!(target: LOG_TARGET, "tone analysis stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Replaces the transcript so far; the word count is recomputed from it.
    pub fn update_speech_text(&self, text: &str) {
        let words = count_words(text);
        self.state().word_count = words;
        tracing::trace!(target: LOG_TARGET, words, "speech text updated");
    }

    /// Moves the confidence score by `delta`, clamped to 0-100.
    pub fn adjust_confidence(&self, delta: f32) -> f32 {
        let mut st = self.state();
        st.confidence = (st.confidence + delta).clamp(MIN_CONFIDENCE_SCORE, MAX_CONFIDENCE_SCORE);
        st.confidence
    }

    pub fn get_analysis(&self) -> ToneAnalysis {
        let st = self.state();
        let pitch = st.mean_pitch();
        let speed = st.words_per_minute();
        ToneAnalysis {
            pitch,
            speed,
            confidence: confidence_label(st.confidence).to_string(),
            confidence_score: st.confidence,
            feedback: tone_feedback(pitch, st.pitch.len(), speed, st.confidence).to_string(),
            samples: st.pitch.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedAudioStream;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn averages_spectrum_into_capped_pitch_buffer() {
        let audio = ScriptedAudioStream::new(vec![vec![255, 255], vec![0, 0]]);
        let t = ToneAnalyzer::new(ToneConfig::default());
        assert_eq!(t.start(&audio), Ok(true));

        sleep(Duration::from_millis(16 * 4 + 8)).await;
        let a = t.get_analysis();
        assert_eq!(a.samples, 4);
        assert!((a.pitch - 50.0).abs() < 1e-4);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(t.get_analysis().samples, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn words_per_minute_since_start() {
        let audio = ScriptedAudioStream::new(vec![vec![128; 8]]);
        let t = ToneAnalyzer::new(ToneConfig::default());
        assert_eq!(t.start(&audio), Ok(true));

        sleep(Duration::from_secs(30)).await;
        t.update_speech_text("one two three four five six seven eight nine ten");
        t.update_speech_text(&"word ".repeat(70));
        assert_eq!(t.get_analysis().speed, 140);

        t.stop();
        sleep(Duration::from_secs(30)).await;
        assert_eq!(t.get_analysis().speed, 140, "pace is frozen at stop");
    }

    #[tokio::test(start_paused = true)]
    async fn acquisition_failure_is_returned() {
        let audio = ScriptedAudioStream::failing(AudioError::PermissionDenied("mic".into()));
        let t = ToneAnalyzer::new(ToneConfig::default());
        assert!(matches!(t.start(&audio), Err(AudioError::PermissionDenied(_))));
        assert!(!t.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_rejected_and_stop_is_idempotent() {
        let audio = ScriptedAudioStream::new(vec![vec![10]]);
        let t = ToneAnalyzer::new(ToneConfig::default());
        t.stop();
        assert_eq!(t.start(&audio), Ok(true));
        assert_eq!(t.start(&audio), Ok(false));
        t.stop();
        t.stop();
        let frozen = t.get_analysis().samples;
        sleep(Duration::from_millis(200)).await;
        assert_eq!(t.get_analysis().samples, frozen);
    }

    #[test]
    fn confidence_accumulator_is_clamped() {
        let t = ToneAnalyzer::new(ToneConfig::default());
        assert_eq!(t.get_analysis().confidence, "Moderately Confident");
        assert_eq!(t.adjust_confidence(45.0), 95.0);
        assert_eq!(t.adjust_confidence(20.0), 100.0);
        assert_eq!(t.get_analysis().confidence, "Very Confident");
        assert_eq!(t.adjust_confidence(-250.0), 0.0);
        assert_eq!(t.get_analysis().confidence, "Nervous");
    }
}
