//! Upstream media sources shared read-only by every analyzer.

mod audio;

use crate::classifier::Frame;
use std::sync::Arc;
use tokio::sync::watch;

pub use audio::{AudioError, AudioStream, FrequencyAnalyser, ScriptedAudioStream};

/// Anything that can hand out the most recently captured frame.
pub trait VideoSource: Send + Sync {
    fn current_frame(&self) -> Option<Frame>;
}

/// Latest-frame slot the host publishes into.
///
/// Readers always observe the newest frame; intermediate frames are dropped.
#[derive(Clone, Debug)]
pub struct FrameSlot {
    tx: Arc<watch::Sender<Option<Frame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, frame: Frame) {
        self.tx.send_replace(Some(frame));
    }

    /// Marks the camera as gone; readers see no frame until the next publish.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for FrameSlot {
    fn current_frame(&self) -> Option<Frame> {
        self.tx.borrow().clone()
    }
}
