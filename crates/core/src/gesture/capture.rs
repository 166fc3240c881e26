use crate::classifier::{FrameClassifier, LandmarkSet};
use crate::source::VideoSource;
use crate::util::{spawn_periodic, TickerHandle};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

const LOG_TARGET: &str = "analysis::gesture::capture";

/// Runs pose inference on the current frame every `interval` and forwards
/// detected poses to `poses`.
///
/// A full channel drops the pose; a closed channel ends the loop.
pub fn spawn_pose_capture(
    classifier: Arc<dyn FrameClassifier>,
    video: Arc<dyn VideoSource>,
    poses: mpsc::Sender<LandmarkSet>,
    interval: Duration,
) -> TickerHandle {
    spawn_periodic("pose-capture", interval, move || {
        let classifier = classifier.clone();
        let video = video.clone();
        let poses = poses.clone();
        async move {
            if poses.is_closed() {
                return ControlFlow::Break(());
            }
            let Some(frame) = video.current_frame() else {
                return ControlFlow::Continue(());
            };
            let pose = match classifier.detect_pose(frame).await {
                Ok(Some(pose)) => pose,
                Ok(None) => return ControlFlow::Continue(()),
                Err(e) => {
                    tracing::debug!(target: LOG_TARGET, error = %e, "pose inference failed");
                    return ControlFlow::Continue(());
                }
            };
            match poses.try_send(pose) {
                Ok(()) => ControlFlow::Continue(()),
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(target: LOG_TARGET, "gesture consumer behind; pose dropped");
                    ControlFlow::Continue(())
                }
                Err(TrySendError::Closed(_)) => ControlFlow::Break(()),
            }
        }
    })
}
