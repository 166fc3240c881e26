use crate::classifier::{
    ClassifierError, ExpressionVector, Frame, FrameClassifier, Landmark, LandmarkSet,
};
use crate::util::sync::lock_or_recover;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const LOG_TARGET: &str = "analysis::classifier";

/// A classifier that replays prepared results in order, cycling at the end.
///
/// `None` entries stand for frames where nothing was detected. It backs the
/// CLI's offline sessions and every analyzer test.
pub struct ScriptedClassifier {
    expressions: Mutex<Vec<Option<ExpressionVector>>>,
    poses: Mutex<Vec<Option<LandmarkSet>>>,
    expression_cursor: AtomicUsize,
    pose_cursor: AtomicUsize,
    loaded: AtomicBool,
    load_calls: AtomicUsize,
    fail_load: AtomicBool,
    fail_inference: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    lock_or_recover(m, "scripted classifier")
}

fn next_in_cycle<T: Clone>(items: &[Option<T>], cursor: &AtomicUsize) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let i = cursor.fetch_add(1, Ordering::Relaxed) % items.len();
    items[i].clone()
}

impl ScriptedClassifier {
    pub fn new(
        expressions: Vec<Option<ExpressionVector>>,
        poses: Vec<Option<LandmarkSet>>,
    ) -> Self {
        Self {
            expressions: Mutex::new(expressions),
            poses: Mutex::new(poses),
            expression_cursor: AtomicUsize::new(0),
            pose_cursor: AtomicUsize::new(0),
            loaded: AtomicBool::new(false),
            load_calls: AtomicUsize::new(0),
            fail_load: AtomicBool::new(false),
            fail_inference: AtomicBool::new(false),
        }
    }

    /// Always reports the same expression vector and pose.
    pub fn constant(expressions: ExpressionVector, pose: Option<LandmarkSet>) -> Self {
        Self::new(vec![Some(expressions)], vec![pose])
    }

    pub fn from_script(script: &CapabilityScript) -> Result<Self, ClassifierError> {
        let expressions = script
            .expressions
            .iter()
            .map(|entry| {
                entry.as_ref().map(|raw| {
                    ExpressionVector::from_raw(raw.iter().map(|(k, v)| (k.as_str(), *v)))
                })
            })
            .collect();
        let poses = script
            .poses
            .iter()
            .map(|entry| match entry {
                Some(points) => LandmarkSet::from_points(points.clone()).map(Some),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(expressions, poses))
    }

    /// Swaps the expression script, restarting from its first entry.
    pub fn set_expressions(&self, expressions: Vec<Option<ExpressionVector>>) {
        *lock(&self.expressions) = expressions;
        self.expression_cursor.store(0, Ordering::Relaxed);
    }

    /// Makes the next real load fail once.
    pub fn fail_next_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::Relaxed);
    }

    pub fn fail_inference(&self, fail: bool) {
        self.fail_inference.store(fail, Ordering::Relaxed);
    }

    /// Number of times a real (non-idempotent) load ran.
    pub fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::Relaxed)
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn load(&self) -> BoxFuture<'_, Result<(), ClassifierError>> {
        async move {
            if self.loaded.load(Ordering::Acquire) {
                return Ok(());
            }
            if self.fail_load.swap(false, Ordering::Relaxed) {
                return Err(ClassifierError::LoadFailed("scripted load failure".into()));
            }
            self.load_calls.fetch_add(1, Ordering::Relaxed);
            self.loaded.store(true, Ordering::Release);
            tracing::debug!(target: LOG_TARGET, "scripted classifier loaded");
            Ok(())
        }
        .boxed()
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    fn detect_expressions(
        &self,
        _frame: Frame,
    ) -> BoxFuture<'_, Result<Option<ExpressionVector>, ClassifierError>> {
        async move {
            if !self.is_loaded() {
                return Err(ClassifierError::NotLoaded);
            }
            if self.fail_inference.load(Ordering::Relaxed) {
                return Err(ClassifierError::Inference("scripted inference failure".into()));
            }
            let items = lock(&self.expressions);
            Ok(next_in_cycle(&items, &self.expression_cursor))
        }
        .boxed()
    }

    fn detect_pose(
        &self,
        _frame: Frame,
    ) -> BoxFuture<'_, Result<Option<LandmarkSet>, ClassifierError>> {
        async move {
            if !self.is_loaded() {
                return Err(ClassifierError::NotLoaded);
            }
            if self.fail_inference.load(Ordering::Relaxed) {
                return Err(ClassifierError::Inference("scripted inference failure".into()));
            }
            let items = lock(&self.poses);
            Ok(next_in_cycle(&items, &self.pose_cursor))
        }
        .boxed()
    }
}

/// On-disk description of a scripted capability session.
///
/// Expression entries use the classifier's raw string keys so recorded model
/// output can be pasted in unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CapabilityScript {
    #[serde(default)]
    pub expressions: Vec<Option<BTreeMap<String, f32>>>,
    #[serde(default)]
    pub poses: Vec<Option<Vec<Landmark>>>,
    #[serde(default)]
    pub spectra: Vec<Vec<u8>>,
}

impl CapabilityScript {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ExpressionLabel;
    use bytes::Bytes;

    fn frame() -> Frame {
        Frame::new(0, 2, 2, Bytes::from_static(&[0; 4]))
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let c = ScriptedClassifier::new(vec![], vec![]);
        c.load().await.expect("load");
        c.load().await.expect("reload");
        assert_eq!(c.load_count(), 1);
        assert!(c.is_loaded());
    }

    #[tokio::test]
    async fn inference_before_load_fails() {
        let c = ScriptedClassifier::constant(ExpressionVector::default(), None);
        let err = c.detect_expressions(frame()).await.unwrap_err();
        assert_eq!(err, ClassifierError::NotLoaded);
    }

    #[tokio::test]
    async fn replays_script_cyclically() {
        let angry = ExpressionVector::default().with(ExpressionLabel::Angry, 0.9);
        let c = ScriptedClassifier::new(vec![Some(angry), None], vec![]);
        c.load().await.expect("load");
        assert_eq!(c.detect_expressions(frame()).await, Ok(Some(angry)));
        assert_eq!(c.detect_expressions(frame()).await, Ok(None));
        assert_eq!(c.detect_expressions(frame()).await, Ok(Some(angry)));
        assert_eq!(c.detect_pose(frame()).await, Ok(None));
    }

    #[test]
    fn script_json_goes_through_raw_adapters() {
        let raw = r#"{
            "expressions": [{"angry": 0.7, "contempt": 0.5}, null],
            "spectra": [[10, 20, 30]]
        }"#;
        let script = CapabilityScript::from_json(raw).expect("valid script");
        assert_eq!(script.spectra, vec![vec![10, 20, 30]]);
        let c = ScriptedClassifier::from_script(&script).expect("valid");
        let items = lock(&c.expressions);
        assert_eq!(items[0].map(|v| v.angry), Some(0.7));
        assert_eq!(items[1], None);
    }

    #[test]
    fn script_with_short_pose_is_rejected() {
        let script = CapabilityScript {
            poses: vec![Some(vec![Landmark::default(); 5])],
            ..Default::default()
        };
        assert!(ScriptedClassifier::from_script(&script).is_err());
    }
}
