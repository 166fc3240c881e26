use crate::classifier::ExpressionVector;
use tokio::time::Instant;

/// A subject's neutral expression profile for one session.
///
/// Built once from the samples collected during calibration and never
/// mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct BaselineCalibration {
    samples: Vec<ExpressionVector>,
    average: ExpressionVector,
    captured: Instant,
}

impl BaselineCalibration {
    /// `None` when no samples were collected.
    pub fn from_samples(samples: Vec<ExpressionVector>) -> Option<Self> {
        let average = ExpressionVector::mean(&samples)?;
        Some(Self {
            samples,
            average,
            captured: Instant::now(),
        })
    }

    pub fn average_expressions(&self) -> &ExpressionVector {
        &self.average
    }

    pub fn samples(&self) -> &[ExpressionVector] {
        &self.samples
    }

    pub fn age(&self) -> std::time::Duration {
        self.captured.elapsed()
    }
}
