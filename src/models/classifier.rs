//! Classifier abstraction shared by every supported model format

use crate::feature_extractor::FeatureRecord;
use anyhow::Result;
use std::sync::Arc;

/// A trained binary classifier.
///
/// `predict` is always available. Probability estimation and feature
/// importances depend on the model family; callers probe for them and treat
/// `None` as "not supported".
pub trait Classifier: Send + Sync {
    /// Short model family name used in logs
    fn name(&self) -> &str;

    /// Predict the class label of a single-row batch.
    fn predict(&self, record: &FeatureRecord) -> Result<i64>;

    /// Estimate `[P(class 0), P(class 1)]` for a single-row batch.
    fn predict_proba(&self, _record: &FeatureRecord) -> Option<Result<[f64; 2]>> {
        None
    }

    /// Importance weight of each input, in schema order.
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}

/// Shared, immutable handle to the loaded model
pub type ClassifierHandle = Arc<dyn Classifier>;
