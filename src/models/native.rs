//! Native model artifacts described in JSON.
//!
//! Two families are supported: a decision-tree ensemble whose leaves hold
//! per-class sample counts, and a logistic regression.

use crate::feature_extractor::{FeatureRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::classifier::{Classifier, ClassifierHandle};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// A model artifact, tagged by family
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModel {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl NativeModel {
    /// Read and validate a model artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        Self::from_slice(&data).with_context(|| format!("Invalid model file {}", path.display()))
    }

    /// Parse and validate a model artifact from JSON bytes
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let model: NativeModel =
            serde_json::from_slice(data).context("Failed to deserialize model")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        match self {
            NativeModel::RandomForest(forest) => forest.validate(),
            NativeModel::LogisticRegression(logistic) => logistic.validate(),
        }
    }

    /// Wrap the model in a shared classifier handle
    pub fn into_handle(self) -> ClassifierHandle {
        match self {
            NativeModel::RandomForest(forest) => Arc::new(forest),
            NativeModel::LogisticRegression(logistic) => Arc::new(logistic),
        }
    }
}

fn check_feature_names(names: &Option<Vec<String>>) -> Result<()> {
    if let Some(names) = names {
        if names.len() != FEATURE_COUNT || names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
            bail!(
                "Model was trained on features {:?}, expected {:?}",
                names,
                FEATURE_NAMES
            );
        }
    }
    Ok(())
}

/// Tree node. Splits send a row left when `value <= threshold`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Per-class training sample counts (or fractions)
        value: [f64; 2],
    },
}

/// A single decision tree; node 0 is the root
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("Tree has no nodes");
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= FEATURE_COUNT {
                        bail!("Node {} splits on unknown feature {}", i, feature);
                    }
                    if left >= self.nodes.len() || right >= self.nodes.len() {
                        bail!("Node {} points outside the tree", i);
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.iter().any(|v| *v < 0.0) || value[0] + value[1] <= 0.0 {
                        bail!("Leaf {} has an empty class distribution", i);
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `row`
    fn leaf_distribution(&self, row: &[f64; FEATURE_COUNT]) -> Result<[f64; 2]> {
        let mut index = 0;
        // A path longer than the node count means the tree has a cycle.
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("Node {} is outside the tree", index))?;
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row
                        .get(feature)
                        .ok_or_else(|| anyhow::anyhow!("Unknown feature {}", feature))?;
                    index = if *value <= threshold { left } else { right };
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    if total <= 0.0 {
                        bail!("Leaf {} has an empty class distribution", index);
                    }
                    return Ok([value[0] / total, value[1] / total]);
                }
            }
        }
        bail!("Tree traversal did not reach a leaf")
    }
}

/// Decision-tree ensemble with averaged leaf distributions
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    #[serde(default)]
    pub(crate) feature_names: Option<Vec<String>>,
    pub(crate) trees: Vec<DecisionTree>,
    #[serde(default)]
    pub(crate) feature_importances: Option<Vec<f64>>,
}

impl RandomForest {
    fn validate(&self) -> Result<()> {
        check_feature_names(&self.feature_names)?;
        if self.trees.is_empty() {
            bail!("Random forest has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().with_context(|| format!("Invalid tree {}", i))?;
        }
        Ok(())
    }

    fn class_distribution(&self, record: &FeatureRecord) -> Result<[f64; 2]> {
        if self.trees.is_empty() {
            bail!("Random forest has no trees");
        }
        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let dist = tree.leaf_distribution(record.values())?;
            sum[0] += dist[0];
            sum[1] += dist[1];
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn predict(&self, record: &FeatureRecord) -> Result<i64> {
        let dist = self.class_distribution(record)?;
        // Ties go to the first class.
        Ok(if dist[1] > dist[0] { 1 } else { 0 })
    }

    fn predict_proba(&self, record: &FeatureRecord) -> Option<Result<[f64; 2]>> {
        Some(self.class_distribution(record))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

/// Logistic regression over the 11 inputs
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    #[serde(default)]
    pub(crate) feature_names: Option<Vec<String>>,
    pub(crate) coefficients: Vec<f64>,
    #[serde(default)]
    pub(crate) intercept: f64,
}

impl LogisticRegression {
    fn validate(&self) -> Result<()> {
        check_feature_names(&self.feature_names)?;
        if self.coefficients.len() != FEATURE_COUNT {
            bail!(
                "Expected {} coefficients, found {}",
                FEATURE_COUNT,
                self.coefficients.len()
            );
        }
        Ok(())
    }

    fn decision_function(&self, record: &FeatureRecord) -> Result<f64> {
        if self.coefficients.len() != FEATURE_COUNT {
            bail!(
                "Expected {} coefficients, found {}",
                FEATURE_COUNT,
                self.coefficients.len()
            );
        }
        Ok(self
            .coefficients
            .iter()
            .zip(record.values())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict(&self, record: &FeatureRecord) -> Result<i64> {
        Ok(if self.decision_function(record)? > 0.0 { 1 } else { 0 })
    }

    fn predict_proba(&self, record: &FeatureRecord) -> Option<Result<[f64; 2]>> {
        Some(self.decision_function(record).map(|z| {
            let p1 = 1.0 / (1.0 + (-z).exp());
            [1.0 - p1, p1]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureExtractor;
    use crate::types::application::PropertyArea;

    // Splits on Credit_History, then on Total_Income_Log.
    const FOREST: &str = r#"{
        "kind": "random_forest",
        "trees": [
            {"nodes": [
                {"feature": 5, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [9.0, 1.0]},
                {"value": [2.0, 8.0]}
            ]},
            {"nodes": [
                {"feature": 10, "threshold": 6.0, "left": 1, "right": 2},
                {"value": [6.0, 4.0]},
                {"value": [0.0, 10.0]}
            ]}
        ],
        "feature_importances": [0.0, 0.0, 0.0, 0.0, 0.0, 0.6, 0.1, 0.0, 0.1, 0.0, 0.2]
    }"#;

    fn record(credit_good: bool, income: f64) -> FeatureRecord {
        FeatureExtractor::new().assemble(credit_good, PropertyArea::Urban, income, 4.5)
    }

    #[test]
    fn test_forest_averages_trees() {
        let model = NativeModel::from_slice(FOREST.as_bytes()).unwrap().into_handle();

        let good = record(true, 8.5);
        let proba = model.predict_proba(&good).unwrap().unwrap();
        assert!((proba[1] - 0.9).abs() < 1e-9);
        assert!((proba[0] - 0.1).abs() < 1e-9);
        assert_eq!(model.predict(&good).unwrap(), 1);

        let bad = record(false, 5.0);
        let proba = model.predict_proba(&bad).unwrap().unwrap();
        assert!((proba[1] - 0.25).abs() < 1e-9);
        assert_eq!(model.predict(&bad).unwrap(), 0);

        assert_eq!(model.feature_importances().map(|w| w.len()), Some(11));
        assert_eq!(model.name(), "random_forest");
    }

    #[test]
    fn test_forest_without_importances() {
        let json = r#"{"kind": "random_forest", "trees": [{"nodes": [{"value": [1.0, 3.0]}]}]}"#;
        let model = NativeModel::from_slice(json.as_bytes()).unwrap().into_handle();

        assert!(model.feature_importances().is_none());
        assert_eq!(model.predict(&record(true, 8.5)).unwrap(), 1);
    }

    #[test]
    fn test_logistic_regression() {
        let json = r#"{
            "kind": "logistic_regression",
            "coefficients": [0, 0, 0, 0, 0, 3.0, 0, 0, -0.5, 0, 0.2],
            "intercept": -2.0
        }"#;
        let model = NativeModel::from_slice(json.as_bytes()).unwrap().into_handle();

        // 3.0 - 2.25 + 1.7 - 2.0 = 0.45
        let good = record(true, 8.5);
        let proba = model.predict_proba(&good).unwrap().unwrap();
        let expected = 1.0 / (1.0 + (-0.45f64).exp());
        assert!((proba[1] - expected).abs() < 1e-9);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&good).unwrap(), 1);

        assert_eq!(model.predict(&record(false, 8.5)).unwrap(), 0);
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_rejects_wrong_coefficient_count() {
        let json = r#"{"kind": "logistic_regression", "coefficients": [1.0, 2.0]}"#;
        assert!(NativeModel::from_slice(json.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_feature_name_mismatch() {
        let json = r#"{
            "kind": "random_forest",
            "feature_names": ["Gender", "Married"],
            "trees": [{"nodes": [{"value": [1.0, 1.0]}]}]
        }"#;
        assert!(NativeModel::from_slice(json.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_dangling_child() {
        let json = r#"{
            "kind": "random_forest",
            "trees": [{"nodes": [{"feature": 0, "threshold": 0.5, "left": 1, "right": 9}, {"value": [1.0, 0.0]}]}]
        }"#;
        assert!(NativeModel::from_slice(json.as_bytes()).is_err());
    }

    #[test]
    fn test_cyclic_tree_fails_at_prediction() {
        let json = r#"{
            "kind": "random_forest",
            "trees": [{"nodes": [{"feature": 0, "threshold": 5.0, "left": 0, "right": 1}, {"value": [1.0, 0.0]}]}]
        }"#;
        let model = NativeModel::from_slice(json.as_bytes()).unwrap().into_handle();
        assert!(model.predict(&record(true, 8.5)).is_err());
    }

    #[test]
    fn test_unvalidated_models_fail_without_panicking() {
        let empty: RandomForest = serde_json::from_str(r#"{"trees": []}"#).unwrap();
        assert!(empty.predict(&record(true, 8.5)).is_err());
        assert!(empty.predict_proba(&record(true, 8.5)).unwrap().is_err());

        let dangling: RandomForest = serde_json::from_str(
            r#"{"trees": [{"nodes": [{"feature": 42, "threshold": 0.5, "left": 7, "right": 8}]}]}"#,
        )
        .unwrap();
        assert!(dangling.predict(&record(true, 8.5)).is_err());

        let hollow: RandomForest =
            serde_json::from_str(r#"{"trees": [{"nodes": []}, {"nodes": [{"value": [0.0, 0.0]}]}]}"#)
                .unwrap();
        assert!(hollow.predict(&record(true, 8.5)).is_err());

        let short: LogisticRegression =
            serde_json::from_str(r#"{"coefficients": [1.0]}"#).unwrap();
        assert!(short.predict(&record(true, 8.5)).is_err());
        assert!(short.predict_proba(&record(true, 8.5)).unwrap().is_err());
    }

    #[test]
    fn test_unknown_kind() {
        let json = r#"{"kind": "svm", "support_vectors": []}"#;
        assert!(NativeModel::from_slice(json.as_bytes()).is_err());
    }
}
