//! Prediction service: feature assembly plus one inference call

use crate::feature_extractor::{FeatureExtractor, FeatureRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::classifier::ClassifierHandle;
use crate::report;
use crate::types::application::{LoanApplication, PropertyArea};
use crate::types::decision::{ClassProbabilities, FeatureImportance, LoanDecision, LoanStatus};
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Result of model inference
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Predicted outcome
    pub label: LoanStatus,
    /// Class probabilities, if the model estimates them
    pub probabilities: Option<ClassProbabilities>,
    /// Per-feature importances in schema order, if the model exposes them
    pub importances: Option<Vec<FeatureImportance>>,
}

impl PredictionResult {
    /// Convert prediction result to the decision sent back to the applicant
    pub fn to_decision(&self, application_id: Option<String>) -> LoanDecision {
        LoanDecision::new(application_id, self.label, report::render(self))
            .with_probabilities(self.probabilities)
            .with_importances(self.importances.clone())
    }
}

/// Turns applications into predictions using a loaded classifier
pub struct PredictionService {
    classifier: ClassifierHandle,
    extractor: FeatureExtractor,
}

impl PredictionService {
    /// Create a prediction service around a loaded model
    pub fn new(classifier: ClassifierHandle) -> Self {
        Self {
            classifier,
            extractor: FeatureExtractor::new(),
        }
    }

    /// Feature extractor used to build model inputs
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Predict the outcome of a submitted application
    pub fn predict(&self, application: &LoanApplication) -> Result<PredictionResult> {
        self.predict_fields(
            application.credit_history.is_good(),
            application.property_area,
            application.total_income_log,
            application.loan_amount_log,
        )
    }

    /// Predict from the four form inputs. The log values must already be clamped.
    pub fn predict_fields(
        &self,
        credit_history_good: bool,
        property_area: PropertyArea,
        total_income_log: f64,
        loan_amount_log: f64,
    ) -> Result<PredictionResult> {
        let record = self.extractor.assemble(
            credit_history_good,
            property_area,
            total_income_log,
            loan_amount_log,
        );
        self.predict_record(&record)
    }

    /// Run the classifier on an assembled row
    pub fn predict_record(&self, record: &FeatureRecord) -> Result<PredictionResult> {
        let model = self.classifier.name();

        let class = self
            .classifier
            .predict(record)
            .with_context(|| format!("{} prediction failed", model))?;
        let label = LoanStatus::from_class(class);

        let probabilities = match self.classifier.predict_proba(record) {
            Some(Ok(pair)) => Some(ClassProbabilities::from_pair(pair)),
            Some(Err(e)) => {
                warn!(model = %model, error = %e, "Probability estimation failed, omitting");
                None
            }
            None => None,
        };

        let importances = self
            .classifier
            .feature_importances()
            .and_then(|weights| pair_importances(model, weights));

        debug!(
            model = %model,
            class = class,
            label = ?label,
            p_approve = probabilities.map(|p| p.approve),
            "Prediction complete"
        );

        Ok(PredictionResult {
            label,
            probabilities,
            importances,
        })
    }
}

fn pair_importances(model: &str, weights: &[f64]) -> Option<Vec<FeatureImportance>> {
    if weights.len() != FEATURE_COUNT {
        warn!(
            model = %model,
            expected = FEATURE_COUNT,
            found = weights.len(),
            "Feature importance count does not match schema, omitting"
        );
        return None;
    }

    Some(
        FEATURE_NAMES
            .iter()
            .zip(weights)
            .map(|(name, &weight)| FeatureImportance {
                feature: name.to_string(),
                weight,
            })
            .collect(),
    )
}
