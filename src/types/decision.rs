//! Loan decision data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Predicted outcome of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Approved,
    Rejected,
}

impl LoanStatus {
    /// Map a raw classifier label to a status. Only class `1` approves.
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            LoanStatus::Approved
        } else {
            LoanStatus::Rejected
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, LoanStatus::Approved)
    }
}

/// Two-class probability estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    /// Probability of approval (class 1)
    pub approve: f64,
    /// Probability of rejection (class 0)
    pub reject: f64,
}

impl ClassProbabilities {
    /// Build from a `[class 0, class 1]` pair as returned by `predict_proba`
    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self {
            approve: pair[1],
            reject: pair[0],
        }
    }

    /// Probability of the given outcome
    pub fn of(&self, status: LoanStatus) -> f64 {
        match status {
            LoanStatus::Approved => self.approve,
            LoanStatus::Rejected => self.reject,
        }
    }
}

/// Importance weight of a single model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub weight: f64,
}

/// Decision returned to the submitter of an application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDecision {
    /// Unique decision identifier
    pub decision_id: String,

    /// Identifier of the application, if the submitter provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    pub status: LoanStatus,

    /// Class probabilities, when the model can estimate them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,

    /// Per-feature importances in schema order, when the model exposes them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<FeatureImportance>>,

    /// Human readable report
    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl LoanDecision {
    /// Create a new decision
    pub fn new(application_id: Option<String>, status: LoanStatus, message: String) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            application_id,
            status,
            probabilities: None,
            importances: None,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Add class probabilities to the decision
    pub fn with_probabilities(mut self, probabilities: Option<ClassProbabilities>) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Add feature importances to the decision
    pub fn with_importances(mut self, importances: Option<Vec<FeatureImportance>>) -> Self {
        self.importances = importances;
        self
    }
}

/// Sent to the requester when an application could not be decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    pub error: String,
}

impl DecisionError {
    pub fn new(application_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            application_id,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_class() {
        assert_eq!(LoanStatus::from_class(1), LoanStatus::Approved);
        assert_eq!(LoanStatus::from_class(0), LoanStatus::Rejected);
        assert_eq!(LoanStatus::from_class(7), LoanStatus::Rejected);
    }

    #[test]
    fn test_probability_pair_order() {
        let probs = ClassProbabilities::from_pair([0.3, 0.7]);
        assert_eq!(probs.approve, 0.7);
        assert_eq!(probs.reject, 0.3);
        assert_eq!(probs.of(LoanStatus::Rejected), 0.3);
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let decision = LoanDecision::new(None, LoanStatus::Rejected, "Loan Not Approved".to_string());

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["status"], "rejected");
        assert!(json.get("probabilities").is_none());
        assert!(json.get("importances").is_none());
        assert!(json.get("application_id").is_none());
    }

    #[test]
    fn test_error_reply_is_not_a_decision() {
        let error = DecisionError::new(Some("app-3".to_string()), "Failed to deserialize application");
        let json = serde_json::to_string(&error).unwrap();

        assert!(serde_json::from_str::<LoanDecision>(&json).is_err());
        let parsed: DecisionError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, error);
    }
}
