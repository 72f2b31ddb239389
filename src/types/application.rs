//! Loan application form submitted by an applicant

use serde::{Deserialize, Serialize};

/// Lower bound accepted for the log-valued numeric inputs
pub const LOG_VALUE_MIN: f64 = 0.0;

/// Upper bound accepted for the log-valued numeric inputs
pub const LOG_VALUE_MAX: f64 = 20.0;

/// Pre-filled total income (log value) shown on the form
pub const DEFAULT_TOTAL_INCOME_LOG: f64 = 8.5;

/// Pre-filled requested loan amount (log value) shown on the form
pub const DEFAULT_LOAN_AMOUNT_LOG: f64 = 4.5;

/// Whether the applicant has repaid past loans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditHistory {
    #[default]
    #[serde(alias = "Good", alias = "Good (1)")]
    Good,
    #[serde(alias = "Bad", alias = "Bad (0)")]
    Bad,
}

impl CreditHistory {
    pub fn is_good(self) -> bool {
        matches!(self, CreditHistory::Good)
    }
}

/// Where the applicant's property is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyArea {
    #[default]
    #[serde(alias = "Urban")]
    Urban,
    #[serde(alias = "Semiurban")]
    Semiurban,
    #[serde(alias = "Rural")]
    Rural,
}

impl PropertyArea {
    /// Numeric encoding the classifier was trained with
    pub fn code(self) -> u8 {
        match self {
            PropertyArea::Urban => 0,
            PropertyArea::Semiurban => 1,
            PropertyArea::Rural => 2,
        }
    }
}

/// A submitted loan application.
///
/// Only the four attributes that drive the prediction are collected; every
/// other model input is filled from fixed defaults by the feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Caller-chosen identifier echoed back on the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    #[serde(default)]
    pub credit_history: CreditHistory,

    #[serde(default)]
    pub property_area: PropertyArea,

    /// Total income as a log value, within [0, 20]
    #[serde(default = "default_total_income_log")]
    pub total_income_log: f64,

    /// Requested loan amount as a log value, within [0, 20]
    #[serde(default = "default_loan_amount_log")]
    pub loan_amount_log: f64,
}

fn default_total_income_log() -> f64 {
    DEFAULT_TOTAL_INCOME_LOG
}

fn default_loan_amount_log() -> f64 {
    DEFAULT_LOAN_AMOUNT_LOG
}

impl LoanApplication {
    /// Create an application from the four form fields
    pub fn new(
        credit_history: CreditHistory,
        property_area: PropertyArea,
        total_income_log: f64,
        loan_amount_log: f64,
    ) -> Self {
        Self {
            application_id: None,
            credit_history,
            property_area,
            total_income_log,
            loan_amount_log,
        }
    }

    /// Attach an identifier to the application
    pub fn with_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Bring the numeric inputs into the range the form accepts.
    ///
    /// Out-of-range values are clamped to [0, 20]; NaN falls back to the
    /// pre-filled form value.
    pub fn clamped(mut self) -> Self {
        self.total_income_log = clamp_log_value(self.total_income_log, DEFAULT_TOTAL_INCOME_LOG);
        self.loan_amount_log = clamp_log_value(self.loan_amount_log, DEFAULT_LOAN_AMOUNT_LOG);
        self
    }
}

impl Default for LoanApplication {
    fn default() -> Self {
        Self::new(
            CreditHistory::Good,
            PropertyArea::Urban,
            DEFAULT_TOTAL_INCOME_LOG,
            DEFAULT_LOAN_AMOUNT_LOG,
        )
    }
}

fn clamp_log_value(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(LOG_VALUE_MIN, LOG_VALUE_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_area_codes() {
        assert_eq!(PropertyArea::Urban.code(), 0);
        assert_eq!(PropertyArea::Semiurban.code(), 1);
        assert_eq!(PropertyArea::Rural.code(), 2);
    }

    #[test]
    fn test_clamping() {
        let app = LoanApplication::new(CreditHistory::Bad, PropertyArea::Rural, -3.0, 25.0).clamped();
        assert_eq!(app.total_income_log, 0.0);
        assert_eq!(app.loan_amount_log, 20.0);

        let app = LoanApplication::new(CreditHistory::Good, PropertyArea::Urban, 0.0, 20.0).clamped();
        assert_eq!(app.total_income_log, 0.0);
        assert_eq!(app.loan_amount_log, 20.0);
    }

    #[test]
    fn test_nan_falls_back_to_form_default() {
        let app = LoanApplication::new(CreditHistory::Good, PropertyArea::Urban, f64::NAN, f64::NAN)
            .clamped();
        assert_eq!(app.total_income_log, DEFAULT_TOTAL_INCOME_LOG);
        assert_eq!(app.loan_amount_log, DEFAULT_LOAN_AMOUNT_LOG);
    }

    #[test]
    fn test_missing_fields_take_form_defaults() {
        let app: LoanApplication = serde_json::from_str(r#"{"property_area": "rural"}"#).unwrap();
        assert_eq!(app.credit_history, CreditHistory::Good);
        assert_eq!(app.property_area, PropertyArea::Rural);
        assert_eq!(app.total_income_log, 8.5);
        assert_eq!(app.loan_amount_log, 4.5);
        assert!(app.application_id.is_none());
    }

    #[test]
    fn test_form_labels_accepted() {
        let app: LoanApplication = serde_json::from_str(
            r#"{"application_id": "a-1", "credit_history": "Bad (0)", "property_area": "Semiurban"}"#,
        )
        .unwrap();
        assert_eq!(app.application_id.as_deref(), Some("a-1"));
        assert!(!app.credit_history.is_good());
        assert_eq!(app.property_area, PropertyArea::Semiurban);
    }
}
