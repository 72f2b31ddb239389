//! Feature assembly for loan approval model inference.
//!
//! The classifier was trained on an 11-column frame. Four columns come from
//! the application form, the other seven are fixed for every request.

use crate::types::application::{LoanApplication, PropertyArea};

/// Number of model inputs
pub const FEATURE_COUNT: usize = 11;

/// Model input names, in the column order used during training.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Gender",
    "Married",
    "Dependents",
    "Education",
    "Self_Employed",
    "Credit_History",
    "Property_Area",
    "ApplicantIncomeLog",
    "LoanAmountLog",
    "Loan_Amount_Term_Log",
    "Total_Income_Log",
];

/// Values used for the inputs the form does not collect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDefaults {
    /// 1 = male
    pub gender: f64,
    /// 1 = married
    pub married: f64,
    pub dependents: f64,
    /// 1 = graduate
    pub education: f64,
    pub self_employed: f64,
    pub applicant_income_log: f64,
    pub loan_amount_term_log: f64,
}

impl FeatureDefaults {
    pub const STANDARD: FeatureDefaults = FeatureDefaults {
        gender: 1.0,
        married: 1.0,
        dependents: 0.0,
        education: 1.0,
        self_employed: 0.0,
        applicant_income_log: 7.5,
        loan_amount_term_log: 5.5,
    };
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A complete model input row, ordered as [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Values in schema order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Look up a value by its trained column name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }

    /// `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Single-precision row for tensor based runtimes
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

/// Builds model input rows from form submissions.
pub struct FeatureExtractor {
    defaults: FeatureDefaults,
}

impl FeatureExtractor {
    /// Create a new feature extractor using the standard defaults.
    pub fn new() -> Self {
        Self {
            defaults: FeatureDefaults::STANDARD,
        }
    }

    /// Assemble a row from the four user-supplied inputs.
    ///
    /// The log values are copied as given; range checks belong to the form.
    pub fn assemble(
        &self,
        credit_history_good: bool,
        property_area: PropertyArea,
        total_income_log: f64,
        loan_amount_log: f64,
    ) -> FeatureRecord {
        let d = &self.defaults;
        let credit_history = if credit_history_good { 1.0 } else { 0.0 };

        FeatureRecord {
            values: [
                d.gender,
                d.married,
                d.dependents,
                d.education,
                d.self_employed,
                credit_history,
                f64::from(property_area.code()),
                d.applicant_income_log,
                loan_amount_log,
                d.loan_amount_term_log,
                total_income_log,
            ],
        }
    }

    /// Assemble a row from an application.
    pub fn extract(&self, application: &LoanApplication) -> FeatureRecord {
        self.assemble(
            application.credit_history.is_good(),
            application.property_area,
            application.total_income_log,
            application.loan_amount_log,
        )
    }

    /// Defaults merged into every row
    pub fn defaults(&self) -> &FeatureDefaults {
        &self.defaults
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (matching training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::application::CreditHistory;

    fn assert_defaults(record: &FeatureRecord) {
        assert_eq!(record.get("Gender"), Some(1.0));
        assert_eq!(record.get("Married"), Some(1.0));
        assert_eq!(record.get("Dependents"), Some(0.0));
        assert_eq!(record.get("Education"), Some(1.0));
        assert_eq!(record.get("Self_Employed"), Some(0.0));
        assert_eq!(record.get("ApplicantIncomeLog"), Some(7.5));
        assert_eq!(record.get("Loan_Amount_Term_Log"), Some(5.5));
    }

    #[test]
    fn test_good_credit_urban() {
        let extractor = FeatureExtractor::new();
        let record = extractor.assemble(true, PropertyArea::Urban, 8.5, 4.5);

        assert_eq!(
            record.values(),
            &[1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 7.5, 4.5, 5.5, 8.5]
        );
    }

    #[test]
    fn test_bad_credit_rural_extremes() {
        let extractor = FeatureExtractor::new();
        let record = extractor.assemble(false, PropertyArea::Rural, 0.0, 20.0);

        assert_eq!(record.get("Credit_History"), Some(0.0));
        assert_eq!(record.get("Property_Area"), Some(2.0));
        assert_eq!(record.get("LoanAmountLog"), Some(20.0));
        assert_eq!(record.get("Total_Income_Log"), Some(0.0));
        assert_defaults(&record);
    }

    #[test]
    fn test_property_area_mapping() {
        let extractor = FeatureExtractor::new();
        for (area, code) in [
            (PropertyArea::Urban, 0.0),
            (PropertyArea::Semiurban, 1.0),
            (PropertyArea::Rural, 2.0),
        ] {
            let record = extractor.assemble(true, area, 8.5, 4.5);
            assert_eq!(record.get("Property_Area"), Some(code));
        }
    }

    #[test]
    fn test_defaults_unchanged_across_calls() {
        let extractor = FeatureExtractor::new();
        let first = extractor.assemble(true, PropertyArea::Semiurban, 3.0, 12.0);
        let second = extractor.assemble(false, PropertyArea::Urban, 19.5, 0.5);

        assert_defaults(&first);
        assert_defaults(&second);
        assert_eq!(extractor.defaults(), &FeatureDefaults::STANDARD);
    }

    #[test]
    fn test_extract_from_application() {
        let extractor = FeatureExtractor::new();
        let app = LoanApplication::new(CreditHistory::Bad, PropertyArea::Semiurban, 9.25, 5.0);
        let record = extractor.extract(&app);

        assert_eq!(record.get("Credit_History"), Some(0.0));
        assert_eq!(record.get("Property_Area"), Some(1.0));
        assert_eq!(record.get("Total_Income_Log"), Some(9.25));
        assert_eq!(record.get("LoanAmountLog"), Some(5.0));
    }

    #[test]
    fn test_record_shape() {
        let extractor = FeatureExtractor::new();
        let record = extractor.assemble(true, PropertyArea::Urban, 8.5, 4.5);

        assert_eq!(extractor.feature_count(), 11);
        assert_eq!(record.iter().count(), 11);
        assert_eq!(record.to_f32_vec().len(), 11);
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, FEATURE_NAMES);
        assert_eq!(record.get("Unknown"), None);
    }
}
