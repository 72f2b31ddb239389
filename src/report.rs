//! Text rendering of a prediction for the applicant

use crate::models::inference::PredictionResult;
use crate::types::decision::{FeatureImportance, LoanStatus};
use std::fmt::Write;

/// Shown instead of the form when no model could be found
pub const MODEL_UNAVAILABLE_MESSAGE: &str = "❌ Could not find the model file.";

const APPROVED_BANNER: &str = "✅ Loan Approved!";
const REJECTED_BANNER: &str = "❌ Loan Not Approved";
const IMPORTANCE_HEADER: &str = "🔍 Feature Importance";

/// Widest importance bar, in characters
const BAR_WIDTH: usize = 30;

/// Render the banner, probability line and importance chart.
pub fn render(result: &PredictionResult) -> String {
    let mut out = String::new();

    match result.label {
        LoanStatus::Approved => out.push_str(APPROVED_BANNER),
        LoanStatus::Rejected => out.push_str(REJECTED_BANNER),
    }
    out.push('\n');

    if let Some(line) = probability_line(result) {
        out.push_str(&line);
        out.push('\n');
    }

    if let Some(importances) = &result.importances {
        out.push('\n');
        out.push_str(&importance_chart(importances));
    }

    out
}

/// Probability of the predicted outcome, two decimals
pub fn probability_line(result: &PredictionResult) -> Option<String> {
    let probabilities = result.probabilities?;
    let line = match result.label {
        LoanStatus::Approved => format!("Probability of approval: {:.2}", probabilities.approve),
        LoanStatus::Rejected => format!("Probability of rejection: {:.2}", probabilities.reject),
    };
    Some(line)
}

/// Horizontal bar chart of importances, scaled to the largest weight
pub fn importance_chart(importances: &[FeatureImportance]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", IMPORTANCE_HEADER);

    let name_width = importances
        .iter()
        .map(|i| i.feature.len())
        .max()
        .unwrap_or(0);
    let max_weight = importances
        .iter()
        .map(|i| i.weight)
        .fold(0.0_f64, f64::max);

    for importance in importances {
        let bar_len = if max_weight > 0.0 && importance.weight > 0.0 {
            ((importance.weight / max_weight) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = "█".repeat(bar_len.min(BAR_WIDTH));
        let _ = writeln!(
            out,
            "  {:<width$} {:>7.4} {}",
            importance.feature,
            importance.weight,
            bar,
            width = name_width
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::ClassProbabilities;

    fn result(label: LoanStatus, probabilities: Option<[f64; 2]>) -> PredictionResult {
        PredictionResult {
            label,
            probabilities: probabilities.map(ClassProbabilities::from_pair),
            importances: None,
        }
    }

    #[test]
    fn test_approved_with_probability() {
        let text = render(&result(LoanStatus::Approved, Some([0.126, 0.874])));
        assert!(text.starts_with("✅ Loan Approved!"));
        assert!(text.contains("Probability of approval: 0.87"));
        assert!(!text.contains("Feature Importance"));
    }

    #[test]
    fn test_rejected_with_probability() {
        let text = render(&result(LoanStatus::Rejected, Some([0.61, 0.39])));
        assert!(text.starts_with("❌ Loan Not Approved"));
        assert!(text.contains("Probability of rejection: 0.61"));
    }

    #[test]
    fn test_no_probability_line_without_estimates() {
        let text = render(&result(LoanStatus::Approved, None));
        assert_eq!(text, "✅ Loan Approved!\n");
    }

    #[test]
    fn test_importance_chart() {
        let importances = vec![
            FeatureImportance {
                feature: "Credit_History".to_string(),
                weight: 0.6,
            },
            FeatureImportance {
                feature: "Gender".to_string(),
                weight: 0.3,
            },
            FeatureImportance {
                feature: "Married".to_string(),
                weight: 0.0,
            },
        ];

        let chart = importance_chart(&importances);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "🔍 Feature Importance");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].matches('█').count(), 30);
        assert_eq!(lines[2].matches('█').count(), 15);
        assert_eq!(lines[3].matches('█').count(), 0);
        assert!(lines[2].contains("Gender"));
    }

    #[test]
    fn test_render_includes_chart() {
        let mut res = result(LoanStatus::Rejected, None);
        res.importances = Some(vec![FeatureImportance {
            feature: "LoanAmountLog".to_string(),
            weight: 1.0,
        }]);

        let text = render(&res);
        assert!(text.contains("🔍 Feature Importance"));
        assert!(text.contains("LoanAmountLog"));
    }
}
