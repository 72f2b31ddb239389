//! Type definitions for the loan approval service

pub mod application;
pub mod decision;

pub use application::{CreditHistory, LoanApplication, PropertyArea};
pub use decision::{ClassProbabilities, DecisionError, FeatureImportance, LoanDecision, LoanStatus};
