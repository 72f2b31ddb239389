//! Loan Approval Service Library
//!
//! Assembles loan applications into the feature row a pre-trained binary
//! classifier expects and reports the predicted decision, class
//! probabilities and feature importances.

pub mod config;
pub mod consumer;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod report;
pub mod types;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use feature_extractor::{FeatureExtractor, FeatureRecord};
pub use models::inference::{PredictionResult, PredictionService};
pub use models::loader::{ModelLoader, ModelState};
pub use producer::DecisionProducer;
pub use types::{application::LoanApplication, decision::LoanDecision};
