//! ML model loading and inference components

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod native;
pub mod onnx;

pub use classifier::{Classifier, ClassifierHandle};
pub use inference::PredictionService;
pub use loader::{ModelLoader, ModelState};
