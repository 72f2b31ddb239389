//! Model artifact loader

use crate::config::ModelConfig;
use crate::models::classifier::ClassifierHandle;
use crate::models::native::NativeModel;
use crate::models::onnx::OnnxClassifier;
use anyhow::{bail, Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of model resolution
pub enum ModelState {
    /// A classifier was found and loaded
    Ready(ClassifierHandle),
    /// No candidate location holds a model file
    Unavailable { searched: Vec<PathBuf> },
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

/// Serialization format of a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Onnx,
    Json,
}

impl ModelFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "onnx" => Some(ModelFormat::Onnx),
            "json" => Some(ModelFormat::Json),
            _ => None,
        }
    }
}

/// Loader for the classifier artifact
pub struct ModelLoader {
    /// Locations tried in order
    candidates: Vec<PathBuf>,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader over an ordered list of candidate paths
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            onnx_threads: 1,
        }
    }

    /// Create a loader from the model section of the configuration
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.paths.iter()).with_threads(config.onnx_threads)
    }

    /// Set the number of ONNX Runtime intra-op threads
    pub fn with_threads(mut self, onnx_threads: usize) -> Self {
        self.onnx_threads = onnx_threads.max(1);
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Resolve the model from the first candidate that exists.
    ///
    /// Missing files fall through to the next candidate. Any other access
    /// failure, or a file that cannot be loaded, is an error and stops the search.
    pub fn load(&self) -> Result<ModelState> {
        for path in &self.candidates {
            match std::fs::metadata(path) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "Model file not found");
                    continue;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Cannot access model file {}", path.display()));
                }
            }

            let classifier = self.load_model(path)?;
            info!(
                model = classifier.name(),
                path = %path.display(),
                "Model loaded"
            );
            return Ok(ModelState::Ready(classifier));
        }

        Ok(ModelState::Unavailable {
            searched: self.candidates.clone(),
        })
    }

    /// Load a single model file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<ClassifierHandle> {
        let path = path.as_ref();
        match ModelFormat::from_path(path) {
            Some(ModelFormat::Onnx) => {
                Ok(Arc::new(OnnxClassifier::load(path, self.onnx_threads)?))
            }
            Some(ModelFormat::Json) => Ok(NativeModel::load(path)?.into_handle()),
            None => bail!("Unsupported model format: {}", path.display()),
        }
    }
}
