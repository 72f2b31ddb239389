//! ONNX classifier backed by ONNX Runtime

use crate::feature_extractor::{FeatureRecord, FEATURE_COUNT};
use crate::models::classifier::Classifier;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Sidecar file carrying the importances the ONNX graph cannot express
#[derive(Debug, Deserialize)]
struct ImportanceFile {
    feature_importances: Vec<f64>,
}

/// Path of the importance sidecar for a model file
pub fn importance_sidecar_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("importances.json")
}

/// Classifier exported to ONNX (e.g. from scikit-learn)
pub struct OnnxClassifier {
    /// Sessions need exclusive access to run
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    /// Present only when the graph exposes class probabilities
    probability_output: Option<String>,
    feature_importances: Option<Vec<f64>>,
}

impl OnnxClassifier {
    /// Load an ONNX model and its optional importance sidecar
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ort::init().commit()?;
        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let (label_output, probability_output) = select_outputs(&output_names);

        let feature_importances = load_importances(&importance_sidecar_path(path))?;

        info!(
            input = %input_name,
            label = %label_output,
            probabilities = ?probability_output,
            importances = feature_importances.is_some(),
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
            feature_importances,
        })
    }

    /// Run the graph on a single-row batch and hand the outputs to `read`
    fn run<T>(
        &self,
        record: &FeatureRecord,
        read: impl FnOnce(&SessionOutputs) -> Result<T>,
    ) -> Result<T> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor = Tensor::from_array((shape, record.to_f32_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;
        read(&outputs)
    }
}

/// Pick the label output and, if the graph has one, the probability output.
///
/// The label is the first output named `*label*`, else the first output.
fn select_outputs(names: &[&str]) -> (String, Option<String>) {
    let label_output = names
        .iter()
        .find(|name| name.contains("label"))
        .or_else(|| names.first())
        .map(|name| name.to_string())
        .unwrap_or_else(|| "output_label".to_string());

    let probability_output = names
        .iter()
        .find(|name| **name != label_output && name.contains("prob"))
        .map(|name| name.to_string());

    (label_output, probability_output)
}

fn load_importances(path: &Path) -> Result<Option<Vec<f64>>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read importances from {}", path.display()))?;
    let file: ImportanceFile = serde_json::from_slice(&data)
        .with_context(|| format!("Invalid importance file {}", path.display()))?;
    Ok(Some(file.feature_importances))
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, record: &FeatureRecord) -> Result<i64> {
        self.run(record, |outputs| {
            let output = outputs
                .get(self.label_output.as_str())
                .ok_or_else(|| anyhow::anyhow!("Missing output {}", self.label_output))?;
            let (_, labels) = output.try_extract_tensor::<i64>()?;
            labels
                .first()
                .copied()
                .ok_or_else(|| anyhow::anyhow!("Empty label output"))
        })
    }

    fn predict_proba(&self, record: &FeatureRecord) -> Option<Result<[f64; 2]>> {
        let name = self.probability_output.as_deref()?;
        Some(self.run(record, |outputs| {
            let output = outputs
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("Missing output {}", name))?;
            extract_probabilities(output)
        }))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

/// Read `[P(0), P(1)]` from either a `[1, 2]` tensor or a `seq(map(int64, float))`
fn extract_probabilities(output: &DynValue) -> Result<[f64; 2]> {
    if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
        if data.len() >= 2 {
            debug!(p0 = data[0], p1 = data[1], "Extracted from tensor");
            return Ok([data[0] as f64, data[1] as f64]);
        }
        anyhow::bail!("Probability tensor has {} values", data.len());
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return extract_from_sequence_map(output);
    }

    anyhow::bail!("Unsupported probability output type")
}

/// scikit-learn exports with zipmap produce one class->probability map per row
fn extract_from_sequence_map(output: &DynValue) -> Result<[f64; 2]> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    pair_from_class_map(&kv_pairs)
}

/// `[P(0), P(1)]` from class->probability entries; a missing class is the complement
fn pair_from_class_map(kv_pairs: &[(i64, f32)]) -> Result<[f64; 2]> {
    let mut pair = [None, None];
    for (class_id, prob) in kv_pairs {
        match *class_id {
            0 => pair[0] = Some(*prob as f64),
            1 => pair[1] = Some(*prob as f64),
            _ => {}
        }
    }

    match pair {
        [Some(p0), Some(p1)] => Ok([p0, p1]),
        [Some(p0), None] => Ok([p0, 1.0 - p0]),
        [None, Some(p1)] => Ok([1.0 - p1, p1]),
        [None, None] => Err(anyhow::anyhow!("No probability found in map")),
    }
}
