pub mod catalog;
pub mod model;
pub mod preprocess;

use shared::Diagnosis;

use crate::config::OutputKind;
use crate::imaging::Image;

pub use catalog::{CatalogError, ClassCatalog};
pub use model::TorchClassifier;
pub use preprocess::{PreprocessSettings, preprocess};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),
    #[error("Model error: {0}")]
    ModelError(#[from] tch::TchError),
    #[error("Model produced {got} scores but the class catalog has {expected} labels")]
    CatalogMismatch { expected: usize, got: usize },
    #[error("Model produced an unusable output: {0}")]
    InvalidOutput(String),
    #[error("Model lock poisoned")]
    Poisoned,
    #[error("Inference task failed: {0}")]
    Join(String),
}

/// Top-1 image classification over a fixed class catalog.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &Image) -> Result<Diagnosis, InferenceError>;
}

pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and score of the highest entry; ties resolve to the lowest index.
pub fn top1(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((index, score)),
        })
}

/// Map raw model scores onto the catalog and pick the top-1 class.
pub fn diagnosis_from_scores(
    scores: &[f32],
    catalog: &ClassCatalog,
    output: OutputKind,
) -> Result<Diagnosis, InferenceError> {
    if scores.len() != catalog.len() {
        return Err(InferenceError::CatalogMismatch {
            expected: catalog.len(),
            got: scores.len(),
        });
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(InferenceError::InvalidOutput(
            "non-finite score in model output".into(),
        ));
    }

    let probabilities = match output {
        OutputKind::Probabilities => scores.to_vec(),
        OutputKind::Logits => softmax(scores),
    };

    let (index, confidence) = top1(&probabilities)
        .ok_or_else(|| InferenceError::InvalidOutput("empty model output".into()))?;
    let label = catalog
        .label(index)
        .ok_or(InferenceError::CatalogMismatch {
            expected: catalog.len(),
            got: probabilities.len(),
        })?;

    Ok(Diagnosis::new(label, confidence.clamp(0.0, 1.0)))
}
