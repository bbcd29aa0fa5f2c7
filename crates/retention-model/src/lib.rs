//! Retention Model
//!
//! Binary logistic regression on preprocessed engagement features, with
//! stratified train/test splitting and accuracy scoring.

mod logistic;
mod metrics;
mod pipeline;
mod split;

pub use logistic::LogisticRegression;
pub use metrics::accuracy_score;
pub use pipeline::RetentionPipeline;
pub use split::{train_test_split, DEFAULT_RANDOM_STATE, DEFAULT_TEST_SIZE};

use preprocessing::PreprocessError;
use thiserror::Error;

/// Errors during model fitting and evaluation
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot fit with zero samples")]
    EmptyInput,
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
    #[error("Labels must be 0 or 1 for binary classification, got {0}")]
    InvalidLabel(usize),
    #[error("Target has a single class ({0}); need both 0 and 1 to fit")]
    DegenerateTarget(usize),
    #[error("Model is not fitted")]
    NotFitted,
    #[error("Hessian is not positive definite; features may be degenerate")]
    Singular,
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
}
