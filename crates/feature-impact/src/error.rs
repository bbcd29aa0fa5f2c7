//! Feature Impact Error Types

use thiserror::Error;

/// Errors raised while extracting feature impact
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImpactError {
    /// Feature names and coefficients are not positionally aligned
    #[error("Shape mismatch: {names} feature names but {coefficients} coefficients")]
    ShapeMismatch { names: usize, coefficients: usize },

    /// Threshold is not a usable odds-ratio cutoff
    #[error("Invalid impact threshold {0}: must be a finite value greater than 0")]
    InvalidThreshold(f64),

    /// Pipeline has not been fitted yet
    #[error("Pipeline is not fitted: {0}")]
    NotFitted(String),
}
