//! Fitted Pipeline Accessors

use crate::error::ImpactError;
use crate::impact::{FilterPolicy, ImpactExtractor, ImpactReport};
use tracing::debug;

/// A fitted preprocessing + linear model composition.
///
/// Both accessors return one entry per expanded model input column, in the
/// same order.
pub trait FittedPipeline {
    /// Expanded column names, possibly carrying stage prefixes
    fn expanded_feature_names(&self) -> Result<Vec<String>, ImpactError>;

    /// Fitted weights aligned with [`expanded_feature_names`](Self::expanded_feature_names)
    fn fitted_coefficients(&self) -> Result<Vec<f64>, ImpactError>;
}

/// Read names and weights out of a fitted pipeline and build its impact report
pub fn extract_from_pipeline<P: FittedPipeline + ?Sized>(
    pipeline: &P,
    impact_threshold: f64,
    policy: FilterPolicy,
) -> Result<ImpactReport, ImpactError> {
    let extractor = ImpactExtractor::new(impact_threshold, policy)?;
    let names = pipeline.expanded_feature_names()?;
    let coefficients = pipeline.fitted_coefficients()?;
    debug!(
        "Extracting impact for {} features (threshold {}, {:?})",
        names.len(),
        impact_threshold,
        policy
    );
    extractor.extract(&names, &coefficients)
}
