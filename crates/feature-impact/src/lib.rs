//! Feature Impact Extraction
//!
//! Turns the coefficients of a fitted logistic-regression pipeline into a
//! ranked, threshold-filtered list of odds ratios.

mod error;
mod impact;
mod pipeline;

pub use error::ImpactError;
pub use impact::{
    display_name, extract_feature_impact, FeatureCoefficient, FeatureImpact, FilterPolicy,
    ImpactExtractor, ImpactReport, DEFAULT_IMPACT_THRESHOLD, STAGE_SEPARATOR,
};
pub use pipeline::{extract_from_pipeline, FittedPipeline};
