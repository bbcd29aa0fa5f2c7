//! Retention Driver Analysis
//!
//! Loads early-engagement metrics from the warehouse, trains a logistic
//! regression predicting four-week retention, reports test accuracy and
//! logs the features whose odds ratios clear the impact threshold.

use anyhow::Context;
use clap::Parser;
use feature_impact::{
    extract_from_pipeline, FilterPolicy, FittedPipeline, ImpactError, ImpactReport,
    DEFAULT_IMPACT_THRESHOLD,
};
use preprocessing::{Dataset, DatasetSchema};
use retention_model::{
    train_test_split, LogisticRegression, RetentionPipeline, DEFAULT_RANDOM_STATE,
    DEFAULT_TEST_SIZE,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use warehouse::Warehouse;

/// Outcome column
pub const TARGET: &str = "IS_RETAINED_4_WEEKS";

/// One-hot encoded columns
pub const CATEGORICAL_FEATURES: &[&str] = &["CREATION_APP_PLATFORM"];

/// Imputed and scaled columns (first 7 days after signup)
pub const NUMERIC_FEATURES: &[&str] = &[
    "HAS_LOG_IN_TO_DASHLANE_F7D",
    "CNT_DAYS_LOG_IN_TO_DASHLANE_F7D",
    "CNT_LOG_IN_TO_DASHLANE_EVENTS_F7D",
    "HAS_ADD_NEW_PASSWORD_TO_VAULT_F7D",
    "CNT_DAYS_ADD_NEW_PASSWORD_TO_VAULT_F7D",
    "CNT_ADD_NEW_PASSWORD_TO_VAULT_EVENTS_F7D",
    "HAS_ADD_NEW_PERSONAL_DOCUMENT_TO_VAULT_F7D",
    "CNT_DAYS_ADD_NEW_PERSONAL_DOCUMENT_TO_VAULT_F7D",
    "CNT_ADD_NEW_PERSONAL_DOCUMENT_TO_VAULT_EVENTS_F7D",
    "HAS_ADD_NEW_PAYMENT_METHOD_TO_VAULT_F7D",
    "CNT_DAYS_ADD_NEW_PAYMENT_METHOD_TO_VAULT_F7D",
    "CNT_ADD_NEW_PAYMENT_METHOD_TO_VAULT_EVENTS_F7D",
    "HAS_PERFORM_AUTOFILL_F7D",
    "CNT_DAYS_PERFORM_AUTOFILL_F7D",
    "CNT_PERFORM_AUTOFILL_EVENTS_F7D",
    "HAS_GENERATE_PASSWORD_F7D",
    "CNT_DAYS_GENERATE_PASSWORD_F7D",
    "CNT_GENERATE_PASSWORD_EVENTS_F7D",
];

/// Source table for early engagement metrics
pub const SOURCE_TABLE: &str = "dashlane.onboarding.dim_user_early_engagement";

/// Command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "run-logistic-regression-model",
    version,
    about = "Train a logistic regression model for user retention."
)]
pub struct Args {
    /// Odds ratio threshold for logging features
    #[arg(
        short = 't',
        long,
        default_value_t = DEFAULT_IMPACT_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub impact_threshold: f64,
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("must be a finite value greater than 0, got {value}"));
    }
    Ok(value)
}

/// Errors specific to the batch flow
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No data loaded")]
    NoData,
}

/// What a completed run produced
#[derive(Debug)]
pub struct RunSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    /// Best-effort: an error here does not fail the run
    pub impact: Result<ImpactReport, ImpactError>,
}

/// Schema of the engagement table
pub fn retention_schema() -> DatasetSchema {
    DatasetSchema::new(
        TARGET,
        CATEGORICAL_FEATURES.iter().copied(),
        NUMERIC_FEATURES.iter().copied(),
    )
}

/// Load `.env` if present, then initialize logging so `.env` can set
/// `RUST_LOG` and `LOG_FORMAT`
pub fn init_environment() {
    let env_file = dotenvy::dotenv();
    init_logging();
    if let Ok(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }
}

fn json_logs() -> bool {
    std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json"))
}

/// Initialize logging (`RUST_LOG` filter, `LOG_FORMAT=json` for JSON lines)
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if json_logs() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

/// Load the early engagement table into a dataset
pub async fn load_dataset<W: Warehouse>(
    warehouse: &W,
    schema: &DatasetSchema,
) -> anyhow::Result<Dataset> {
    let query = schema.select_query(SOURCE_TABLE);
    let records = warehouse
        .execute_query(&query)
        .await
        .context("Error retrieving or processing data")?;
    let dataset =
        Dataset::from_records(&records, schema).context("Error retrieving or processing data")?;
    info!("Successfully loaded {} records.", dataset.n_rows());
    Ok(dataset)
}

/// Accuracy of the fitted pipeline on held-out rows
pub fn evaluate_model(pipeline: &RetentionPipeline, test: &Dataset) -> anyhow::Result<f64> {
    info!("Evaluating model on test set...");
    let accuracy = pipeline
        .score(test)
        .context("Error evaluating model on test set")?;
    info!("Model Test Accuracy: {:.4}", accuracy);
    Ok(accuracy)
}

/// Log the impactful features of a fitted pipeline; failures are logged as warnings
pub fn log_feature_coefficients<P: FittedPipeline>(
    pipeline: &P,
    impact_threshold: f64,
) -> Result<ImpactReport, ImpactError> {
    info!("Extracting feature coefficients...");
    let result = extract_from_pipeline(pipeline, impact_threshold, FilterPolicy::TwoSided);
    match &result {
        Ok(report) => {
            info!("Impactful Features (Threshold: {})", impact_threshold);
            info!("\n{}", report);
        }
        Err(e) => warn!("Could not extract feature coefficients: {}", e),
    }
    result
}

/// Run the whole analysis.
///
/// Returns `Ok(None)` when model fitting fails; data-access failures are errors.
pub async fn run<W: Warehouse>(warehouse: &W, args: &Args) -> anyhow::Result<Option<RunSummary>> {
    if args.impact_threshold <= 1.0 {
        warn!(
            "Impact threshold {} is not above 1.0; the two-sided filter will keep every feature",
            args.impact_threshold
        );
    }

    let dataset = load_dataset(warehouse, &retention_schema()).await?;
    if dataset.is_empty() {
        error!("No data loaded. Exiting.");
        return Err(AnalysisError::NoData.into());
    }

    let (train, test) = train_test_split(&dataset, DEFAULT_TEST_SIZE, DEFAULT_RANDOM_STATE)
        .context("Error splitting data")?;
    info!(
        "Data split: {} train samples, {} test samples.",
        train.n_rows(),
        test.n_rows()
    );

    let mut pipeline = RetentionPipeline::new(LogisticRegression::new());
    if let Err(e) = pipeline.fit(&train) {
        error!("Error during model fitting: {}", e);
        return Ok(None);
    }
    info!("Model training complete.");

    let accuracy = evaluate_model(&pipeline, &test)?;
    let impact = log_feature_coefficients(&pipeline, args.impact_threshold);

    Ok(Some(RunSummary {
        train_rows: train.n_rows(),
        test_rows: test.n_rows(),
        accuracy,
        impact,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let args = Args::try_parse_from(["run-logistic-regression-model"]).unwrap();
        assert_eq!(args.impact_threshold, 1.2);
    }

    #[test]
    fn test_threshold_flag() {
        let args =
            Args::try_parse_from(["run-logistic-regression-model", "--impact-threshold", "1.15"])
                .unwrap();
        assert_eq!(args.impact_threshold, 1.15);

        let args = Args::try_parse_from(["run-logistic-regression-model", "-t", "2"]).unwrap();
        assert_eq!(args.impact_threshold, 2.0);
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        for bad in ["0", "-1.5", "abc", "inf"] {
            assert!(
                Args::try_parse_from(["run-logistic-regression-model", "--impact-threshold", bad])
                    .is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_unknown_flags() {
        assert!(Args::try_parse_from(["run-logistic-regression-model", "--verbose"]).is_err());
    }

    #[test]
    fn test_env_file_selects_log_format() {
        let path = std::env::temp_dir().join(format!(".env-retention-cli-{}", std::process::id()));
        std::fs::write(&path, "LOG_FORMAT=json\n").unwrap();

        dotenvy::from_path_override(&path).unwrap();
        let json = json_logs();

        std::env::remove_var("LOG_FORMAT");
        std::fs::remove_file(&path).unwrap();
        assert!(json);
    }

    #[test]
    fn test_schema_and_query() {
        let schema = retention_schema();
        assert_eq!(schema.target, TARGET);
        assert_eq!(schema.numeric.len(), 18);
        let query = schema.select_query(SOURCE_TABLE);
        assert!(query.contains("CREATION_APP_PLATFORM"));
        assert!(query.ends_with("FROM dashlane.onboarding.dim_user_early_engagement"));
    }
}
