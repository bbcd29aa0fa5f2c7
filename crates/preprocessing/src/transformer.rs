//! Column Transformer
//!
//! Routes numeric columns through imputation and scaling and categorical
//! columns through one-hot encoding, then concatenates the two blocks.
//! Output names carry the stage that produced them (`num__`, `cat__`).

use crate::dataset::Dataset;
use crate::encoder::OneHotEncoder;
use crate::error::PreprocessError;
use crate::imputer::MedianImputer;
use crate::scaler::StandardScaler;
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stage prefix for the numeric branch
pub const NUMERIC_STAGE: &str = "num";

/// Stage prefix for the categorical branch
pub const CATEGORICAL_STAGE: &str = "cat";

/// Numeric (median impute -> standard scale) + categorical (one-hot) preprocessor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnTransformer {
    imputer: MedianImputer,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    /// Input column names seen at fit: (numeric, categorical)
    columns: Option<(Vec<String>, Vec<String>)>,
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<(), PreprocessError> {
        if dataset.is_empty() {
            return Err(PreprocessError::EmptyInput("ColumnTransformer"));
        }

        let imputed = self.imputer.fit_transform(&dataset.numeric)?;
        self.scaler.fit(&imputed)?;
        self.encoder.fit(&dataset.categorical)?;
        self.columns = Some((
            dataset.schema.numeric.clone(),
            dataset.schema.categorical.clone(),
        ));

        debug!(
            "Fitted column transformer: {} numeric, {} categorical -> {} outputs",
            dataset.schema.numeric.len(),
            dataset.schema.categorical.len(),
            self.n_outputs()
        );
        Ok(())
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<Array2<f64>, PreprocessError> {
        if self.columns.is_none() {
            return Err(PreprocessError::NotFitted("ColumnTransformer"));
        }

        let numeric = self.scaler.transform(&self.imputer.transform(&dataset.numeric)?)?;
        if dataset.categorical.is_empty() {
            return Ok(numeric);
        }

        let categorical = self.encoder.transform(&dataset.categorical)?;
        if categorical.nrows() != numeric.nrows() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} rows", numeric.nrows()),
                actual: format!("{} rows", categorical.nrows()),
            });
        }

        concatenate(Axis(1), &[numeric.view(), categorical.view()]).map_err(|e| {
            PreprocessError::ShapeMismatch {
                expected: "concatenable blocks".to_string(),
                actual: e.to_string(),
            }
        })
    }

    pub fn fit_transform(&mut self, dataset: &Dataset) -> Result<Array2<f64>, PreprocessError> {
        self.fit(dataset)?;
        self.transform(dataset)
    }

    /// Expanded output column names, stage-prefixed, in output order
    pub fn feature_names_out(&self) -> Result<Vec<String>, PreprocessError> {
        let (numeric, categorical) = self
            .columns
            .as_ref()
            .ok_or(PreprocessError::NotFitted("ColumnTransformer"))?;

        let mut names: Vec<String> = numeric
            .iter()
            .map(|name| format!("{NUMERIC_STAGE}__{name}"))
            .collect();
        names.extend(
            self.encoder
                .feature_names(categorical)?
                .into_iter()
                .map(|name| format!("{CATEGORICAL_STAGE}__{name}")),
        );
        Ok(names)
    }

    /// Number of output columns (0 before fit)
    pub fn n_outputs(&self) -> usize {
        self.feature_names_out().map_or(0, |names| names.len())
    }

    pub fn is_fitted(&self) -> bool {
        self.columns.is_some()
    }
}
