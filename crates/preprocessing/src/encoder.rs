//! One-Hot Encoding

use crate::error::PreprocessError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Expands each categorical column into one indicator column per level.
///
/// Levels not seen during fit, and missing values, encode as all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted levels per input column
    categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the distinct non-missing levels of every column
    pub fn fit(&mut self, columns: &[Vec<Option<String>>]) -> Result<(), PreprocessError> {
        let categories = columns
            .iter()
            .map(|column| {
                column
                    .iter()
                    .flatten()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.categories = Some(categories);
        Ok(())
    }

    pub fn transform(&self, columns: &[Vec<Option<String>>]) -> Result<Array2<f64>, PreprocessError> {
        let categories = self
            .categories
            .as_ref()
            .ok_or(PreprocessError::NotFitted("OneHotEncoder"))?;
        if columns.len() != categories.len() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} categorical columns", categories.len()),
                actual: format!("{} categorical columns", columns.len()),
            });
        }

        let n_rows = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} rows", n_rows),
                actual: format!("{} rows", bad.len()),
            });
        }

        let width = categories.iter().map(Vec::len).sum();
        let mut out = Array2::<f64>::zeros((n_rows, width));
        let mut offset = 0;

        for (column, levels) in columns.iter().zip(categories) {
            for (row, value) in column.iter().enumerate() {
                let position = value
                    .as_ref()
                    .and_then(|v| levels.binary_search(v).ok());
                if let Some(idx) = position {
                    out[(row, offset + idx)] = 1.0;
                }
            }
            offset += levels.len();
        }

        Ok(out)
    }

    pub fn fit_transform(
        &mut self,
        columns: &[Vec<Option<String>>],
    ) -> Result<Array2<f64>, PreprocessError> {
        self.fit(columns)?;
        self.transform(columns)
    }

    /// Output column names: `<column>_<level>`
    pub fn feature_names(&self, input_names: &[String]) -> Result<Vec<String>, PreprocessError> {
        let categories = self
            .categories
            .as_ref()
            .ok_or(PreprocessError::NotFitted("OneHotEncoder"))?;
        if input_names.len() != categories.len() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} column names", categories.len()),
                actual: format!("{} column names", input_names.len()),
            });
        }

        Ok(input_names
            .iter()
            .zip(categories)
            .flat_map(|(name, levels)| levels.iter().map(move |level| format!("{name}_{level}")))
            .collect())
    }

    pub fn categories(&self) -> Option<&[Vec<String>]> {
        self.categories.as_deref()
    }
}
