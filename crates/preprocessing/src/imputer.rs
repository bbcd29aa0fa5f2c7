//! Median Imputation for Missing Values

use crate::error::PreprocessError;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Replaces NaN cells with the per-column median seen during fit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    /// Fitted column medians
    medians: Option<Vec<f64>>,
}

impl MedianImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn column medians, ignoring missing cells
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<(), PreprocessError> {
        if x.nrows() == 0 {
            return Err(PreprocessError::EmptyInput("MedianImputer"));
        }

        let medians = x
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(col, column)| {
                let mut present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
                median(&mut present).unwrap_or_else(|| {
                    warn!("Column {} has no observed values, imputing 0.0", col);
                    0.0
                })
            })
            .collect();

        self.medians = Some(medians);
        Ok(())
    }

    /// Fill missing cells with the fitted medians
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        let medians = self
            .medians
            .as_ref()
            .ok_or(PreprocessError::NotFitted("MedianImputer"))?;
        if x.ncols() != medians.len() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} columns", medians.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut column, &fill) in out.axis_iter_mut(Axis(1)).zip(medians) {
            column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn medians(&self) -> Option<&[f64]> {
        self.medians.as_deref()
    }
}

/// Median of a set of values; mean of the two middle values for even counts
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fills_with_median() {
        let x = array![[1.0, 10.0], [f64::NAN, 20.0], [3.0, f64::NAN], [100.0, 40.0]];
        let mut imputer = MedianImputer::new();

        let filled = imputer.fit_transform(&x).unwrap();

        // Column 0 observed [1, 3, 100] -> 3; column 1 observed [10, 20, 40] -> 20
        assert_eq!(filled[(1, 0)], 3.0);
        assert_eq!(filled[(2, 1)], 20.0);
        assert_eq!(filled[(3, 0)], 100.0);
    }

    #[test]
    fn test_even_count_median() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_all_missing_column() {
        let x = array![[f64::NAN], [f64::NAN]];
        let mut imputer = MedianImputer::new();
        let filled = imputer.fit_transform(&x).unwrap();
        assert_eq!(filled[(0, 0)], 0.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = MedianImputer::new();
        assert_eq!(
            imputer.transform(&array![[1.0]]).unwrap_err(),
            PreprocessError::NotFitted("MedianImputer")
        );
    }

    #[test]
    fn test_column_mismatch() {
        let mut imputer = MedianImputer::new();
        imputer.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(imputer.transform(&array![[1.0]]).is_err());
    }
}
