//! Zero-Mean / Unit-Variance Scaling

use crate::error::PreprocessError;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standardizes columns: z = (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column means (computed during fit)
    mean: Option<Vec<f64>>,
    /// Column population standard deviations, 1.0 where a column is constant
    scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<(), PreprocessError> {
        if x.nrows() == 0 {
            return Err(PreprocessError::EmptyInput("StandardScaler"));
        }

        let n = x.nrows() as f64;
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let mean = column.sum() / n;
            let variance = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            means.push(mean);
            scales.push(if std_dev > 0.0 { std_dev } else { 1.0 });
        }

        self.mean = Some(means);
        self.scale = Some(scales);
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        let (means, scales) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(PreprocessError::NotFitted("StandardScaler")),
        };
        if x.ncols() != means.len() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} columns", means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for ((mut column, &mean), &scale) in out.axis_iter_mut(Axis(1)).zip(means).zip(scales) {
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Get fitted means
    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    /// Get fitted scales
    pub fn scale(&self) -> Option<&[f64]> {
        self.scale.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_standardization() {
        let x = array![[1.0, 100.0], [2.0, 200.0], [3.0, 300.0], [4.0, 400.0]];
        let mut scaler = StandardScaler::new();

        let scaled = scaler.fit_transform(&x).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            let mean = column.sum() / 4.0;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((variance - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column() {
        let x = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|&v| v == 0.0));
        assert_eq!(scaler.scale(), Some(&[1.0][..]));
    }

    #[test]
    fn test_empty_fit() {
        let mut scaler = StandardScaler::new();
        assert!(scaler.fit(&Array2::zeros((0, 2))).is_err());
    }

    proptest! {
        #[test]
        fn prop_scaled_mean_is_zero(values in proptest::collection::vec(-1e3f64..1e3, 2..50)) {
            let x = Array2::from_shape_vec((values.len(), 1), values).unwrap();
            let mut scaler = StandardScaler::new();
            let scaled = scaler.fit_transform(&x).unwrap();
            let mean = scaled.sum() / scaled.nrows() as f64;
            prop_assert!(mean.abs() < 1e-6);
        }
    }
}
