//! Preprocessing + Model Pipeline

use crate::logistic::{mean_probability, LogisticRegression};
use crate::metrics::accuracy_score;
use crate::ModelError;
use feature_impact::{FittedPipeline, ImpactError};
use ndarray::Array1;
use preprocessing::{ColumnTransformer, Dataset};
use tracing::{debug, info};

/// Column transformer feeding a logistic regression
#[derive(Debug, Clone, Default)]
pub struct RetentionPipeline {
    preprocessor: ColumnTransformer,
    model: LogisticRegression,
}

impl RetentionPipeline {
    pub fn new(model: LogisticRegression) -> Self {
        Self {
            preprocessor: ColumnTransformer::new(),
            model,
        }
    }

    /// Fit the preprocessor and the model on a training set.
    ///
    /// On error the pipeline keeps its previous fitted state.
    pub fn fit(&mut self, train: &Dataset) -> Result<(), ModelError> {
        let mut preprocessor = self.preprocessor.clone();
        let mut model = self.model.clone();

        let x = preprocessor.fit_transform(train)?;
        debug!("Training matrix: {} x {}", x.nrows(), x.ncols());
        model.fit(&x, &train.target)?;
        info!(
            "Fitted logistic regression on {} rows, {} features ({} iterations)",
            x.nrows(),
            x.ncols(),
            model.n_iter()
        );

        self.preprocessor = preprocessor;
        self.model = model;
        Ok(())
    }

    pub fn predict_proba(&self, data: &Dataset) -> Result<Array1<f64>, ModelError> {
        if !self.model.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        let x = self.preprocessor.transform(data)?;
        self.model.predict_proba(&x)
    }

    pub fn predict(&self, data: &Dataset) -> Result<Vec<usize>, ModelError> {
        if !self.model.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        let x = self.preprocessor.transform(data)?;
        self.model.predict(&x)
    }

    /// Accuracy of predictions against the dataset's target
    pub fn score(&self, data: &Dataset) -> Result<f64, ModelError> {
        let proba = self.predict_proba(data)?;
        debug!("Mean predicted retention probability: {:.4}", mean_probability(proba.view()));
        let predicted: Vec<usize> = proba.iter().map(|&p| usize::from(p >= 0.5)).collect();
        accuracy_score(&data.target, &predicted)
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn model(&self) -> &LogisticRegression {
        &self.model
    }
}

impl FittedPipeline for RetentionPipeline {
    fn expanded_feature_names(&self) -> Result<Vec<String>, ImpactError> {
        self.preprocessor
            .feature_names_out()
            .map_err(|e| ImpactError::NotFitted(e.to_string()))
    }

    fn fitted_coefficients(&self) -> Result<Vec<f64>, ImpactError> {
        self.model
            .coefficients()
            .map(|c| c.to_vec())
            .ok_or_else(|| ImpactError::NotFitted("model has no coefficients".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_impact::{extract_from_pipeline, FilterPolicy};
    use ndarray::Array2;
    use preprocessing::DatasetSchema;

    /// Retention driven by logins only
    fn dataset() -> Dataset {
        let n = 60;
        let logins: Vec<f64> = (0..n).map(|i| (i % 10) as f64).collect();
        let platform: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 2 == 0 { "ios" } else { "web" }.to_string()))
            .collect();
        let target: Vec<usize> = logins.iter().map(|&l| usize::from(l >= 4.0)).collect();
        Dataset {
            numeric: Array2::from_shape_vec((n, 1), logins).unwrap(),
            categorical: vec![platform],
            target,
            schema: DatasetSchema::new("RETAINED", ["PLATFORM"], ["LOGINS"]),
        }
    }

    #[test]
    fn test_fit_and_score() {
        let data = dataset();
        let mut pipeline = RetentionPipeline::default();

        pipeline.fit(&data).unwrap();

        assert!(pipeline.score(&data).unwrap() >= 0.9);
        assert_eq!(pipeline.predict(&data).unwrap().len(), data.n_rows());
    }

    #[test]
    fn test_exposes_aligned_names_and_coefficients() {
        let mut pipeline = RetentionPipeline::default();
        pipeline.fit(&dataset()).unwrap();

        let names = pipeline.expanded_feature_names().unwrap();
        let coefficients = pipeline.fitted_coefficients().unwrap();

        assert_eq!(names, vec!["num__LOGINS", "cat__PLATFORM_ios", "cat__PLATFORM_web"]);
        assert_eq!(names.len(), coefficients.len());
        assert!(coefficients[0] > 0.0);
    }

    #[test]
    fn test_impact_report_from_pipeline() {
        let mut pipeline = RetentionPipeline::default();
        pipeline.fit(&dataset()).unwrap();

        let report = extract_from_pipeline(&pipeline, 1.2, FilterPolicy::TwoSided).unwrap();

        assert_eq!(report.impacts[0].feature_name, "LOGINS");
        assert!(report.impacts[0].odds_ratio > 1.2);
    }

    #[test]
    fn test_unfitted_pipeline() {
        let pipeline = RetentionPipeline::default();
        assert!(matches!(pipeline.predict(&dataset()), Err(ModelError::NotFitted)));
        assert!(matches!(
            pipeline.fitted_coefficients(),
            Err(ImpactError::NotFitted(_))
        ));
        assert!(pipeline.expanded_feature_names().is_err());
    }

    #[test]
    fn test_failed_refit_keeps_previous_fit() {
        let mut pipeline = RetentionPipeline::default();
        pipeline.fit(&dataset()).unwrap();
        let names = pipeline.expanded_feature_names().unwrap();
        let coefficients = pipeline.fitted_coefficients().unwrap();

        let mut relabelled = dataset();
        relabelled.categorical = vec![(0..relabelled.n_rows())
            .map(|i| Some(if i % 2 == 0 { "android" } else { "linux" }.to_string()))
            .collect()];
        relabelled.target = vec![0; relabelled.n_rows()];
        assert!(pipeline.fit(&relabelled).is_err());

        assert_eq!(pipeline.expanded_feature_names().unwrap(), names);
        assert_eq!(pipeline.fitted_coefficients().unwrap(), coefficients);
        assert!(pipeline.score(&dataset()).unwrap() >= 0.9);
    }

    #[test]
    fn test_failed_first_fit_stays_unfitted() {
        let mut data = dataset();
        data.target = vec![0; data.n_rows()];
        let mut pipeline = RetentionPipeline::default();

        assert!(pipeline.fit(&data).is_err());

        assert!(!pipeline.preprocessor().is_fitted());
        assert!(matches!(pipeline.predict(&dataset()), Err(ModelError::NotFitted)));
    }

    #[test]
    fn test_single_class_fails_to_fit() {
        let mut data = dataset();
        data.target = vec![1; data.n_rows()];
        let mut pipeline = RetentionPipeline::default();
        assert!(matches!(
            pipeline.fit(&data),
            Err(ModelError::DegenerateTarget(1))
        ));
    }
}
