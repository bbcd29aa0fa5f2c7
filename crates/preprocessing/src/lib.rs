//! Tabular Preprocessing
//!
//! Turns warehouse records into a numeric design matrix: median imputation
//! and standard scaling for numeric columns, one-hot encoding for
//! categorical columns.

mod dataset;
mod encoder;
mod error;
mod imputer;
mod scaler;
mod transformer;

pub use dataset::{Dataset, DatasetSchema};
pub use encoder::OneHotEncoder;
pub use error::PreprocessError;
pub use imputer::MedianImputer;
pub use scaler::StandardScaler;
pub use transformer::{ColumnTransformer, CATEGORICAL_STAGE, NUMERIC_STAGE};
