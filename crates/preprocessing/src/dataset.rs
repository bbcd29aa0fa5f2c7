//! Record to Dataset Conversion

use crate::error::PreprocessError;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use warehouse::Record;

/// Columns to pull out of each record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Binary outcome column
    pub target: String,
    /// One-hot encoded columns
    pub categorical: Vec<String>,
    /// Imputed and scaled columns
    pub numeric: Vec<String>,
}

impl DatasetSchema {
    pub fn new<S: Into<String>>(
        target: impl Into<String>,
        categorical: impl IntoIterator<Item = S>,
        numeric: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            target: target.into(),
            categorical: categorical.into_iter().map(Into::into).collect(),
            numeric: numeric.into_iter().map(Into::into).collect(),
        }
    }

    /// SELECT statement for the target and every feature column of `table`
    pub fn select_query(&self, table: &str) -> String {
        let mut columns = vec![self.target.as_str()];
        columns.extend(self.categorical.iter().map(String::as_str));
        columns.extend(self.numeric.iter().map(String::as_str));
        format!("SELECT\n    {}\nFROM {}", columns.join(",\n    "), table)
    }
}

/// In-memory training table
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Numeric features, one column per `schema.numeric`; missing cells are NaN
    pub numeric: Array2<f64>,
    /// Categorical features, one inner vector per `schema.categorical`
    pub categorical: Vec<Vec<Option<String>>>,
    /// Outcome labels (0 or 1)
    pub target: Vec<usize>,
    pub schema: DatasetSchema,
}

impl Dataset {
    /// Build a dataset from warehouse records
    pub fn from_records(records: &[Record], schema: &DatasetSchema) -> Result<Self, PreprocessError> {
        let n_rows = records.len();
        let mut numeric = Array2::<f64>::zeros((n_rows, schema.numeric.len()));
        let mut categorical = vec![Vec::with_capacity(n_rows); schema.categorical.len()];
        let mut target = Vec::with_capacity(n_rows);

        for (row, record) in records.iter().enumerate() {
            target.push(parse_target(cell(record, &schema.target, row)?, &schema.target, row)?);

            for (col, name) in schema.numeric.iter().enumerate() {
                numeric[(row, col)] = parse_numeric(cell(record, name, row)?, name, row)?;
            }

            for (col, name) in schema.categorical.iter().enumerate() {
                categorical[col].push(parse_categorical(cell(record, name, row)?));
            }
        }

        debug!(
            "Built dataset: {} rows, {} numeric, {} categorical columns",
            n_rows,
            schema.numeric.len(),
            schema.categorical.len()
        );

        Ok(Self {
            numeric,
            categorical,
            target,
            schema: schema.clone(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Rows at `indices`, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            numeric: self.numeric.select(Axis(0), indices),
            categorical: self
                .categorical
                .iter()
                .map(|column| indices.iter().map(|&i| column[i].clone()).collect())
                .collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
            schema: self.schema.clone(),
        }
    }
}

fn cell<'a>(record: &'a Record, column: &str, row: usize) -> Result<&'a Value, PreprocessError> {
    record.get(column).ok_or_else(|| PreprocessError::MissingColumn {
        column: column.to_string(),
        row,
    })
}

fn invalid(column: &str, row: usize, value: &Value) -> PreprocessError {
    PreprocessError::InvalidValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
    }
}

fn parse_target(value: &Value, column: &str, row: usize) -> Result<usize, PreprocessError> {
    let label = match value {
        Value::Bool(b) => Some(usize::from(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Some(0),
            Some(v) if v == 1.0 => Some(1),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(1),
            "false" | "0" => Some(0),
            _ => None,
        },
        _ => None,
    };
    label.ok_or_else(|| invalid(column, row, value))
}

fn parse_numeric(value: &Value, column: &str, row: usize) -> Result<f64, PreprocessError> {
    match value {
        Value::Null => Ok(f64::NAN),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(column, row, value)),
        Value::String(s) => s.trim().parse().map_err(|_| invalid(column, row, value)),
        _ => Err(invalid(column, row, value)),
    }
}

fn parse_categorical(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
