//! In-Memory Warehouse

use crate::error::WarehouseError;
use crate::{Record, Warehouse};
use std::sync::Mutex;
use tracing::{debug, info};

/// Warehouse that serves a fixed set of rows for every query.
///
/// Statements are recorded so callers can inspect what was executed.
pub struct InMemoryWarehouse {
    /// Rows returned by every query
    records: Vec<Record>,
    /// Error message returned instead of rows, if set
    failure: Option<String>,
    /// Statements executed so far
    executed: Mutex<Vec<String>>,
}

impl InMemoryWarehouse {
    /// Create a warehouse that returns `records`
    pub fn new(records: Vec<Record>) -> Self {
        info!("Creating in-memory warehouse with {} records", records.len());
        Self {
            records,
            failure: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Create a warehouse whose queries always fail
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(message.into()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, sql: &str) -> Result<(), WarehouseError> {
        let mut executed = self
            .executed
            .lock()
            .map_err(|e| WarehouseError::Connection(format!("Lock error: {}", e)))?;
        executed.push(sql.to_string());

        match &self.failure {
            Some(message) => Err(WarehouseError::QueryFailed {
                code: "000000".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Warehouse for InMemoryWarehouse {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Record>, WarehouseError> {
        self.record(sql)?;
        debug!("Serving {} in-memory records", self.records.len());
        Ok(self.records.clone())
    }

    async fn execute_batch(&self, statements: &[&str]) -> Result<(), WarehouseError> {
        for (idx, sql) in statements.iter().enumerate() {
            self.record(sql)?;
            info!("executed query {}/{} successfully", idx + 1, statements.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_returns_records() {
        let warehouse = InMemoryWarehouse::new(vec![record(json!({"A": 1}))]);

        let rows = warehouse.execute_query("SELECT A FROM t").await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["A"], 1);
        assert_eq!(warehouse.executed(), vec!["SELECT A FROM t"]);
    }

    #[tokio::test]
    async fn test_batch_runs_in_order() {
        let warehouse = InMemoryWarehouse::new(Vec::new());

        warehouse
            .execute_batch(&["CREATE TABLE t (a INT)", "INSERT INTO t VALUES (1)"])
            .await
            .unwrap();

        assert_eq!(
            warehouse.executed(),
            vec!["CREATE TABLE t (a INT)", "INSERT INTO t VALUES (1)"]
        );
    }

    #[tokio::test]
    async fn test_failure() {
        let warehouse = InMemoryWarehouse::failing("Object does not exist");
        let err = warehouse.execute_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err, WarehouseError::QueryFailed { .. }));
        assert!(err.to_string().contains("Object does not exist"));
    }
}
