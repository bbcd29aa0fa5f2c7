//! Warehouse Access
//!
//! Runs SQL against the analytics warehouse and returns rows as
//! column-name keyed records.

mod credentials;
mod error;
mod memory;
mod snowflake;

pub use credentials::{ConfigError, WarehouseConfig};
pub use error::WarehouseError;
pub use memory::InMemoryWarehouse;
pub use snowflake::SnowflakeClient;

/// One result row: column name -> value
pub type Record = serde_json::Map<String, serde_json::Value>;

/// SQL execution against a warehouse
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Run a single statement and return its rows
    async fn execute_query(&self, sql: &str) -> Result<Vec<Record>, WarehouseError>;

    /// Run statements in order within one session, discarding results
    async fn execute_batch(&self, statements: &[&str]) -> Result<(), WarehouseError>;
}
