//! Warehouse Credentials

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Errors while loading credentials
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

/// Environment variables as the `config` crate sees them (keys lowercased)
#[derive(Debug, Default, Deserialize)]
struct RawCredentials {
    username: Option<String>,
    snowflake_account: Option<String>,
    role: Option<String>,
    warehouse: Option<String>,
    password: Option<String>,
}

/// Snowflake connection settings, validated once at start-up
#[derive(Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub user: String,
    /// Account identifier, optionally with region (`xy12345.eu-west-1`)
    pub account: String,
    pub role: String,
    pub warehouse: String,
    pub password: String,
}

impl WarehouseConfig {
    /// Read `USERNAME`, `SNOWFLAKE_ACCOUNT`, `ROLE`, `WAREHOUSE` and `PASSWORD`
    /// from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Load from an explicit `config` environment source
    pub fn from_environment(source: config::Environment) -> Result<Self, ConfigError> {
        let raw: RawCredentials = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        let mut missing = Vec::new();
        let mut require = |value: Option<String>, name: &'static str| -> String {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let config = Self {
            user: require(raw.username, "USERNAME"),
            account: require(raw.snowflake_account, "SNOWFLAKE_ACCOUNT"),
            role: require(raw.role, "ROLE"),
            warehouse: require(raw.warehouse, "WAREHOUSE"),
            password: require(raw.password, "PASSWORD"),
        };

        if missing.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// Account locator without region, as sent in the login payload
    pub fn account_name(&self) -> &str {
        self.account.split('.').next().unwrap_or(&self.account)
    }

    /// Base URL of the account's REST endpoints
    pub fn base_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com", self.account)
    }
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("user", &self.user)
            .field("account", &self.account)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("password", &"***")
            .finish()
    }
}
