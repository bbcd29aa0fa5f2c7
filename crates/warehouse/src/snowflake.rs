//! Snowflake REST Client
//!
//! Speaks the session/query endpoints used by the official connectors:
//! a password login yields a session token, statements are posted with
//! that token, and large results are fetched from the chunk URLs listed in
//! the first response.

use crate::credentials::WarehouseConfig;
use crate::error::WarehouseError;
use crate::{Record, Warehouse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// HTTP timeout for a single request
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Delay between polls of a still-running query
const POLL_INTERVAL_MS: u64 = 500;

/// Upper bound on polls before giving up (~1 hour)
const MAX_POLLS: usize = 7200;

/// Response codes meaning "query still running"
const QUERY_IN_PROGRESS: &[&str] = &["333333", "333334"];

const CLIENT_APP_ID: &str = "retention-drivers";

/// Common response wrapper
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    message: Option<String>,
    code: Option<String>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: Option<String>,
}

/// Column description from a result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ColumnType {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub scale: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultChunk {
    url: String,
    #[serde(default)]
    row_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
    #[serde(default)]
    chunks: Vec<ResultChunk>,
    #[serde(default)]
    chunk_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    qrmk: Option<String>,
    #[serde(default)]
    query_result_format: Option<String>,
    #[serde(default)]
    get_result_url: Option<String>,
    #[serde(default)]
    query_id: Option<String>,
}

/// Authenticated session
struct Session {
    token: String,
    sequence_id: u64,
}

impl Session {
    fn auth_header(&self) -> String {
        format!("Snowflake Token=\"{}\"", self.token)
    }
}

/// Snowflake client; every query or batch runs in its own session
pub struct SnowflakeClient {
    config: WarehouseConfig,
    base_url: String,
    http: reqwest::Client,
}

impl SnowflakeClient {
    /// Create a client for the configured account
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let base_url = config.base_url();
        Self::with_base_url(config, base_url)
    }

    /// Create a client against an explicit endpoint (private link, proxies)
    pub fn with_base_url(
        config: WarehouseConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, WarehouseError> {
        let http = http_builder().build()?;
        Ok(Self::with_http_client(config, base_url, http))
    }

    pub(crate) fn with_http_client(
        config: WarehouseConfig,
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Creating Snowflake client for {}", base_url);

        Self {
            config,
            base_url,
            http,
        }
    }

    async fn login(&self) -> Result<Session, WarehouseError> {
        let url = format!("{}/session/v1/login-request", self.base_url);
        let body = json!({
            "data": {
                "CLIENT_APP_ID": CLIENT_APP_ID,
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
                "ACCOUNT_NAME": self.config.account_name(),
                "LOGIN_NAME": self.config.user,
                "PASSWORD": self.config.password,
                "SESSION_PARAMETERS": { "QUERY_RESULT_FORMAT": "JSON" },
            }
        });

        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("Logging in to {} as {}", self.base_url, self.config.user);
        let response: Envelope<LoginData> = self
            .http
            .post(&url)
            .query(&[
                ("warehouse", self.config.warehouse.as_str()),
                ("roleName", self.config.role.as_str()),
                ("request_id", request_id.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.data.and_then(|d| d.token) {
            Some(token) if response.success => Ok(Session {
                token,
                sequence_id: 0,
            }),
            _ => Err(WarehouseError::Authentication(
                response
                    .message
                    .unwrap_or_else(|| "login rejected".to_string()),
            )),
        }
    }

    async fn logout(&self, session: &Session) {
        let url = format!("{}/session", self.base_url);
        let result = self
            .http
            .post(&url)
            .query(&[("delete", "true")])
            .header(AUTHORIZATION, session.auth_header())
            .header(ACCEPT, "application/json")
            .send()
            .await;
        if let Err(e) = result {
            warn!("Failed to close Snowflake session: {}", e);
        }
    }

    /// Post one statement and wait for its first result page
    async fn submit(&self, session: &mut Session, sql: &str) -> Result<QueryData, WarehouseError> {
        session.sequence_id += 1;
        let url = format!("{}/queries/v1/query-request", self.base_url);
        let body = json!({
            "sqlText": sql,
            "asyncExec": false,
            "sequenceId": session.sequence_id,
            "querySubmissionTime": chrono::Utc::now().timestamp_millis(),
        });

        let mut response: Envelope<QueryData> = self
            .http
            .post(&url)
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .header(AUTHORIZATION, session.auth_header())
            .header(ACCEPT, "application/snowflake")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut polls = 0;
        while is_in_progress(&response) {
            let result_url = response
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .ok_or_else(|| WarehouseError::Decode("query in progress without result URL".to_string()))?;
            if polls >= MAX_POLLS {
                return Err(WarehouseError::QueryFailed {
                    code: response.code.unwrap_or_default(),
                    message: "query did not complete in time".to_string(),
                });
            }
            polls += 1;
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;

            debug!("Polling query result ({})", polls);
            response = self
                .http
                .get(format!("{}{}", self.base_url, result_url))
                .header(AUTHORIZATION, session.auth_header())
                .header(ACCEPT, "application/snowflake")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
        }

        if !response.success {
            let err = WarehouseError::QueryFailed {
                code: response.code.unwrap_or_default(),
                message: response
                    .message
                    .unwrap_or_else(|| "unknown error".to_string()),
            };
            error!("{}", err);
            return Err(err);
        }

        let data = response.data.unwrap_or_default();
        if let Some(id) = &data.query_id {
            debug!("Query {} completed", id);
        }
        Ok(data)
    }

    /// Download every result chunk, in order
    async fn fetch_chunks(&self, data: &QueryData) -> Result<Vec<Vec<Option<String>>>, WarehouseError> {
        let mut rows = Vec::new();
        if data.chunks.is_empty() {
            return Ok(rows);
        }

        let headers = chunk_headers(data)?;
        for (idx, chunk) in data.chunks.iter().enumerate() {
            debug!(
                "Downloading result chunk {}/{} ({} rows)",
                idx + 1,
                data.chunks.len(),
                chunk.row_count
            );
            let body = self
                .http
                .get(&chunk.url)
                .headers(headers.clone())
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            rows.extend(parse_chunk(&body)?);
        }
        Ok(rows)
    }

    async fn run_query(&self, session: &mut Session, sql: &str) -> Result<Vec<Record>, WarehouseError> {
        let mut data = self.submit(session, sql).await?;
        if let Some(format) = &data.query_result_format {
            if !format.eq_ignore_ascii_case("json") {
                return Err(WarehouseError::Decode(format!(
                    "unsupported result format {}",
                    format
                )));
            }
        }

        let mut rows = std::mem::take(&mut data.rowset);
        rows.extend(self.fetch_chunks(&data).await?);
        decode_rows(&data.rowtype, rows)
    }
}

impl Warehouse for SnowflakeClient {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Record>, WarehouseError> {
        let mut session = self.login().await?;
        let result = self.run_query(&mut session, sql).await;
        self.logout(&session).await;

        let records = result?;
        info!("Query successfully executed ({} rows)", records.len());
        Ok(records)
    }

    async fn execute_batch(&self, statements: &[&str]) -> Result<(), WarehouseError> {
        let mut session = self.login().await?;
        let mut result = Ok(());
        for (idx, sql) in statements.iter().enumerate() {
            if let Err(e) = self.submit(&mut session, sql).await {
                result = Err(e);
                break;
            }
            info!("executed query {}/{} successfully", idx + 1, statements.len());
        }
        self.logout(&session).await;
        result
    }
}

fn http_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(format!("{}/{}", CLIENT_APP_ID, env!("CARGO_PKG_VERSION")))
}

fn is_in_progress(response: &Envelope<QueryData>) -> bool {
    response
        .code
        .as_deref()
        .map_or(false, |code| QUERY_IN_PROGRESS.contains(&code))
}

fn chunk_headers(data: &QueryData) -> Result<HeaderMap, WarehouseError> {
    let mut headers = HeaderMap::new();
    let invalid = |e: &dyn std::fmt::Display| WarehouseError::Decode(format!("invalid chunk header: {}", e));

    match (&data.chunk_headers, &data.qrmk) {
        (Some(map), _) => {
            for (name, value) in map {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e))?;
                let value = HeaderValue::from_str(value).map_err(|e| invalid(&e))?;
                headers.insert(name, value);
            }
        }
        (None, Some(key)) => {
            headers.insert(
                "x-amz-server-side-encryption-customer-algorithm",
                HeaderValue::from_static("AES256"),
            );
            headers.insert(
                "x-amz-server-side-encryption-customer-key",
                HeaderValue::from_str(key).map_err(|e| invalid(&e))?,
            );
        }
        (None, None) => {}
    }
    Ok(headers)
}

/// Chunk bodies are comma-separated JSON arrays without enclosing brackets
pub(crate) fn parse_chunk(body: &str) -> Result<Vec<Vec<Option<String>>>, WarehouseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{}]", trimmed))?)
}

/// Convert raw string cells into typed records using the column types
pub(crate) fn decode_rows(
    columns: &[ColumnType],
    rows: Vec<Vec<Option<String>>>,
) -> Result<Vec<Record>, WarehouseError> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            if row.len() != columns.len() {
                return Err(WarehouseError::Decode(format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    columns.len()
                )));
            }
            Ok(columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.name.clone(), decode_cell(column, cell)))
                .collect())
        })
        .collect()
}

fn decode_cell(column: &ColumnType, cell: Option<String>) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };

    match column.kind.to_ascii_lowercase().as_str() {
        "fixed" if column.scale.unwrap_or(0) == 0 => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| decode_float(raw)),
        "fixed" | "real" => decode_float(raw),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            _ => Value::String(raw),
        },
        _ => Value::String(raw),
    }
}

fn decode_float(raw: String) -> Value {
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(raw))
}
