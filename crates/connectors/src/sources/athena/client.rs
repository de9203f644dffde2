//! The Athena query API as seen by the executor, and its AWS SDK implementation.
use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use polyquery_common::AthenaConfig;
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use secrecy::ExposeSecret;
use std::fmt;

/// Identifies one submitted Athena query. Not reused once its results are read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state as reported by Athena.
///
/// Only `Succeeded` and `Failed` are terminal; anything else, `CANCELLED`
/// included, is checked again after the poll interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl ExecutionState {
    pub fn from_athena(state: &str) -> Self {
        match state {
            "QUEUED" => ExecutionState::Queued,
            "RUNNING" => ExecutionState::Running,
            "SUCCEEDED" => ExecutionState::Succeeded,
            "FAILED" => ExecutionState::Failed,
            other => ExecutionState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExecutionState::Queued => "QUEUED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Succeeded => "SUCCEEDED",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Other(other) => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    pub reason: Option<String>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthenaColumn {
    pub name: String,
    pub type_name: String,
}

impl AthenaColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One `GetQueryResults` response. A `None` cell is a datum with no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub columns: Vec<AthenaColumn>,
    pub rows: Vec<Vec<Option<String>>>,
    pub next_token: Option<String>,
}

/// Where submitted queries run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub database: String,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
}

impl QueryTarget {
    pub fn from_config(config: &AthenaConfig) -> Self {
        Self {
            database: config.database.clone(),
            workgroup: config.workgroup.clone(),
            output_location: config.output_location.clone(),
        }
    }
}

/// Submit/poll/fetch operations of the queue-based backend.
///
/// Implementations report failures with the matching code: `SubmissionFailed`,
/// `StatusCheckFailed` and `FetchFailed`.
#[async_trait]
pub trait AthenaApi: Send + Sync {
    async fn start_query(&self, query: &str, target: &QueryTarget) -> Result<ExecutionHandle>;

    async fn execution_status(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus>;

    async fn result_page(
        &self,
        handle: &ExecutionHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage>;

    async fn stop_query(&self, handle: &ExecutionHandle) -> Result<()>;
}

/// [`AthenaApi`] backed by `aws-sdk-athena` with static credentials.
#[derive(Debug, Clone)]
pub struct AwsAthenaApi {
    client: aws_sdk_athena::Client,
}

impl AwsAthenaApi {
    pub fn new(client: aws_sdk_athena::Client) -> Self {
        Self { client }
    }

    pub async fn from_config(config: &AthenaConfig) -> Self {
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.expose_secret().to_string(),
            config
                .session_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            None,
            "polyquery-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_athena::config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        tracing::info!(
            region = %config.region,
            database = %config.database,
            "Athena client created"
        );
        Self::new(aws_sdk_athena::Client::new(&sdk_config))
    }
}

fn sdk_error<E>(code: ErrorCode, operation: &str, err: E) -> PolyQueryError
where
    E: std::error::Error,
{
    PolyQueryError::new(
        code,
        format!("Athena {} failed: {}", operation, DisplayErrorContext(&err)),
    )
    .with_context(ErrorContext::Backend {
        backend: "athena".to_string(),
        operation: operation.to_string(),
    })
}

#[async_trait]
impl AthenaApi for AwsAthenaApi {
    async fn start_query(&self, query: &str, target: &QueryTarget) -> Result<ExecutionHandle> {
        let mut request = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&target.database)
                    .build(),
            );
        if let Some(workgroup) = &target.workgroup {
            request = request.work_group(workgroup);
        }
        if let Some(location) = &target.output_location {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error(ErrorCode::SubmissionFailed, "StartQueryExecution", e))?;

        output
            .query_execution_id()
            .map(ExecutionHandle::new)
            .ok_or_else(|| {
                PolyQueryError::new(
                    ErrorCode::SubmissionFailed,
                    "StartQueryExecution returned no query execution id",
                )
            })
    }

    async fn execution_status(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                sdk_error(ErrorCode::StatusCheckFailed, "GetQueryExecution", e)
                    .with_execution_id(handle.as_str())
            })?;

        let status = output.query_execution().and_then(|e| e.status());
        let state = status
            .and_then(|s| s.state())
            .map(|s| ExecutionState::from_athena(s.as_str()))
            .unwrap_or_else(|| ExecutionState::Other("UNKNOWN".to_string()));
        let reason = status
            .and_then(|s| s.state_change_reason())
            .map(str::to_string);

        Ok(ExecutionStatus { state, reason })
    }

    async fn result_page(
        &self,
        handle: &ExecutionHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(handle.as_str())
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                sdk_error(ErrorCode::FetchFailed, "GetQueryResults", e)
                    .with_execution_id(handle.as_str())
            })?;

        let result_set = output.result_set();
        let columns = result_set
            .and_then(|rs| rs.result_set_metadata())
            .map(|meta| {
                meta.column_info()
                    .iter()
                    .map(|c| AthenaColumn::new(c.name(), c.r#type()))
                    .collect()
            })
            .unwrap_or_default();
        let rows = result_set
            .map(|rs| {
                rs.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().map(str::to_string))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ResultPage {
            columns,
            rows,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn stop_query(&self, handle: &ExecutionHandle) -> Result<()> {
        self.client
            .stop_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                sdk_error(ErrorCode::QueryCancelled, "StopQueryExecution", e)
                    .with_execution_id(handle.as_str())
            })?;
        Ok(())
    }
}
