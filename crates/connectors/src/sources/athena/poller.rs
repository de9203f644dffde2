use super::client::{AthenaApi, ExecutionHandle, ExecutionState};
use polyquery_common::AthenaConfig;
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often to check an Athena execution and how long to wait overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits until a terminal state, however long that takes.
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(polyquery_common::models::DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &AthenaConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            timeout: config.poll_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Block until the execution reaches `SUCCEEDED`.
///
/// Returns the number of status checks performed. On timeout the execution is
/// stopped on a best-effort basis before `QueryTimedOut` is returned.
pub async fn wait_for_completion(
    api: &dyn AthenaApi,
    handle: &ExecutionHandle,
    settings: &PollSettings,
) -> Result<usize> {
    let Some(limit) = settings.timeout else {
        return poll_until_terminal(api, handle, settings.interval).await;
    };

    match tokio::time::timeout(limit, poll_until_terminal(api, handle, settings.interval)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                execution_id = %handle,
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "Athena query exceeded its deadline, stopping it"
            );
            stop_execution(api, handle).await;
            Err(PolyQueryError::new(
                ErrorCode::QueryTimedOut,
                format!(
                    "Athena query did not finish within {} ms",
                    limit.as_millis()
                ),
            )
            .with_context(ErrorContext::Execution {
                execution_id: handle.to_string(),
                state: None,
                reason: None,
            })
            .with_execution_id(handle.as_str()))
        }
    }
}

/// Ask Athena to stop `handle`. Failures are logged, not returned.
pub async fn stop_execution(api: &dyn AthenaApi, handle: &ExecutionHandle) {
    if let Err(e) = api.stop_query(handle).await {
        warn!(execution_id = %handle, error = %e, "StopQueryExecution failed");
    }
}

async fn poll_until_terminal(
    api: &dyn AthenaApi,
    handle: &ExecutionHandle,
    interval: Duration,
) -> Result<usize> {
    let mut checks = 0usize;
    loop {
        let status = api.execution_status(handle).await.map_err(|e| {
            error!(execution_id = %handle, error = %e, "Failed to read Athena query status");
            e
        })?;
        checks += 1;

        match status.state {
            ExecutionState::Succeeded => {
                debug!(execution_id = %handle, checks, "Athena query succeeded");
                return Ok(checks);
            }
            ExecutionState::Failed => {
                let reason = status.reason.unwrap_or_else(|| "no reason given".to_string());
                error!(execution_id = %handle, reason = %reason, "Athena query failed");
                return Err(PolyQueryError::new(
                    ErrorCode::QueryFailed,
                    format!("Athena query failed: {}", reason),
                )
                .with_context(ErrorContext::Execution {
                    execution_id: handle.to_string(),
                    state: Some(ExecutionState::Failed.to_string()),
                    reason: Some(reason),
                })
                .with_execution_id(handle.as_str()));
            }
            state => {
                info!(execution_id = %handle, state = %state, "Athena query not finished yet");
                tokio::time::sleep(interval).await;
            }
        }
    }
}
