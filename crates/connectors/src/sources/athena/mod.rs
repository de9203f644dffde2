//! Athena executor: submit, poll to completion, page through results.
pub mod client;
pub mod fetch;
pub mod normalize;
pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    AthenaApi, AthenaColumn, AwsAthenaApi, ExecutionHandle, ExecutionState, ExecutionStatus,
    QueryTarget, ResultPage,
};
pub use poller::PollSettings;

use crate::sources::{cancelled_error, QueryExecutor};
use async_trait::async_trait;
use polyquery_common::scrubber::query_for_log;
use polyquery_common::{AthenaConfig, Backend, TabularResult};
use polyquery_error::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct AthenaExecutor {
    api: Arc<dyn AthenaApi>,
    target: QueryTarget,
    poll: PollSettings,
}

impl AthenaExecutor {
    pub fn new(api: Arc<dyn AthenaApi>, target: QueryTarget, poll: PollSettings) -> Self {
        Self { api, target, poll }
    }

    /// Build an executor talking to AWS with the config's static credentials.
    pub async fn connect(config: &AthenaConfig) -> Self {
        let api = AwsAthenaApi::from_config(config).await;
        Self::new(
            Arc::new(api),
            QueryTarget::from_config(config),
            PollSettings::from_config(config),
        )
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }
}

#[async_trait]
impl QueryExecutor for AthenaExecutor {
    fn backend(&self) -> Backend {
        Backend::Athena
    }

    async fn execute(&self, query: &str) -> Result<TabularResult> {
        self.execute_cancellable(query, &CancellationToken::new())
            .await
    }

    /// Submission always runs to completion so the execution id is known;
    /// cancellation after that stops the execution on the Athena side.
    async fn execute_cancellable(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<TabularResult> {
        if cancel.is_cancelled() {
            return Err(cancelled_error(Backend::Athena));
        }
        info!(
            database = %self.target.database,
            query = %query_for_log(query),
            "Submitting Athena query"
        );

        let handle = self
            .api
            .start_query(query, &self.target)
            .await
            .map_err(|e| {
                error!(error = %e, "Athena query submission failed");
                e
            })?;
        info!(execution_id = %handle, "Athena query submitted");

        let checks = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(execution_id = %handle, "Athena query cancelled, stopping it");
                poller::stop_execution(self.api.as_ref(), &handle).await;
                return Err(cancelled_error(Backend::Athena).with_execution_id(handle.as_str()));
            }
            outcome = poller::wait_for_completion(self.api.as_ref(), &handle, &self.poll) => outcome?,
        };

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(cancelled_error(Backend::Athena).with_execution_id(handle.as_str()));
            }
            page = fetch::fetch_all_pages(self.api.as_ref(), &handle) => page?,
        };
        let result = normalize::normalize(&page.columns, page.rows);

        info!(
            execution_id = %handle,
            status_checks = checks,
            rows = result.row_count(),
            columns = result.column_names.len(),
            "Athena query completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::athena::testing::ScriptedAthena;
    use polyquery_error::ErrorCode;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn executor(api: Arc<ScriptedAthena>) -> AthenaExecutor {
        let config = AthenaConfig::new("AKIA", "secret", "ap-south-1");
        AthenaExecutor::new(
            api,
            QueryTarget::from_config(&config),
            PollSettings {
                interval: Duration::from_secs(2),
                timeout: None,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_polls_then_fetches() {
        let api = Arc::new(
            ScriptedAthena::new()
                .with_states(&["QUEUED", "RUNNING", "SUCCEEDED"])
                .with_pages(vec![
                    ResultPage {
                        columns: vec![
                            AthenaColumn::new("_meta", "varchar"),
                            AthenaColumn::new("id", "integer"),
                        ],
                        rows: vec![
                            vec![Some("_meta".into()), Some("id".into())],
                            vec![Some("m".into()), Some("1".into())],
                        ],
                        next_token: Some("t1".into()),
                    },
                    ResultPage {
                        columns: Vec::new(),
                        rows: vec![vec![Some("m".into()), None]],
                        next_token: None,
                    },
                ]),
        );

        let result = executor(api.clone()).execute("SELECT id FROM t").await.unwrap();

        assert_eq!(api.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(api.page_calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.column_names, vec!["id"]);
        assert_eq!(
            result.rows,
            vec![vec!["id".to_string()], vec!["1".to_string()], vec!["NIL".to_string()]]
        );
        assert_eq!(result.without_header_row().row_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_query_skips_fetch() {
        let api = Arc::new(ScriptedAthena::new().with_states(&["RUNNING", "FAILED"]));

        let err = executor(api.clone()).execute("SELEC 1").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::QueryFailed);
        assert_eq!(err.execution_id.as_deref(), Some("q-1"));
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_execute_gets_its_own_handle() {
        let api = Arc::new(ScriptedAthena::new());
        let executor = executor(api.clone());

        executor.execute("SELECT 1").await.unwrap();
        executor.execute("SELECT 2").await.unwrap();

        assert_eq!(api.start_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_running_execution() {
        let api = Arc::new(ScriptedAthena::new().with_states(&["RUNNING"]));
        let executor = Arc::new(executor(api.clone()));
        let cancel = CancellationToken::new();

        let task = {
            let executor = executor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                executor
                    .execute_cancellable("SELECT * FROM events", &cancel)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::QueryCancelled);
        assert_eq!(err.execution_id.as_deref(), Some("q-1"));
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_submit_skips_athena() {
        let api = Arc::new(ScriptedAthena::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor(api.clone())
            .execute_cancellable("SELECT 1", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::QueryCancelled);
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.stop_calls.load(Ordering::SeqCst), 0);
    }
}
