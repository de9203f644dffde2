//! Scripted [`AthenaApi`] used by the unit tests of this module.
use super::client::{
    AthenaApi, ExecutionHandle, ExecutionState, ExecutionStatus, QueryTarget, ResultPage,
};
use async_trait::async_trait;
use polyquery_error::{ErrorCode, PolyQueryError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct ScriptedAthena {
    states: Mutex<VecDeque<String>>,
    last_state: Mutex<Option<String>>,
    failure_reason: Option<String>,
    status_fails_after: Option<usize>,
    pages: Vec<ResultPage>,
    failing_page: Option<usize>,
    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub tokens_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedAthena {
    pub fn new() -> Self {
        Self::default()
    }

    /// States returned by successive status checks; the last one repeats.
    pub fn with_states(self, states: &[&str]) -> Self {
        *self.states.lock().unwrap() = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_failure_reason(mut self, reason: &str) -> Self {
        self.failure_reason = Some(reason.to_string());
        self
    }

    pub fn failing_status_after(mut self, checks: usize) -> Self {
        self.status_fails_after = Some(checks);
        self
    }

    /// Pages served in order, regardless of the token passed.
    pub fn with_pages(mut self, pages: Vec<ResultPage>) -> Self {
        self.pages = pages;
        self
    }

    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing_page = Some(index);
        self
    }
}

#[async_trait]
impl AthenaApi for ScriptedAthena {
    async fn start_query(&self, _query: &str, _target: &QueryTarget) -> Result<ExecutionHandle> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionHandle::new(format!("q-{}", n + 1)))
    }

    async fn execution_status(&self, _handle: &ExecutionHandle) -> Result<ExecutionStatus> {
        let n = self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.status_fails_after.is_some_and(|limit| n >= limit) {
            return Err(PolyQueryError::new(
                ErrorCode::StatusCheckFailed,
                "GetQueryExecution failed: throttled",
            ));
        }

        let next = self.states.lock().unwrap().pop_front();
        let mut last = self.last_state.lock().unwrap();
        if let Some(state) = next {
            *last = Some(state);
        }
        let state = last.clone().unwrap_or_else(|| "SUCCEEDED".to_string());

        Ok(ExecutionStatus {
            state: ExecutionState::from_athena(&state),
            reason: self.failure_reason.clone(),
        })
    }

    async fn result_page(
        &self,
        _handle: &ExecutionHandle,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let n = self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(next_token.map(str::to_string));
        if self.failing_page == Some(n) {
            return Err(PolyQueryError::new(
                ErrorCode::FetchFailed,
                "GetQueryResults failed: connection reset",
            ));
        }
        Ok(self.pages.get(n).cloned().unwrap_or_default())
    }

    async fn stop_query(&self, _handle: &ExecutionHandle) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
