//! Process-wide holder of the four backend clients.
//!
//! Each backend gets one lazily-built executor. Construction happens at most
//! once per backend even under concurrent initialization, and the built client
//! is shared by every later query.
use polyquery_common::{
    Backend, BackendSelector, DriverConfig, TabularResult, UnknownBackendPolicy,
};
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::sources::{build_executor, QueryExecutor};

static GLOBAL: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::new);

#[derive(Default)]
pub struct DriverRegistry {
    athena: OnceCell<Arc<dyn QueryExecutor>>,
    mysql: OnceCell<Arc<dyn QueryExecutor>>,
    presto: OnceCell<Arc<dyn QueryExecutor>>,
    trino: OnceCell<Arc<dyn QueryExecutor>>,
    empty_on_unknown: AtomicBool,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknown_backend_policy(policy: UnknownBackendPolicy) -> Self {
        let registry = Self::new();
        registry.set_unknown_backend_policy(policy);
        registry
    }

    /// The registry behind the crate-level `initialize_driver`/`execute_query`.
    pub fn global() -> &'static DriverRegistry {
        &GLOBAL
    }

    pub fn set_unknown_backend_policy(&self, policy: UnknownBackendPolicy) {
        self.empty_on_unknown
            .store(policy == UnknownBackendPolicy::Empty, Ordering::SeqCst);
    }

    pub fn unknown_backend_policy(&self) -> UnknownBackendPolicy {
        if self.empty_on_unknown.load(Ordering::SeqCst) {
            UnknownBackendPolicy::Empty
        } else {
            UnknownBackendPolicy::Reject
        }
    }

    fn cell(&self, backend: Backend) -> &OnceCell<Arc<dyn QueryExecutor>> {
        match backend {
            Backend::Athena => &self.athena,
            Backend::Mysql => &self.mysql,
            Backend::Presto => &self.presto,
            Backend::Trino => &self.trino,
        }
    }

    pub fn is_initialized(&self, backend: Backend) -> bool {
        self.cell(backend).initialized()
    }

    /// Backends with a live client.
    pub fn initialized_backends(&self) -> Vec<Backend> {
        Backend::ALL
            .iter()
            .copied()
            .filter(|b| self.is_initialized(*b))
            .collect()
    }

    /// `Some(backend)` for a usable selector, `None` when the policy says an
    /// unknown selector yields an empty result.
    fn resolve(&self, selector: &BackendSelector, operation: &str) -> Result<Option<Backend>> {
        match selector.resolve() {
            Ok(backend) => Ok(Some(backend)),
            Err(e) => match self.unknown_backend_policy() {
                UnknownBackendPolicy::Reject => {
                    error!(selector = %selector, operation, "Unknown backend");
                    Err(e)
                }
                UnknownBackendPolicy::Empty => {
                    warn!(selector = %selector, operation, "Unknown backend, ignoring");
                    Ok(None)
                }
            },
        }
    }

    /// Build the client for `selector` from `config` unless it already exists.
    ///
    /// An Athena config without credentials or region is accepted and leaves the
    /// client unbuilt; queries against it fail with `UninitializedClient`.
    pub async fn initialize(
        &self,
        selector: impl Into<BackendSelector>,
        config: DriverConfig,
    ) -> Result<()> {
        let selector = selector.into();
        let Some(backend) = self.resolve(&selector, "initialize")? else {
            return Ok(());
        };

        if config.backend() != backend {
            error!(
                backend = %backend,
                config = %config.backend(),
                "Config does not match backend"
            );
            return Err(PolyQueryError::new(
                ErrorCode::InvalidConfigForBackend,
                format!(
                    "Invalid config for {}: got a {} config",
                    backend.display_name(),
                    config.backend().display_name()
                ),
            )
            .with_context(ErrorContext::Backend {
                backend: backend.name().to_string(),
                operation: "initialize".to_string(),
            })
            .with_hint(format!("Pass DriverConfig::{:?}(..)", backend)));
        }

        if self.is_initialized(backend) {
            debug!(backend = %backend, "Client already initialized");
            return Ok(());
        }

        if let DriverConfig::Athena(athena) = &config {
            if !athena.is_complete() {
                warn!(
                    backend = %backend,
                    "Incomplete config, client not created"
                );
                return Ok(());
            }
            athena.check_settings().map_err(|e| {
                error!(backend = %backend, error = %e, "Invalid Athena settings");
                e
            })?;
        }

        self.initialize_with(backend, || build_executor(&config))
            .await
            .map_err(|e| {
                error!(backend = %backend, error = %e, "Failed to create client");
                e
            })
    }

    /// Install the executor produced by `build` unless one is already present.
    ///
    /// Concurrent callers wait for the first one; `build` runs at most once on
    /// success.
    pub async fn initialize_with<F, Fut>(&self, backend: Backend, build: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn QueryExecutor>>>,
    {
        self.cell(backend).get_or_try_init(build).await?;
        info!(backend = %backend, "Client initialized");
        Ok(())
    }

    pub async fn execute(
        &self,
        query: &str,
        selector: impl Into<BackendSelector>,
    ) -> Result<TabularResult> {
        let selector = selector.into();
        let Some(backend) = self.resolve(&selector, "execute")? else {
            return Ok(TabularResult::default());
        };
        self.executor(backend)?.execute(query).await
    }

    /// Like [`execute`](Self::execute), but gives up with `QueryCancelled` as
    /// soon as `cancel` fires. The executor releases any server-side work it
    /// already started.
    pub async fn execute_cancellable(
        &self,
        query: &str,
        selector: impl Into<BackendSelector>,
        cancel: &CancellationToken,
    ) -> Result<TabularResult> {
        let selector = selector.into();
        let Some(backend) = self.resolve(&selector, "execute")? else {
            return Ok(TabularResult::default());
        };
        let executor = self.executor(backend)?;

        let result = executor.execute_cancellable(query, cancel).await;
        if let Err(e) = &result {
            if e.code == ErrorCode::QueryCancelled {
                warn!(backend = %backend, "Query cancelled");
            }
        }
        result
    }

    fn executor(&self, backend: Backend) -> Result<Arc<dyn QueryExecutor>> {
        self.cell(backend).get().cloned().ok_or_else(|| {
            error!(backend = %backend, "Client not initialized");
            PolyQueryError::new(
                ErrorCode::UninitializedClient,
                format!("{} client is not initialized", backend.display_name()),
            )
            .with_context(ErrorContext::Backend {
                backend: backend.name().to_string(),
                operation: "execute".to_string(),
            })
            .with_hint("Call initialize_driver with a complete config for this backend first")
        })
    }
}
