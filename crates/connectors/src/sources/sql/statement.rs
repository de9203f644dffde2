//! Client for the Trino/Presto HTTP statement protocol.
//!
//! A query is `POST`ed to `/v1/statement`; the server answers with a batch of
//! columns and rows plus an optional `nextUri`, which the client keeps `GET`ting
//! until it disappears. Trino and Presto speak the same protocol and differ only
//! in their header prefix and our transport tuning.
use async_trait::async_trait;
use polyquery_common::scrubber::redact_connection_string;
use polyquery_common::{Backend, DsnConfig};
use polyquery_error::{ErrorCode, ErrorContext, PolyQueryError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::common::{RowSink, SqlColumn};
use super::SqlClient;

const STATEMENT_PATH: &str = "/v1/statement";
const DEFAULT_SOURCE: &str = "polyquery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementProtocol {
    Trino,
    Presto,
}

impl StatementProtocol {
    pub fn backend(&self) -> Backend {
        match self {
            StatementProtocol::Trino => Backend::Trino,
            StatementProtocol::Presto => Backend::Presto,
        }
    }

    fn header(&self, name: &str) -> String {
        match self {
            StatementProtocol::Trino => format!("X-Trino-{}", name),
            StatementProtocol::Presto => format!("X-Presto-{}", name),
        }
    }

    pub fn transport(&self) -> TransportSettings {
        match self {
            StatementProtocol::Trino => TransportSettings {
                connect_timeout: Duration::from_secs(30),
                tcp_keepalive: Duration::from_secs(30),
                max_idle_per_host: 100,
                idle_timeout: Duration::from_secs(90),
            },
            StatementProtocol::Presto => TransportSettings {
                connect_timeout: Duration::from_secs(300),
                tcp_keepalive: Duration::from_secs(30),
                max_idle_per_host: 10,
                idle_timeout: Duration::from_secs(45),
            },
        }
    }
}

/// Connection pool tuning for the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
}

/// Server and session parsed from a
/// `http[s]://user[:password]@host[:port]?catalog=..&schema=..&source=..` DSN.
#[derive(Debug, Clone)]
pub struct StatementTarget {
    pub server: Url,
    pub user: String,
    pub password: Option<SecretString>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub source: String,
}

impl StatementTarget {
    pub fn parse(dsn: &str) -> Result<Self> {
        let url = Url::parse(dsn).map_err(|e| {
            PolyQueryError::from(e)
                .with_hint("Expected http[s]://user@host:port?catalog=..&schema=..")
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PolyQueryError::new(
                ErrorCode::InvalidConnectionString,
                format!("Unsupported scheme '{}' in statement DSN", url.scheme()),
            )
            .with_hint("Use http:// or https://"));
        }
        if url.username().is_empty() {
            return Err(PolyQueryError::new(
                ErrorCode::InvalidConnectionString,
                "Statement DSN has no user",
            )
            .with_hint("Put the user before the host, e.g. http://analyst@trino:8080"));
        }

        let mut catalog = None;
        let mut schema = None;
        let mut source = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "catalog" => catalog = Some(value.into_owned()),
                "schema" => schema = Some(value.into_owned()),
                "source" => source = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut server = url.clone();
        server.set_query(None);
        server.set_path("");
        // Neither call can fail on an http(s) URL
        let _ = server.set_username("");
        let _ = server.set_password(None);

        Ok(Self {
            server,
            user: url.username().to_string(),
            password: url.password().map(|p| SecretString::from(p.to_string())),
            catalog,
            schema,
            source: source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        })
    }

    fn statement_url(&self) -> Result<Url> {
        Ok(self.server.join(STATEMENT_PATH)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<StatementColumn>>,
    data: Option<Vec<Vec<serde_json::Value>>>,
    stats: Option<StatementStats>,
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
struct StatementColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct StatementStats {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryError {
    message: String,
    error_name: Option<String>,
}

pub struct StatementClient {
    http: reqwest::Client,
    target: StatementTarget,
    protocol: StatementProtocol,
}

impl StatementClient {
    pub fn trino(config: &DsnConfig) -> Result<Self> {
        Self::new(config, StatementProtocol::Trino)
    }

    pub fn presto(config: &DsnConfig) -> Result<Self> {
        Self::new(config, StatementProtocol::Presto)
    }

    pub fn new(config: &DsnConfig, protocol: StatementProtocol) -> Result<Self> {
        let dsn = config.dsn.expose_secret();
        let target = StatementTarget::parse(dsn)?;
        let transport = protocol.transport();

        let http = reqwest::Client::builder()
            .connect_timeout(transport.connect_timeout)
            .tcp_keepalive(transport.tcp_keepalive)
            .pool_max_idle_per_host(transport.max_idle_per_host)
            .pool_idle_timeout(transport.idle_timeout)
            .build()
            .map_err(|e| {
                PolyQueryError::new(
                    ErrorCode::ConnectionFailed,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        info!(
            backend = %protocol.backend(),
            dsn = %redact_connection_string(dsn),
            "Statement client created"
        );
        Ok(Self {
            http,
            target,
            protocol,
        })
    }

    pub fn target(&self) -> &StatementTarget {
        &self.target
    }

    fn with_session(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let header = |name: &str| self.protocol.header(name);
        request = request
            .header(header("User"), &self.target.user)
            .header(header("Source"), &self.target.source);
        if let Some(catalog) = &self.target.catalog {
            request = request.header(header("Catalog"), catalog);
        }
        if let Some(schema) = &self.target.schema {
            request = request.header(header("Schema"), schema);
        }
        if let Some(password) = &self.target.password {
            request = request.basic_auth(&self.target.user, Some(password.expose_secret()));
        }
        request
    }

    async fn submit(&self, query: &str) -> Result<QueryResults> {
        let url = self.target.statement_url()?;
        let request = self.with_session(self.http.post(url)).body(query.to_string());
        self.send(request, ErrorCode::SubmissionFailed).await
    }

    async fn advance(&self, next_uri: &str) -> Result<QueryResults> {
        let request = self.with_session(self.http.get(next_uri));
        self.send(request, ErrorCode::FetchFailed).await
    }

    async fn send(&self, request: reqwest::RequestBuilder, code: ErrorCode) -> Result<QueryResults> {
        let backend = self.protocol.backend();
        let context = || ErrorContext::Connection {
            backend: backend.name().to_string(),
            host: self.target.server.host_str().map(str::to_string),
            port: self.target.server.port_or_known_default(),
        };

        let response = request.send().await.map_err(|e| {
            PolyQueryError::new(code, format!("{} request failed: {}", backend.display_name(), e))
                .with_context(context())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PolyQueryError::new(
                code,
                format!(
                    "{} returned HTTP {}: {}",
                    backend.display_name(),
                    status,
                    body.trim()
                ),
            )
            .with_context(context()));
        }

        response.json::<QueryResults>().await.map_err(|e| {
            PolyQueryError::new(
                code,
                format!("Malformed {} response: {}", backend.display_name(), e),
            )
        })
    }
}

#[async_trait]
impl SqlClient for StatementClient {
    fn backend(&self) -> Backend {
        self.protocol.backend()
    }

    async fn run(&self, query: &str, sink: &mut dyn RowSink) -> Result<()> {
        let mut results = self.submit(query).await?;
        let query_id = results.id.clone();
        let mut columns_sent = false;
        let mut batches = 0usize;

        loop {
            if let Some(error) = results.error.take() {
                let name = error.error_name.unwrap_or_else(|| "QUERY_FAILED".to_string());
                return Err(PolyQueryError::new(
                    ErrorCode::QueryFailed,
                    format!("{}: {}", name, error.message),
                )
                .with_context(ErrorContext::Execution {
                    execution_id: query_id.clone(),
                    state: results.stats.as_ref().map(|s| s.state.clone()),
                    reason: Some(error.message),
                })
                .with_execution_id(query_id));
            }

            if !columns_sent {
                if let Some(columns) = results.columns.take() {
                    sink.columns(
                        columns
                            .into_iter()
                            .map(|c| SqlColumn::new(c.name, database_type_name(&c.type_name)))
                            .collect(),
                    )?;
                    columns_sent = true;
                }
            }

            if let Some(data) = results.data.take() {
                if !columns_sent {
                    return Err(PolyQueryError::new(
                        ErrorCode::ScanFailed,
                        "Server sent rows before column metadata",
                    )
                    .with_execution_id(query_id));
                }
                for row in data {
                    sink.row(row.iter().map(cell_text).collect())?;
                }
                batches += 1;
            }

            match results.next_uri.take() {
                Some(next_uri) => {
                    debug!(query_id = %query_id, next_uri = %next_uri, "Following nextUri");
                    results = self
                        .advance(&next_uri)
                        .await
                        .map_err(|e| e.with_execution_id(query_id.as_str()))?;
                }
                None => break,
            }
        }

        if !columns_sent {
            // Statements without a result set, e.g. DDL
            sink.columns(Vec::new())?;
        }
        debug!(query_id = %query_id, batches, "Statement finished");
        Ok(())
    }
}

/// Upper-case type name without parameters: `varchar(20)` → `VARCHAR`,
/// `timestamp(3) with time zone` → `TIMESTAMP WITH TIME ZONE`.
///
/// Structural types (`array`, `map`, `row`) keep their full signature.
pub fn database_type_name(raw: &str) -> String {
    let raw = raw.trim();
    let base = raw.split('(').next().unwrap_or(raw).trim();
    if matches!(base, "array" | "map" | "row") {
        return raw.to_uppercase();
    }

    let mut stripped = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
