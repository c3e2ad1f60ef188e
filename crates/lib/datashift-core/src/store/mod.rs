//! Store interfaces and database client implementations.
//!
//! `SearchBackend` and `SqlExecutor` are the seams between the control planes
//! and the databases. `ElasticsearchClient` and `PgExecutor` are the
//! production implementations.

pub mod elasticsearch;
pub mod postgres;

use std::{error::Error, fmt};

use async_trait::async_trait;
use datashift_store::models::Row;
use serde_json::Value;

pub use elasticsearch::{ElasticsearchClient, ElasticsearchConfig};
pub use postgres::{PgExecutor, PostgresConfig};

#[derive(Debug)]
pub enum StoreError {
    Http(Box<reqwest::Error>),
    Status { status: u16, reason: String },
    NotFound(String),
    Sql(Box<sqlx::Error>),
    Decode(String),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Status { status, reason } => {
                write!(f, "Elasticsearch returned {status}: {reason}")
            }
            Self::NotFound(message) => write!(f, "Not found: {message}"),
            Self::Sql(err) => write!(f, "{err}"),
            Self::Decode(message) => write!(f, "Unexpected response: {message}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Sql(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Raw access to the search engine's REST API.
///
/// Methods return the engine's response bodies untouched; the control plane
/// owns their interpretation.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Returns `true` when the cluster answers at all.
    async fn ping(&self) -> bool;

    /// Runs a search, opening a scroll context when `scroll` is set.
    async fn search(&self, index: &str, body: Value, scroll: Option<&str>) -> StoreResult<Value>;

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> StoreResult<Value>;

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()>;

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Value>;

    async fn get_aliases(&self, pattern: &str) -> StoreResult<Value>;

    async fn get_mapping(&self, index: &str) -> StoreResult<Value>;

    async fn count(&self, index: &str, body: Value) -> StoreResult<Value>;

    /// Sends newline-delimited bulk actions.
    async fn bulk(&self, lines: Vec<Value>) -> StoreResult<Value>;

    async fn refresh(&self, index: &str) -> StoreResult<()>;

    async fn cluster_health(&self) -> StoreResult<Value>;

    async fn index_exists(&self, index: &str) -> StoreResult<bool>;
}

/// Statement execution against the relational database.
///
/// Parameters are JSON scalars bound positionally to `$1..$n`.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Runs a row-returning statement and yields each row as a JSON object.
    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<u64>;

    /// Runs `sql` once per parameter set inside a single transaction.
    ///
    /// Nothing is committed unless every execution succeeds.
    async fn execute_batch(&self, sql: &str, batches: &[Vec<Value>]) -> StoreResult<u64>;
}
