use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use datashift_store::models::Row;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Arguments, Either, Executor, PgPool, Statement, TypeInfo};
use tracing::debug;

use super::{SqlExecutor, StoreError, StoreResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const RESULT_ALIAS: &str = "datashift_rows";
/// Parameter types a text-bound value reaches without a cast.
const TEXTUAL_TYPES: [&str; 6] = ["TEXT", "VARCHAR", "BPCHAR", "NAME", "CHAR", "UNKNOWN"];

/// Connection settings for a `PostgreSQL` database.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Full connection URL; takes precedence over the discrete fields.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PostgresConfig {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Resolves the settings into driver connect options.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidInput` if the connection URL cannot be parsed.
    pub fn connect_options(&self) -> StoreResult<PgConnectOptions> {
        if let Some(url) = self.url.as_deref() {
            return PgConnectOptions::from_str(url).map_err(|err| {
                StoreError::InvalidInput(format!("invalid postgres url: {err}"))
            });
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password))
    }
}

/// `sqlx` pool-backed statement executor.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Creates a pool that opens connections on first use.
    ///
    /// # Errors
    /// Returns `StoreError` if the connect options are invalid.
    pub fn connect_lazy(config: &PostgresConfig) -> StoreResult<Self> {
        let options = config.connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Casts text-bound placeholders to the type the server infers for them.
    ///
    /// Strings and nulls are bound as `TEXT`, which has no assignment cast to
    /// numeric, temporal or other non-text types.
    async fn cast_text_params(&self, sql: &str, text_bound: &[bool]) -> StoreResult<String> {
        if !text_bound.contains(&true) {
            return Ok(sql.to_string());
        }
        let prepared = (&self.pool).prepare(sql).await?;
        let Some(Either::Left(types)) = prepared.parameters() else {
            return Ok(sql.to_string());
        };
        let casts: Vec<Option<&str>> = types
            .iter()
            .zip(text_bound)
            .map(|(type_info, text)| {
                let name = type_info.name();
                (*text && needs_text_cast(name)).then_some(name)
            })
            .collect();
        let rewritten = cast_placeholders(sql, |index| casts.get(index).copied().flatten());
        if rewritten != sql {
            debug!(sql = %rewritten, "cast text parameters");
        }
        Ok(rewritten)
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        let wrapped = wrap_as_json_rows(sql);
        debug!(sql = %wrapped, params = params.len(), "fetch rows");
        let wrapped = self.cast_text_params(&wrapped, &text_bound([params])).await?;
        let arguments = to_arguments(params)?;
        let values: Vec<Value> = sqlx::query_scalar_with(&wrapped, arguments)
            .fetch_all(&self.pool)
            .await?;
        values
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Decode(format!("expected a row object, got {other}"))),
            })
            .collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<u64> {
        let statement = trim_statement(sql);
        debug!(sql = %statement, params = params.len(), "execute");
        let statement = self.cast_text_params(statement, &text_bound([params])).await?;
        let arguments = to_arguments(params)?;
        let result = sqlx::query_with(&statement, arguments)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn execute_batch(&self, sql: &str, batches: &[Vec<Value>]) -> StoreResult<u64> {
        let statement = trim_statement(sql);
        debug!(sql = %statement, batches = batches.len(), "execute batch");
        let statement = self
            .cast_text_params(statement, &text_bound(batches.iter().map(Vec::as_slice)))
            .await?;
        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;
        for params in batches {
            let arguments = to_arguments(params)?;
            let result = sqlx::query_with(&statement, arguments)
                .execute(&mut *tx)
                .await?;
            affected = affected.saturating_add(result.rows_affected());
        }
        tx.commit().await?;
        Ok(affected)
    }
}

/// Strips surrounding whitespace and trailing statement terminators.
fn trim_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

/// Wraps a row-returning statement so every row comes back as one JSON value.
///
/// A CTE accepts both queries and data-modifying statements with `RETURNING`.
/// The statement ends its own line so a trailing `--` comment stays inside it.
fn wrap_as_json_rows(sql: &str) -> String {
    let statement = trim_statement(sql);
    format!("WITH {RESULT_ALIAS} AS ({statement}\n) SELECT row_to_json({RESULT_ALIAS}) FROM {RESULT_ALIAS}")
}

/// Marks parameter positions holding a string or null in any batch.
fn text_bound<'a>(batches: impl IntoIterator<Item = &'a [Value]>) -> Vec<bool> {
    let mut positions = Vec::new();
    for params in batches {
        if positions.len() < params.len() {
            positions.resize(params.len(), false);
        }
        for (slot, value) in positions.iter_mut().zip(params) {
            *slot |= matches!(value, Value::String(_) | Value::Null);
        }
    }
    positions
}

fn needs_text_cast(type_name: &str) -> bool {
    let base = type_name.strip_suffix("[]").unwrap_or(type_name);
    let nameable = base
        .bytes()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == b'_')
        && base.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_');
    nameable
        && !TEXTUAL_TYPES
            .iter()
            .any(|textual| textual.eq_ignore_ascii_case(type_name))
}

/// Replaces each `$n` placeholder that `cast` names a type for with
/// `CAST($n AS type)`. Literals, quoted identifiers, comments and
/// dollar-quoted bodies are left untouched.
fn cast_placeholders<'t>(sql: &str, cast: impl Fn(usize) -> Option<&'t str>) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        let next = bytes.get(i + 1).copied();
        let after_identifier = i > 0 && is_identifier_byte(bytes[i - 1]);
        i = match bytes[i] {
            b'\'' => {
                let escapes = i > 0
                    && bytes[i - 1].eq_ignore_ascii_case(&b'e')
                    && (i < 2 || !is_identifier_byte(bytes[i - 2]));
                skip_quoted(bytes, i, b'\'', escapes)
            }
            b'"' => skip_quoted(bytes, i, b'"', false),
            b'-' if next == Some(b'-') => bytes[i..]
                .iter()
                .position(|&byte| byte == b'\n')
                .map_or(bytes.len(), |offset| i + offset + 1),
            b'/' if next == Some(b'*') => skip_block_comment(bytes, i),
            b'$' if !after_identifier && next.is_some_and(|byte| byte.is_ascii_digit()) => {
                let end = i + 1 + bytes[i + 1..].iter().take_while(|byte| byte.is_ascii_digit()).count();
                let placeholder = &sql[i..end];
                let target = sql[i + 1..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|position| position.checked_sub(1))
                    .and_then(&cast);
                if let Some(type_name) = target {
                    out.push_str(&sql[copied..i]);
                    out.push_str("CAST(");
                    out.push_str(placeholder);
                    out.push_str(" AS ");
                    out.push_str(type_name);
                    out.push(')');
                    copied = end;
                }
                end
            }
            b'$' if !after_identifier => skip_dollar_quoted(bytes, i),
            _ => i + 1,
        };
    }
    out.push_str(&sql[copied..]);
    out
}

const fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

fn skip_quoted(bytes: &[u8], start: usize, quote: u8, escapes: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            byte if byte == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skips a `$tag$ ... $tag$` body, or just the `$` when no tag opens here.
fn skip_dollar_quoted(bytes: &[u8], start: usize) -> usize {
    let tag_len = bytes[start + 1..]
        .iter()
        .take_while(|&&byte| is_identifier_byte(byte) && byte != b'$')
        .count();
    let close = start + 1 + tag_len;
    if bytes.get(close) != Some(&b'$') {
        return start + 1;
    }
    let delimiter = &bytes[start..=close];
    bytes[close + 1..]
        .windows(delimiter.len())
        .position(|window| window == delimiter)
        .map_or(bytes.len(), |offset| close + 1 + offset + delimiter.len())
}

fn to_arguments(params: &[Value]) -> StoreResult<PgArguments> {
    let mut arguments = PgArguments::default();
    for value in params {
        let added = match value {
            Value::Null => arguments.add(None::<String>),
            Value::Bool(flag) => arguments.add(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => arguments.add(integer),
                None => arguments.add(number.as_f64()),
            },
            Value::String(text) => arguments.add(text.clone()),
            other => arguments.add(Json(other.clone())),
        };
        added.map_err(|err| {
            StoreError::InvalidInput(format!("cannot bind parameter {value}: {err}"))
        })?;
    }
    Ok(arguments)
}
