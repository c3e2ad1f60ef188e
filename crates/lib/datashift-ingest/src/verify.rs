//! Cross-store verification after a transfer.
//!
//! Both sides are inspected independently; a failure on one side is recorded
//! in its section of the report and the verdict treats that side as empty.

use chrono::{DateTime, Utc};
use datashift_core::control::{ControlError, SearchControlPlane, SearchRequest, SqlControlPlane};
use datashift_store::models::{ColumnInfo, Row};
use datashift_store::schema::{
    DEFAULT_BASELINE_ID,
    DEFAULT_ID_FIELD,
    DEFAULT_SAMPLE_INDEX,
    DEFAULT_SAMPLE_TABLE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const DEFAULT_BASELINE_ROWS: i64 = 1;

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub index: String,
    pub table: String,
    pub id_field: String,
    /// Id of the seed row present in the table before any transfer.
    pub baseline_id: String,
    /// Rows in the table that did not come from the search engine.
    pub baseline_rows: i64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            index: DEFAULT_SAMPLE_INDEX.to_string(),
            table: DEFAULT_SAMPLE_TABLE.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            baseline_id: DEFAULT_BASELINE_ID.to_string(),
            baseline_rows: DEFAULT_BASELINE_ROWS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchSide {
    pub health: Option<String>,
    pub index_exists: bool,
    pub count: u64,
    pub sample: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SqlSide {
    pub table_exists: bool,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
    pub sample: Option<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    SourceEmpty,
    TargetEmpty,
    Match,
    /// `difference` is source documents minus transferred rows.
    Mismatch { difference: i64 },
}

impl Verdict {
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationReport {
    pub checked_at: DateTime<Utc>,
    pub search: SearchSide,
    pub sql: SqlSide,
    pub source_count: u64,
    /// Table rows minus the baseline rows.
    pub transferred_rows: i64,
    pub verdict: Verdict,
}

/// Compares source documents with table rows, discounting the baseline rows.
#[must_use]
pub fn verdict(source_count: u64, row_count: i64, baseline_rows: i64) -> Verdict {
    let source = i64::try_from(source_count).unwrap_or(i64::MAX);
    let transferred = row_count - baseline_rows;
    if source == 0 {
        Verdict::SourceEmpty
    } else if row_count <= baseline_rows {
        Verdict::TargetEmpty
    } else if source == transferred {
        Verdict::Match
    } else {
        Verdict::Mismatch {
            difference: source - transferred,
        }
    }
}

/// Inspects both stores and compares their counts.
pub async fn verify(
    search: &SearchControlPlane,
    sql: &SqlControlPlane,
    options: &VerifyOptions,
) -> VerificationReport {
    let search_side = inspect_search(search, options).await;
    let sql_side = inspect_sql(sql, options).await;
    let verdict = verdict(search_side.count, sql_side.row_count, options.baseline_rows);
    info!(
        source = search_side.count,
        rows = sql_side.row_count,
        ?verdict,
        "verification finished"
    );
    VerificationReport {
        checked_at: Utc::now(),
        source_count: search_side.count,
        transferred_rows: (sql_side.row_count - options.baseline_rows).max(0),
        search: search_side,
        sql: sql_side,
        verdict,
    }
}

async fn inspect_search(control: &SearchControlPlane, options: &VerifyOptions) -> SearchSide {
    let mut side = SearchSide::default();
    if let Err(err) = fill_search(control, options, &mut side).await {
        warn!(error = %err, "search side verification failed");
        side.error = Some(err.to_string());
    }
    side
}

async fn fill_search(
    control: &SearchControlPlane,
    options: &VerifyOptions,
    side: &mut SearchSide,
) -> Result<(), ControlError> {
    side.health = Some(control.cluster_health().await?.status);
    side.index_exists = control.index_exists(&options.index).await?;
    if !side.index_exists {
        return Ok(());
    }
    side.count = control.count_documents(&options.index, None).await?.count;
    let page = control
        .search_documents(SearchRequest {
            index: options.index.clone(),
            size: Some(1),
            ..Default::default()
        })
        .await?;
    side.sample = page.documents.into_iter().next();
    Ok(())
}

async fn inspect_sql(control: &SqlControlPlane, options: &VerifyOptions) -> SqlSide {
    let mut side = SqlSide::default();
    if let Err(err) = fill_sql(control, options, &mut side).await {
        warn!(error = %err, "sql side verification failed");
        side.error = Some(err.to_string());
    }
    side
}

async fn fill_sql(
    control: &SqlControlPlane,
    options: &VerifyOptions,
    side: &mut SqlSide,
) -> Result<(), ControlError> {
    side.table_exists = control.table_exists(&options.table).await?;
    if !side.table_exists {
        return Ok(());
    }
    side.columns = control.get_schema(&options.table).await?.columns;
    side.row_count = control.count_rows(&options.table, None).await?.count;
    side.sample = control
        .sample_row(
            &options.table,
            Some((options.id_field.as_str(), options.baseline_id.as_str())),
        )
        .await?;
    Ok(())
}
