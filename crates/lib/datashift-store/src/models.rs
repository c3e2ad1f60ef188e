use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object keyed by column (or field) name.
pub type Row = Map<String, Value>;

/// One page of search hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub total: u64,
    pub documents: Vec<Value>,
    pub took_ms: u64,
}

/// An index and the aliases pointing at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSummary {
    pub name: String,
    pub aliases: Vec<String>,
}

/// Every document matching a query, gathered through a scroll context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkExport {
    pub total: u64,
    pub exported: usize,
    pub documents: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentCount {
    pub count: u64,
}

/// Cluster health as reported by the search engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterHealth {
    pub cluster_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub number_of_nodes: u64,
}

/// A document the bulk API refused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: u16,
    pub reason: String,
}

/// Outcome of one bulk indexing request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkIndexReport {
    pub indexed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BulkFailure>,
}

impl BulkIndexReport {
    pub fn merge(&mut self, other: Self) {
        self.indexed += other.indexed;
        self.failures.extend(other.failures);
    }
}

/// Rows returned by a read-only query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRows {
    pub count: usize,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsertedRow {
    pub status: String,
    pub inserted_row: Row,
}

/// How a multi-row insert treats primary-key collisions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Ignore,
    Update,
    #[default]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkInsertReport {
    pub status: String,
    pub inserted: u64,
    pub total_rows: usize,
}

/// Column metadata from `information_schema.columns`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub character_maximum_length: Option<i64>,
    pub is_nullable: String,
    pub column_default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableList {
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowCount {
    pub table: String,
    pub count: i64,
}

/// Outcome of an `INSERT`, `UPDATE`, or `DELETE` statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteReport {
    pub status: String,
    pub affected_rows: u64,
    pub query_type: String,
}
