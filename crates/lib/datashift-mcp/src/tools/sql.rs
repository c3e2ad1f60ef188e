use datashift_store::models::{ConflictStrategy, Row};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SqlMcp;
use crate::helpers;

/// Conflict handling for `bulk_insert`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OnConflict {
    /// Skip rows that collide with an existing key.
    Ignore,
    /// Overwrite the existing row, keyed on the first column.
    Update,
    /// Fail the whole batch.
    #[default]
    Error,
}

impl From<OnConflict> for ConflictStrategy {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Ignore => Self::Ignore,
            OnConflict::Update => Self::Update,
            OnConflict::Error => Self::Error,
        }
    }
}

/// Parameters for `execute_query`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteQueryParams {
    /// SQL SELECT query to execute.
    pub query: String,
}

/// Parameters for `insert_data`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InsertDataParams {
    /// Name of the table.
    pub table: String,
    /// Column names mapped to values.
    pub data: Row,
}

/// Parameters for `bulk_insert`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BulkInsertParams {
    /// Name of the table.
    pub table: String,
    /// Rows to insert; the first row decides the column list.
    pub data: Vec<Row>,
    /// Conflict resolution strategy (default: `error`).
    pub on_conflict: Option<OnConflict>,
}

/// Parameters for tools that only need a table.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableParams {
    /// Name of the table.
    pub table: String,
}

/// Parameters for `create_table`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateTableParams {
    /// Name of the table to create.
    pub table: String,
    /// Column names mapped to `"data_type constraints"`.
    pub columns: Row,
}

/// Parameters for `count_rows`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CountRowsParams {
    /// Name of the table.
    pub table: String,
    /// Optional condition, without the `WHERE` keyword.
    #[serde(rename = "where")]
    pub filter: Option<String>,
}

/// Parameters for `execute_write_query`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteWriteQueryParams {
    /// SQL INSERT, UPDATE, or DELETE statement using `$1..$n` placeholders.
    pub query: String,
    /// Values for the placeholders, in order.
    pub params: Option<Vec<Value>>,
}

#[tool_router(router = tool_router_sql, vis = "pub")]
impl SqlMcp {
    #[tool(
        description = "Execute a SELECT query and return results. For safety, only SELECT queries are allowed."
    )]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result("execute_query", self.control.execute_query(&params.query).await)
    }

    #[tool(description = "Insert a single row of data into a table.")]
    async fn insert_data(
        &self,
        Parameters(params): Parameters<InsertDataParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result(
            "insert_data",
            self.control.insert_data(&params.table, &params.data).await,
        )
    }

    #[tool(description = "Insert multiple rows into a table in one transaction.")]
    async fn bulk_insert(
        &self,
        Parameters(params): Parameters<BulkInsertParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let strategy = params.on_conflict.unwrap_or_default().into();
        helpers::tool_result(
            "bulk_insert",
            self.control
                .bulk_insert(&params.table, &params.data, strategy)
                .await,
        )
    }

    #[tool(description = "Get column information for a table.")]
    async fn get_schema(
        &self,
        Parameters(params): Parameters<TableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result("get_schema", self.control.get_schema(&params.table).await)
    }

    #[tool(description = "List all tables in the database.")]
    async fn list_tables(&self) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result("list_tables", self.control.list_tables().await)
    }

    #[tool(description = "Create a new table with the given columns. Use with caution.")]
    async fn create_table(
        &self,
        Parameters(params): Parameters<CreateTableParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result(
            "create_table",
            self.control
                .create_table(&params.table, &params.columns)
                .await,
        )
    }

    #[tool(description = "Count rows in a table, optionally with a WHERE condition.")]
    async fn count_rows(
        &self,
        Parameters(params): Parameters<CountRowsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result(
            "count_rows",
            self.control
                .count_rows(&params.table, params.filter.as_deref())
                .await,
        )
    }

    #[tool(
        description = "Execute INSERT, UPDATE, or DELETE queries. For safety, DDL commands (DROP, TRUNCATE, ALTER, CREATE) are not allowed."
    )]
    async fn execute_write_query(
        &self,
        Parameters(params): Parameters<ExecuteWriteQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let values = params.params.unwrap_or_default();
        helpers::tool_result(
            "execute_write_query",
            self.control
                .execute_write_query(&params.query, &values)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_advertised_names() {
        let mut names: Vec<String> = SqlMcp::tool_router_sql()
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "bulk_insert",
                "count_rows",
                "create_table",
                "execute_query",
                "execute_write_query",
                "get_schema",
                "insert_data",
                "list_tables",
            ]
        );
    }

    #[test]
    fn on_conflict_parses_lowercase() {
        let params: BulkInsertParams = serde_json::from_value(serde_json::json!({
            "table": "products",
            "data": [],
            "on_conflict": "update"
        }))
        .expect("params should parse");
        assert_eq!(
            ConflictStrategy::from(params.on_conflict.unwrap_or_default()),
            ConflictStrategy::Update
        );
    }

    #[test]
    fn where_is_the_wire_name_for_filter() {
        let params: CountRowsParams =
            serde_json::from_value(serde_json::json!({ "table": "products", "where": "price > 1" }))
                .expect("params should parse");
        assert_eq!(params.filter.as_deref(), Some("price > 1"));
    }
}
