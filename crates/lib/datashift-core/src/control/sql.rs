use std::sync::Arc;

use datashift_store::models::{
    BulkInsertReport,
    ColumnInfo,
    ConflictStrategy,
    InsertedRow,
    QueryRows,
    Row,
    RowCount,
    StatusMessage,
    TableList,
    TableSchema,
    WriteReport,
};
use datashift_store::schema::{SQL_LIST_TABLES, SQL_TABLE_COLUMNS, SQL_TABLE_EXISTS, STATUS_SUCCESS};
use serde_json::Value;
use tracing::{debug, info};

use crate::store::{SqlExecutor, StoreError};

use super::statement::{
    bulk_insert_sql,
    count_rows_sql,
    create_table_sql,
    ensure_fragment,
    ensure_read_only,
    ensure_row_write,
    insert_row_sql,
    sample_row_sql,
    validate_column,
    validate_table,
};
use super::ControlError;

/// Operations exposed by the relational adapter.
#[derive(Clone)]
pub struct SqlControlPlane {
    executor: Arc<dyn SqlExecutor>,
}

impl SqlControlPlane {
    #[must_use]
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    /// Runs a read-only query.
    ///
    /// # Errors
    /// Returns `ControlError::Rejected` for anything but a `SELECT`, or a
    /// store error if the query fails.
    pub async fn execute_query(&self, query: &str) -> Result<QueryRows, ControlError> {
        let query = ensure_read_only(query)?;
        let rows = self.executor.fetch_rows(query, &[]).await?;
        Ok(QueryRows {
            count: rows.len(),
            rows,
        })
    }

    /// Inserts one row and returns it as stored, defaults included.
    ///
    /// Keys are folded to lower case to match the unquoted column list.
    ///
    /// # Errors
    /// Returns `ControlError` if the table or a column name is invalid, the row
    /// is empty, or the insert fails.
    pub async fn insert_data(&self, table: &str, data: &Row) -> Result<InsertedRow, ControlError> {
        validate_table(table)?;
        let data = fold_keys(data)?;
        let columns = column_names(&data)?;
        let sql = insert_row_sql(table, &columns);
        let mut rows = self.executor.fetch_rows(&sql, &[Value::Object(data)]).await?;
        if rows.is_empty() {
            return Err(StoreError::Decode("insert returned no row".to_string()).into());
        }
        info!(table, "inserted row");
        Ok(InsertedRow {
            status: STATUS_SUCCESS.to_string(),
            inserted_row: rows.swap_remove(0),
        })
    }

    /// Inserts many rows in one transaction.
    ///
    /// Columns are taken from the first row; later rows are projected onto
    /// them, with missing keys stored as `NULL`. Keys match columns
    /// case-insensitively, as unquoted identifiers do.
    ///
    /// # Errors
    /// Returns `ControlError` if names are invalid or any row fails, in which
    /// case nothing is committed.
    pub async fn bulk_insert(
        &self,
        table: &str,
        data: &[Row],
        on_conflict: ConflictStrategy,
    ) -> Result<BulkInsertReport, ControlError> {
        validate_table(table)?;
        let Some(first) = data.first() else {
            return Ok(BulkInsertReport {
                status: STATUS_SUCCESS.to_string(),
                inserted: 0,
                total_rows: 0,
            });
        };
        let first = fold_keys(first)?;
        let columns = column_names(&first)?;
        let sql = bulk_insert_sql(table, &columns, on_conflict);
        let batches = data
            .iter()
            .map(|row| fold_keys(row).map(|row| vec![Value::Object(project(&row, &columns))]))
            .collect::<Result<Vec<_>, _>>()?;
        let inserted = self.executor.execute_batch(&sql, &batches).await?;
        info!(table, inserted, total_rows = data.len(), ?on_conflict, "bulk insert finished");
        Ok(BulkInsertReport {
            status: STATUS_SUCCESS.to_string(),
            inserted,
            total_rows: data.len(),
        })
    }

    /// Describes a table's columns in ordinal order.
    ///
    /// # Errors
    /// Returns `ControlError` if the table name is invalid or the catalog query fails.
    pub async fn get_schema(&self, table: &str) -> Result<TableSchema, ControlError> {
        validate_table(table)?;
        let name = fold_identifier(table.rsplit('.').next().unwrap_or(table));
        let rows = self
            .executor
            .fetch_rows(SQL_TABLE_COLUMNS, &[Value::String(name)])
            .await?;
        let columns = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value::<ColumnInfo>(Value::Object(row))
                    .map_err(|err| StoreError::Decode(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TableSchema {
            table: table.to_string(),
            columns,
        })
    }

    /// Lists base tables and views in the `public` schema.
    ///
    /// # Errors
    /// Returns `ControlError` if the catalog query fails.
    pub async fn list_tables(&self) -> Result<TableList, ControlError> {
        let rows = self.executor.fetch_rows(SQL_LIST_TABLES, &[]).await?;
        let tables = rows
            .iter()
            .filter_map(|row| row.get("table_name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        Ok(TableList { tables })
    }

    /// Creates a table unless it already exists.
    ///
    /// `columns` maps each column name to its type and constraints, e.g.
    /// `"VARCHAR(50) PRIMARY KEY"`.
    ///
    /// # Errors
    /// Returns `ControlError` if a name or definition is invalid or the
    /// statement fails.
    pub async fn create_table(&self, table: &str, columns: &Row) -> Result<StatusMessage, ControlError> {
        validate_table(table)?;
        if columns.is_empty() {
            return Err(ControlError::InvalidInput(
                "columns must define at least one column".to_string(),
            ));
        }
        let mut definitions = Vec::with_capacity(columns.len());
        for (name, definition) in columns {
            validate_column(name)?;
            let Some(definition) = definition.as_str().filter(|text| !text.trim().is_empty()) else {
                return Err(ControlError::InvalidInput(format!(
                    "column {name} needs a type definition"
                )));
            };
            ensure_fragment(definition, "column definition")?;
            definitions.push((name.clone(), definition.to_string()));
        }
        self.executor
            .execute(&create_table_sql(table, &definitions), &[])
            .await?;
        info!(table, columns = definitions.len(), "table ensured");
        Ok(StatusMessage {
            status: STATUS_SUCCESS.to_string(),
            message: format!("Table {table} created successfully"),
        })
    }

    /// Counts rows, optionally restricted by a `WHERE` condition.
    ///
    /// # Errors
    /// Returns `ControlError` if the table name or filter is invalid or the query fails.
    pub async fn count_rows(&self, table: &str, filter: Option<&str>) -> Result<RowCount, ControlError> {
        validate_table(table)?;
        if let Some(filter) = filter {
            ensure_fragment(filter, "where")?;
        }
        let rows = self
            .executor
            .fetch_rows(&count_rows_sql(table, filter), &[])
            .await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::Decode("count query returned no count".to_string()))?;
        Ok(RowCount {
            table: table.to_string(),
            count,
        })
    }

    /// Runs one `INSERT`, `UPDATE`, or `DELETE` with `$n` parameters.
    ///
    /// # Errors
    /// Returns `ControlError::Rejected` if the statement kind is not allowed or
    /// it mentions a DDL keyword, or a store error if it fails.
    pub async fn execute_write_query(
        &self,
        query: &str,
        params: &[Value],
    ) -> Result<WriteReport, ControlError> {
        let query_type = ensure_row_write(query)?;
        let affected_rows = self.executor.execute(query.trim(), params).await?;
        debug!(query_type = %query_type, affected_rows, "write query applied");
        Ok(WriteReport {
            status: STATUS_SUCCESS.to_string(),
            affected_rows,
            query_type,
        })
    }

    /// Checks whether a table exists.
    ///
    /// # Errors
    /// Returns `ControlError` if the table name is invalid or the catalog query fails.
    pub async fn table_exists(&self, table: &str) -> Result<bool, ControlError> {
        validate_table(table)?;
        let name = fold_identifier(table.rsplit('.').next().unwrap_or(table));
        let rows = self
            .executor
            .fetch_rows(SQL_TABLE_EXISTS, &[Value::String(name)])
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("exists"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    /// Returns any one row, optionally skipping rows whose `column` equals `value`.
    ///
    /// # Errors
    /// Returns `ControlError` if a name is invalid or the query fails.
    pub async fn sample_row(
        &self,
        table: &str,
        exclude: Option<(&str, &str)>,
    ) -> Result<Option<Row>, ControlError> {
        validate_table(table)?;
        let (sql, params) = match exclude {
            Some((column, value)) => {
                validate_column(column)?;
                (
                    sample_row_sql(table, Some(column)),
                    vec![Value::String(value.to_string())],
                )
            }
            None => (sample_row_sql(table, None), Vec::new()),
        };
        let rows = self.executor.fetch_rows(&sql, &params).await?;
        Ok(rows.into_iter().next())
    }
}

/// Lowercases every key the way Postgres folds unquoted identifiers, since
/// `json_populate_record` matches keys case-sensitively.
fn fold_keys(row: &Row) -> Result<Row, ControlError> {
    let mut folded = Row::new();
    for (name, value) in row {
        if folded.insert(fold_identifier(name), value.clone()).is_some() {
            return Err(ControlError::InvalidInput(format!(
                "column {name} is given more than once"
            )));
        }
    }
    Ok(folded)
}

fn fold_identifier(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn column_names(row: &Row) -> Result<Vec<&str>, ControlError> {
    if row.is_empty() {
        return Err(ControlError::InvalidInput(
            "data must contain at least one column".to_string(),
        ));
    }
    row.keys()
        .map(|name| validate_column(name).map(|()| name.as_str()))
        .collect()
}

fn project(row: &Row, columns: &[&str]) -> Row {
    columns
        .iter()
        .map(|column| {
            (
                (*column).to_string(),
                row.get(*column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}
