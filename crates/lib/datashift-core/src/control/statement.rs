//! SQL statement guards and builders.
//!
//! Row values never appear in generated SQL: they travel as one JSON parameter
//! and `json_populate_record` converts them to the table's column types.
//! Identifiers are validated before interpolation.

use datashift_store::models::ConflictStrategy;
use datashift_store::schema::{
    DDL_KEYWORDS,
    READ_KEYWORD,
    READ_ONLY_REJECTION,
    WRITE_KEYWORDS,
    WRITE_REJECTION,
};

use super::ControlError;

const MAX_IDENTIFIER_LEN: usize = 63;

/// Accepts only statements whose first keyword is `SELECT`.
///
/// # Errors
/// Returns `ControlError::Rejected` for any other statement.
pub fn ensure_read_only(query: &str) -> Result<&str, ControlError> {
    let trimmed = query.trim();
    if first_keyword(trimmed).as_deref() == Some(READ_KEYWORD) {
        Ok(trimmed)
    } else {
        Err(ControlError::Rejected(READ_ONLY_REJECTION))
    }
}

/// Accepts `INSERT`, `UPDATE`, and `DELETE` statements free of DDL keywords.
///
/// Returns the statement kind, e.g. `UPDATE`.
///
/// # Errors
/// Returns `ControlError::Rejected` when the statement kind is not allowed or
/// a DDL keyword appears anywhere in it.
pub fn ensure_row_write(query: &str) -> Result<String, ControlError> {
    let Some(kind) = first_keyword(query).filter(|kind| WRITE_KEYWORDS.contains(&kind.as_str()))
    else {
        return Err(ControlError::Rejected(WRITE_REJECTION));
    };
    if keywords(query).any(|word| DDL_KEYWORDS.contains(&word.as_str())) {
        return Err(ControlError::Rejected(WRITE_REJECTION));
    }
    Ok(kind)
}

/// Validates a table name, optionally schema-qualified.
///
/// # Errors
/// Returns `ControlError::InvalidInput` if any part is not a plain identifier.
pub fn validate_table(name: &str) -> Result<(), ControlError> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(ControlError::InvalidInput(format!("invalid table name: {name}")));
    }
    Ok(())
}

/// Validates a column name.
///
/// # Errors
/// Returns `ControlError::InvalidInput` if the name is not a plain identifier.
pub fn validate_column(name: &str) -> Result<(), ControlError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ControlError::InvalidInput(format!("invalid column name: {name}")))
    }
}

/// Rejects free-form SQL fragments that could end the statement or hide text
/// in a comment.
///
/// # Errors
/// Returns `ControlError::InvalidInput` if the fragment contains `;`, `--`, or `/*`.
pub fn ensure_fragment(fragment: &str, field: &str) -> Result<(), ControlError> {
    if fragment.contains(';') || fragment.contains("--") || fragment.contains("/*") {
        return Err(ControlError::InvalidInput(format!(
            "{field} must not contain statement separators or comments"
        )));
    }
    Ok(())
}

#[must_use]
pub fn insert_row_sql(table: &str, columns: &[&str]) -> String {
    let column_list = columns.join(", ");
    format!(
        "INSERT INTO {table} ({column_list}) SELECT {column_list} FROM json_populate_record(NULL::{table}, $1::json) RETURNING *"
    )
}

/// Builds a per-row insert whose conflict clause follows `strategy`.
///
/// `Update` treats the first column as the conflict target and overwrites the
/// rest; with a single column there is nothing to update, so it behaves like
/// `Ignore`.
#[must_use]
pub fn bulk_insert_sql(table: &str, columns: &[&str], strategy: ConflictStrategy) -> String {
    let column_list = columns.join(", ");
    let mut sql = format!(
        "INSERT INTO {table} ({column_list}) SELECT {column_list} FROM json_populate_record(NULL::{table}, $1::json)"
    );
    match (strategy, columns.split_first()) {
        (ConflictStrategy::Update, Some((key, rest))) if !rest.is_empty() => {
            let assignments = rest
                .iter()
                .map(|column| format!("{column} = EXCLUDED.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ON CONFLICT ({key}) DO UPDATE SET {assignments}"));
        }
        (ConflictStrategy::Update | ConflictStrategy::Ignore, _) => {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }
        (ConflictStrategy::Error, _) => {}
    }
    sql
}

#[must_use]
pub fn create_table_sql(table: &str, definitions: &[(String, String)]) -> String {
    let columns = definitions
        .iter()
        .map(|(name, definition)| format!("{name} {}", definition.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {table} ({columns})")
}

#[must_use]
pub fn count_rows_sql(table: &str, filter: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) AS count FROM {table}");
    if let Some(filter) = filter.map(str::trim).filter(|filter| !filter.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

#[must_use]
pub fn sample_row_sql(table: &str, exclude_column: Option<&str>) -> String {
    match exclude_column {
        Some(column) => format!("SELECT * FROM {table} WHERE {column}::text <> $1 LIMIT 1"),
        None => format!("SELECT * FROM {table} LIMIT 1"),
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    value.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}

fn keywords(query: &str) -> impl Iterator<Item = String> + '_ {
    query
        .split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
}

fn first_keyword(query: &str) -> Option<String> {
    keywords(query).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_accepts_select_in_any_case() {
        assert_eq!(
            ensure_read_only("  select * from products\n").unwrap(),
            "select * from products"
        );
    }

    #[test]
    fn read_only_rejects_writes_with_fixed_message() {
        let err = ensure_read_only("DELETE FROM products").unwrap_err();
        assert_eq!(err.to_string(), READ_ONLY_REJECTION);
        assert!(ensure_read_only("SELECTED").is_err());
    }

    #[test]
    fn row_write_reports_statement_kind() {
        assert_eq!(
            ensure_row_write("update products set price = $1 where id = $2").unwrap(),
            "UPDATE"
        );
    }

    #[test]
    fn row_write_rejects_ddl_anywhere() {
        for query in [
            "DROP TABLE products",
            "DELETE FROM products; DROP TABLE products",
            "INSERT INTO audit SELECT * FROM products WHERE 1=1; alter table x add y int",
            "SELECT 1",
        ] {
            let err = ensure_row_write(query).unwrap_err();
            assert_eq!(err.to_string(), WRITE_REJECTION, "query: {query}");
        }
    }

    #[test]
    fn row_write_allows_columns_containing_ddl_words() {
        assert_eq!(
            ensure_row_write("UPDATE products SET created_at = now(), dropped = false").unwrap(),
            "UPDATE"
        );
    }

    #[test]
    fn table_names_may_be_schema_qualified() {
        assert!(validate_table("products").is_ok());
        assert!(validate_table("public.products").is_ok());
        assert!(validate_table("a.b.c").is_err());
        assert!(validate_table("products; DROP TABLE x").is_err());
        assert!(validate_table("").is_err());
        assert!(validate_column("1st").is_err());
    }

    #[test]
    fn fragments_reject_separators_and_comments() {
        assert!(ensure_fragment("price > 10 AND stock < 5", "where").is_ok());
        assert!(ensure_fragment("1=1; DROP TABLE products", "where").is_err());
        assert!(ensure_fragment("1=1 -- trailing", "where").is_err());
        assert!(ensure_fragment("1=1 /* hidden */", "where").is_err());
    }

    #[test]
    fn insert_row_returns_stored_row() {
        assert_eq!(
            insert_row_sql("products", &["id", "name"]),
            "INSERT INTO products (id, name) SELECT id, name FROM json_populate_record(NULL::products, $1::json) RETURNING *"
        );
    }

    #[test]
    fn bulk_insert_conflict_clauses() {
        let columns = ["id", "name", "price"];
        assert!(!bulk_insert_sql("products", &columns, ConflictStrategy::Error).contains("ON CONFLICT"));
        assert!(
            bulk_insert_sql("products", &columns, ConflictStrategy::Ignore)
                .ends_with(" ON CONFLICT DO NOTHING")
        );
        assert!(
            bulk_insert_sql("products", &columns, ConflictStrategy::Update).ends_with(
                " ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, price = EXCLUDED.price"
            )
        );
        assert!(
            bulk_insert_sql("products", &["id"], ConflictStrategy::Update)
                .ends_with(" ON CONFLICT DO NOTHING")
        );
    }

    #[test]
    fn create_table_keeps_definition_order() {
        let definitions = vec![
            ("id".to_string(), "VARCHAR(50) PRIMARY KEY".to_string()),
            ("price".to_string(), " NUMERIC(10,2) ".to_string()),
        ];
        assert_eq!(
            create_table_sql("products", &definitions),
            "CREATE TABLE IF NOT EXISTS products (id VARCHAR(50) PRIMARY KEY, price NUMERIC(10,2))"
        );
    }

    #[test]
    fn count_rows_appends_non_blank_filter() {
        assert_eq!(
            count_rows_sql("products", Some("  ")),
            "SELECT COUNT(*) AS count FROM products"
        );
        assert_eq!(
            count_rows_sql("products", Some("price > 10")),
            "SELECT COUNT(*) AS count FROM products WHERE price > 10"
        );
    }
}
