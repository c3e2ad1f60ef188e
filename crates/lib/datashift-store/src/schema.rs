use serde_json::{Value, json};

pub const SEARCH_SERVER_NAME: &str = "elasticsearch-mcp";
pub const SQL_SERVER_NAME: &str = "postgres-mcp";

pub const DEFAULT_SEARCH_SIZE: u32 = 10;
pub const DEFAULT_SEARCH_FROM: u32 = 0;
pub const DEFAULT_EXPORT_BATCH_SIZE: u32 = 100;
pub const SCROLL_KEEP_ALIVE: &str = "2m";
pub const SYSTEM_INDEX_PREFIX: char = '.';

pub const STATUS_SUCCESS: &str = "success";

pub const READ_ONLY_REJECTION: &str = "Error: Only SELECT queries are allowed for safety. Use specific tools for INSERT, UPDATE, DELETE.";
pub const WRITE_REJECTION: &str = "Error: Only INSERT, UPDATE, and DELETE queries are allowed. DDL commands (DROP, TRUNCATE, ALTER, CREATE) are not permitted.";

pub const READ_KEYWORD: &str = "SELECT";
pub const WRITE_KEYWORDS: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];
pub const DDL_KEYWORDS: [&str; 4] = ["DROP", "TRUNCATE", "ALTER", "CREATE"];

pub const SQL_TABLE_COLUMNS: &str = "SELECT column_name, data_type, character_maximum_length, is_nullable, column_default FROM information_schema.columns WHERE table_name = $1::text ORDER BY ordinal_position";
pub const SQL_LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name";
pub const SQL_TABLE_EXISTS: &str = "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1::text) AS exists";

pub const DEFAULT_SAMPLE_INDEX: &str = "products";
pub const DEFAULT_SAMPLE_TABLE: &str = "products";
pub const DEFAULT_ID_FIELD: &str = "id";
pub const DEFAULT_BASELINE_ID: &str = "SAMPLE-000";

/// Query used when a caller does not supply one.
#[must_use]
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}
