//! MCP servers for datashift.
//!
//! `SearchMcp` exposes the Elasticsearch control plane and `SqlMcp` the
//! `PostgreSQL` one. Both serialize successful results as pretty-printed JSON
//! text and report failed operations as tool errors.

mod helpers;
pub mod server;
pub mod tools;

use std::sync::Arc;

use datashift_core::control::{SearchControlPlane, SqlControlPlane};
use datashift_core::store::{SearchBackend, SqlExecutor};
use datashift_store::schema::{SEARCH_SERVER_NAME, SQL_SERVER_NAME};
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool_handler,
};

const SEARCH_INSTRUCTIONS: &str = r"elasticsearch-mcp exposes an Elasticsearch cluster.

- `list_indices` shows user indices and their aliases; `get_mapping` shows field types.
- `search_documents` returns one page of hits (`size`, `from_`); `count_documents` counts matches.
- `get_document` fetches one document source by id.
- `bulk_export` walks a scroll context and returns every matching document; prefer
  it over paging with `from_` for full extracts.
Queries use the Elasticsearch query DSL and default to `match_all`.";

const SQL_INSTRUCTIONS: &str = r"postgres-mcp exposes a PostgreSQL database.

- `list_tables` and `get_schema` describe the public schema.
- `execute_query` runs SELECT statements only.
- `insert_data` inserts one row and returns it; `bulk_insert` inserts many rows in one
  transaction with `on_conflict` set to `ignore`, `update`, or `error`.
- `create_table` creates a table if it does not exist.
- `count_rows` counts rows with an optional condition (no `WHERE` keyword).
- `execute_write_query` runs INSERT, UPDATE, or DELETE with `$1..$n` parameters; DDL is refused.
Values are converted to column types by the database.";

/// MCP server over the search control plane.
#[derive(Clone)]
pub struct SearchMcp {
    tool_router: ToolRouter<Self>,
    control: SearchControlPlane,
}

impl SearchMcp {
    #[must_use]
    pub fn new(control: SearchControlPlane) -> Self {
        Self {
            tool_router: Self::tool_router_search(),
            control,
        }
    }

    #[must_use]
    pub fn from_backend(backend: Arc<dyn SearchBackend>) -> Self {
        Self::new(SearchControlPlane::new(backend))
    }

    #[must_use]
    pub const fn control(&self) -> &SearchControlPlane {
        &self.control
    }
}

#[tool_handler]
impl ServerHandler for SearchMcp {
    fn get_info(&self) -> ServerInfo {
        server_info(SEARCH_SERVER_NAME, SEARCH_INSTRUCTIONS)
    }
}

/// MCP server over the SQL control plane.
#[derive(Clone)]
pub struct SqlMcp {
    tool_router: ToolRouter<Self>,
    control: SqlControlPlane,
}

impl SqlMcp {
    #[must_use]
    pub fn new(control: SqlControlPlane) -> Self {
        Self {
            tool_router: Self::tool_router_sql(),
            control,
        }
    }

    #[must_use]
    pub fn from_executor(executor: Arc<dyn SqlExecutor>) -> Self {
        Self::new(SqlControlPlane::new(executor))
    }

    #[must_use]
    pub const fn control(&self) -> &SqlControlPlane {
        &self.control
    }
}

#[tool_handler]
impl ServerHandler for SqlMcp {
    fn get_info(&self) -> ServerInfo {
        server_info(SQL_SERVER_NAME, SQL_INSTRUCTIONS)
    }
}

fn server_info(name: &str, instructions: &str) -> ServerInfo {
    ServerInfo {
        protocol_version: ProtocolVersion::LATEST,
        capabilities: ServerCapabilities::builder().enable_tools().build(),
        server_info: Implementation {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Implementation::from_build_env()
        },
        instructions: Some(instructions.to_string()),
    }
}
