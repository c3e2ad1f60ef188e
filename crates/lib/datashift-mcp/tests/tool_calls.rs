use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use datashift_core::store::{SearchBackend, SqlExecutor, StoreError, StoreResult};
use datashift_mcp::{SearchMcp, SqlMcp};
use datashift_store::models::Row;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use rmcp::service::RunningService;
use rmcp::{RoleClient, ServerHandler, ServiceExt};
use serde_json::{Value, json};

struct StaticCluster;

#[async_trait]
impl SearchBackend for StaticCluster {
    async fn ping(&self) -> bool {
        true
    }

    async fn search(&self, _index: &str, _body: Value, _scroll: Option<&str>) -> StoreResult<Value> {
        Ok(json!({
            "took": 4,
            "hits": {
                "total": { "value": 1 },
                "hits": [{ "_id": "P-1", "_source": { "id": "P-1", "name": "Lamp" } }]
            }
        }))
    }

    async fn scroll(&self, _scroll_id: &str, _keep_alive: &str) -> StoreResult<Value> {
        Ok(json!({ "hits": { "total": { "value": 1 }, "hits": [] } }))
    }

    async fn clear_scroll(&self, _scroll_id: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Value> {
        Err(StoreError::NotFound(format!("document {id} not found in index {index}")))
    }

    async fn get_aliases(&self, _pattern: &str) -> StoreResult<Value> {
        Ok(json!({ "products": { "aliases": {} }, ".security-7": { "aliases": {} } }))
    }

    async fn get_mapping(&self, index: &str) -> StoreResult<Value> {
        Ok(json!({ index: { "mappings": { "properties": { "name": { "type": "text" } } } } }))
    }

    async fn count(&self, _index: &str, _body: Value) -> StoreResult<Value> {
        Ok(json!({ "count": 1 }))
    }

    async fn bulk(&self, _lines: Vec<Value>) -> StoreResult<Value> {
        Ok(json!({ "errors": false, "items": [] }))
    }

    async fn refresh(&self, _index: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn cluster_health(&self) -> StoreResult<Value> {
        Ok(json!({ "status": "green" }))
    }

    async fn index_exists(&self, _index: &str) -> StoreResult<bool> {
        Ok(true)
    }
}

#[derive(Default)]
struct RecordingDatabase {
    statements: Mutex<Vec<String>>,
}

#[async_trait]
impl SqlExecutor for RecordingDatabase {
    async fn fetch_rows(&self, sql: &str, _params: &[Value]) -> StoreResult<Vec<Row>> {
        self.statements
            .lock()
            .expect("statement log poisoned")
            .push(sql.to_string());
        let row = json!({ "id": "P-1", "name": "Lamp", "price": 12.5 });
        Ok(vec![row.as_object().cloned().unwrap_or_default()])
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> StoreResult<u64> {
        self.statements
            .lock()
            .expect("statement log poisoned")
            .push(sql.to_string());
        Ok(2)
    }

    async fn execute_batch(&self, _sql: &str, batches: &[Vec<Value>]) -> StoreResult<u64> {
        Ok(batches.len() as u64)
    }
}

async fn connect<S>(server: S) -> RunningService<RoleClient, ()>
where
    S: ServerHandler + Send + 'static,
{
    let (server_transport, client_transport) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let running = server
            .serve(server_transport)
            .await
            .expect("server should start");
        let _ = running.waiting().await;
    });
    ().serve(client_transport)
        .await
        .expect("client should connect")
}

fn call(name: &str, arguments: &Value) -> CallToolRequestParams {
    CallToolRequestParams {
        meta: None,
        name: name.to_string().into(),
        arguments: arguments.as_object().cloned(),
        task: None,
    }
}

fn text(result: &CallToolResult) -> &str {
    result
        .content
        .first()
        .and_then(|content| content.raw.as_text())
        .map(|text| text.text.as_str())
        .expect("expected text content")
}

fn search_server() -> SearchMcp {
    SearchMcp::from_backend(Arc::new(StaticCluster))
}

#[tokio::test]
async fn search_server_identifies_itself() {
    let client = connect(search_server()).await;
    let info = client.peer_info().expect("server info after handshake");
    assert_eq!(info.server_info.name, "elasticsearch-mcp");
    assert!(info.capabilities.tools.is_some());
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn search_tools_declare_required_fields() {
    let client = connect(search_server()).await;
    let tools = client.list_all_tools().await.expect("tools/list");
    assert_eq!(tools.len(), 6);

    let search = tools
        .iter()
        .find(|tool| tool.name == "search_documents")
        .expect("search_documents is advertised");
    let required = search
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .expect("search_documents has required fields");
    assert_eq!(required, &vec![json!("index")]);
    let properties = search
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
        .expect("search_documents has properties");
    assert!(properties.contains_key("from_"));
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn search_documents_returns_pretty_json() {
    let client = connect(search_server()).await;
    let result = client
        .call_tool(call("search_documents", &json!({ "index": "products" })))
        .await
        .expect("tools/call");
    assert_ne!(result.is_error, Some(true));
    let body: Value = serde_json::from_str(text(&result)).expect("json body");
    assert_eq!(
        body,
        json!({ "total": 1, "documents": [{ "id": "P-1", "name": "Lamp" }], "took_ms": 4 })
    );
    assert!(text(&result).contains("\n  \"total\": 1"));
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn missing_document_is_a_tool_error() {
    let client = connect(search_server()).await;
    let result = client
        .call_tool(call("get_document", &json!({ "index": "products", "doc_id": "P-404" })))
        .await
        .expect("tools/call");
    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        "Error executing get_document: Not found: document P-404 not found in index products"
    );
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn missing_required_argument_is_a_protocol_error() {
    let client = connect(search_server()).await;
    let outcome = client
        .call_tool(call("get_mapping", &json!({})))
        .await;
    assert!(outcome.is_err());
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn unknown_tool_is_a_protocol_error() {
    let client = connect(search_server()).await;
    let outcome = client.call_tool(call("drop_index", &json!({}))).await;
    assert!(outcome.is_err());
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn list_indices_hides_system_indices_over_the_wire() {
    let client = connect(search_server()).await;
    let result = client
        .call_tool(call("list_indices", &json!({})))
        .await
        .expect("tools/call");
    let body: Value = serde_json::from_str(text(&result)).expect("json body");
    assert_eq!(body, json!([{ "name": "products", "aliases": [] }]));
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn sql_server_lists_eight_tools() {
    let client = connect(SqlMcp::from_executor(Arc::new(RecordingDatabase::default()))).await;
    let info = client.peer_info().expect("server info after handshake");
    assert_eq!(info.server_info.name, "postgres-mcp");
    let tools = client.list_all_tools().await.expect("tools/list");
    assert_eq!(tools.len(), 8);
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn read_only_guard_text_is_returned_verbatim() {
    let database = Arc::new(RecordingDatabase::default());
    let client = connect(SqlMcp::from_executor(database.clone())).await;
    let result = client
        .call_tool(call("execute_query", &json!({ "query": "DELETE FROM products" })))
        .await
        .expect("tools/call");
    assert_eq!(result.is_error, Some(true));
    assert_eq!(
        text(&result),
        "Error: Only SELECT queries are allowed for safety. Use specific tools for INSERT, UPDATE, DELETE."
    );
    assert!(database.statements.lock().expect("statement log poisoned").is_empty());
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn execute_query_keeps_column_order() {
    let client = connect(SqlMcp::from_executor(Arc::new(RecordingDatabase::default()))).await;
    let result = client
        .call_tool(call("execute_query", &json!({ "query": "SELECT * FROM products" })))
        .await
        .expect("tools/call");
    let text = text(&result);
    let id = text.find("\"id\"").expect("id column");
    let name = text.find("\"name\"").expect("name column");
    let price = text.find("\"price\"").expect("price column");
    assert!(id < name && name < price);
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn write_query_reports_affected_rows() {
    let client = connect(SqlMcp::from_executor(Arc::new(RecordingDatabase::default()))).await;
    let result = client
        .call_tool(call(
            "execute_write_query",
            &json!({ "query": "UPDATE products SET price = $1 WHERE id = $2", "params": [9.5, "P-1"] }),
        ))
        .await
        .expect("tools/call");
    let body: Value = serde_json::from_str(text(&result)).expect("json body");
    assert_eq!(
        body,
        json!({ "status": "success", "affected_rows": 2, "query_type": "UPDATE" })
    );
    client.cancel().await.expect("client should stop");
}

#[tokio::test]
async fn bulk_insert_with_no_rows_touches_nothing() {
    let database = Arc::new(RecordingDatabase::default());
    let client = connect(SqlMcp::from_executor(database.clone())).await;
    let result = client
        .call_tool(call("bulk_insert", &json!({ "table": "products", "data": [] })))
        .await
        .expect("tools/call");
    let body: Value = serde_json::from_str(text(&result)).expect("json body");
    assert_eq!(body, json!({ "status": "success", "inserted": 0, "total_rows": 0 }));
    assert!(database.statements.lock().expect("statement log poisoned").is_empty());
    client.cancel().await.expect("client should stop");
}
