use datashift_core::control::{ExportRequest, SearchRequest};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SearchMcp;
use crate::helpers;

/// Parameters for `search_documents`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchDocumentsParams {
    /// Name of the index to search.
    pub index: String,
    /// Elasticsearch query DSL object (default: `{"match_all": {}}`).
    pub query: Option<Map<String, Value>>,
    /// Number of results to return (default: 10).
    pub size: Option<u32>,
    /// Offset of the first result (default: 0).
    #[serde(rename = "from_")]
    pub from: Option<u32>,
}

/// Parameters for `get_document`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetDocumentParams {
    /// Name of the index.
    pub index: String,
    /// Document id.
    pub doc_id: String,
}

/// Parameters for tools that only need an index.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IndexParams {
    /// Name of the index.
    pub index: String,
}

/// Parameters for `bulk_export`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BulkExportParams {
    /// Name of the index to export.
    pub index: String,
    /// Elasticsearch query DSL object (default: `{"match_all": {}}`).
    pub query: Option<Map<String, Value>>,
    /// Documents fetched per scroll page (default: 100).
    pub batch_size: Option<u32>,
}

/// Parameters for `count_documents`.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CountDocumentsParams {
    /// Name of the index.
    pub index: String,
    /// Elasticsearch query DSL object (default: `{"match_all": {}}`).
    pub query: Option<Map<String, Value>>,
}

#[tool_router(router = tool_router_search, vis = "pub")]
impl SearchMcp {
    #[tool(description = "Search for documents in an Elasticsearch index.")]
    async fn search_documents(
        &self,
        Parameters(params): Parameters<SearchDocumentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = SearchRequest {
            index: params.index,
            query: params.query.map(Value::Object),
            size: params.size,
            from: params.from,
        };
        helpers::tool_result(
            "search_documents",
            self.control.search_documents(request).await,
        )
    }

    #[tool(description = "Get a specific document by id from an Elasticsearch index.")]
    async fn get_document(
        &self,
        Parameters(params): Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result(
            "get_document",
            self.control.get_document(&params.index, &params.doc_id).await,
        )
    }

    #[tool(description = "List all indices in the Elasticsearch cluster.")]
    async fn list_indices(&self) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result("list_indices", self.control.list_indices().await)
    }

    #[tool(description = "Get the mapping (schema) of an Elasticsearch index.")]
    async fn get_mapping(
        &self,
        Parameters(params): Parameters<IndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result("get_mapping", self.control.get_mapping(&params.index).await)
    }

    #[tool(
        description = "Export all documents from an index using the scroll API. Use this for large extracts."
    )]
    async fn bulk_export(
        &self,
        Parameters(params): Parameters<BulkExportParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = ExportRequest {
            index: params.index,
            query: params.query.map(Value::Object),
            batch_size: params.batch_size,
        };
        helpers::tool_result("bulk_export", self.control.bulk_export(request).await)
    }

    #[tool(description = "Count documents in an index, optionally matching a query.")]
    async fn count_documents(
        &self,
        Parameters(params): Parameters<CountDocumentsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        helpers::tool_result(
            "count_documents",
            self.control
                .count_documents(&params.index, params.query.map(Value::Object))
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_advertised_names() {
        let mut names: Vec<String> = SearchMcp::tool_router_search()
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "bulk_export",
                "count_documents",
                "get_document",
                "get_mapping",
                "list_indices",
                "search_documents",
            ]
        );
    }

    #[test]
    fn offset_is_named_from_underscore() {
        let params: SearchDocumentsParams =
            serde_json::from_value(serde_json::json!({ "index": "products", "from_": 20 }))
                .expect("params should parse");
        assert_eq!(params.from, Some(20));
        assert!(params.query.is_none());
    }
}
