use std::sync::Arc;

use datashift_store::models::{
    BulkExport,
    BulkFailure,
    BulkIndexReport,
    ClusterHealth,
    DocumentCount,
    IndexSummary,
    SearchPage,
};
use datashift_store::schema::{
    DEFAULT_EXPORT_BATCH_SIZE,
    DEFAULT_SEARCH_FROM,
    DEFAULT_SEARCH_SIZE,
    SCROLL_KEEP_ALIVE,
    SYSTEM_INDEX_PREFIX,
    match_all,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::store::{SearchBackend, StoreError};

use super::{ControlError, ensure_index, ensure_non_empty};

/// Input for a single page of search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    pub query: Option<Value>,
    pub size: Option<u32>,
    pub from: Option<u32>,
}

/// Input for a scroll export of every matching document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    pub index: String,
    pub query: Option<Value>,
    pub batch_size: Option<u32>,
}

/// Operations exposed by the search adapter.
#[derive(Clone)]
pub struct SearchControlPlane {
    backend: Arc<dyn SearchBackend>,
}

impl SearchControlPlane {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    /// Runs one search and returns the page of matching sources.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the search fails.
    pub async fn search_documents(&self, request: SearchRequest) -> Result<SearchPage, ControlError> {
        ensure_index(&request.index)?;
        let body = json!({
            "query": request.query.unwrap_or_else(match_all),
            "size": request.size.unwrap_or(DEFAULT_SEARCH_SIZE),
            "from": request.from.unwrap_or(DEFAULT_SEARCH_FROM),
        });
        let response = self.backend.search(&request.index, body, None).await?;
        Ok(SearchPage {
            total: hits_total(&response)?,
            documents: hit_sources(&response)?,
            took_ms: response.get("took").and_then(Value::as_u64).unwrap_or(0),
        })
    }

    /// Fetches a document's source by id.
    ///
    /// # Errors
    /// Returns `ControlError` if the inputs are blank, the document is missing,
    /// or the request fails.
    pub async fn get_document(&self, index: &str, doc_id: &str) -> Result<Value, ControlError> {
        ensure_index(index)?;
        ensure_non_empty(doc_id, "doc_id")?;
        let response = self.backend.get_document(index, doc_id).await?;
        if response.get("found").and_then(Value::as_bool) == Some(false) {
            return Err(StoreError::NotFound(format!(
                "document {doc_id} not found in index {index}"
            ))
            .into());
        }
        response
            .get("_source")
            .cloned()
            .ok_or_else(|| StoreError::Decode("document has no _source".to_string()).into())
    }

    /// Lists user indices with their aliases, sorted by name.
    ///
    /// # Errors
    /// Returns `ControlError` if the alias request fails.
    pub async fn list_indices(&self) -> Result<Vec<IndexSummary>, ControlError> {
        let response = self.backend.get_aliases("*").await?;
        let Some(entries) = response.as_object() else {
            return Err(StoreError::Decode("alias listing is not an object".to_string()).into());
        };
        let mut indices: Vec<IndexSummary> = entries
            .iter()
            .filter(|(name, _)| !name.starts_with(SYSTEM_INDEX_PREFIX))
            .map(|(name, info)| IndexSummary {
                name: name.clone(),
                aliases: info
                    .get("aliases")
                    .and_then(Value::as_object)
                    .map(|aliases| aliases.keys().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();
        indices.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(indices)
    }

    /// Returns the raw mapping for an index.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the request fails.
    pub async fn get_mapping(&self, index: &str) -> Result<Value, ControlError> {
        ensure_index(index)?;
        Ok(self.backend.get_mapping(index).await?)
    }

    /// Collects every matching document through a scroll context.
    ///
    /// Pages are requested until one comes back empty. The scroll context is
    /// released afterwards even when a page request fails.
    ///
    /// # Errors
    /// Returns `ControlError` if the inputs are invalid or any page request fails.
    pub async fn bulk_export(&self, request: ExportRequest) -> Result<BulkExport, ControlError> {
        ensure_index(&request.index)?;
        let batch_size = request.batch_size.unwrap_or(DEFAULT_EXPORT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ControlError::InvalidInput(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let body = json!({
            "query": request.query.unwrap_or_else(match_all),
            "size": batch_size,
        });
        let first = self
            .backend
            .search(&request.index, body, Some(SCROLL_KEEP_ALIVE))
            .await?;
        let total = hits_total(&first)?;
        let mut scroll_id = scroll_id_of(&first)?;
        let mut documents = hit_sources(&first)?;
        let mut last_page = documents.len();
        debug!(index = %request.index, page = last_page, "opened scroll");

        let drained = async {
            while last_page > 0 {
                let page = self.backend.scroll(&scroll_id, SCROLL_KEEP_ALIVE).await?;
                if let Ok(next_id) = scroll_id_of(&page) {
                    scroll_id = next_id;
                }
                let sources = hit_sources(&page)?;
                last_page = sources.len();
                debug!(index = %request.index, page = last_page, "scroll page");
                documents.extend(sources);
            }
            Ok::<(), ControlError>(())
        }
        .await;

        if let Err(err) = self.backend.clear_scroll(&scroll_id).await {
            warn!(index = %request.index, error = %err, "failed to clear scroll context");
        }
        drained?;

        info!(index = %request.index, total, exported = documents.len(), "bulk export finished");
        Ok(BulkExport {
            total,
            exported: documents.len(),
            documents,
        })
    }

    /// Counts documents matching a query.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the request fails.
    pub async fn count_documents(
        &self,
        index: &str,
        query: Option<Value>,
    ) -> Result<DocumentCount, ControlError> {
        ensure_index(index)?;
        let body = json!({ "query": query.unwrap_or_else(match_all) });
        let response = self.backend.count(index, body).await?;
        let count = response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::Decode("count response has no count".to_string()))?;
        Ok(DocumentCount { count })
    }

    pub async fn ping(&self) -> bool {
        self.backend.ping().await
    }

    /// Reports cluster health.
    ///
    /// # Errors
    /// Returns `ControlError` if the request fails or the body is malformed.
    pub async fn cluster_health(&self) -> Result<ClusterHealth, ControlError> {
        let response = self.backend.cluster_health().await?;
        serde_json::from_value(response)
            .map_err(|err| StoreError::Decode(err.to_string()).into())
    }

    /// Checks whether an index exists.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the request fails.
    pub async fn index_exists(&self, index: &str) -> Result<bool, ControlError> {
        ensure_index(index)?;
        Ok(self.backend.index_exists(index).await?)
    }

    /// Makes recent writes to an index visible to search.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the request fails.
    pub async fn refresh(&self, index: &str) -> Result<(), ControlError> {
        ensure_index(index)?;
        Ok(self.backend.refresh(index).await?)
    }

    /// Indexes documents with one bulk request, using `id_field` as the
    /// document id when present.
    ///
    /// Rejected documents are reported rather than failing the call.
    ///
    /// # Errors
    /// Returns `ControlError` if the index is blank or the bulk request fails.
    pub async fn index_documents(
        &self,
        index: &str,
        documents: &[Value],
        id_field: &str,
    ) -> Result<BulkIndexReport, ControlError> {
        ensure_index(index)?;
        if documents.is_empty() {
            return Ok(BulkIndexReport::default());
        }

        let mut lines = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            let mut action = json!({ "_index": index });
            if let Some(id) = document_id(document, id_field) {
                action["_id"] = Value::String(id);
            }
            lines.push(json!({ "index": action }));
            lines.push(document.clone());
        }

        let response = self.backend.bulk(lines).await?;
        Ok(parse_bulk_response(&response))
    }
}

fn hits_total(response: &Value) -> Result<u64, ControlError> {
    let total = response.pointer("/hits/total");
    total
        .and_then(|total| total.get("value").and_then(Value::as_u64).or_else(|| total.as_u64()))
        .ok_or_else(|| StoreError::Decode("search response has no hits.total".to_string()).into())
}

fn hit_sources(response: &Value) -> Result<Vec<Value>, ControlError> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::Decode("search response has no hits.hits".to_string()))?;
    Ok(hits
        .iter()
        .map(|hit| hit.get("_source").cloned().unwrap_or(Value::Null))
        .collect())
}

fn scroll_id_of(response: &Value) -> Result<String, ControlError> {
    response
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode("search response has no _scroll_id".to_string()).into())
}

fn document_id(document: &Value, id_field: &str) -> Option<String> {
    match document.get(id_field)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn parse_bulk_response(response: &Value) -> BulkIndexReport {
    let mut report = BulkIndexReport::default();
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for item in items {
        let Some(result) = item.as_object().and_then(|entry| entry.values().next()) else {
            continue;
        };
        let status = result
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(0);
        if (200..300).contains(&status) && result.get("error").is_none() {
            report.indexed += 1;
            continue;
        }
        let error = result.get("error");
        let reason = error
            .and_then(|error| error.get("reason").and_then(Value::as_str).or_else(|| error.as_str()))
            .unwrap_or("unknown bulk failure")
            .to_string();
        report.failures.push(BulkFailure {
            id: result.get("_id").and_then(Value::as_str).map(str::to_string),
            status,
            reason,
        });
    }
    report
}
