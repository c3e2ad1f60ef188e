use std::path::PathBuf;

use datashift_core::control::SearchControlPlane;
use datashift_store::models::{BulkFailure, BulkIndexReport};
use datashift_store::schema::{DEFAULT_ID_FIELD, DEFAULT_SAMPLE_INDEX};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::IngestError;

pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Where to read sample documents from and how to index them.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub path: PathBuf,
    pub index: String,
    pub id_field: String,
    pub chunk_size: usize,
}

impl LoadRequest {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: DEFAULT_SAMPLE_INDEX.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadReport {
    pub index: String,
    pub loaded: usize,
    pub indexed: usize,
    pub failures: Vec<BulkFailure>,
    /// Documents in the index after the refresh.
    pub final_count: u64,
}

/// Parses a JSON array of documents.
///
/// # Errors
/// Returns `IngestError::Parse` if the text is not a JSON array.
pub fn parse_documents(text: &str) -> Result<Vec<Value>, IngestError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(documents)) => Ok(documents),
        Ok(_) => Err(IngestError::Parse("expected a JSON array of documents".to_string())),
        Err(err) => Err(IngestError::Parse(err.to_string())),
    }
}

/// Reads a JSON array file and indexes it.
///
/// # Errors
/// Returns `IngestError` if the file cannot be read or parsed, or loading fails.
pub async fn load_file(
    control: &SearchControlPlane,
    request: &LoadRequest,
) -> Result<LoadReport, IngestError> {
    let text = tokio::fs::read_to_string(&request.path)
        .await
        .map_err(|source| IngestError::Io {
            path: request.path.clone(),
            source,
        })?;
    let documents = parse_documents(&text)?;
    info!(path = %request.path.display(), documents = documents.len(), "loaded documents from file");
    load_documents(control, &documents, request).await
}

/// Bulk-indexes documents in chunks, then refreshes the index and counts it.
///
/// Documents rejected by the engine are reported, not fatal.
///
/// # Errors
/// Returns `IngestError::Unreachable` if the cluster does not answer, or a
/// control error if a bulk, refresh, or count request fails.
pub async fn load_documents(
    control: &SearchControlPlane,
    documents: &[Value],
    request: &LoadRequest,
) -> Result<LoadReport, IngestError> {
    if !control.ping().await {
        return Err(IngestError::Unreachable("Elasticsearch".to_string()));
    }

    let mut report = BulkIndexReport::default();
    for chunk in documents.chunks(request.chunk_size.max(1)) {
        let outcome = control
            .index_documents(&request.index, chunk, &request.id_field)
            .await?;
        if !outcome.failures.is_empty() {
            warn!(index = %request.index, failed = outcome.failures.len(), "bulk chunk had failures");
        }
        report.merge(outcome);
    }
    info!(index = %request.index, indexed = report.indexed, failed = report.failures.len(), "bulk load finished");

    control.refresh(&request.index).await?;
    let final_count = control.count_documents(&request.index, None).await?.count;

    Ok(LoadReport {
        index: request.index.clone(),
        loaded: documents.len(),
        indexed: report.indexed,
        failures: report.failures,
        final_count,
    })
}
