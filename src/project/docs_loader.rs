//! Loads the API documentation file used to build the native catalog.

use std::path::Path;

use super::error::DocsError;
use crate::hir::ApiDocs;

/// Read and decode an API documentation file.
pub fn load_api_docs(path: &Path) -> Result<ApiDocs, DocsError> {
    let text = std::fs::read_to_string(path).map_err(|source| DocsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let docs = ApiDocs::from_json(&text).map_err(|source| DocsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), classes = docs.classes.len(), "loaded API docs");
    Ok(docs)
}
