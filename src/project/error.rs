use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the workspace session.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The script failed to parse. The error is also published as a
    /// diagnostic.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        message: String,
        line: u32,
    },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("project root not found: {0}")]
    RootNotFound(PathBuf),
}

/// Errors produced while loading API documentation.
#[derive(Debug, Error)]
pub enum DocsError {
    #[error("cannot read API docs '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid API docs '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
