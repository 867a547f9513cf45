//! Project management: the workspace session and the loaders feeding it.

mod docs_loader;
mod error;
pub mod workspace;
pub mod workspace_loader;

pub use docs_loader::load_api_docs;
pub use error::{DocsError, WorkspaceError};
pub use workspace::{
    DiagnosticsSink, PublishedDiagnostics, QueueSink, ScanReport, Workspace, WorkspaceConfig,
};
pub use workspace_loader::WorkspaceLoader;
