//! Workspace session: the parsed state of one project.
//!
//! Two caches map a script path to its latest [`DocumentRecord`]:
//!
//! - `parse_results`: the latest parse attempt, successful or not
//! - `scripts`: the latest *successful* parse
//!
//! A successful parse puts the same record in both. A failed parse replaces
//! only `parse_results`, so features that need a complete symbol tree keep
//! working from the last good version while diagnostics reflect the current
//! text. Every path in `scripts` is also in `parse_results`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::docs_loader::load_api_docs;
use super::error::WorkspaceError;
use super::workspace_loader::WorkspaceLoader;
use crate::base::uri::{path_key, path_to_file_uri};
use crate::hir::{ApiDocs, Diagnostic, DocumentRecord, FlatIndex, NativeCatalog, Symbol};

// ============================================================================
// DIAGNOSTICS SINK
// ============================================================================

/// Receives the diagnostics published after every parse.
pub trait DiagnosticsSink: Send {
    fn publish(&mut self, uri: &str, diagnostics: &[Diagnostic]);
}

/// A published diagnostics set.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedDiagnostics {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sink that queues publications until they are drained.
///
/// Clones share the queue, so the owner of the workspace can keep a handle
/// and forward what was published after each request.
#[derive(Clone, Debug, Default)]
pub struct QueueSink {
    queue: Arc<Mutex<Vec<PublishedDiagnostics>>>,
}

impl QueueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<PublishedDiagnostics> {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for QueueSink {
    fn publish(&mut self, uri: &str, diagnostics: &[Diagnostic]) {
        self.queue.lock().push(PublishedDiagnostics {
            uri: uri.to_string(),
            diagnostics: diagnostics.to_vec(),
        });
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Session settings.
#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    /// Project root scanned on initialization.
    pub root: PathBuf,
    /// API documentation file for the native catalog.
    pub api_docs: Option<PathBuf>,
    /// Maintain the flat index used for related-symbol queries.
    pub smart_resolve: bool,
}

impl WorkspaceConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            api_docs: None,
            smart_resolve: true,
        }
    }
}

/// Outcome of a project scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub parsed: usize,
    pub failed: usize,
}

// ============================================================================
// WORKSPACE
// ============================================================================

pub struct Workspace {
    config: WorkspaceConfig,
    parse_results: FxHashMap<String, Arc<DocumentRecord>>,
    scripts: FxHashMap<String, Arc<DocumentRecord>>,
    /// `class_name` → declaring script path.
    global_classes: FxHashMap<SmolStr, String>,
    flat_index: FlatIndex,
    native: NativeCatalog,
    /// Docs supplied in memory; take precedence over `config.api_docs`.
    preloaded_docs: Option<ApiDocs>,
    /// The native catalog is built at most once, even when the scan fails.
    native_loaded: bool,
    initialized: bool,
    sink: Box<dyn DiagnosticsSink>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.config.root)
            .field("parse_results", &self.parse_results.len())
            .field("scripts", &self.scripts.len())
            .field("native_classes", &self.native.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Workspace {
    pub fn new(config: WorkspaceConfig, sink: Box<dyn DiagnosticsSink>) -> Self {
        Self {
            config,
            parse_results: FxHashMap::default(),
            scripts: FxHashMap::default(),
            global_classes: FxHashMap::default(),
            flat_index: FlatIndex::new(),
            native: NativeCatalog::default(),
            preloaded_docs: None,
            native_loaded: false,
            initialized: false,
            sink,
        }
    }

    /// Use in-memory API documentation instead of reading a file.
    pub fn with_api_docs(mut self, docs: ApiDocs) -> Self {
        self.preloaded_docs = Some(docs);
        self
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.config.root = root.into();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn native(&self) -> &NativeCatalog {
        &self.native
    }

    pub fn flat_index(&self) -> &FlatIndex {
        &self.flat_index
    }

    pub fn smart_resolve(&self) -> bool {
        self.config.smart_resolve
    }

    /// Build the native catalog and scan the project. The catalog is built
    /// by the first call only; once a scan succeeds, later calls do nothing.
    pub fn initialize(&mut self) -> Result<(), WorkspaceError> {
        if self.initialized {
            return Ok(());
        }

        if !self.native_loaded {
            self.load_native();
        }

        let report = self.reload_all_workspace_scripts()?;
        self.initialized = true;
        tracing::info!(
            root = %self.config.root.display(),
            parsed = report.parsed,
            failed = report.failed,
            native_classes = self.native.len(),
            "workspace initialized"
        );
        Ok(())
    }

    fn load_native(&mut self) {
        let docs = match self.preloaded_docs.take() {
            Some(docs) => Some(docs),
            None => match &self.config.api_docs {
                Some(path) => match load_api_docs(path) {
                    Ok(docs) => Some(docs),
                    Err(err) => {
                        tracing::warn!(error = %err, "continuing without native symbols");
                        None
                    }
                },
                None => None,
            },
        };
        if let Some(docs) = docs {
            self.native = NativeCatalog::build(&docs);
            if self.config.smart_resolve {
                self.flat_index.add_native(self.native.flat_entries());
            }
        }
        self.native_loaded = true;
    }

    /// Parse `content` as the new text of `path` and publish its
    /// diagnostics.
    pub fn parse_script(&mut self, path: &str, content: &str) -> Result<(), WorkspaceError> {
        let record = Arc::new(DocumentRecord::parse(path, content));
        let result = match &record.parse_error {
            None => {
                self.scripts.insert(path.to_string(), Arc::clone(&record));
                self.parse_results.insert(path.to_string(), Arc::clone(&record));
                if self.config.smart_resolve {
                    self.flat_index.add_document(path, &record.symbols);
                }
                self.update_global_class(path, record.class_name.clone());
                Ok(())
            }
            Some(error) => {
                self.parse_results.insert(path.to_string(), Arc::clone(&record));
                Err(WorkspaceError::Parse {
                    path: path.to_string(),
                    message: error.message.clone(),
                    line: error.line,
                })
            }
        };

        self.publish_diagnostics(path);
        result
    }

    fn update_global_class(&mut self, path: &str, class_name: Option<SmolStr>) {
        self.global_classes.retain(|_, owner| owner != path);
        if let Some(name) = class_name {
            self.global_classes.insert(name, path.to_string());
        }
    }

    /// Publish the diagnostics of the latest parse attempt of `path`; an
    /// empty set when the path is unknown.
    pub fn publish_diagnostics(&mut self, path: &str) {
        let diagnostics = self
            .parse_results
            .get(path)
            .map_or(&[][..], |record| record.diagnostics.as_slice());
        self.sink.publish(&path_to_file_uri(path), diagnostics);
    }

    /// Latest parse attempt, parsing the file from disk on a cache miss.
    pub fn get_parse_result(&mut self, path: &str) -> Option<Arc<DocumentRecord>> {
        if let Some(record) = self.parse_results.get(path) {
            return Some(Arc::clone(record));
        }
        self.load_from_disk(path);
        self.parse_results.get(path).cloned()
    }

    /// Latest successful parse, parsing the file from disk on a cache miss.
    pub fn get_parse_successed_script(&mut self, path: &str) -> Option<Arc<DocumentRecord>> {
        if let Some(record) = self.scripts.get(path) {
            return Some(Arc::clone(record));
        }
        self.load_from_disk(path);
        self.scripts.get(path).cloned()
    }

    /// Cached latest parse attempt, without touching the disk.
    pub fn cached_parse_result(&self, path: &str) -> Option<&Arc<DocumentRecord>> {
        self.parse_results.get(path)
    }

    /// Cached latest successful parse, without touching the disk.
    pub fn cached_script(&self, path: &str) -> Option<&Arc<DocumentRecord>> {
        self.scripts.get(path)
    }

    /// Root class symbol of the latest successful parse of `path`.
    pub fn get_script_symbol(&mut self, path: &str) -> Option<Symbol> {
        self.get_parse_successed_script(path).map(|record| record.symbols.clone())
    }

    /// Successfully parsed scripts, ordered by path.
    pub fn scripts(&self) -> Vec<(&str, &Arc<DocumentRecord>)> {
        let mut scripts: Vec<_> = self.scripts.iter().map(|(p, r)| (p.as_str(), r)).collect();
        scripts.sort_by(|a, b| a.0.cmp(b.0));
        scripts
    }

    /// Script declaring `class_name name`.
    pub fn global_class_path(&self, name: &str) -> Option<&str> {
        self.global_classes.get(name).map(String::as_str)
    }

    pub fn global_class_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.global_classes.keys()
    }

    /// Forget everything cached for `path`.
    pub fn remove_script(&mut self, path: &str) {
        self.parse_results.remove(path);
        self.scripts.remove(path);
        self.flat_index.remove_document(path);
        self.global_classes.retain(|_, owner| owner != path);
    }

    /// Parse every script under the project root.
    ///
    /// Unreadable files and parse failures are logged; the scan goes on.
    pub fn reload_all_workspace_scripts(&mut self) -> Result<ScanReport, WorkspaceError> {
        let paths = WorkspaceLoader::new(&self.config.root).collect_script_paths()?;
        let mut report = ScanReport::default();

        for path in paths {
            let key = path_key(&path);
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(source) => {
                    let err = WorkspaceError::Io { path: key, source };
                    tracing::warn!(error = %err, "skipping script");
                    report.failed += 1;
                    continue;
                }
            };
            match self.parse_script(&key, &content) {
                Ok(()) => report.parsed += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "script failed to parse");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn load_from_disk(&mut self, path: &str) {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                if let Err(err) = self.parse_script(path, &content) {
                    tracing::debug!(error = %err, "loaded script has errors");
                }
            }
            Err(source) => {
                let err = WorkspaceError::Io {
                    path: path.to_string(),
                    source,
                };
                tracing::warn!(error = %err, "cannot load script");
            }
        }
    }
}
