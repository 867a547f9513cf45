//! Document and workspace symbol queries.

use crate::base::uri::{file_uri_to_path, path_to_file_uri};
use crate::hir::{Symbol, SymbolInformation, flatten};
use crate::project::Workspace;

/// Symbol tree of the last successful parse of a document: the script
/// class, with its members as children.
pub fn document_symbols(ws: &mut Workspace, uri: &str) -> Vec<Symbol> {
    let path = file_uri_to_path(uri);
    match ws.get_parse_successed_script(&path) {
        Some(record) => vec![record.symbols.clone()],
        None => Vec::new(),
    }
}

/// Symbols across all successfully parsed scripts whose name contains the
/// query as a case-insensitive subsequence. An empty query matches nothing.
pub fn workspace_symbols(ws: &Workspace, query: &str) -> Vec<SymbolInformation> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (path, record) in ws.scripts() {
        let uri = path_to_file_uri(path);
        out.extend(
            flatten(&record.symbols, &uri)
                .into_iter()
                .filter(|info| is_subsequence_ci(query, &info.name)),
        );
    }
    out
}

/// Whether the characters of `needle` appear in order in `haystack`.
pub fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|c| rest.any(|h| h == c))
}

/// [`is_subsequence`], ignoring case.
pub fn is_subsequence_ci(needle: &str, haystack: &str) -> bool {
    is_subsequence(&needle.to_lowercase(), &haystack.to_lowercase())
}
