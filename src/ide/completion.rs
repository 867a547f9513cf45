//! Completion: oracle candidates filtered by the word being typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::oracle::{CandidateKind, CodeOracle, CompletionCandidate, mark_cursor};
use super::resolve::{DocumentPosition, identifier_before};
use super::symbols::is_subsequence;
use crate::base::uri::file_uri_to_path;
use crate::project::Workspace;

/// Most items returned for one request.
pub const MAX_COMPLETION_ITEMS: usize = 200;

/// Protocol `CompletionItemKind` values.
pub mod item_kind {
    pub const TEXT: u32 = 1;
    pub const FUNCTION: u32 = 3;
    pub const FIELD: u32 = 5;
    pub const VARIABLE: u32 = 6;
    pub const CLASS: u32 = 7;
    pub const ENUM: u32 = 13;
    pub const KEYWORD: u32 = 14;
    pub const FILE: u32 = 17;
    pub const CONSTANT: u32 = 21;
    pub const EVENT: u32 = 23;
}

impl CandidateKind {
    pub fn to_item_kind(self) -> u32 {
        match self {
            CandidateKind::Class => item_kind::CLASS,
            CandidateKind::Constant => item_kind::CONSTANT,
            CandidateKind::Enum => item_kind::ENUM,
            CandidateKind::NodePath | CandidateKind::FilePath => item_kind::FILE,
            CandidateKind::Function => item_kind::FUNCTION,
            CandidateKind::Member => item_kind::FIELD,
            CandidateKind::Signal => item_kind::EVENT,
            CandidateKind::Variable => item_kind::VARIABLE,
            CandidateKind::Keyword => item_kind::KEYWORD,
            CandidateKind::PlainText => item_kind::TEXT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub kind: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub deprecated: bool,
    pub preselect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commit_characters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<CompletionCandidate> for CompletionItem {
    fn from(candidate: CompletionCandidate) -> Self {
        let insert_text = (candidate.insert_text != candidate.display).then_some(candidate.insert_text);
        Self {
            kind: candidate.kind.to_item_kind(),
            label: candidate.display,
            insert_text,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionList {
    pub is_incomplete: bool,
    pub items: Vec<CompletionItem>,
}

/// Complete at `pos`.
///
/// Candidates containing the typed word come first, exact case before any
/// case. Only when none contain it are subsequence matches tried, again
/// exact case first.
pub fn completion(ws: &mut Workspace, oracle: &dyn CodeOracle, pos: &DocumentPosition) -> CompletionList {
    let path = file_uri_to_path(&pos.uri);
    let Some(record) = ws.get_parse_result(&path) else {
        return CompletionList::default();
    };

    let word = record
        .line(pos.position.line)
        .and_then(|line| identifier_before(line, pos.position.character))
        .map(|(word, _)| word)
        .unwrap_or_default();

    let code = mark_cursor(&record.source_text, pos.position);
    let candidates = oracle.complete_code(ws, &code, &path);
    let filtered = filter_candidates(candidates, &word);
    tracing::debug!(word = %word, matches = filtered.len(), "completion");

    CompletionList {
        is_incomplete: !filtered.is_empty(),
        items: filtered
            .into_iter()
            .take(MAX_COMPLETION_ITEMS)
            .map(CompletionItem::from)
            .collect(),
    }
}

fn filter_candidates(candidates: Vec<CompletionCandidate>, word: &str) -> Vec<CompletionCandidate> {
    let lower_word = word.to_lowercase();

    let mut exact = Vec::new();
    let mut any_case = Vec::new();
    for candidate in &candidates {
        if candidate.display.contains(word) {
            exact.push(candidate.clone());
        } else if candidate.display.to_lowercase().contains(&lower_word) {
            any_case.push(candidate.clone());
        }
    }
    exact.append(&mut any_case);
    if !exact.is_empty() {
        return exact;
    }

    let subsequence: Vec<_> = candidates
        .iter()
        .filter(|c| is_subsequence(word, &c.display))
        .cloned()
        .collect();
    if !subsequence.is_empty() {
        return subsequence;
    }

    candidates
        .into_iter()
        .filter(|c| is_subsequence(&lower_word, &c.display.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Position;
    use crate::ide::oracle::LookupResult;
    use crate::project::{QueueSink, WorkspaceConfig};

    /// Oracle returning a fixed candidate list.
    struct FixedOracle(Vec<CompletionCandidate>);

    impl CodeOracle for FixedOracle {
        fn complete_code(&self, _: &Workspace, _: &str, _: &str) -> Vec<CompletionCandidate> {
            self.0.clone()
        }

        fn lookup_code(&self, _: &Workspace, _: &str, _: &str, _: &str, _: bool) -> LookupResult {
            LookupResult::NotFound
        }

        fn call_hint(&self, _: &Workspace, _: &str, _: &str) -> String {
            String::new()
        }
    }

    fn candidates(names: &[&str]) -> Vec<CompletionCandidate> {
        names
            .iter()
            .map(|n| CompletionCandidate::new(*n, CandidateKind::Variable))
            .collect()
    }

    fn labels(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|i| i.label.as_str()).collect()
    }

    fn workspace_with(text: &str) -> Workspace {
        let mut ws = Workspace::new(WorkspaceConfig::new("/nonexistent"), Box::new(QueueSink::new()));
        let _ = ws.parse_script("/p/a.gd", text);
        ws
    }

    #[test]
    fn test_completion_is_capped() {
        let names: Vec<String> = (0..500).map(|i| format!("item_{}", i)).collect();
        let oracle = FixedOracle(names.iter().map(|n| CompletionCandidate::new(n, CandidateKind::Function)).collect());
        let mut ws = workspace_with("func f():\n\t\n");

        let list = completion(&mut ws, &oracle, &DocumentPosition::new("file:///p/a.gd", Position::new(1, 1)));
        assert_eq!(list.items.len(), MAX_COMPLETION_ITEMS);
        assert!(list.is_incomplete);
        assert_eq!(list.items[0].kind, item_kind::FUNCTION);
    }

    #[test]
    fn test_substring_tiers() {
        let oracle = FixedOracle(candidates(&["Position", "set_position", "pos", "pause"]));
        let mut ws = workspace_with("func f():\n\tpos\n");

        let list = completion(&mut ws, &oracle, &DocumentPosition::new("file:///p/a.gd", Position::new(1, 4)));
        assert_eq!(labels(&list), vec!["set_position", "pos", "Position"]);
    }

    #[test]
    fn test_subsequence_fallback() {
        let oracle = FixedOracle(candidates(&["get_node", "Get_Node", "queue_free"]));
        let mut ws = workspace_with("func f():\n\tgnd\n");

        let list = completion(&mut ws, &oracle, &DocumentPosition::new("file:///p/a.gd", Position::new(1, 4)));
        assert_eq!(labels(&list), vec!["get_node"]);

        let oracle = FixedOracle(candidates(&["Get_Node", "queue_free"]));
        let list = completion(&mut ws, &oracle, &DocumentPosition::new("file:///p/a.gd", Position::new(1, 4)));
        assert_eq!(labels(&list), vec!["Get_Node"]);
    }

    #[test]
    fn test_no_match_is_complete() {
        let oracle = FixedOracle(candidates(&["alpha"]));
        let mut ws = workspace_with("func f():\n\tzz\n");

        let list = completion(&mut ws, &oracle, &DocumentPosition::new("file:///p/a.gd", Position::new(1, 3)));
        assert!(list.items.is_empty());
        assert!(!list.is_incomplete);
    }

    #[test]
    fn test_item_serialization() {
        let item = CompletionItem::from(CompletionCandidate::new("ready", CandidateKind::Signal));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["label"], "ready");
        assert_eq!(json["kind"], 23);
        assert_eq!(json["preselect"], false);
        assert!(json.get("insertText").is_none());
    }
}
