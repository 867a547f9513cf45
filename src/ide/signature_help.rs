//! Signature help built from the oracle's call hint.

use serde::{Deserialize, Serialize};

use super::oracle::{CURSOR_MARKER, CodeOracle, matching_paren, mark_cursor, split_params};
use super::resolve::{DocumentPosition, resolve_symbol};
use crate::base::uri::file_uri_to_path;
use crate::project::Workspace;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelp {
    pub signatures: Vec<SignatureInformation>,
    pub active_signature: u32,
    pub active_parameter: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInformation {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub parameters: Vec<ParameterInformation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInformation {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// A call hint split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallHint {
    /// Callee name without any `Type.` prefix.
    pub callee: String,
    /// Hint text without markers.
    pub label: String,
    pub params: Vec<String>,
    pub active_parameter: usize,
}

impl CallHint {
    /// Parse `callee(a, \u{FFFF}b\u{FFFF}, c) -> ret`.
    pub fn parse(hint: &str) -> Option<Self> {
        let open = hint.find('(')?;
        let callee = hint[..open].trim();
        let callee = callee.rsplit('.').next().unwrap_or(callee).to_string();
        if callee.is_empty() {
            return None;
        }

        let close = matching_paren(hint, open).unwrap_or(hint.len());
        let inner_end = close.min(hint.len());
        let raw_params = split_params(&hint[open + 1..inner_end]);

        let active_parameter = match raw_params.iter().position(|p| p.contains(CURSOR_MARKER)) {
            Some(index) => index,
            None => {
                // Marker outside any parameter: count the parameters before it.
                let marker = hint.find(CURSOR_MARKER);
                match marker {
                    Some(offset) if offset > open => hint[open + 1..offset.min(inner_end)].matches(',').count(),
                    _ => 0,
                }
            }
        };

        let strip = |s: &str| s.replace(CURSOR_MARKER, "").trim().to_string();
        let params: Vec<String> = raw_params.iter().map(|p| strip(p)).filter(|p| !p.is_empty()).collect();
        Some(Self {
            callee,
            label: hint.replace(CURSOR_MARKER, ""),
            params,
            active_parameter,
        })
    }
}

/// Signature of the call enclosing `pos`.
pub fn signature_help(ws: &mut Workspace, oracle: &dyn CodeOracle, pos: &DocumentPosition) -> Option<SignatureHelp> {
    let path = file_uri_to_path(&pos.uri);
    let record = ws.get_parse_result(&path)?;
    let code = mark_cursor(&record.source_text, pos.position);
    let hint = oracle.call_hint(ws, &code, &path);
    if hint.is_empty() {
        return None;
    }
    let hint = CallHint::parse(&hint)?;

    let symbol = resolve_symbol(ws, oracle, pos, Some(&hint.callee), true)?;

    let parameters = hint
        .params
        .iter()
        .map(|label| {
            let name = label.split([':', '=']).next().unwrap_or_default().trim();
            let documentation = symbol
                .child(name)
                .map(|param| param.detail.clone())
                .filter(|detail| !detail.is_empty());
            ParameterInformation {
                label: label.clone(),
                documentation,
            }
        })
        .collect();

    Some(SignatureHelp {
        signatures: vec![SignatureInformation {
            label: hint.label,
            documentation: Some(symbol.documentation.clone()).filter(|d| !d.is_empty()),
            parameters,
        }],
        active_signature: 0,
        active_parameter: hint.active_parameter as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Position;
    use crate::ide::oracle::DocOracle;
    use crate::project::{QueueSink, WorkspaceConfig};
    use rstest::rstest;

    #[rstest]
    #[case("foo(a, \u{FFFF}b\u{FFFF}, c)", "foo", 1)]
    #[case("Node.add(\u{FFFF}x\u{FFFF}) -> void", "add", 0)]
    #[case("foo(a, b, \u{FFFF})", "foo", 2)]
    #[case("foo()", "foo", 0)]
    fn test_parse_hint(#[case] hint: &str, #[case] callee: &str, #[case] active: usize) {
        let parsed = CallHint::parse(hint).unwrap();
        assert_eq!(parsed.callee, callee);
        assert_eq!(parsed.active_parameter, active);
        assert!(!parsed.label.contains(CURSOR_MARKER));
    }

    #[test]
    fn test_parse_hint_rejects_garbage() {
        assert!(CallHint::parse("no call here").is_none());
        assert!(CallHint::parse("(a, b)").is_none());
    }

    #[test]
    fn test_signature_help_for_script_function() {
        let mut ws = Workspace::new(WorkspaceConfig::new("/nonexistent"), Box::new(QueueSink::new()));
        let text = "# Moves the body.\nfunc walk(speed: float, dir):\n\tpass\nfunc g():\n\twalk(1, \n";
        let _ = ws.parse_script("/p/a.gd", text);

        let pos = DocumentPosition::new("file:///p/a.gd", Position::new(4, 9));
        let help = signature_help(&mut ws, &DocOracle, &pos).unwrap();
        assert_eq!(help.active_parameter, 1);
        let signature = &help.signatures[0];
        assert_eq!(signature.label, "walk(speed: float, dir)");
        assert_eq!(signature.documentation.as_deref(), Some("Moves the body."));
        assert_eq!(signature.parameters.len(), 2);
        assert_eq!(signature.parameters[0].documentation.as_deref(), Some("float"));
        assert_eq!(signature.parameters[1].documentation, None);
    }

    #[test]
    fn test_signature_help_for_native_method() {
        use crate::hir::docs::{ApiDocs, ArgumentDoc, ClassDoc, MethodDoc};

        let docs = ApiDocs {
            classes: vec![ClassDoc {
                name: "Node".into(),
                methods: vec![MethodDoc {
                    name: "add_child".into(),
                    return_type: Some("void".into()),
                    arguments: vec![ArgumentDoc {
                        name: "node".into(),
                        type_name: "Node".into(),
                        default_value: None,
                    }],
                    ..MethodDoc::default()
                }],
                ..ClassDoc::default()
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::new(WorkspaceConfig::new(dir.path()), Box::new(QueueSink::new())).with_api_docs(docs);
        ws.initialize().unwrap();
        let _ = ws.parse_script("/p/a.gd", "extends Node\nfunc _ready():\n\tadd_child(self)\n");

        let pos = DocumentPosition::new("file:///p/a.gd", Position::new(2, 11));
        let help = signature_help(&mut ws, &DocOracle, &pos).unwrap();
        assert_eq!(help.active_parameter, 0);
        let signature = &help.signatures[0];
        assert_eq!(signature.label, "add_child(node: Node) -> void");
        assert_eq!(signature.parameters.len(), 1);
        assert_eq!(signature.parameters[0].label, "node: Node");
        assert_eq!(signature.parameters[0].documentation.as_deref(), Some("Node"));
    }

    #[test]
    fn test_no_signature_outside_call() {
        let mut ws = Workspace::new(WorkspaceConfig::new("/nonexistent"), Box::new(QueueSink::new()));
        ws.parse_script("/p/a.gd", "var a = 1\n").unwrap();

        let pos = DocumentPosition::new("file:///p/a.gd", Position::new(0, 3));
        assert!(signature_help(&mut ws, &DocOracle, &pos).is_none());
    }
}
