//! Project scans from disk, with and without API documentation.

use std::fs;
use std::path::Path;

use gdlsp::base::uri::{path_key, path_to_file_uri};
use gdlsp::ide::{self, DocOracle, DocumentPosition};
use gdlsp::project::QueueSink;
use gdlsp::{Position, SymbolKind, Workspace, WorkspaceConfig};

const API_DOCS: &str = r#"{
    "classes": [
        {
            "name": "Object",
            "methods": [{"name": "free", "return_type": "void"}]
        },
        {
            "name": "Node",
            "inherits": "Object",
            "brief_description": "Base class for all scene objects.",
            "methods": [
                {
                    "name": "add_child",
                    "return_type": "void",
                    "arguments": [{"name": "node", "type": "Node"}]
                }
            ],
            "signals": [{"name": "ready"}]
        }
    ]
}"#;

fn write(root: &Path, relative: &str, text: &str) -> String {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, text).unwrap();
    path_key(&path)
}

fn workspace(root: &Path, api_docs: Option<&Path>) -> (Workspace, QueueSink) {
    let sink = QueueSink::new();
    let mut config = WorkspaceConfig::new(root);
    config.api_docs = api_docs.map(Path::to_path_buf);
    (Workspace::new(config, Box::new(sink.clone())), sink)
}

#[test]
fn test_scan_parses_every_script() {
    let dir = tempfile::tempdir().unwrap();
    let player = write(dir.path(), "actors/player.gd", "class_name Player\nvar health = 10\n");
    let broken = write(dir.path(), "broken.gd", "var broken = (\n");
    write(dir.path(), ".hidden/skip.gd", "var x\n");
    write(dir.path(), "notes.txt", "not a script\n");

    let (mut ws, sink) = workspace(dir.path(), None);
    ws.initialize().unwrap();
    assert!(ws.is_initialized());

    assert!(ws.cached_script(&player).is_some());
    assert!(ws.cached_script(&broken).is_none());
    assert!(ws.cached_parse_result(&broken).is_some());
    assert_eq!(ws.scripts().len(), 1);
    assert_eq!(ws.global_class_path("Player"), Some(player.as_str()));

    // One publication per scanned script.
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "main.gd", "var a\n");

    let (mut ws, sink) = workspace(dir.path(), None);
    ws.initialize().unwrap();
    sink.drain();

    write(dir.path(), "late.gd", "var b\n");
    ws.initialize().unwrap();
    assert!(sink.is_empty());
    assert_eq!(ws.scripts().len(), 1);
    assert!(ws.cached_script(&path).is_some());
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ws, _) = workspace(&dir.path().join("absent"), None);
    assert!(ws.initialize().is_err());
    assert!(!ws.is_initialized());
}

#[test]
fn test_bad_api_docs_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.gd", "var a\n");
    let docs = dir.path().join("api.json");
    fs::write(&docs, "{ not json").unwrap();

    let (mut ws, _) = workspace(dir.path(), Some(&docs));
    ws.initialize().unwrap();
    assert!(ws.native().is_empty());
    assert_eq!(ws.scripts().len(), 1);
}

#[test]
fn test_native_members_resolve_through_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("api.json");
    fs::write(&docs, API_DOCS).unwrap();
    let path = write(dir.path(), "main.gd", "extends Node\n\nfunc _ready():\n\tfree()\n\tadd_child(self)\n");

    let (mut ws, _) = workspace(dir.path(), Some(&docs));
    ws.initialize().unwrap();
    assert_eq!(ws.native().len(), 2);

    let free = ws.native().get_native_symbol("Node", "free").expect("inherited member");
    assert_eq!(free.native_class.as_deref(), Some("Object"));

    let uri = path_to_file_uri(&path);
    let pos = DocumentPosition::new(uri.as_str(), Position::new(4, 3));
    let symbol = ide::resolve_symbol(&mut ws, &DocOracle::new(), &pos, None, false).expect("native method");
    assert_eq!(symbol.name, "add_child");
    assert_eq!(symbol.kind, SymbolKind::Method);
    assert_eq!(symbol.native_class.as_deref(), Some("Node"));

    // Native symbols have no file to jump to.
    assert!(ide::definition(&mut ws, &DocOracle::new(), &pos).is_none());
}

#[test]
fn test_global_class_definition_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let player = write(dir.path(), "player.gd", "class_name Player\nvar health = 10\n");
    let main = write(dir.path(), "main.gd", "var p: Player\n");

    let (mut ws, _) = workspace(dir.path(), None);
    ws.initialize().unwrap();

    let uri = path_to_file_uri(&main);
    let pos = DocumentPosition::new(uri.as_str(), Position::new(0, 9));
    let location = ide::definition(&mut ws, &DocOracle::new(), &pos).expect("definition");
    assert_eq!(location.uri, path_to_file_uri(&player));
}

#[test]
fn test_related_symbols_span_scripts_and_natives() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("api.json");
    fs::write(&docs, API_DOCS).unwrap();
    let path = write(dir.path(), "a.gd", "func add_child(x):\n\tpass\n");

    let (mut ws, _) = workspace(dir.path(), Some(&docs));
    ws.initialize().unwrap();

    let pos = DocumentPosition::new(path_to_file_uri(&path), Position::new(0, 6));
    let related = ide::resolve_related_symbols(&mut ws, &pos);
    assert_eq!(related.len(), 2, "{:?}", related);
}
