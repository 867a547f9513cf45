//! Project scan: finds every script under the project root.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::error::WorkspaceError;

/// Script file extension.
pub const SCRIPT_EXTENSION: &str = "gd";

/// Collects script paths below a project root.
#[derive(Clone, Debug)]
pub struct WorkspaceLoader {
    root: PathBuf,
}

impl WorkspaceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All `*.gd` files under the root, sorted.
    ///
    /// Hidden directories (`.git`, `.import`, ...) are skipped. Entries that
    /// cannot be read are logged and skipped.
    pub fn collect_script_paths(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        if !self.root.is_dir() {
            return Err(WorkspaceError::RootNotFound(self.root.clone()));
        }

        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_script(entry.path()) => {
                    paths.push(entry.into_path());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "skipping unreadable entry"),
            }
        }

        paths.sort();
        Ok(paths)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

pub fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collects_scripts_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("actors/enemies")).unwrap();
        fs::write(dir.path().join("main.gd"), "extends Node\n").unwrap();
        fs::write(dir.path().join("actors/enemies/bat.gd"), "extends Node\n").unwrap();
        fs::write(dir.path().join("actors/readme.txt"), "").unwrap();

        let paths = WorkspaceLoader::new(dir.path()).collect_script_paths().unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["actors/enemies/bat.gd", "main.gd"]);
    }

    #[test]
    fn test_skips_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".import")).unwrap();
        fs::write(dir.path().join(".import/cached.gd"), "").unwrap();

        let paths = WorkspaceLoader::new(dir.path()).collect_script_paths().unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = WorkspaceLoader::new(dir.path().join("nope")).collect_script_paths();
        assert!(matches!(result, Err(WorkspaceError::RootNotFound(_))));
    }
}
