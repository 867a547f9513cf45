//! Flat index: every known member under its qualified `Owner.member` name.
//!
//! Entries are grouped by owning document (`None` for built-in classes) so a
//! reparse can drop and re-add one document's entries without touching the
//! rest. Iteration follows insertion order.

use std::sync::Arc;

use indexmap::IndexMap;

use super::symbols::{Symbol, for_each_member};

/// One indexed member.
#[derive(Clone, Debug)]
pub struct FlatEntry {
    /// Path of the declaring document; `None` for built-in classes.
    pub document: Option<String>,
    /// `Owner.member`
    pub qualified_name: String,
    pub symbol: Arc<Symbol>,
}

impl FlatEntry {
    /// The member name (text after the last `.`).
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit_once('.')
            .map_or(self.qualified_name.as_str(), |(_, name)| name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FlatIndex {
    by_document: IndexMap<Option<String>, Vec<FlatEntry>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entries of a script document with the members of `root`.
    pub fn add_document(&mut self, path: &str, root: &Symbol) {
        self.remove_document(path);

        let mut entries = Vec::new();
        for_each_member(root, &mut |owner, member| {
            entries.push(FlatEntry {
                document: Some(path.to_string()),
                qualified_name: format!("{}.{}", owner.name, member.name),
                symbol: Arc::new(member.clone()),
            });
        });
        self.by_document.insert(Some(path.to_string()), entries);
    }

    /// Drop every entry owned by `path`.
    pub fn remove_document(&mut self, path: &str) {
        self.by_document.shift_remove(&Some(path.to_string()));
    }

    /// Replace the built-in class entries.
    pub fn add_native(&mut self, entries: Vec<FlatEntry>) {
        self.by_document.insert(None, entries);
    }

    pub fn entries(&self) -> impl Iterator<Item = &FlatEntry> {
        self.by_document.values().flatten()
    }

    /// Entries whose member name equals `name`, in insertion order.
    pub fn lookup_simple<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FlatEntry> + 'a {
        self.entries().filter(move |e| e.simple_name() == name)
    }

    pub fn lookup_qualified(&self, qualified_name: &str) -> Option<&FlatEntry> {
        self.entries().find(|e| e.qualified_name == qualified_name)
    }

    pub fn len(&self) -> usize {
        self.by_document.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
