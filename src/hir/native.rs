//! Native symbol catalog: built-in classes as symbols.
//!
//! Built once from [`ApiDocs`] and read-only afterwards. Lookups walk the
//! inheritance chain so a member declared on an ancestor is found from any
//! descendant.

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use smol_str::SmolStr;

use super::docs::{ApiDocs, ClassDoc, MethodDoc};
use super::index::FlatEntry;
use super::symbols::{Symbol, SymbolKind};

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// One built-in class.
#[derive(Clone, Debug)]
pub struct NativeClass {
    pub symbol: Arc<Symbol>,
    pub parent: Option<SmolStr>,
}

/// Built-in classes by name, in documentation order.
#[derive(Clone, Debug, Default)]
pub struct NativeCatalog {
    classes: FxIndexMap<SmolStr, NativeClass>,
}

impl NativeCatalog {
    /// Build the catalog from API documentation.
    pub fn build(docs: &ApiDocs) -> Self {
        let mut classes = FxIndexMap::default();
        for class in &docs.classes {
            let native = NativeClass {
                symbol: Arc::new(class_symbol(class)),
                parent: class.inherits.as_deref().filter(|p| !p.is_empty()).map(SmolStr::new),
            };
            classes.insert(SmolStr::new(&class.name), native);
        }
        tracing::debug!(classes = classes.len(), "native catalog built");
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn is_native_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Option<&NativeClass> {
        self.classes.get(name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.classes.keys()
    }

    /// `class` and its ancestors, nearest first. Unknown classes end the
    /// chain; a cycle is cut at the first repeated class.
    pub fn ancestors<'a>(&'a self, class: &str) -> impl Iterator<Item = (&'a SmolStr, &'a NativeClass)> + 'a {
        let mut next = self.classes.get_key_value(class);
        let mut remaining = self.classes.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let current = next?;
            next = current
                .1
                .parent
                .as_deref()
                .and_then(|parent| self.classes.get_key_value(parent));
            Some(current)
        })
    }

    /// Look up a class (`member` empty) or a member visible on `class`.
    pub fn get_native_symbol(&self, class: &str, member: &str) -> Option<&Symbol> {
        self.ancestors(class).find_map(|(_, native)| {
            if member.is_empty() {
                Some(native.symbol.as_ref())
            } else {
                native.symbol.child(member)
            }
        })
    }

    /// Flat index entries for every member of every class.
    pub fn flat_entries(&self) -> Vec<FlatEntry> {
        self.classes
            .iter()
            .flat_map(|(name, native)| {
                native.symbol.children.iter().map(move |member| FlatEntry {
                    document: None,
                    qualified_name: format!("{}.{}", name, member.name),
                    symbol: Arc::new(member.clone()),
                })
            })
            .collect()
    }
}

// ============================================================================
// SYMBOL CONSTRUCTION
// ============================================================================

fn class_symbol(class: &ClassDoc) -> Symbol {
    let owner = SmolStr::new(&class.name);
    let member = |name: &str, kind: SymbolKind, detail: String, doc: &str| Symbol {
        detail,
        documentation: bbcode_to_markdown(doc),
        native_class: Some(owner.clone()),
        ..Symbol::new(name, kind)
    };

    let mut detail = format!("<Native> class {}", class.name);
    if let Some(parent) = class.inherits.as_deref().filter(|p| !p.is_empty()) {
        detail.push_str(" extends ");
        detail.push_str(parent);
    }

    let brief = bbcode_to_markdown(&class.brief_description);
    let full = bbcode_to_markdown(&class.description);
    let documentation = match (brief.is_empty(), full.is_empty()) {
        (false, false) => format!("{}\n\n{}", brief, full),
        (false, true) => brief,
        _ => full,
    };

    let mut symbol = Symbol {
        detail,
        documentation,
        native_class: Some(owner.clone()),
        ..Symbol::new(&class.name, SymbolKind::Class)
    };

    for constant in &class.constants {
        let qualified = match &constant.enumeration {
            Some(enumeration) => format!("{}.{}", enumeration, constant.name),
            None => constant.name.clone(),
        };
        let detail = format!("const {} = {}", qualified, constant.value);
        symbol
            .children
            .push(member(&constant.name, SymbolKind::Constant, detail, &constant.description));
    }
    for property in &class.members {
        let detail = format!("var {}: {}", property.name, property.type_name);
        symbol
            .children
            .push(member(&property.name, SymbolKind::Property, detail, &property.description));
    }
    for item in &class.theme_items {
        let detail = format!("<Theme> var {}: {}", item.name, item.type_name);
        symbol
            .children
            .push(member(&item.name, SymbolKind::Property, detail, &item.description));
    }
    for method in &class.methods {
        let detail = callable_detail(method, true);
        let mut child = member(&method.name, SymbolKind::Method, detail, &method.description);
        // One child per argument, detailed with its type, like script functions.
        child.children = method
            .arguments
            .iter()
            .map(|arg| Symbol {
                detail: arg.type_name.clone(),
                native_class: Some(owner.clone()),
                ..Symbol::new(&arg.name, SymbolKind::Variable)
            })
            .collect();
        symbol.children.push(child);
    }
    for signal in &class.signals {
        let detail = callable_detail(signal, false);
        symbol
            .children
            .push(member(&signal.name, SymbolKind::Event, detail, &signal.description));
    }

    symbol
}

/// `name(arg: type = default, ...) -> return`
fn callable_detail(method: &MethodDoc, with_return: bool) -> String {
    let mut args: Vec<String> = method
        .arguments
        .iter()
        .map(|arg| {
            let mut text = arg.name.clone();
            if !arg.type_name.is_empty() {
                text.push_str(": ");
                text.push_str(&arg.type_name);
            }
            if let Some(default) = &arg.default_value {
                text.push_str(" = ");
                text.push_str(default);
            }
            text
        })
        .collect();
    if method.is_vararg() {
        args.push("...".to_string());
    }

    let mut detail = format!("{}({})", method.name, args.join(", "));
    if with_return {
        detail.push_str(" -> ");
        detail.push_str(method.return_type.as_deref().unwrap_or("void"));
    }
    detail
}

// ============================================================================
// MARKUP CONVERSION
// ============================================================================

/// Convert the documentation markup to Markdown.
///
/// Inline tags map to Markdown emphasis, `[codeblock]` becomes an indented
/// block and cross references become inline code. Unknown tags are kept.
pub fn bbcode_to_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.trim();

    while let Some(open) = rest.find("[codeblock]") {
        push_inline(&mut out, rest[..open].trim_end());
        let after = &rest[open + "[codeblock]".len()..];
        let (code, tail) = match after.find("[/codeblock]") {
            Some(close) => (&after[..close], &after[close + "[/codeblock]".len()..]),
            None => (after, ""),
        };
        push_code_block(&mut out, code);
        rest = tail.trim_start();
    }
    push_inline(&mut out, rest);

    out.trim().to_string()
}

fn push_code_block(out: &mut String, code: &str) {
    let mut lines: Vec<&str> = code.lines().skip_while(|l| l.trim().is_empty()).collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push_str(if out.ends_with('\n') { "\n" } else { "\n\n" });
    }
    for line in lines {
        out.push_str("    ");
        out.push_str(line.get(indent..).unwrap_or("").trim_end());
        out.push('\n');
    }
    out.push('\n');
}

fn push_inline(out: &mut String, text: &str) {
    let text: Vec<&str> = text.lines().map(str::trim).collect();
    let text = text.join("\n");
    let mut rest = text.as_str();

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find(']') else {
            out.push_str(&rest[open..]);
            return;
        };
        let tag = &rest[open + 1..open + close];
        match convert_tag(tag) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&rest[open..=open + close]),
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
}

fn convert_tag(tag: &str) -> Option<String> {
    let simple = match tag {
        "code" | "/code" => "`",
        "b" | "/b" => "**",
        "i" | "/i" => "*",
        "u" | "/u" => "__",
        _ => "",
    };
    if !simple.is_empty() {
        return Some(simple.to_string());
    }

    if let Some((kind, target)) = tag.split_once(' ') {
        return match kind {
            "method" | "member" | "signal" | "constant" | "enum" => Some(format!("`{}`", target)),
            _ => None,
        };
    }

    let is_class_ref = tag.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_class_ref.then(|| format!("`{}`", tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::docs::{ArgumentDoc, ConstantDoc, PropertyDoc};

    fn class(name: &str, inherits: Option<&str>) -> ClassDoc {
        ClassDoc {
            name: name.to_string(),
            inherits: inherits.map(str::to_string),
            ..ClassDoc::default()
        }
    }

    fn method(name: &str) -> MethodDoc {
        MethodDoc {
            name: name.to_string(),
            ..MethodDoc::default()
        }
    }

    fn chain() -> NativeCatalog {
        let mut a = class("A", Some("B"));
        a.methods.push(method("a_only"));
        let b = class("B", Some("C"));
        let mut c = class("C", None);
        c.methods.push(method("m"));
        NativeCatalog::build(&ApiDocs {
            classes: vec![a, b, c],
        })
    }

    #[test]
    fn test_member_found_on_ancestor() {
        let catalog = chain();
        let symbol = catalog.get_native_symbol("A", "m").unwrap();
        assert_eq!(symbol.name, "m");
        assert_eq!(symbol.native_class.as_deref(), Some("C"));
    }

    #[test]
    fn test_missing_member() {
        let catalog = chain();
        assert!(catalog.get_native_symbol("A", "missing").is_none());
        assert!(catalog.get_native_symbol("C", "a_only").is_none());
        assert!(catalog.get_native_symbol("Unknown", "").is_none());
    }

    #[test]
    fn test_empty_member_returns_class() {
        let catalog = chain();
        let symbol = catalog.get_native_symbol("A", "").unwrap();
        assert_eq!(symbol.name, "A");
        assert_eq!(symbol.kind, SymbolKind::Class);
        assert_eq!(symbol.detail, "<Native> class A extends B");
    }

    #[test]
    fn test_inheritance_cycle_terminates() {
        let catalog = NativeCatalog::build(&ApiDocs {
            classes: vec![class("X", Some("Y")), class("Y", Some("X"))],
        });
        assert!(catalog.get_native_symbol("X", "nothing").is_none());
        assert_eq!(catalog.ancestors("X").count(), 2);
    }

    #[test]
    fn test_member_details() {
        let mut node = class("Node", Some("Object"));
        node.constants.push(ConstantDoc {
            name: "PAUSE_MODE_STOP".into(),
            value: "1".into(),
            enumeration: Some("PauseMode".into()),
            description: String::new(),
        });
        node.members.push(PropertyDoc {
            name: "name".into(),
            type_name: "String".into(),
            ..PropertyDoc::default()
        });
        node.theme_items.push(PropertyDoc {
            name: "font".into(),
            type_name: "Font".into(),
            ..PropertyDoc::default()
        });
        node.methods.push(MethodDoc {
            name: "rpc".into(),
            return_type: Some("Variant".into()),
            arguments: vec![ArgumentDoc {
                name: "method".into(),
                type_name: "String".into(),
                default_value: None,
            }],
            qualifiers: "vararg".into(),
            description: String::new(),
        });
        node.signals.push(MethodDoc {
            name: "ready".into(),
            ..MethodDoc::default()
        });

        let catalog = NativeCatalog::build(&ApiDocs { classes: vec![node] });
        let details: Vec<_> = catalog
            .class("Node")
            .unwrap()
            .symbol
            .children
            .iter()
            .map(|c| (c.kind, c.detail.as_str()))
            .collect();
        assert_eq!(
            details,
            vec![
                (SymbolKind::Constant, "const PauseMode.PAUSE_MODE_STOP = 1"),
                (SymbolKind::Property, "var name: String"),
                (SymbolKind::Property, "<Theme> var font: Font"),
                (SymbolKind::Method, "rpc(method: String, ...) -> Variant"),
                (SymbolKind::Event, "ready()"),
            ]
        );

        let rpc = catalog.get_native_symbol("Node", "rpc").unwrap();
        assert_eq!(rpc.children.len(), 1);
        assert_eq!(rpc.children[0].name, "method");
        assert_eq!(rpc.children[0].kind, SymbolKind::Variable);
        assert_eq!(rpc.children[0].detail, "String");
    }

    #[test]
    fn test_flat_entries_are_qualified() {
        let catalog = chain();
        let names: Vec<_> = catalog.flat_entries().into_iter().map(|e| e.qualified_name).collect();
        assert_eq!(names, vec!["A.a_only", "C.m"]);
    }

    #[test]
    fn test_bbcode_inline_tags() {
        assert_eq!(
            bbcode_to_markdown("Call [code]foo()[/code] on a [b]bold[/b] [i]it[/i] [u]u[/u]."),
            "Call `foo()` on a **bold** *it* __u__."
        );
        assert_eq!(
            bbcode_to_markdown("See [method add_child] and [Node2D]."),
            "See `add_child` and `Node2D`."
        );
        assert_eq!(bbcode_to_markdown("keep [url=x]link[/url]"), "keep [url=x]link[/url]");
    }

    #[test]
    fn test_bbcode_code_block() {
        let text = "Example:\n\t\t[codeblock]\n\t\tvar a = 1\n\t\tif a:\n\t\t\tpass\n\t\t[/codeblock]\n\t\tDone.";
        assert_eq!(
            bbcode_to_markdown(text),
            "Example:\n\n    var a = 1\n    if a:\n    \tpass\n\nDone."
        );
    }
}
