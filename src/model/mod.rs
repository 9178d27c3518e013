//! The attributed node tree shared by every stage of the pipeline.

pub mod arena;
pub mod kind;
pub mod platform;
#[cfg(test)]
pub(crate) mod sample;

pub use arena::{Arena, Node, NodeId};
pub use kind::Kind;
pub use platform::{Platform, Platforms};

use std::collections::BTreeMap;
use std::fmt::Write;

/// One namespace at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    /// Logical name, equal to the namespace name.
    pub name: String,
    pub version: String,
    /// Prefix for links into the online API documentation.
    pub doc_url: Option<String>,
    /// Whether bindings are produced for this repository.
    pub generate: bool,
    /// File the repository was read from (of the highest-priority variant
    /// after merge).
    pub source: String,
    /// The `repository` node; owns exactly one `namespace` node.
    pub root: NodeId,
}

impl Repository {
    pub fn namespace(&self, arena: &Arena) -> Option<NodeId> {
        arena.child_of_kind(self.root, Kind::Namespace)
    }

    /// Name used for rule files and diagnostics: `Gtk-4.0`.
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// All repositories of one run, keyed by namespace name.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// The platform the documents came from; `None` once merged.
    pub platform: Option<Platform>,
    pub arena: Arena,
    pub repositories: BTreeMap<String, Repository>,
}

impl Module {
    pub fn new(platform: Option<Platform>) -> Self {
        Module {
            platform,
            arena: Arena::new(),
            repositories: BTreeMap::new(),
        }
    }

    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    /// The namespace node of the named repository.
    pub fn namespace(&self, name: &str) -> Option<NodeId> {
        self.repositories.get(name)?.namespace(&self.arena)
    }

    /// Structural equality: same repositories with equal metadata and equal
    /// trees, regardless of how the arenas are laid out.
    pub fn same_as(&self, other: &Module) -> bool {
        self.platform == other.platform
            && self.repositories.len() == other.repositories.len()
            && self
                .repositories
                .iter()
                .zip(&other.repositories)
                .all(|((na, a), (nb, b))| {
                    na == nb
                        && a.name == b.name
                        && a.version == b.version
                        && a.doc_url == b.doc_url
                        && a.generate == b.generate
                        && self.arena.same_tree(a.root, &other.arena, b.root)
                })
    }

    /// Canonical text dump of the whole module.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for repo in self.repositories.values() {
            let _ = writeln!(
                out,
                "# {}{}",
                repo.qualified_name(),
                if repo.generate { "" } else { " (no generate)" }
            );
            write_tree(&self.arena, repo.root, 0, &mut out, &|_| None);
        }
        out
    }
}

/// Append an indented rendering of a subtree. `annotate` may add a suffix to
/// any node's line.
pub fn write_tree(
    arena: &Arena,
    id: NodeId,
    depth: usize,
    out: &mut String,
    annotate: &dyn Fn(NodeId) -> Option<String>,
) {
    let node = arena.get(id);
    let _ = write!(out, "{}{}", "  ".repeat(depth), node.kind.tag());
    for (key, value) in &node.attrs {
        let _ = write!(out, " {}=\"{}\"", key, value);
    }
    if !node.platforms.is_empty() {
        let _ = write!(out, " [{}]", node.platforms);
    }
    if let Some(note) = annotate(id) {
        let _ = write!(out, " {}", note);
    }
    out.push('\n');
    if let Some(ref text) = node.text {
        for line in text.lines() {
            let _ = writeln!(out, "{}| {}", "  ".repeat(depth + 1), line);
        }
    }
    for child in &node.children {
        write_tree(arena, *child, depth + 1, out, annotate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with_class(class: &str) -> Module {
        let mut module = Module::new(Some(Platform::Linux));
        let arena = &mut module.arena;
        let cls = arena.alloc(Node::new(Kind::Class).with_attr("name", class));
        let ns = arena.alloc(
            Node::new(Kind::Namespace)
                .with_attr("name", "Test")
                .with_children(vec![cls]),
        );
        let root = arena.alloc(Node::new(Kind::Repository).with_children(vec![ns]));
        module.repositories.insert(
            "Test".into(),
            Repository {
                name: "Test".into(),
                version: "1.0".into(),
                doc_url: None,
                generate: true,
                source: "Test-1.0.json".into(),
                root,
            },
        );
        module
    }

    #[test]
    fn same_as_ignores_arena_layout() {
        let a = module_with_class("Foo");
        let mut b = Module::new(Some(Platform::Linux));
        b.arena.alloc(Node::new(Kind::Doc));
        let root = b.arena.import(&a.arena, a.repositories["Test"].root);
        let mut repo = a.repositories["Test"].clone();
        repo.root = root;
        b.repositories.insert("Test".into(), repo);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&module_with_class("Bar")));
    }

    #[test]
    fn dump_lists_attributes() {
        let module = module_with_class("Foo");
        let dump = module.dump();
        assert!(dump.starts_with("# Test-1.0\n"));
        assert!(dump.contains("    class name=\"Foo\"\n"));
        assert_eq!(module.namespace("Test").map(|ns| module.arena.kind(ns)), Some(Kind::Namespace));
    }
}
