//! Cross-reference linking.
//!
//! Type references (`type`, `implements`, `prerequisite`) are resolved by
//! name against a [`SymbolIndex`] built from the module being linked:
//!
//! 1. fundamental names (`gint`, `utf8`, `gpointer`, ...) are external;
//! 2. `Namespace.Type` is looked up in that namespace;
//! 3. an undotted name is looked up in the reference's own namespace;
//! 4. the native spelling (`c:type` without `const` and `*`) is looked up
//!    in the native-identifier index, which spans every loaded namespace;
//! 5. anything else is unresolved.
//!
//! Resolution works by name and is memoized, so namespaces that refer to
//! each other need no particular load order. Unresolved references are
//! marked in the tree (`unresolved="1"` on the reference, the list of
//! missing names on the owning member) and reported as warnings for
//! repositories that are generated. Stale marks from an earlier run are
//! cleared, so linking may be repeated after patches.

use crate::diagnostics::Diagnostics;
use crate::model::{Arena, Kind, Module, NodeId, Repository};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::sync::LazyLock;

static RE_C_QUALIFIERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(const|volatile)\b|\*").unwrap());

/// Type names that never refer to a declaration.
const FUNDAMENTAL: &[&str] = &[
    "none",
    "gboolean",
    "gchar",
    "guchar",
    "gshort",
    "gushort",
    "gint",
    "guint",
    "glong",
    "gulong",
    "gint8",
    "guint8",
    "gint16",
    "guint16",
    "gint32",
    "guint32",
    "gint64",
    "guint64",
    "gfloat",
    "gdouble",
    "long double",
    "gsize",
    "gssize",
    "goffset",
    "gintptr",
    "guintptr",
    "gpointer",
    "gconstpointer",
    "gunichar",
    "gunichar2",
    "GType",
    "utf8",
    "filename",
    "va_list",
    "int",
    "char",
    "double",
    "float",
    "void",
    "time_t",
    "off_t",
    "pid_t",
    "uid_t",
    "dev_t",
    "socklen_t",
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub namespace: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: &str, name: &str) -> Self {
        QualifiedName {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

// -- Symbol index ------------------------------------------------------------

/// Lookup tables for one module. Built from scratch for every link.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    types: HashMap<QualifiedName, NodeId>,
    native: HashMap<String, QualifiedName>,
    includes: HashMap<String, Vec<String>>,
}

impl SymbolIndex {
    pub fn build(module: &Module) -> Self {
        let mut index = SymbolIndex::default();
        let arena = &module.arena;
        for repo in module.repositories.values() {
            let includes = arena
                .children_of_kind(repo.root, Kind::Include)
                .filter_map(|i| arena.attr(i, "name"))
                .map(str::to_string)
                .collect();
            index.includes.insert(repo.name.clone(), includes);

            let Some(ns) = repo.namespace(arena) else {
                continue;
            };
            for &child in arena.children(ns) {
                index.register(arena, &repo.name, child, None);
            }
        }
        index
    }

    fn register(&mut self, arena: &Arena, namespace: &str, id: NodeId, owner: Option<&str>) {
        let kind = arena.kind(id);
        let Some(name) = arena.name(id) else {
            return;
        };
        let path = match owner {
            Some(owner) => format!("{}.{}", owner, name),
            None => name.to_string(),
        };
        let qualified = QualifiedName::new(namespace, &path);

        if owner.is_none() && kind.is_registered_type() {
            self.types.entry(qualified.clone()).or_insert(id);
            for key in ["c:type", "glib:type-name"] {
                if let Some(native) = arena.attr(id, key) {
                    self.native
                        .entry(native.to_string())
                        .or_insert_with(|| qualified.clone());
                }
            }
            for &member in arena.children(id) {
                self.register(arena, namespace, member, Some(&path));
            }
        } else if kind.is_callable() || kind == Kind::Member || kind == Kind::Constant {
            if let Some(ident) = arena.attr(id, "c:identifier") {
                self.native
                    .entry(ident.to_string())
                    .or_insert_with(|| qualified.clone());
            }
        }
    }

    /// A registered type by namespace and name.
    pub fn lookup_qualified(&self, name: &QualifiedName) -> Option<NodeId> {
        self.types.get(name).copied()
    }

    /// A registered type by (possibly dotted) name, as seen from `namespace`.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<NodeId> {
        let (ns, local) = name.split_once('.').unwrap_or((namespace, name));
        self.lookup_qualified(&QualifiedName::new(ns, local))
    }

    /// Declaration owning a native identifier or native type name.
    pub fn lookup_native(&self, native: &str) -> Option<&QualifiedName> {
        self.native.get(native)
    }

    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.includes.contains_key(namespace)
    }

    /// The namespace itself and everything it includes, transitively.
    pub fn include_closure(&self, namespace: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([namespace.to_string()]);
        while let Some(ns) = queue.pop_front() {
            if !visited.insert(ns.clone()) {
                continue;
            }
            for include in self.includes.get(&ns).into_iter().flatten() {
                if visited.contains(include) {
                    if include == namespace {
                        tracing::debug!(namespace, via = %ns, "include cycle");
                    }
                } else {
                    queue.push_back(include.clone());
                }
            }
        }
        visited
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// -- Resolution --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameResolution {
    Found(QualifiedName),
    External,
    Missing,
}

/// Name-level resolution, memoized per (namespace, name, c:type).
#[derive(Default)]
struct Resolver {
    memo: HashMap<(String, Option<String>, Option<String>), NameResolution>,
}

impl Resolver {
    fn resolve(
        &mut self,
        index: &SymbolIndex,
        namespace: &str,
        name: Option<&str>,
        c_type: Option<&str>,
    ) -> NameResolution {
        let key = (
            namespace.to_string(),
            name.map(str::to_string),
            c_type.map(str::to_string),
        );
        if let Some(hit) = self.memo.get(&key) {
            return hit.clone();
        }
        let result = resolve_uncached(index, namespace, name, c_type);
        self.memo.insert(key, result.clone());
        result
    }
}

fn resolve_uncached(
    index: &SymbolIndex,
    namespace: &str,
    name: Option<&str>,
    c_type: Option<&str>,
) -> NameResolution {
    if let Some(name) = name {
        if FUNDAMENTAL.contains(&name) {
            return NameResolution::External;
        }
        let (ns, local) = name.split_once('.').unwrap_or((namespace, name));
        let qualified = QualifiedName::new(ns, local);
        if index.lookup_qualified(&qualified).is_some() {
            return NameResolution::Found(qualified);
        }
    }
    if let Some(c_type) = c_type {
        let bare = RE_C_QUALIFIERS.replace_all(c_type, "");
        let bare = bare.trim();
        if let Some(qualified) = index.lookup_native(bare) {
            if index.lookup_qualified(qualified).is_some() {
                return NameResolution::Found(qualified.clone());
            }
        }
        if name.is_none() {
            // Anonymous native spelling, passed through as is.
            return NameResolution::External;
        }
    }
    match name {
        Some(_) => NameResolution::Missing,
        None => NameResolution::External,
    }
}

/// Where a type reference points.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Target),
    External,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: QualifiedName,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Dotted path of the reference, e.g. `Gtk.Button.new_with_label.return-value.type`.
    pub location: String,
    pub resolution: Resolution,
}

/// Resolution of every type reference of a linked module, keyed by the
/// reference node.
#[derive(Debug, Clone, Default)]
pub struct Links {
    entries: BTreeMap<NodeId, Link>,
}

impl Links {
    pub fn get(&self, id: NodeId) -> Option<&Resolution> {
        self.entries.get(&id).map(|l| &l.resolution)
    }

    pub fn link(&self, id: NodeId) -> Option<&Link> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Link)> {
        self.entries.iter().map(|(id, l)| (*id, l))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Link> {
        self.entries
            .values()
            .filter(|l| l.resolution == Resolution::Unresolved)
    }

    /// (location, target) pairs of all resolved references. Independent of
    /// node numbering, so it can be compared across runs.
    pub fn resolved_set(&self) -> BTreeSet<(String, String)> {
        self.entries
            .values()
            .filter_map(|l| match &l.resolution {
                Resolution::Resolved(t) => Some((l.location.clone(), t.name.to_string())),
                _ => None,
            })
            .collect()
    }
}

// -- Linking -----------------------------------------------------------------

/// Output of [`link`].
#[derive(Debug, Clone)]
pub struct Linked {
    pub module: Module,
    pub index: SymbolIndex,
    pub links: Links,
    pub diagnostics: Diagnostics,
}

pub fn link(mut module: Module) -> Linked {
    let mut diagnostics = Diagnostics::new();
    let mut resolver = Resolver::default();

    let initial = SymbolIndex::build(&module);
    let names: Vec<String> = module.repositories.keys().cloned().collect();
    for name in &names {
        let Some(root) = module.repositories.get(name).map(|r| r.root) else {
            continue;
        };
        let new_root = mark(&mut module.arena, root, name, &initial, &mut resolver);
        if let Some(repo) = module.repositories.get_mut(name) {
            repo.root = new_root;
        }
    }

    // Marking allocated new nodes, so index the final trees.
    let index = SymbolIndex::build(&module);
    let mut links = Links::default();
    for repo in module.repositories.values() {
        collect(
            &module.arena,
            repo,
            &index,
            &mut resolver,
            &mut links,
            &mut diagnostics,
        );
        check_alias_cycles(&module.arena, repo, &index, &mut resolver, &mut diagnostics);
    }

    tracing::info!(
        repositories = module.repositories.len(),
        types = index.len(),
        references = links.len(),
        unresolved = links.unresolved().count(),
        "linked module"
    );
    Linked {
        module,
        index,
        links,
        diagnostics,
    }
}

fn mark(
    arena: &mut Arena,
    root: NodeId,
    namespace: &str,
    index: &SymbolIndex,
    resolver: &mut Resolver,
) -> NodeId {
    let result: Result<NodeId, Infallible> = arena.rewrite(root, &mut |arena, _, id| {
        let kind = arena.kind(id);
        let mut id = id;
        if kind == Kind::Type {
            let res = resolver.resolve(
                index,
                namespace,
                arena.attr(id, "name"),
                arena.attr(id, "c:type"),
            );
            id = match res {
                NameResolution::Missing => arena.set_attr(id, "unresolved", "1"),
                _ => arena.remove_attr(id, "unresolved"),
            };
        }
        if kind.is_member() {
            let missing = missing_names(arena, id, namespace, index, resolver);
            id = if missing.is_empty() {
                arena.remove_attr(id, "unresolved")
            } else {
                arena.set_attr(id, "unresolved", &missing.join(","))
            };
        }
        Ok(id)
    });
    match result {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

/// Names of the unresolved references owned by a member, not counting
/// those inside nested members.
fn missing_names(
    arena: &Arena,
    member: NodeId,
    namespace: &str,
    index: &SymbolIndex,
    resolver: &mut Resolver,
) -> Vec<String> {
    let mut out = Vec::new();
    let kind = arena.kind(member);
    if kind.is_type_reference() {
        let res = resolver.resolve(index, namespace, arena.attr(member, "name"), None);
        if res == NameResolution::Missing {
            out.extend(arena.attr(member, "name").map(str::to_string));
        }
        return out;
    }
    let mut stack: Vec<NodeId> = arena.children(member).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let kind = arena.kind(id);
        if kind.is_member() {
            continue;
        }
        if kind == Kind::Type && arena.attr(id, "unresolved").is_some() {
            let name = arena
                .attr(id, "name")
                .or_else(|| arena.attr(id, "c:type"))
                .unwrap_or("?")
                .to_string();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        stack.extend(arena.children(id).iter().rev().copied());
    }
    out
}

fn collect(
    arena: &Arena,
    repo: &Repository,
    index: &SymbolIndex,
    resolver: &mut Resolver,
    links: &mut Links,
    diagnostics: &mut Diagnostics,
) {
    let Some(ns) = repo.namespace(arena) else {
        return;
    };
    let closure = index.include_closure(&repo.name);
    let mut path = vec![repo.name.clone()];
    let mut walk = Walk {
        arena,
        repo,
        index,
        resolver,
        closure: &closure,
        links,
        diagnostics,
    };
    for &child in arena.children(ns) {
        walk.visit(child, &mut path);
    }
}

struct Walk<'a> {
    arena: &'a Arena,
    repo: &'a Repository,
    index: &'a SymbolIndex,
    resolver: &'a mut Resolver,
    closure: &'a BTreeSet<String>,
    links: &'a mut Links,
    diagnostics: &'a mut Diagnostics,
}

impl Walk<'_> {
    fn visit(&mut self, id: NodeId, path: &mut Vec<String>) {
        let kind = self.arena.kind(id);
        let segment = match self.arena.name(id) {
            Some(name) if !kind.is_type_reference() => name,
            _ => kind.tag(),
        };
        path.push(segment.to_string());
        if kind.is_type_reference() {
            let location = path.join(".");
            let resolution = self.resolve(id, &location);
            self.links.entries.insert(
                id,
                Link {
                    location,
                    resolution,
                },
            );
        }
        for &child in self.arena.children(id) {
            self.visit(child, path);
        }
        path.pop();
    }

    fn resolve(&mut self, id: NodeId, location: &str) -> Resolution {
        let name = self.arena.attr(id, "name");
        let c_type = match self.arena.kind(id) {
            Kind::Type => self.arena.attr(id, "c:type"),
            _ => None,
        };
        match self.resolver.resolve(self.index, &self.repo.name, name, c_type) {
            NameResolution::External => Resolution::External,
            NameResolution::Missing => {
                let name = name.unwrap_or("?");
                let message = format!("cannot resolve type {} at {}", name, location);
                if self.repo.generate {
                    self.diagnostics.warning(&self.repo.source, None, message);
                } else {
                    tracing::debug!(repository = %self.repo.name, "{}", message);
                }
                Resolution::Unresolved
            }
            NameResolution::Found(target) => {
                if self.repo.generate
                    && !self.closure.contains(&target.namespace)
                    && self.index.contains_namespace(&target.namespace)
                {
                    self.diagnostics.warning(
                        &self.repo.source,
                        None,
                        format!(
                            "{} refers to {} but {} does not include {}",
                            location, target, self.repo.name, target.namespace
                        ),
                    );
                }
                match self.index.lookup_qualified(&target) {
                    Some(node) => Resolution::Resolved(Target { name: target, node }),
                    None => Resolution::Unresolved,
                }
            }
        }
    }
}

fn check_alias_cycles(
    arena: &Arena,
    repo: &Repository,
    index: &SymbolIndex,
    resolver: &mut Resolver,
    diagnostics: &mut Diagnostics,
) {
    let Some(ns) = repo.namespace(arena) else {
        return;
    };
    let mut reported: BTreeSet<BTreeSet<QualifiedName>> = BTreeSet::new();
    for alias in arena.children_of_kind(ns, Kind::Alias) {
        let Some(name) = arena.attr(alias, "name") else {
            continue;
        };
        let start = QualifiedName::new(&repo.name, name);
        if let Err(cycle) = follow_alias(arena, index, resolver, start) {
            let members: BTreeSet<QualifiedName> = cycle.iter().cloned().collect();
            if reported.insert(members) {
                let chain: Vec<String> = cycle.iter().map(ToString::to_string).collect();
                diagnostics.warning(
                    &repo.source,
                    None,
                    format!("alias cycle: {}", chain.join(" -> ")),
                );
            }
        }
    }
}

/// Follow an alias chain to its first non-alias target. Returns the chain
/// (ending with the repeated name) when it loops.
fn follow_alias(
    arena: &Arena,
    index: &SymbolIndex,
    resolver: &mut Resolver,
    start: QualifiedName,
) -> Result<QualifiedName, Vec<QualifiedName>> {
    let mut chain = vec![start.clone()];
    let mut current = start;
    loop {
        let Some(node) = index.lookup_qualified(&current) else {
            return Ok(current);
        };
        if arena.kind(node) != Kind::Alias {
            return Ok(current);
        }
        let Some(target) = arena.child_of_kind(node, Kind::Type) else {
            return Ok(current);
        };
        let res = resolver.resolve(
            index,
            &current.namespace,
            arena.attr(target, "name"),
            arena.attr(target, "c:type"),
        );
        let NameResolution::Found(next) = res else {
            return Ok(current);
        };
        if let Some(pos) = chain.iter().position(|q| *q == next) {
            let mut cycle = chain.split_off(pos);
            cycle.push(next);
            return Err(cycle);
        }
        chain.push(next.clone());
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::ModuleBuilder;
    use crate::model::Node;

    /// GLib and GObject referring to each other.
    fn mutual() -> Module {
        let mut b = ModuleBuilder::linux();
        let t = b.ty("GObject.Object", "GObject*");
        let m = b.method("get_owner", t);
        let variant = b.node(Kind::Record, &[("name", "Variant"), ("c:type", "GVariant")], vec![m]);
        b.repo("GLib", &["GObject"], vec![variant]);

        let t = b.ty("GLib.Variant", "GVariant*");
        let m = b.method("get_data", t);
        let object = b.node(Kind::Class, &[("name", "Object"), ("c:type", "GObject")], vec![m]);
        b.repo("GObject", &["GLib"], vec![object]);
        b.finish()
    }

    #[test]
    fn resolves_mutual_references() {
        let linked = link(mutual());
        assert!(linked.diagnostics.is_empty(), "{:?}", linked.diagnostics);
        let set = linked.links.resolved_set();
        assert!(set.contains(&(
            "GLib.Variant.get_owner.return-value.type".to_string(),
            "GObject.Object".to_string()
        )));
        assert!(set.contains(&(
            "GObject.Object.get_data.return-value.type".to_string(),
            "GLib.Variant".to_string()
        )));
    }

    #[test]
    fn resolved_target_is_node_in_final_tree() {
        let linked = link(mutual());
        let (_, link) = linked
            .links
            .iter()
            .find(|(_, l)| l.location.starts_with("GLib."))
            .unwrap();
        let Resolution::Resolved(target) = &link.resolution else {
            panic!("expected resolution");
        };
        assert_eq!(linked.module.arena.name(target.node), Some("Object"));
        assert_eq!(
            linked.index.lookup("GLib", "GObject.Object"),
            Some(target.node)
        );
    }

    #[test]
    fn native_spelling_fallback() {
        let mut b = ModuleBuilder::linux();
        let widget = b.node(Kind::Class, &[("name", "Widget"), ("c:type", "GtkWidget")], vec![]);
        b.repo("Gtk", &[], vec![widget]);
        // Undotted name from another namespace: only the c:type finds it.
        let t = b.ty("Widget", "const GtkWidget*");
        let f = b.node(Kind::Function, &[("name", "wrap")], vec![t]);
        b.repo("Adw", &["Gtk"], vec![f]);

        let linked = link(b.finish());
        assert!(linked
            .links
            .resolved_set()
            .contains(&("Adw.wrap.type".to_string(), "Gtk.Widget".to_string())));
    }

    #[test]
    fn fundamental_types_are_external() {
        let mut b = ModuleBuilder::linux();
        let t = b.ty("utf8", "const gchar*");
        let f = b.node(Kind::Function, &[("name", "f")], vec![t]);
        b.repo("GLib", &[], vec![f]);
        let linked = link(b.finish());
        let (_, l) = linked.links.iter().next().unwrap();
        assert_eq!(l.resolution, Resolution::External);
        assert!(linked.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_marks_reference_and_member() {
        let mut b = ModuleBuilder::linux();
        let t = b.ty("Missing", "GMissing*");
        let m = b.method("broken", t);
        let ok_t = b.ty("gint", "gint");
        let ok = b.method("fine", ok_t);
        let cls = b.node(Kind::Class, &[("name", "Thing")], vec![m, ok]);
        b.repo("Test", &[], vec![cls]);

        let linked = link(b.finish());
        let arena = &linked.module.arena;
        let ns = linked.module.namespace("Test").unwrap();
        let cls = arena.children(ns)[0];
        let broken = arena.children(cls)[0];
        let fine = arena.children(cls)[1];
        assert_eq!(arena.attr(broken, "unresolved"), Some("Missing"));
        assert_eq!(arena.attr(fine, "unresolved"), None);
        let ty = arena.node_at(broken, &[0, 0]).unwrap();
        assert_eq!(arena.attr(ty, "unresolved"), Some("1"));

        let messages: Vec<String> = linked.diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec!["Test-1.0.json: cannot resolve type Missing at Test.Thing.broken.return-value.type"]
        );
    }

    #[test]
    fn relinking_clears_stale_marks() {
        let mut b = ModuleBuilder::linux();
        let t = b.ty("Later", "TLater*");
        let f = b.node(Kind::Function, &[("name", "f")], vec![t]);
        b.repo("Test", &[], vec![f]);
        let mut module = link(b.finish()).module;

        // A declaration for the missing type shows up, e.g. added by a patch.
        let ns = module.namespace("Test").unwrap();
        let later = module.arena.alloc(Node::new(Kind::Record).with_attr("name", "Later"));
        let mut children = module.arena.children(ns).to_vec();
        children.push(later);
        let root = module.repositories["Test"].root;
        let root = module
            .arena
            .replace_at(root, &[0], |a, ns| a.with_children(ns, children))
            .unwrap();
        module.repositories.get_mut("Test").unwrap().root = root;

        let linked = link(module);
        assert_eq!(linked.links.unresolved().count(), 0);
        let f = linked.module.arena.children(linked.module.namespace("Test").unwrap())[0];
        assert_eq!(linked.module.arena.attr(f, "unresolved"), None);
    }

    #[test]
    fn warnings_only_for_generated_repositories() {
        let mut b = ModuleBuilder::linux();
        let t = b.ty("Missing", "");
        let f = b.node(Kind::Function, &[("name", "f")], vec![t]);
        b.repo("Quiet", &[], vec![f]);
        b.module.repositories.get_mut("Quiet").unwrap().generate = false;
        let linked = link(b.finish());
        assert!(linked.diagnostics.is_empty());
        assert_eq!(linked.links.unresolved().count(), 1);
    }

    #[test]
    fn reference_outside_include_closure_warns() {
        let mut b = ModuleBuilder::linux();
        let obj = b.node(Kind::Class, &[("name", "Object")], vec![]);
        b.repo("GObject", &[], vec![obj]);
        let t = b.ty("GObject.Object", "GObject*");
        let f = b.node(Kind::Function, &[("name", "f")], vec![t]);
        b.repo("Gtk", &[], vec![f]);
        let linked = link(b.finish());
        let messages: Vec<String> = linked.diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec!["Gtk-1.0.json: Gtk.f.type refers to GObject.Object but Gtk does not include GObject"]
        );
    }

    #[test]
    fn include_cycles_terminate() {
        let linked = link(mutual());
        let closure = linked.index.include_closure("GLib");
        assert_eq!(closure, BTreeSet::from(["GLib".to_string(), "GObject".to_string()]));
    }

    #[test]
    fn alias_cycle_is_reported_once() {
        let mut b = ModuleBuilder::linux();
        let ta = b.ty("B", "");
        let a = b.node(Kind::Alias, &[("name", "A")], vec![ta]);
        let tb = b.ty("A", "");
        let bb = b.node(Kind::Alias, &[("name", "B")], vec![tb]);
        b.repo("Test", &[], vec![a, bb]);
        let linked = link(b.finish());
        let messages: Vec<String> = linked.diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["Test-1.0.json: alias cycle: Test.A -> Test.B -> Test.A"]);
    }

    #[test]
    fn native_index_covers_callables() {
        let mut b = ModuleBuilder::linux();
        let rv = b.ty("none", "void");
        let m = b.node(
            Kind::Method,
            &[("name", "show"), ("c:identifier", "gtk_widget_show")],
            vec![rv],
        );
        let widget = b.node(
            Kind::Class,
            &[("name", "Widget"), ("c:type", "GtkWidget"), ("glib:type-name", "GtkWidget")],
            vec![m],
        );
        b.repo("Gtk", &[], vec![widget]);
        let index = SymbolIndex::build(&b.finish());
        assert_eq!(
            index.lookup_native("gtk_widget_show").map(ToString::to_string),
            Some("Gtk.Widget.show".to_string())
        );
        assert_eq!(
            index.lookup_native("GtkWidget").map(ToString::to_string),
            Some("Gtk.Widget".to_string())
        );
    }
}
