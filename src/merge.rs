//! Platform merge: combine the per-platform modules into one.
//!
//! Containers (repository, namespace, classes, records, enumerations, ...)
//! are merged child by child. Registered types are matched by name alone, so
//! a name declared as a record on one platform and as an alias on another is
//! one element and the higher-priority kind wins. Other children are matched
//! by kind and name; unnamed children and repeated names are matched by their
//! position among siblings of the same kind and name. The resulting child
//! order starts from the
//! highest-priority variant, and children that only exist elsewhere are
//! placed after the nearest sibling they followed in their own variant.
//!
//! Everything else is atomic: the highest-priority variant is kept as is and
//! its platform set is the union of the variants whose shape (signature,
//! type, value) agrees with it. Divergent variants are dropped.
//!
//! `glong` and `gulong` are 32 bits wide on Windows. Where an element
//! available there uses them for a value (return value, parameter, property
//! or alias target), the merged element uses `gint`/`guint` instead.

use crate::error::MergeError;
use crate::model::{Arena, Kind, Module, NodeId, Platform, Platforms, Repository};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Platform priority for structural conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    priority: Vec<Platform>,
}

impl MergePolicy {
    pub fn new(priority: Vec<Platform>) -> Result<Self, MergeError> {
        let distinct: BTreeSet<Platform> = priority.iter().copied().collect();
        if priority.len() != Platform::ALL.len() || distinct.len() != priority.len() {
            let names: Vec<&str> = priority.iter().map(|p| p.name()).collect();
            return Err(MergeError::InvalidPolicy(format!(
                "{} (every platform must be listed exactly once)",
                names.join(",")
            )));
        }
        Ok(MergePolicy { priority })
    }

    pub fn priority(&self) -> &[Platform] {
        &self.priority
    }

    /// Position of a platform in the priority order; lower wins.
    pub fn rank(&self, platform: Platform) -> usize {
        self.priority
            .iter()
            .position(|p| *p == platform)
            .unwrap_or(self.priority.len())
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy {
            priority: vec![Platform::Linux, Platform::Windows, Platform::Macos],
        }
    }
}

impl FromStr for MergePolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let priority = s
            .split(',')
            .map(|p| p.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(MergeError::InvalidPolicy)?;
        MergePolicy::new(priority)
    }
}

/// Repositories that are missing on some of the merged platforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub missing: BTreeMap<String, Platforms>,
}

impl MergeReport {
    pub fn missing_on(&self, repository: &str) -> Platforms {
        self.missing.get(repository).copied().unwrap_or_default()
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (repo, platforms) in &self.missing {
            writeln!(f, "{} missing on {}", repo, platforms)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Merged {
    pub module: Module,
    pub report: MergeReport,
}

/// One input's view of an element.
#[derive(Clone, Copy)]
struct Variant<'a> {
    arena: &'a Arena,
    id: NodeId,
    platform: Option<Platform>,
}

impl Variant<'_> {
    /// Platforms this variant speaks for.
    fn contribution(&self) -> Platforms {
        let own = self.arena.platforms(self.id);
        match (own.is_empty(), self.platform) {
            (false, _) => own,
            (true, Some(p)) => Platforms::single(p),
            (true, None) => Platforms::empty(),
        }
    }
}

pub fn merge(inputs: Vec<Module>, policy: &MergePolicy) -> Result<Merged, MergeError> {
    let mut seen = BTreeSet::new();
    for module in &inputs {
        if let Some(p) = module.platform {
            if !seen.insert(p) {
                return Err(MergeError::DuplicatePlatform(p));
            }
        }
    }

    let mut inputs = inputs;
    // Already merged modules first, then by priority.
    inputs.sort_by_key(|m| m.platform.map_or(0, |p| 1 + policy.rank(p)));

    let names: BTreeSet<&String> = inputs.iter().flat_map(|m| m.repositories.keys()).collect();
    let mut out = Module::new(None);
    let mut report = MergeReport::default();
    let supplied: Platforms = inputs.iter().fold(Platforms::empty(), |acc, m| {
        acc.union(module_platforms(m))
    });

    for name in names {
        let present: Vec<(&Module, &Repository)> = inputs
            .iter()
            .filter_map(|m| m.repositories.get(name).map(|r| (m, r)))
            .collect();
        let variants: Vec<Variant> = present
            .iter()
            .map(|(m, r)| Variant {
                arena: &m.arena,
                id: r.root,
                platform: m.platform,
            })
            .collect();

        let mut merger = Merger {
            out: &mut out.arena,
            repository: name,
        };
        let root = merger.merge(&variants)?;
        let root = narrow_windows_longs(&mut out.arena, root);

        let available = out.arena.platforms(root);
        let missing = Platforms::from_iter(supplied.iter().filter(|p| !available.contains(*p)));
        if !missing.is_empty() {
            tracing::debug!(repository = %name, %missing, "repository missing on platforms");
            report.missing.insert(name.clone(), missing);
        }

        let (_, base) = present[0];
        out.repositories.insert(
            name.clone(),
            Repository {
                root,
                ..base.clone()
            },
        );
    }

    tracing::info!(
        inputs = inputs.len(),
        repositories = out.repositories.len(),
        "merged platform modules"
    );
    Ok(Merged {
        module: out,
        report,
    })
}

fn module_platforms(module: &Module) -> Platforms {
    match module.platform {
        Some(p) => Platforms::single(p),
        None => module
            .repositories
            .values()
            .fold(Platforms::empty(), |acc, r| {
                acc.union(module.arena.platforms(r.root))
            }),
    }
}

/// Registered types share one name space, so a record and an alias of the
/// same name are one element. Other kinds are matched within their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Type,
    Kind(Kind),
}

impl Slot {
    fn of(kind: Kind) -> Slot {
        if kind.is_registered_type() {
            Slot::Type
        } else {
            Slot::Kind(kind)
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Type => f.write_str("type"),
            Slot::Kind(kind) => f.write_str(kind.tag()),
        }
    }
}

/// Identity of a child among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    slot: Slot,
    name: Option<String>,
    occurrence: usize,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {}", self.slot, name),
            None => write!(f, "{} #{}", self.slot, self.occurrence),
        }
    }
}

struct Merger<'o> {
    out: &'o mut Arena,
    repository: &'o str,
}

impl Merger<'_> {
    fn merge(&mut self, variants: &[Variant]) -> Result<NodeId, MergeError> {
        let base = variants[0];
        let kind = base.arena.kind(base.id);
        let mut platforms = Platforms::empty();
        let mut agreeing = Vec::with_capacity(variants.len());
        for v in variants {
            let contribution = v.contribution();
            if contribution.is_empty() {
                return Err(MergeError::MissingPlatform {
                    repository: self.repository.to_string(),
                });
            }
            if v.arena.kind(v.id) != kind || (!kind.is_container() && shape(v) != shape(&base)) {
                tracing::debug!(
                    repository = self.repository,
                    element = base.arena.name(base.id).unwrap_or(kind.tag()),
                    dropped = %contribution,
                    "variant disagrees with higher priority"
                );
                continue;
            }
            platforms = platforms.union(contribution);
            agreeing.push(*v);
        }

        if !kind.is_container() {
            return Ok(copy_with_platforms(self.out, base.arena, base.id, platforms));
        }

        let keyed: Vec<Vec<(Key, NodeId)>> = agreeing
            .iter()
            .map(|v| self.keyed_children(v))
            .collect::<Result<_, _>>()?;

        let order = ordered_union(&keyed);
        let lookup: Vec<HashMap<&Key, NodeId>> = keyed
            .iter()
            .map(|list| list.iter().map(|(k, id)| (k, *id)).collect())
            .collect();

        let mut children = Vec::with_capacity(order.len());
        for key in &order {
            let matched: Vec<Variant> = agreeing
                .iter()
                .zip(&lookup)
                .filter_map(|(v, map)| {
                    map.get(key).map(|id| Variant {
                        arena: v.arena,
                        id: *id,
                        platform: v.platform,
                    })
                })
                .collect();
            children.push(self.merge(&matched)?);
        }

        let mut node = base.arena.get(base.id).clone();
        node.children = children;
        node.platforms = platforms;
        Ok(self.out.alloc(node))
    }

    fn keyed_children(&self, variant: &Variant) -> Result<Vec<(Key, NodeId)>, MergeError> {
        let arena = variant.arena;
        let mut counts: HashMap<(Slot, Option<String>), (usize, NodeId)> = HashMap::new();
        let mut out = Vec::new();
        for &child in arena.children(variant.id) {
            let slot = Slot::of(arena.kind(child));
            let name = arena.name(child).map(str::to_string);
            let entry = counts
                .entry((slot, name.clone()))
                .or_insert((0, child));
            let occurrence = entry.0;
            entry.0 += 1;
            let key = Key {
                slot,
                name,
                occurrence,
            };
            if occurrence > 0 && key.name.is_some() {
                let first = Variant { id: entry.1, ..*variant };
                let this = Variant { id: child, ..*variant };
                if shape(&first) != shape(&this) {
                    return Err(MergeError::Conflict {
                        repository: self.repository.to_string(),
                        key: key.to_string(),
                        platform: variant.contribution().to_string(),
                    });
                }
            }
            out.push((key, child));
        }
        Ok(out)
    }
}

/// The first list's order, with keys missing from it inserted after the
/// nearest preceding key of their own list.
fn ordered_union(lists: &[Vec<(Key, NodeId)>]) -> Vec<Key> {
    let Some((base, others)) = lists.split_first() else {
        return Vec::new();
    };
    let mut present: HashSet<&Key> = base.iter().map(|(k, _)| k).collect();
    let mut after: HashMap<Option<&Key>, Vec<&Key>> = HashMap::new();
    for list in others {
        let mut anchor: Option<&Key> = None;
        for (key, _) in list {
            if present.insert(key) {
                after.entry(anchor).or_default().push(key);
            }
            anchor = Some(key);
        }
    }

    fn emit<'k>(anchor: Option<&'k Key>, after: &HashMap<Option<&'k Key>, Vec<&'k Key>>, out: &mut Vec<Key>) {
        for key in after.get(&anchor).into_iter().flatten() {
            out.push((*key).clone());
            emit(Some(*key), after, out);
        }
    }

    let mut out = Vec::with_capacity(present.len());
    emit(None, &after, &mut out);
    for (key, _) in base {
        out.push(key.clone());
        emit(Some(key), &after, &mut out);
    }
    out
}

fn copy_with_platforms(out: &mut Arena, from: &Arena, id: NodeId, platforms: Platforms) -> NodeId {
    let source = from.get(id);
    let children = source
        .children
        .iter()
        .map(|c| copy_with_platforms(out, from, *c, platforms))
        .collect();
    let mut node = source.clone();
    node.children = children;
    node.platforms = platforms;
    out.alloc(node)
}

/// Narrow `glong`/`gulong` value types of elements available on Windows.
fn narrow_windows_longs(arena: &mut Arena, root: NodeId) -> NodeId {
    let result: Result<NodeId, Infallible> = arena.rewrite(root, &mut |arena, ancestors, id| {
        if arena.kind(id) != Kind::Type || !arena.platforms(id).contains(Platform::Windows) {
            return Ok(id);
        }
        let (long, narrow) = match arena.name(id) {
            Some("glong") => ("glong", "gint"),
            Some("gulong") => ("gulong", "guint"),
            _ => return Ok(id),
        };
        let owner = ancestors
            .iter()
            .rev()
            .map(|a| arena.kind(*a))
            .find(|k| *k != Kind::Array);
        let value = matches!(
            owner,
            Some(Kind::ReturnValue | Kind::Parameter | Kind::InstanceParameter | Kind::Property | Kind::Alias)
        );
        if !value {
            return Ok(id);
        }
        tracing::debug!(from = long, to = narrow, "narrowed long type for windows");
        let id = arena.set_attr(id, "name", narrow);
        Ok(match arena.attr(id, "c:type") {
            Some(c_type) if c_type == long => arena.set_attr(id, "c:type", narrow),
            _ => id,
        })
    });
    match result {
        Ok(root) => root,
        Err(never) => match never {},
    }
}

// -- Shapes ------------------------------------------------------------------

/// What must agree for two variants of an atomic element to be the same.
#[derive(Debug, PartialEq, Eq)]
struct Shape {
    kind: Kind,
    name: Option<String>,
    signature: Vec<String>,
}

fn shape(variant: &Variant) -> Shape {
    let arena = variant.arena;
    let id = variant.id;
    let kind = arena.kind(id);
    let mut signature = Vec::new();
    if kind.is_callable() {
        let ret = arena
            .child_of_kind(id, Kind::ReturnValue)
            .map(|rv| type_descriptor(arena, rv))
            .unwrap_or_else(|| "none".to_string());
        signature.push(ret);
        if let Some(params) = arena.child_of_kind(id, Kind::Parameters) {
            for &p in arena.children(params) {
                match arena.kind(p) {
                    Kind::Parameter | Kind::InstanceParameter => {
                        signature.push(type_descriptor(arena, p))
                    }
                    _ => {}
                }
            }
        }
        signature.push(format!("throws={}", arena.attr(id, "throws").unwrap_or("0")));
    } else {
        match kind {
            Kind::Field | Kind::Property | Kind::Constant | Kind::Alias => {
                signature.push(type_descriptor(arena, id));
                if let Some(value) = arena.attr(id, "value") {
                    signature.push(value.to_string());
                }
            }
            Kind::Member => {
                signature.extend(arena.attr(id, "value").map(str::to_string));
            }
            _ => {}
        }
    }
    Shape {
        kind,
        name: arena.name(id).map(str::to_string),
        signature,
    }
}

/// Spelling of the first type-like child of `id`.
fn type_descriptor(arena: &Arena, id: NodeId) -> String {
    for &child in arena.children(id) {
        match arena.kind(child) {
            Kind::Type => {
                return arena
                    .attr(child, "name")
                    .or_else(|| arena.attr(child, "c:type"))
                    .unwrap_or("?")
                    .to_string()
            }
            Kind::Array => return format!("array<{}>", type_descriptor(arena, child)),
            Kind::Varargs => return "...".to_string(),
            Kind::Callback => return format!("callback:{}", arena.name(child).unwrap_or("?")),
            _ => {}
        }
    }
    "none".to_string()
}
