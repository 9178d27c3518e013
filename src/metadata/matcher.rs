//! Applies a rule tree to one repository of a module.
//!
//! Matched nodes are addressed by index paths below the namespace. Attribute
//! edits never change the shape of the tree, so paths stay valid until the
//! deferred `move-to` edits run at the end of the file.

use super::parser::{Arg, ArgValue, Rule};
use crate::diagnostics::Diagnostics;
use crate::model::{Arena, Kind, Module, NodeId};
use regex::Regex;
use std::collections::HashSet;
use std::convert::Infallible;

/// Key that reparents matched nodes instead of setting an attribute.
pub const MOVE_TO: &str = "move-to";

const PLACEHOLDER: &str = "{{value}}";

type Path = Vec<usize>;

struct Move {
    path: Path,
    target: String,
    line: usize,
}

struct Matcher<'a> {
    arena: &'a mut Arena,
    root: NodeId,
    /// Position of the namespace among the repository's children.
    ns_index: usize,
    namespace: &'a str,
    file: &'a str,
    diagnostics: &'a mut Diagnostics,
    moves: Vec<Move>,
}

/// Apply `rules` to the named repository. Problems are reported to
/// `diagnostics`; the repository is left as it was when nothing matches.
pub fn apply_rules(
    module: &mut Module,
    repository: &str,
    file: &str,
    rules: &[Rule],
    diagnostics: &mut Diagnostics,
) {
    let Some(repo) = module.repositories.get_mut(repository) else {
        return;
    };
    let Some(ns_index) = module
        .arena
        .children(repo.root)
        .iter()
        .position(|c| module.arena.kind(*c) == Kind::Namespace)
    else {
        return;
    };

    let mut matcher = Matcher {
        arena: &mut module.arena,
        root: repo.root,
        ns_index,
        namespace: &repo.name,
        file,
        diagnostics,
        moves: Vec::new(),
    };
    for rule in rules {
        matcher.apply(rule, &[Vec::new()]);
    }
    matcher.finish_moves();
    let root = matcher.root;
    tracing::debug!(repository, file, rules = rules.len(), "applied rule file");
    repo.root = root;
}

/// Translate a rule pattern into an anchored regular expression.
///
/// `*` becomes `.*` unless it follows something it can quantify (`.`, `)`,
/// `]`) or is escaped, and `{a,b}` becomes an alternation. Everything else is
/// regex syntax.
pub fn pattern_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^(?:");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let prev = i.checked_sub(1).map(|p| chars[p]);
        match c {
            '*' if !matches!(prev, Some('.' | ')' | ']' | '\\')) => out.push_str(".*"),
            '{' => {
                let close = chars[i + 1..].iter().position(|c| *c == '}');
                if let Some(len) = close {
                    let inner: String = chars[i + 1..i + 1 + len].iter().collect();
                    let quantifier = inner.chars().all(|c| c.is_ascii_digit() || c == ',');
                    if inner.contains(',') && !quantifier {
                        out.push_str("(?:");
                        out.push_str(&inner.replace(',', "|"));
                        out.push(')');
                        i += len + 2;
                        continue;
                    }
                }
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out.push_str(")$");
    out
}

impl Matcher<'_> {
    fn namespace_node(&self) -> NodeId {
        self.arena.children(self.root)[self.ns_index]
    }

    fn full_path(&self, path: &[usize]) -> Path {
        let mut full = Vec::with_capacity(path.len() + 1);
        full.push(self.ns_index);
        full.extend_from_slice(path);
        full
    }

    fn apply(&mut self, rule: &Rule, scope: &[Path]) {
        let Some(matches) = self.select(rule, scope) else {
            return;
        };
        if matches.is_empty() {
            self.diagnostics.warning(
                self.file,
                Some(rule.line),
                format!("pattern `{}` does not match anything", rule.pattern),
            );
            return;
        }
        for arg in &rule.args {
            for path in &matches {
                self.edit(path, arg);
            }
        }
        for child in &rule.children {
            self.apply(child, &matches);
        }
    }

    /// Children of every scope node that match the rule. Parameter lists
    /// are looked through. `None` when the pattern does not compile.
    fn select(&mut self, rule: &Rule, scope: &[Path]) -> Option<Vec<Path>> {
        let regex = match Regex::new(&pattern_to_regex(&rule.pattern)) {
            Ok(regex) => regex,
            Err(err) => {
                self.diagnostics.warning(
                    self.file,
                    Some(rule.line),
                    format!("invalid pattern `{}`: {}", rule.pattern, err),
                );
                return None;
            }
        };
        let lone_wildcard = rule.pattern == "*";
        let ns = self.namespace_node();
        let arena = &*self.arena;
        let matches_rule = |id: NodeId| {
            let node = arena.get(id);
            let selected = rule
                .selector
                .as_deref()
                .map_or(true, |s| node.kind.tag() == s);
            let named = match node.name() {
                Some(name) => regex.is_match(name),
                None => lone_wildcard,
            };
            selected && named
        };

        let mut out = Vec::new();
        for path in scope {
            let Some(parent) = arena.node_at(ns, path) else {
                continue;
            };
            for (i, &child) in arena.children(parent).iter().enumerate() {
                if arena.kind(child) == Kind::Parameters {
                    for (j, &param) in arena.children(child).iter().enumerate() {
                        if matches_rule(param) {
                            let mut found = path.clone();
                            found.extend([i, j]);
                            out.push(found);
                        }
                    }
                } else if matches_rule(child) {
                    let mut found = path.clone();
                    found.push(i);
                    out.push(found);
                }
            }
        }
        Some(out)
    }

    fn edit(&mut self, path: &[usize], arg: &Arg) {
        if arg.key == MOVE_TO {
            match &arg.value {
                ArgValue::Set(target) => self.moves.push(Move {
                    path: path.to_vec(),
                    target: target.clone(),
                    line: arg.line,
                }),
                ArgValue::Remove => {
                    self.diagnostics
                        .warning(self.file, Some(arg.line), "move-to needs a target type")
                }
            }
            return;
        }
        let full = self.full_path(path);
        let root = self.arena.replace_at(self.root, &full, |arena, id| match &arg.value {
            ArgValue::Remove => arena.remove_attr(id, &arg.key),
            ArgValue::Set(value) => {
                let value = match arena.attr(id, &arg.key) {
                    Some(current) if value.contains(PLACEHOLDER) => {
                        value.replace(PLACEHOLDER, current)
                    }
                    _ => value.clone(),
                };
                arena.set_attr(id, &arg.key, &value)
            }
        });
        if let Some(root) = root {
            self.root = root;
        }
    }

    /// Index of the registered type named `target` among the namespace's
    /// children. `Some(None)` stands for the namespace itself.
    fn move_target(&self, target: &str) -> Option<Option<usize>> {
        if target == self.namespace {
            return Some(None);
        }
        let ns = self.namespace_node();
        self.arena
            .children(ns)
            .iter()
            .position(|c| {
                self.arena.kind(*c).is_registered_type() && self.arena.name(*c) == Some(target)
            })
            .map(Some)
    }

    fn finish_moves(&mut self) {
        let moves = std::mem::take(&mut self.moves);
        if moves.is_empty() {
            return;
        }

        let ns = self.namespace_node();
        let mut pending: Vec<(Path, NodeId, String)> = Vec::new();
        for m in moves {
            let Some(node) = self.arena.node_at(ns, &m.path) else {
                continue;
            };
            match self.move_target(&m.target) {
                Some(Some(index)) if m.path == [index] => self.diagnostics.warning(
                    self.file,
                    Some(m.line),
                    format!("cannot move {} into itself", m.target),
                ),
                Some(_) if pending.iter().any(|(p, _, _)| *p == m.path) => {}
                Some(_) => pending.push((m.path, node, m.target)),
                None => self.diagnostics.warning(
                    self.file,
                    Some(m.line),
                    format!("move-to target {} not found in {}", m.target, self.namespace),
                ),
            }
        }

        // A node travels with a moved ancestor.
        let paths: Vec<Path> = pending.iter().map(|(p, _, _)| p.clone()).collect();
        pending.retain(|(path, _, _)| {
            let nested = paths
                .iter()
                .any(|other| other.len() < path.len() && path.starts_with(other));
            if nested {
                tracing::debug!(?path, "skipping move inside a moved element");
            }
            !nested
        });

        let moved: HashSet<NodeId> = pending.iter().map(|(_, node, _)| *node).collect();
        let detached = self.arena.rewrite(ns, &mut |arena, _, id| {
            let kept: Vec<NodeId> = arena
                .children(id)
                .iter()
                .copied()
                .filter(|c| !moved.contains(c))
                .collect();
            Ok::<_, Infallible>(arena.with_children(id, kept))
        });
        let detached = match detached {
            Ok(id) => id,
            Err(never) => match never {},
        };
        let mut root_children = self.arena.children(self.root).to_vec();
        root_children[self.ns_index] = detached;
        self.root = self.arena.with_children(self.root, root_children);

        for (_, node, target) in pending {
            let Some(index) = self.move_target(&target) else {
                continue;
            };
            let path = match index {
                Some(i) => self.full_path(&[i]),
                None => self.full_path(&[]),
            };
            let root = self.arena.replace_at(self.root, &path, |arena, parent| {
                let mut children = arena.children(parent).to_vec();
                children.push(node);
                arena.with_children(parent, children)
            });
            if let Some(root) = root {
                self.root = root;
            }
        }
    }
}
