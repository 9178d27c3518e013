//! Append-only node arena.
//!
//! Nodes are never modified once allocated. A rewrite allocates a new node
//! for the changed element and new copies of its ancestors up to the root,
//! while every untouched subtree keeps its `NodeId`. Older roots therefore
//! stay valid and describe the model as it was before the rewrite.

use super::kind::Kind;
use super::platform::Platforms;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One element of the model tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Kind,
    /// Attributes in source order; keys are unique.
    pub attrs: IndexMap<String, String>,
    /// Children in source order.
    pub children: Vec<NodeId>,
    /// Text content, only present on documentation elements.
    pub text: Option<String>,
    /// Platforms defining this element. Empty until merge.
    pub platforms: Platforms,
}

impl Node {
    pub fn new(kind: Kind) -> Self {
        Node {
            kind,
            attrs: IndexMap::new(),
            children: Vec::new(),
            text: None,
            platforms: Platforms::empty(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<NodeId>) -> Self {
        self.children = children;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attr(self.kind.name_key())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.get(id).kind
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.get(id).attr(key)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.get(id).name()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    pub fn platforms(&self, id: NodeId) -> Platforms {
        self.get(id).platforms
    }

    /// First child of the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: Kind) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == kind)
    }

    pub fn children_of_kind(&self, id: NodeId, kind: Kind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) == kind)
    }

    /// Allocate a modified copy of `id`. Returns `id` itself when `f` leaves
    /// the node unchanged.
    pub fn update(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) -> NodeId {
        let mut node = self.get(id).clone();
        f(&mut node);
        if node == *self.get(id) {
            id
        } else {
            self.alloc(node)
        }
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) -> NodeId {
        self.update(id, |n| {
            n.attrs.insert(key.to_string(), value.to_string());
        })
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> NodeId {
        self.update(id, |n| {
            n.attrs.shift_remove(key);
        })
    }

    pub fn with_children(&mut self, id: NodeId, children: Vec<NodeId>) -> NodeId {
        self.update(id, |n| n.children = children)
    }

    pub fn with_platforms(&mut self, id: NodeId, platforms: Platforms) -> NodeId {
        self.update(id, |n| n.platforms = platforms)
    }

    /// The node reached by following child indices from `root`.
    pub fn node_at(&self, root: NodeId, path: &[usize]) -> Option<NodeId> {
        let mut current = root;
        for &i in path {
            current = *self.children(current).get(i)?;
        }
        Some(current)
    }

    /// Replace the node at `path` below `root` with the result of `f` and
    /// rebuild the ancestors. Returns the new root, or `None` when the path
    /// does not exist.
    pub fn replace_at(
        &mut self,
        root: NodeId,
        path: &[usize],
        f: impl FnOnce(&mut Arena, NodeId) -> NodeId,
    ) -> Option<NodeId> {
        match path.split_first() {
            None => Some(f(self, root)),
            Some((&i, rest)) => {
                let child = *self.children(root).get(i)?;
                let replaced = self.replace_at(child, rest, f)?;
                if replaced == child {
                    return Some(root);
                }
                let mut children = self.children(root).to_vec();
                children[i] = replaced;
                Some(self.with_children(root, children))
            }
        }
    }

    /// Rewrite a tree bottom-up. `f` receives the ancestors of the node (root
    /// first) and the node with its children already rewritten.
    pub fn rewrite<E>(
        &mut self,
        root: NodeId,
        f: &mut impl FnMut(&mut Arena, &[NodeId], NodeId) -> Result<NodeId, E>,
    ) -> Result<NodeId, E> {
        let mut ancestors = Vec::new();
        self.rewrite_inner(root, &mut ancestors, f)
    }

    fn rewrite_inner<E>(
        &mut self,
        id: NodeId,
        ancestors: &mut Vec<NodeId>,
        f: &mut impl FnMut(&mut Arena, &[NodeId], NodeId) -> Result<NodeId, E>,
    ) -> Result<NodeId, E> {
        let old_children = self.children(id).to_vec();
        ancestors.push(id);
        let mut new_children = Vec::with_capacity(old_children.len());
        for child in &old_children {
            new_children.push(self.rewrite_inner(*child, ancestors, f)?);
        }
        ancestors.pop();
        let current = if new_children == old_children {
            id
        } else {
            self.with_children(id, new_children)
        };
        f(self, &ancestors[..], current)
    }

    /// All nodes of the tree in pre-order, root included.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Deep-copy a tree from another arena.
    pub fn import(&mut self, from: &Arena, id: NodeId) -> NodeId {
        let source = from.get(id);
        let children = source
            .children
            .iter()
            .map(|c| self.import(from, *c))
            .collect();
        let mut node = source.clone();
        node.children = children;
        self.alloc(node)
    }

    /// Structural equality of two trees, possibly in different arenas.
    pub fn same_tree(&self, a: NodeId, other: &Arena, b: NodeId) -> bool {
        let x = self.get(a);
        let y = other.get(b);
        x.kind == y.kind
            && x.attrs == y.attrs
            && x.text == y.text
            && x.platforms == y.platforms
            && x.children.len() == y.children.len()
            && x.children
                .iter()
                .zip(&y.children)
                .all(|(ca, cb)| self.same_tree(*ca, other, *cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(arena: &mut Arena) -> NodeId {
        let p1 = arena.alloc(Node::new(Kind::Parameter).with_attr("name", "a"));
        let p2 = arena.alloc(Node::new(Kind::Parameter).with_attr("name", "b"));
        let params = arena.alloc(Node::new(Kind::Parameters).with_children(vec![p1, p2]));
        let method = arena.alloc(
            Node::new(Kind::Method)
                .with_attr("name", "bar")
                .with_children(vec![params]),
        );
        arena.alloc(
            Node::new(Kind::Class)
                .with_attr("name", "Foo")
                .with_children(vec![method]),
        )
    }

    #[test]
    fn set_attr_leaves_original_untouched() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let renamed = arena.set_attr(root, "name", "Baz");
        assert_ne!(root, renamed);
        assert_eq!(arena.name(root), Some("Foo"));
        assert_eq!(arena.name(renamed), Some("Baz"));
        assert_eq!(arena.children(root), arena.children(renamed));
    }

    #[test]
    fn unchanged_update_keeps_id() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let before = arena.len();
        assert_eq!(arena.set_attr(root, "name", "Foo"), root);
        assert_eq!(arena.remove_attr(root, "missing"), root);
        assert_eq!(arena.len(), before);
    }

    #[test]
    fn replace_at_shares_siblings() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let first = arena.node_at(root, &[0, 0, 0]).unwrap();
        let second = arena.node_at(root, &[0, 0, 1]).unwrap();

        let new_root = arena
            .replace_at(root, &[0, 0, 1], |a, id| a.set_attr(id, "deprecated", "1"))
            .unwrap();

        assert_ne!(new_root, root);
        assert_eq!(arena.node_at(new_root, &[0, 0, 0]), Some(first));
        let patched = arena.node_at(new_root, &[0, 0, 1]).unwrap();
        assert_eq!(arena.attr(patched, "deprecated"), Some("1"));
        assert_eq!(arena.attr(second, "deprecated"), None);
        assert!(arena.replace_at(root, &[3], |_, id| id).is_none());
    }

    #[test]
    fn rewrite_is_bottom_up_with_ancestors() {
        let mut arena = Arena::new();
        let root = sample(&mut arena);
        let mut seen = Vec::new();
        let out: Result<NodeId, ()> = arena.rewrite(root, &mut |a, ancestors, id| {
            seen.push((a.kind(id), ancestors.len()));
            Ok(id)
        });
        assert_eq!(out, Ok(root));
        assert_eq!(
            seen,
            vec![
                (Kind::Parameter, 3),
                (Kind::Parameter, 3),
                (Kind::Parameters, 2),
                (Kind::Method, 1),
                (Kind::Class, 0),
            ]
        );
    }

    #[test]
    fn import_and_compare_across_arenas() {
        let mut a = Arena::new();
        let root = sample(&mut a);
        let mut b = Arena::new();
        let copy = b.import(&a, root);
        assert!(a.same_tree(root, &b, copy));
        let changed = b.set_attr(copy, "name", "Other");
        assert!(!a.same_tree(root, &b, changed));
        assert_eq!(a.descendants(root).len(), 5);
    }
}
