//! Programmatic patches over the merged model.
//!
//! A patch sees every element of a repository, bottom-up, together with the
//! name of the namespace the element belongs to. It returns the element
//! unchanged when it does not apply, or a replacement built through the
//! arena (the input subtree stays intact). Patches run strictly in
//! registration order; an error or a panic inside a patch aborts the run.

pub mod base;
pub mod glib;
pub mod gobject;
pub mod gtk;

use crate::error::PatchError;
use crate::link::SymbolIndex;
use crate::model::{Arena, Kind, Module, Node, NodeId, Platforms};
use std::panic::{self, AssertUnwindSafe};

pub trait Patch {
    fn name(&self) -> &'static str;

    /// Return `element` itself when the patch does not apply.
    fn patch(&self, cx: &mut PatchContext, element: NodeId) -> Result<NodeId, PatchError>;
}

/// What a patch may look at and build with.
pub struct PatchContext<'a> {
    pub arena: &'a mut Arena,
    /// Name of the namespace the element belongs to.
    pub namespace: &'a str,
    /// Index of the model before this patch ran.
    pub index: &'a SymbolIndex,
    patch: &'static str,
}

impl PatchContext<'_> {
    pub fn kind(&self, id: NodeId) -> Kind {
        self.arena.kind(id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.arena.name(id)
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.arena.attr(id, key)
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    /// Copy of `parent` with `child` appended.
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> NodeId {
        let mut children = self.arena.children(parent).to_vec();
        children.push(child);
        self.arena.with_children(parent, children)
    }

    /// Copy of `parent` without the children of `kind` whose `key` equals
    /// `value`.
    pub fn remove(&mut self, parent: NodeId, kind: Kind, key: &str, value: &str) -> NodeId {
        let children: Vec<NodeId> = self
            .arena
            .children(parent)
            .iter()
            .copied()
            .filter(|c| !(self.arena.kind(*c) == kind && self.arena.attr(*c, key) == Some(value)))
            .collect();
        self.arena.with_children(parent, children)
    }

    pub fn fail(&self, message: impl Into<String>) -> PatchError {
        PatchError::Failed {
            patch: self.patch,
            namespace: self.namespace.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Default)]
pub struct PatchEngine {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchEngine {
    pub fn new() -> Self {
        PatchEngine::default()
    }

    /// The namespace-independent corrections, then the GLib, GObject and
    /// Gtk patches.
    pub fn builtin() -> Self {
        PatchEngine::new()
            .with(base::BasePatch)
            .with(glib::GLibPatch)
            .with(gobject::GObjectPatch)
            .with(gtk::GtkPatch)
    }

    pub fn with<P: Patch + 'static>(mut self, patch: P) -> Self {
        self.register(Box::new(patch));
        self
    }

    pub fn register(&mut self, patch: Box<dyn Patch>) {
        self.patches.push(patch);
    }

    pub fn into_patches(self) -> Vec<Box<dyn Patch>> {
        self.patches
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.patches.iter().map(|p| p.name()).collect()
    }

    pub fn apply(&self, mut module: Module, index: &SymbolIndex) -> Result<Module, PatchError> {
        let names: Vec<String> = module.repositories.keys().cloned().collect();
        for name in &names {
            for patch in &self.patches {
                let Some(root) = module.repositories.get(name).map(|r| r.root) else {
                    continue;
                };
                let root = apply_one(patch.as_ref(), &mut module.arena, root, name, index)?;
                if let Some(repo) = module.repositories.get_mut(name) {
                    repo.root = root;
                }
            }
        }
        tracing::info!(patches = self.patches.len(), repositories = names.len(), "patches applied");
        Ok(module)
    }
}

fn apply_one(
    patch: &dyn Patch,
    arena: &mut Arena,
    root: NodeId,
    namespace: &str,
    index: &SymbolIndex,
) -> Result<NodeId, PatchError> {
    arena.rewrite(root, &mut |arena, ancestors, id| {
        let inherited = match arena.platforms(id) {
            p if !p.is_empty() => p,
            _ => ancestors
                .last()
                .map(|a| arena.platforms(*a))
                .unwrap_or_default(),
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut cx = PatchContext {
                arena: &mut *arena,
                namespace,
                index,
                patch: patch.name(),
            };
            patch.patch(&mut cx, id)
        }));
        let patched = match outcome {
            Ok(result) => result?,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Err(PatchError::Panicked {
                    patch: patch.name(),
                    namespace: namespace.to_string(),
                    message,
                });
            }
        };
        if patched == id {
            return Ok(id);
        }
        tracing::debug!(patch = patch.name(), namespace, element = arena.name(patched).unwrap_or("?"), "patched");
        Ok(inherit_platforms(arena, patched, inherited))
    })
}

/// Give nodes without a platform set the set of their nearest ancestor.
fn inherit_platforms(arena: &mut Arena, id: NodeId, inherited: Platforms) -> NodeId {
    if inherited.is_empty() {
        return id;
    }
    let own = match arena.platforms(id) {
        p if p.is_empty() => inherited,
        p => p,
    };
    let children: Vec<NodeId> = arena
        .children(id)
        .to_vec()
        .into_iter()
        .map(|c| inherit_platforms(arena, c, own))
        .collect();
    arena.update(id, |n| {
        n.platforms = own;
        n.children = children;
    })
}
