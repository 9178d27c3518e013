//! Hand-built modules for unit tests.

use super::{Arena, Kind, Module, Node, NodeId, Platform, Platforms, Repository};

pub struct ModuleBuilder {
    pub module: Module,
}

impl ModuleBuilder {
    pub fn new(platform: Option<Platform>) -> Self {
        ModuleBuilder {
            module: Module::new(platform),
        }
    }

    pub fn linux() -> Self {
        ModuleBuilder::new(Some(Platform::Linux))
    }

    pub fn node(&mut self, kind: Kind, attrs: &[(&str, &str)], children: Vec<NodeId>) -> NodeId {
        let mut node = Node::new(kind).with_children(children);
        for (k, v) in attrs {
            node.attrs.insert(k.to_string(), v.to_string());
        }
        self.module.arena.alloc(node)
    }

    pub fn ty(&mut self, name: &str, c_type: &str) -> NodeId {
        self.node(Kind::Type, &[("name", name), ("c:type", c_type)], vec![])
    }

    pub fn param(&mut self, name: &str, type_name: &str, c_type: &str) -> NodeId {
        let t = self.ty(type_name, c_type);
        self.node(Kind::Parameter, &[("name", name)], vec![t])
    }

    /// A callable with the given return type and parameters.
    pub fn callable(
        &mut self,
        kind: Kind,
        attrs: &[(&str, &str)],
        ret: NodeId,
        params: Vec<NodeId>,
    ) -> NodeId {
        let rv = self.node(Kind::ReturnValue, &[], vec![ret]);
        let mut children = vec![rv];
        if !params.is_empty() {
            children.push(self.node(Kind::Parameters, &[], params));
        }
        self.node(kind, attrs, children)
    }

    pub fn method(&mut self, name: &str, ret: NodeId) -> NodeId {
        self.callable(Kind::Method, &[("name", name)], ret, vec![])
    }

    pub fn repo(&mut self, name: &str, includes: &[&str], children: Vec<NodeId>) {
        let ns = self.node(
            Kind::Namespace,
            &[("name", name), ("version", "1.0")],
            children,
        );
        let mut root_children: Vec<NodeId> = includes
            .iter()
            .map(|i| self.node(Kind::Include, &[("name", *i)], vec![]))
            .collect();
        root_children.push(ns);
        let root = self.node(Kind::Repository, &[], root_children);
        self.module.repositories.insert(
            name.to_string(),
            Repository {
                name: name.to_string(),
                version: "1.0".into(),
                doc_url: None,
                generate: true,
                source: format!("{}-1.0.json", name),
                root,
            },
        );
    }

    pub fn finish(self) -> Module {
        self.module
    }

    /// The module as if merged from its own platform alone.
    pub fn finish_merged(self) -> Module {
        let mut module = self.module;
        let platforms = module
            .platform
            .map(Platforms::single)
            .unwrap_or_else(Platforms::all);
        let names: Vec<String> = module.repositories.keys().cloned().collect();
        for name in names {
            let root = module.repositories[&name].root;
            let root = set_platforms(&mut module.arena, root, platforms);
            if let Some(repo) = module.repositories.get_mut(&name) {
                repo.root = root;
            }
        }
        module.platform = None;
        module
    }
}

fn set_platforms(arena: &mut Arena, id: NodeId, platforms: Platforms) -> NodeId {
    let children: Vec<NodeId> = arena
        .children(id)
        .to_vec()
        .into_iter()
        .map(|c| set_platforms(arena, c, platforms))
        .collect();
    arena.update(id, |n| {
        n.platforms = platforms;
        n.children = children;
    })
}
