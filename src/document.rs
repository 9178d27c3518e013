//! Node trees handed over by the description-document parser.
//!
//! The parser runs outside this crate and writes one JSON tree per source
//! file:
//!
//! ```json
//! {"kind": "repository", "attrs": {"version": "1.2"}, "children": [
//!   {"kind": "namespace", "attrs": {"name": "GLib", "version": "2.0"}, "children": []}
//! ]}
//! ```
//!
//! Element kinds are spelled with their tags (`glib:signal`,
//! `virtual-method`).

use crate::error::DocumentError;
use crate::model::{Arena, Kind, Module, Node, NodeId, Platform, Repository};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
}

/// One parsed description document.
#[derive(Debug, Clone)]
pub struct Document {
    pub file: String,
    pub root: RawNode,
}

impl Document {
    pub fn from_json(file: &str, json: &str) -> Result<Self, DocumentError> {
        let root = serde_json::from_str(json).map_err(|source| DocumentError::Json {
            file: file.to_string(),
            source,
        })?;
        Ok(Document {
            file: file.to_string(),
            root,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let json = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            file: file.clone(),
            source,
        })?;
        Document::from_json(&file, &json)
    }
}

/// Settings owned by the build layer that apply while loading documents.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Repositories to generate bindings for; `None` means all of them.
    pub generate: Option<BTreeSet<String>>,
    /// Documentation URL prefix per namespace name.
    pub doc_urls: BTreeMap<String, String>,
}

impl LoadOptions {
    pub fn generates(&self, name: &str) -> bool {
        self.generate.as_ref().map_or(true, |set| set.contains(name))
    }
}

impl Module {
    /// Build the module of one platform from its documents.
    pub fn from_documents(
        platform: Platform,
        documents: Vec<Document>,
        options: &LoadOptions,
    ) -> Result<Module, DocumentError> {
        let mut module = Module::new(Some(platform));
        for doc in documents {
            let root = build(&mut module.arena, &doc.file, &doc.root)?;
            let repo = repository(&module.arena, root, &doc.file, options)?;
            if let Some(existing) = module.repositories.get(&repo.name) {
                return Err(DocumentError::DuplicateNamespace {
                    namespace: repo.name,
                    platform,
                    first: existing.source.clone(),
                    second: doc.file,
                });
            }
            tracing::debug!(%platform, repository = %repo.qualified_name(), file = %doc.file, "loaded document");
            module.repositories.insert(repo.name.clone(), repo);
        }
        Ok(module)
    }
}

fn build(arena: &mut Arena, file: &str, raw: &RawNode) -> Result<NodeId, DocumentError> {
    let kind = Kind::from_tag(&raw.kind).ok_or_else(|| DocumentError::UnknownElement {
        file: file.to_string(),
        tag: raw.kind.clone(),
    })?;
    let children = raw
        .children
        .iter()
        .map(|c| build(arena, file, c))
        .collect::<Result<Vec<_>, _>>()?;
    let mut node = Node::new(kind).with_children(children);
    node.attrs = raw.attrs.clone();
    node.text = raw.text.clone();
    Ok(arena.alloc(node))
}

fn repository(
    arena: &Arena,
    root: NodeId,
    file: &str,
    options: &LoadOptions,
) -> Result<Repository, DocumentError> {
    if arena.kind(root) != Kind::Repository {
        return Err(DocumentError::NotARepository {
            file: file.to_string(),
            found: arena.kind(root).tag().to_string(),
        });
    }
    let namespaces: Vec<NodeId> = arena.children_of_kind(root, Kind::Namespace).collect();
    let &[ns] = namespaces.as_slice() else {
        return Err(DocumentError::NamespaceCount {
            file: file.to_string(),
            count: namespaces.len(),
        });
    };
    let name = arena
        .attr(ns, "name")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DocumentError::UnnamedNamespace {
            file: file.to_string(),
        })?
        .to_string();
    let version = arena.attr(ns, "version").unwrap_or("0").to_string();
    Ok(Repository {
        doc_url: options.doc_urls.get(&name).cloned(),
        generate: options.generates(&name),
        source: file.to_string(),
        name,
        version,
        root,
    })
}
