//! JSON renderer for tooling.
//!
//! Nodes keep their tag, attributes in source order, platform set and
//! children. Type references carry the outcome of linking.

use crate::render::Renderer;
use anyhow::{Context, Result};
use girweave::link::{Links, Resolution};
use girweave::model::{Arena, NodeId, Platforms};
use girweave::pipeline::Resolved;
use indexmap::IndexMap;
use serde::Serialize;

pub struct JsonRenderer;

#[derive(Serialize)]
struct Output<'a> {
    repositories: Vec<RepositoryJson<'a>>,
}

#[derive(Serialize)]
struct RepositoryJson<'a> {
    name: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc_url: Option<&'a str>,
    generate: bool,
    source: &'a str,
    #[serde(skip_serializing_if = "no_platforms")]
    missing: Platforms,
    root: NodeJson<'a>,
}

#[derive(Serialize)]
struct NodeJson<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "no_attrs")]
    attrs: &'a IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "no_platforms")]
    platforms: Platforms,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<LinkJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeJson<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum LinkJson {
    Resolved { target: String },
    External,
    Unresolved,
}

fn no_attrs(attrs: &&IndexMap<String, String>) -> bool {
    attrs.is_empty()
}

fn no_platforms(platforms: &Platforms) -> bool {
    platforms.is_empty()
}

fn node<'a>(arena: &'a Arena, links: &Links, id: NodeId) -> NodeJson<'a> {
    let n = arena.get(id);
    let link = links.get(id).map(|r| match r {
        Resolution::Resolved(target) => LinkJson::Resolved {
            target: target.name.to_string(),
        },
        Resolution::External => LinkJson::External,
        Resolution::Unresolved => LinkJson::Unresolved,
    });
    NodeJson {
        kind: n.kind.tag(),
        attrs: &n.attrs,
        text: n.text.as_deref(),
        platforms: n.platforms,
        link,
        children: n.children.iter().map(|c| node(arena, links, *c)).collect(),
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, resolved: &Resolved) -> Result<String> {
        let module = &resolved.module;
        let repositories = module
            .repositories
            .values()
            .map(|repo| RepositoryJson {
                name: &repo.name,
                version: &repo.version,
                doc_url: repo.doc_url.as_deref(),
                generate: repo.generate,
                source: &repo.source,
                missing: resolved.report.missing_on(&repo.name),
                root: node(&module.arena, &resolved.links, repo.root),
            })
            .collect();
        let mut out = serde_json::to_string_pretty(&Output { repositories })
            .context("failed to serialize model")?;
        out.push('\n');
        Ok(out)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing;
    use serde_json::Value;

    #[test]
    fn renders_links_and_platforms() {
        let out = JsonRenderer.render(&testing::resolved()).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let repo = &value["repositories"][0];
        assert_eq!(repo["name"], "Test");
        assert_eq!(repo["missing"], serde_json::json!(["macos"]));

        let ns = &repo["root"]["children"][0];
        assert_eq!(ns["kind"], "namespace");
        let function = &ns["children"][1];
        assert_eq!(function["platforms"], serde_json::json!(["linux"]));

        let ret = &function["children"][0]["children"][0];
        assert_eq!(ret["link"], serde_json::json!({"status": "resolved", "target": "Test.Widget"}));
        let missing = &function["children"][1]["children"][0]["children"][0];
        assert_eq!(missing["link"]["status"], "unresolved");
        assert_eq!(missing["attrs"]["unresolved"], "1");
    }
}
