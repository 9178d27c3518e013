//! Indented text tree, one node per line, for reading and diffing.

use crate::render::Renderer;
use anyhow::Result;
use girweave::link::Resolution;
use girweave::model::{write_tree, NodeId};
use girweave::pipeline::Resolved;
use std::fmt::Write;

pub struct TreeRenderer;

impl Renderer for TreeRenderer {
    fn render(&self, resolved: &Resolved) -> Result<String> {
        let module = &resolved.module;
        let annotate = |id: NodeId| match resolved.links.get(id)? {
            Resolution::Resolved(target) => Some(format!("-> {}", target.name)),
            Resolution::External => None,
            Resolution::Unresolved => Some("-> ?".to_string()),
        };

        let mut out = String::new();
        for repo in module.repositories.values() {
            write!(out, "# {}", repo.qualified_name())?;
            if !repo.generate {
                out.push_str(" (no generate)");
            }
            let missing = resolved.report.missing_on(&repo.name);
            if !missing.is_empty() {
                write!(out, " (missing on {})", missing)?;
            }
            out.push('\n');
            write_tree(&module.arena, repo.root, 0, &mut out, &annotate);
        }
        Ok(out)
    }

    fn file_extension(&self) -> &str {
        "txt"
    }
}
