//! Output formats for the resolved model.

pub mod json;
pub mod tree;

use anyhow::{anyhow, Result};
use girweave::pipeline::Resolved;

pub trait Renderer {
    fn render(&self, resolved: &Resolved) -> Result<String>;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "json" => Ok(Box::new(json::JsonRenderer)),
        "tree" | "text" => Ok(Box::new(tree::TreeRenderer)),
        _ => Err(anyhow!("unknown format: {}. Use json or tree", format)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_formats() {
        assert_eq!(create_renderer("json").unwrap().file_extension(), "json");
        assert_eq!(create_renderer("tree").unwrap().file_extension(), "txt");
        let err = create_renderer("xml").err().unwrap();
        assert_eq!(err.to_string(), "unknown format: xml. Use json or tree");
    }
}
