//! Declarative rule files.
//!
//! A rule file holds one statement per line. Each statement selects nodes
//! by name pattern, walking from the namespace down, and sets or removes
//! attributes on them:
//!
//! ```text
//! // comments are allowed
//! Widget#class.get_*_width skip
//! Window
//!   .new.title nullable
//!   .set_default transfer-ownership=() doc-version="{{value}}.1"
//! helper_function move-to=Widget
//! ```
//!
//! Rules for a repository are read from `<Namespace>-<Version>.metadata`.

pub mod matcher;
pub mod parser;
pub mod scanner;

pub use matcher::{apply_rules, pattern_to_regex, MOVE_TO};
pub use parser::{parse, Arg, ArgValue, Rule};

use crate::diagnostics::Diagnostics;
use crate::model::{Module, Repository};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A parsed rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFile {
    /// Name used in diagnostics.
    pub file: String,
    pub rules: Vec<Rule>,
}

impl RuleFile {
    pub fn parse(file: &str, text: &str, diagnostics: &mut Diagnostics) -> RuleFile {
        RuleFile {
            file: file.to_string(),
            rules: parse(file, text, diagnostics),
        }
    }

    /// Read the rule file of `repository` from `dir`. A missing file means
    /// no rules; one that cannot be read is an error diagnostic.
    pub fn load(dir: &Path, repository: &Repository, diagnostics: &mut Diagnostics) -> Option<RuleFile> {
        let name = file_name(repository);
        let path = dir.join(&name);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no rule file");
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(RuleFile::parse(&name, &text, diagnostics)),
            Err(err) => {
                diagnostics.error(&name, None, format!("cannot read file: {}", err));
                None
            }
        }
    }

    pub fn apply(&self, module: &mut Module, repository: &str, diagnostics: &mut Diagnostics) {
        apply_rules(module, repository, &self.file, &self.rules, diagnostics);
    }
}

/// `Gtk-4.0.metadata`
pub fn file_name(repository: &Repository) -> String {
    format!("{}.metadata", repository.qualified_name())
}

/// Where rule files come from: an optional directory searched by file name,
/// plus rule files registered per repository.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    dir: Option<PathBuf>,
    files: BTreeMap<String, Vec<RuleFile>>,
}

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Metadata {
            dir: Some(dir.into()),
            files: BTreeMap::new(),
        }
    }

    pub fn with_rules(mut self, repository: &str, file: RuleFile) -> Self {
        self.add(repository, file);
        self
    }

    pub fn add(&mut self, repository: &str, file: RuleFile) {
        self.files.entry(repository.to_string()).or_default().push(file);
    }

    /// Rule files for `repository` in application order: the directory's
    /// file first, then the registered ones.
    pub fn rules_for(&self, repository: &Repository, diagnostics: &mut Diagnostics) -> Vec<RuleFile> {
        let mut out = Vec::new();
        if let Some(ref dir) = self.dir {
            out.extend(RuleFile::load(dir, repository, diagnostics));
        }
        if let Some(files) = self.files.get(&repository.name) {
            out.extend(files.iter().cloned());
        }
        out
    }

    /// Apply every repository's rule files to `module`.
    pub fn apply(&self, module: &mut Module, diagnostics: &mut Diagnostics) {
        let repositories: Vec<Repository> = module.repositories.values().cloned().collect();
        for repository in &repositories {
            for file in self.rules_for(repository, diagnostics) {
                file.apply(module, &repository.name, diagnostics);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::ModuleBuilder;
    use crate::model::Kind;

    fn module() -> Module {
        let mut b = ModuleBuilder::linux();
        let foo = b.node(Kind::Class, &[("name", "Foo")], vec![]);
        b.repo("Test", &[], vec![foo]);
        b.finish_merged()
    }

    fn foo_attr(module: &Module, key: &str) -> Option<String> {
        let ns = module.namespace("Test").unwrap();
        let foo = module.arena.children(ns)[0];
        module.arena.attr(foo, key).map(str::to_string)
    }

    #[test]
    fn directory_file_then_registered_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Test-1.0.metadata"), "Foo a=dir b=dir\n").unwrap();
        let mut diags = Diagnostics::new();
        let extra = RuleFile::parse("extra.metadata", "Foo b=extra\n", &mut diags);
        let metadata = Metadata::from_dir(dir.path()).with_rules("Test", extra);

        let mut m = module();
        metadata.apply(&mut m, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(foo_attr(&m, "a").as_deref(), Some("dir"));
        assert_eq!(foo_attr(&m, "b").as_deref(), Some("extra"));
    }

    #[test]
    fn missing_file_means_no_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut diags = Diagnostics::new();
        let m = module();
        let repo = m.repository("Test").unwrap();
        assert!(RuleFile::load(dir.path(), repo, &mut diags).is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn unreadable_file_is_error_without_line() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as text.
        std::fs::create_dir(dir.path().join("Test-1.0.metadata")).unwrap();
        let mut diags = Diagnostics::new();
        let m = module();
        let repo = m.repository("Test").unwrap();
        assert!(RuleFile::load(dir.path(), repo, &mut diags).is_none());
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.line, None);
        assert!(diag.to_string().starts_with("Test-1.0.metadata: cannot read file"));
    }
}
