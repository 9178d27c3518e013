//! The complete resolution pipeline.
//!
//! ```text
//! documents ─▶ link (per platform) ─▶ merge ─▶ flag ─▶ patches ─▶ rule files ─▶ link
//! ```
//!
//! Every stage consumes the previous stage's module and returns a new one.
//! Lookup tables live inside a single run, so pipelines never share state.

use crate::diagnostics::Diagnostics;
use crate::document::{Document, LoadOptions};
use crate::error::Result;
use crate::flag::{flag, FlagPolicy};
use crate::link::{link, Links, SymbolIndex};
use crate::merge::{merge, MergePolicy, MergeReport};
use crate::metadata::Metadata;
use crate::model::{Module, Platform};
use crate::patch::{Patch, PatchEngine};

/// Everything configurable about a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub load: LoadOptions,
    pub policy: MergePolicy,
    pub flags: FlagPolicy,
}

/// The final model with its links and everything reported on the way.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub module: Module,
    pub links: Links,
    pub report: MergeReport,
    pub diagnostics: Diagnostics,
}

pub struct Pipeline {
    config: PipelineConfig,
    patches: PatchEngine,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline {
            config,
            patches: PatchEngine::new(),
        }
    }

    /// Append the GLib, GObject and Gtk patches.
    pub fn with_builtin_patches(mut self) -> Self {
        for patch in PatchEngine::builtin().into_patches() {
            self.patches.register(patch);
        }
        self
    }

    pub fn with_patch<P: Patch + 'static>(mut self, patch: P) -> Self {
        self.patches.register(Box::new(patch));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn patch_names(&self) -> Vec<&'static str> {
        self.patches.names()
    }

    /// Build one module per platform. A platform without documents yields
    /// an empty module.
    pub fn load(&self, inputs: Vec<(Platform, Vec<Document>)>) -> Result<Vec<Module>> {
        let mut modules = Vec::with_capacity(inputs.len());
        for (platform, documents) in inputs {
            modules.push(Module::from_documents(platform, documents, &self.config.load)?);
        }
        Ok(modules)
    }

    /// Load the documents of each platform and resolve them.
    pub fn run(
        &self,
        inputs: Vec<(Platform, Vec<Document>)>,
        metadata: &Metadata,
    ) -> Result<Resolved> {
        let modules = self.load(inputs)?;
        self.run_modules(modules, metadata)
    }

    /// Resolve modules that are already loaded.
    pub fn run_modules(&self, modules: Vec<Module>, metadata: &Metadata) -> Result<Resolved> {
        let mut diagnostics = Diagnostics::new();

        // Per-platform links only mark the trees. Their warnings would be
        // repeated by the final link, so they are logged but not kept.
        let mut linked = Vec::with_capacity(modules.len());
        for module in modules {
            let platform = module.platform;
            let result = link(module);
            tracing::debug!(
                platform = ?platform,
                unresolved = result.links.unresolved().count(),
                "linked platform module"
            );
            linked.push(result.module);
        }

        let merged = merge(linked, &self.config.policy)?;
        if !merged.report.missing.is_empty() {
            tracing::info!(report = %merged.report.to_string().trim_end(), "merge report");
        }

        let module = flag(merged.module, &self.config.flags);

        let index = SymbolIndex::build(&module);
        let mut module = self.patches.apply(module, &index)?;

        metadata.apply(&mut module, &mut diagnostics);

        let result = link(module);
        diagnostics.extend(result.diagnostics);

        Ok(Resolved {
            module: result.module,
            links: result.links,
            report: merged.report,
            diagnostics,
        })
    }
}
