//! girweave: resolve per-platform introspection documents into one model.
//!
//! ```text
//! girweave --linux gir/linux --windows 'gir/windows/*.json' \
//!          --metadata metadata --generate Gtk -f tree -o model.txt
//! ```

mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use girweave::document::{Document, LoadOptions};
use girweave::flag::FlagPolicy;
use girweave::merge::MergePolicy;
use girweave::metadata::Metadata;
use girweave::model::{Platform, Platforms};
use girweave::pipeline::{Pipeline, PipelineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "girweave",
    about = "Link, merge and patch per-platform introspection documents"
)]
struct Cli {
    /// Linux documents: files, directories or glob patterns
    #[arg(long, value_name = "PATH")]
    linux: Vec<String>,

    /// Windows documents: files, directories or glob patterns
    #[arg(long, value_name = "PATH")]
    windows: Vec<String>,

    /// macOS documents: files, directories or glob patterns
    #[arg(long, value_name = "PATH")]
    macos: Vec<String>,

    /// Directory holding <Namespace>-<Version>.metadata rule files
    #[arg(long, value_name = "DIR")]
    metadata: Option<PathBuf>,

    /// Generate bindings only for these repositories (default: all).
    /// Can be specified multiple times.
    #[arg(long, value_name = "NAME")]
    generate: Vec<String>,

    /// Documentation URL prefix of a namespace, e.g. Gtk=https://docs.gtk.org/gtk4
    #[arg(long, value_name = "NAME=URL", value_parser = parse_doc_url)]
    doc_url: Vec<(String, String)>,

    /// Platform priority for merge conflicts
    #[arg(long, default_value = "linux,windows,macos")]
    priority: MergePolicy,

    /// Platforms on which C variadic functions are flagged unsupported
    #[arg(long, value_name = "PLATFORMS")]
    unsupported_varargs: Option<Platforms>,

    /// Output format: json (default) or tree
    #[arg(short = 'f', long, default_value = "json")]
    format: String,

    /// Write the output to a file instead of stdout. A directory receives
    /// model.json or model.txt.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn parse_doc_url(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        _ => Err(format!("expected NAME=URL, got {}", s)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "girweave=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let renderer = render::create_renderer(&cli.format)?;

    let sources = [
        (Platform::Linux, &cli.linux),
        (Platform::Windows, &cli.windows),
        (Platform::Macos, &cli.macos),
    ];
    if sources.iter().all(|(_, patterns)| patterns.is_empty()) {
        bail!("no input documents. Use --linux, --windows or --macos");
    }

    let mut inputs = Vec::new();
    for (platform, patterns) in sources {
        if patterns.is_empty() {
            continue;
        }
        let mut documents = Vec::new();
        for path in expand_globs(patterns)? {
            let doc = Document::load(&path)
                .with_context(|| format!("failed to load {} document", platform))?;
            documents.push(doc);
        }
        inputs.push((platform, documents));
    }

    let config = PipelineConfig {
        load: LoadOptions {
            generate: (!cli.generate.is_empty()).then(|| cli.generate.iter().cloned().collect()),
            doc_urls: cli.doc_url.iter().cloned().collect(),
        },
        policy: cli.priority.clone(),
        flags: FlagPolicy {
            varargs: cli.unsupported_varargs.unwrap_or_default(),
        },
    };

    let metadata = match cli.metadata {
        Some(ref dir) => {
            if !dir.is_dir() {
                bail!("metadata directory not found: {}", dir.display());
            }
            Metadata::from_dir(dir)
        }
        None => Metadata::new(),
    };

    let resolved = Pipeline::new(config)
        .with_builtin_patches()
        .run(inputs, &metadata)?;

    for diagnostic in resolved.diagnostics.iter() {
        eprintln!("{}: {}", diagnostic.severity, diagnostic);
    }
    for (repository, platforms) in &resolved.report.missing {
        eprintln!("warning: {} is missing on {}", repository, platforms);
    }

    let output = renderer.render(&resolved)?;
    match cli.output {
        Some(ref path) => {
            let path = if path.is_dir() {
                path.join(format!("model.{}", renderer.file_extension()))
            } else {
                path.clone()
            };
            fs::write(&path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => print!("{}", output),
    }
    Ok(())
}

/// Expand files, directories (their `*.json` files) and glob patterns into
/// a sorted list of document paths.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json") {
                    files.push(p);
                }
            }
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            eprintln!("warning: no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    files.sort();
    files.dedup();
    Ok(files)
}
