//! `ctm-write`: serializes a topic-map snapshot as a CTM document.
//!
//! Reads a JSON snapshot of a `ctm_model::TopicMap`, applies the writer
//! configuration and writes one CTM document to a file or standard output.
//! Log output goes to standard error and is filtered by `RUST_LOG`.
//!
//! **Usage:**
//! ```
//! ctm-write --graph <snapshot.json> [--config <writer.toml>] [--out <file>]
//!           [--set <key=value>]... [--prefix <label=namespace>]...
//!           [--include <iri>]... [--mergemap <iri=notation>]...
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ctm_model::TopicMap;
use ctm_writer::{CtmWriter, WriterConfig};
use tracing_subscriber::EnvFilter;

/// Write a topic-map snapshot as Compact Topic Maps.
#[derive(Parser)]
#[command(name = "ctm-write", about = "Write a topic-map snapshot as a CTM document")]
struct Args {
    /// JSON snapshot of the topic map.
    #[arg(long)]
    graph: PathBuf,

    /// TOML writer configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file. Standard output if omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Overrides one configuration property, e.g. `template-merge=true`.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    settings: Vec<String>,

    /// Binds a prefix label, e.g. `ex=http://example.org/`.
    #[arg(long = "prefix", value_name = "LABEL=NAMESPACE")]
    prefixes: Vec<String>,

    /// Adds an `%include` directive.
    #[arg(long = "include", value_name = "IRI")]
    includes: Vec<String>,

    /// Adds a `%mergemap` directive, e.g. `http://example.org/m.xtm=xtm`.
    #[arg(long = "mergemap", value_name = "IRI=NOTATION")]
    merge_maps: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            WriterConfig::from_toml_str(&source)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?
        }
        None => WriterConfig::default(),
    };
    for setting in &args.settings {
        let (key, value) = split_pair(setting, "--set")?;
        config
            .set(key, value)
            .with_context(|| format!("Invalid setting '{setting}'"))?;
    }

    let mut writer = CtmWriter::new(config)?;
    for binding in &args.prefixes {
        let (label, namespace) = split_pair(binding, "--prefix")?;
        writer.add_prefix(label, namespace)?;
    }
    for iri in &args.includes {
        writer.add_include(iri.as_str());
    }
    for entry in &args.merge_maps {
        // The IRI may carry `=` in its query; the notation never does.
        let (iri, notation) = entry
            .rsplit_once('=')
            .with_context(|| format!("--mergemap expects IRI=NOTATION, got '{entry}'"))?;
        writer.add_merge_map(iri.trim(), notation.trim());
    }

    let snapshot = fs::read_to_string(&args.graph)
        .with_context(|| format!("Failed to read {}", args.graph.display()))?;
    let graph: TopicMap = serde_json::from_str(&snapshot)
        .with_context(|| format!("Failed to parse topic map snapshot {}", args.graph.display()))?;
    tracing::info!(
        topics = graph.topic_count(),
        associations = graph.association_count(),
        "loaded snapshot"
    );

    let report = match &args.out {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut sink = BufWriter::new(file);
            let report = writer
                .write(&graph, &mut sink)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            sink.flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("  Written: {}", path.display());
            report
        }
        None => {
            let stdout = io::stdout();
            let mut sink = stdout.lock();
            writer
                .write(&graph, &mut sink)
                .context("Failed to write CTM to standard output")?
        }
    };

    eprintln!(
        "{} topics, {} associations, {} invocations, {} templates, {} skipped",
        report.topics,
        report.associations,
        report.invocations,
        report.templates_defined,
        report.skipped
    );
    Ok(())
}

/// Splits `key=value`.
fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .with_context(|| format!("{flag} expects KEY=VALUE, got '{raw}'"))
}
