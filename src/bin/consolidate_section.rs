//! Section Consolidation Binary
//!
//! Reads the per-level slices of one section as JSON, consolidates them and
//! prints the resulting `CollectedSlices` (slices, conflicts, constraint rows
//! and stats) as JSON on stdout.
//!
//! ## Input
//!
//! A JSON array of levels, coarsest first; each level is an array of slices:
//!
//! ```json
//! [[{"id": 1, "section": 0, "region": [{"x": 0, "y": 0}]}], []]
//! ```
//!
//! The section is taken from the slices themselves.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `SLICE_KERNEL_SIMILARITY_THRESHOLD`: duplicate threshold in [0, 1] (default: 0.75)
//! - `SLICE_KERNEL_SINGLETON_POLICY`: "unconflicted" or "always" (default: unconflicted)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin consolidate_section -- levels.json > collected.json
//! cat levels.json | cargo run --bin consolidate_section
//! ```

use std::error::Error;
use std::io::{self, Read, Write};

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slice_kernel::{KernelConfig, Slice, SliceCollector, SliceSet, SLICE_KERNEL_SCHEMA_VERSION};

/// Initialize the tracing subscriber with JSON or pretty format.
///
/// Logs go to stderr; stdout carries the result.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "consolidate_section=info,slice_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    }
}

fn read_input() -> io::Result<String> {
    let mut input = String::new();
    match std::env::args().nth(1) {
        Some(path) if path != "-" => input = std::fs::read_to_string(path)?,
        _ => {
            io::stdin().read_to_string(&mut input)?;
        }
    }
    Ok(input)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = KernelConfig::from_env()?;
    info!(
        schema_version = SLICE_KERNEL_SCHEMA_VERSION,
        similarity_threshold = config.consolidation.similarity_threshold,
        singleton_policy = %config.synthesis.singleton_policy,
        params_hash = %config.params_hash(),
        "Starting section consolidation"
    );

    let raw_levels: Vec<Vec<Slice>> = serde_json::from_str(&read_input()?)?;
    let section = raw_levels
        .iter()
        .flatten()
        .map(Slice::section)
        .next()
        .unwrap_or(0);

    let levels = raw_levels
        .into_iter()
        .map(SliceSet::from_slices)
        .collect::<Result<Vec<_>, _>>()?;

    let collector = SliceCollector::new(config)?;
    let collected = collector.collect(section, levels)?;

    info!(
        section,
        slices = collected.slices.len(),
        constraints = collected.constraints.len(),
        removed = collected.stats.removed(),
        passes = collected.stats.passes,
        fingerprint = %collected.fingerprint(),
        "Section consolidated"
    );

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &collected)?;
    writeln!(stdout)?;
    Ok(())
}
