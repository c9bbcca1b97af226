//! Inspect, hash and compare recorded traces.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use corewar_recorder::trace_reader::{first_divergence, read_trace_file, trace_digest, TraceFile};

#[derive(Parser)]
#[command(name = "corewar-trace")]
#[command(about = "Inspect CoreWar execution traces", long_about = None)]
#[command(version)]
enum Commands {
    /// Print the header, event counts and the first events
    Inspect {
        /// Trace file
        file: PathBuf,

        /// Number of events to list
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Emit a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },

    /// SHA-256 of the event stream
    Digest {
        /// Trace file
        file: PathBuf,
    },

    /// Report the first event at which two traces differ
    Diff {
        left: PathBuf,
        right: PathBuf,
    },
}

fn load(path: &Path) -> Result<TraceFile> {
    read_trace_file(path).with_context(|| format!("reading {}", path.display()))
}

fn inspect(path: &Path, limit: usize, as_json: bool) -> Result<()> {
    let trace = load(path)?;
    let header = &trace.header;
    let counts = trace.kind_counts();

    if as_json {
        let names: Vec<_> = header
            .participants
            .iter()
            .flatten()
            .map(|p| json!({ "name": p.name, "start": p.start }))
            .collect();
        let kinds: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(kind, n)| (kind.name().to_string(), json!(n)))
            .collect();
        let summary = json!({
            "version": header.version,
            "core_size": header.core_size,
            "total_cycles": header.total_cycles,
            "total_events": header.total_events,
            "events_present": trace.events.len(),
            "finalized": trace.is_finalized(),
            "trailing_bytes": trace.trailing_bytes,
            "participants": names,
            "kinds": kinds,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("version       {}", header.version);
    println!("core size     {}", header.core_size);
    println!("total cycles  {}", header.total_cycles);
    println!(
        "events        {} recorded, header says {}{}",
        trace.events.len(),
        header.total_events,
        if trace.is_finalized() { "" } else { " (not finalized)" }
    );
    if trace.trailing_bytes > 0 {
        println!("trailing      {} bytes", trace.trailing_bytes);
    }
    for (idx, p) in header.participants.iter().flatten().enumerate() {
        println!("warrior {}     {} @ {}", idx, p.name, p.start);
    }
    for (kind, n) in &counts {
        println!("  {:<6} {}", kind.name(), n);
    }
    for event in trace.events.iter().take(limit) {
        println!(
            "{:>8} {:<6} addr={:<5} w={} data={}",
            event.cycle,
            event.kind.name(),
            event.address,
            event.warrior_id,
            event.data
        );
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Commands::parse() {
        Commands::Inspect { file, limit, json } => inspect(&file, limit, json)?,
        Commands::Digest { file } => {
            let trace = load(&file)?;
            println!("{}  {}", trace_digest(&trace), file.display());
        }
        Commands::Diff { left, right } => {
            let a = load(&left)?;
            let b = load(&right)?;
            match first_divergence(&a, &b) {
                Some(divergence) => {
                    println!("{}", divergence);
                    return Ok(ExitCode::FAILURE);
                }
                None => println!("identical ({} events)", a.events.len()),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
