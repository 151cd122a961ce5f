/// tsbuf command-line tool: detect the packet size of a transport stream
/// and walk every packet through the parallel decode buffer.
///
/// # Command overview
///
/// ```text
/// tsbuf <COMMAND> [OPTIONS]
///
/// Commands:
///   probe      Detect the packet size from the head of a stream
///   inspect    Decode every packet and print per-PID totals
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Raise log verbosity (-v debug, -vv trace)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// `-` in place of a file name reads standard input. Standard input
/// cannot be rewound, so auto-detection on it skips ahead to the next
/// packet boundary instead of re-reading the probed bytes.
///
/// # Exit codes
///
/// | Code | Meaning                                      |
/// |------|----------------------------------------------|
/// | 0    | Success (per-packet decode errors included)  |
/// | 1    | Error (I/O failure, undetectable stream)     |
///
/// Reports go to stdout; logs and errors go to stderr.
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tsbuf_buffer::DEFAULT_CHUNK_PACKETS;
use tsbuf_wire::ByteSource;

mod cmd_inspect;
mod cmd_probe;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Transport stream framing and buffering tool.
#[derive(Parser)]
#[command(name = "tsbuf", version, about = "Transport stream packet buffer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise log verbosity. `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Detect the packet size from the head of a stream.
    Probe(ProbeArgs),
    /// Decode every packet and print per-PID totals.
    Inspect(InspectArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `tsbuf probe`.
#[derive(clap::Args)]
pub struct ProbeArgs {
    /// Stream to probe, or `-` for standard input.
    pub input: PathBuf,
}

/// Arguments for `tsbuf inspect`.
///
/// ```text
/// ┌─────────────────┬───────────────────────────────────────────────┐
/// │ Flag            │ Effect                                        │
/// ├─────────────────┼───────────────────────────────────────────────┤
/// │ --packet-size N │ Skip detection and trust N (default: detect)  │
/// │ --chunk-packets │ Packets per bulk read (default 10 000)        │
/// │ --workers N     │ Decode threads (default: one per CPU)         │
/// │ --json          │ Emit the report as JSON                       │
/// └─────────────────┴───────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Stream to inspect, or `-` for standard input.
    pub input: PathBuf,

    /// Fixed packet size in bytes. 0 detects it from the stream.
    #[arg(long, default_value_t = 0)]
    pub packet_size: usize,

    /// Packets read per refill.
    #[arg(long, default_value_t = DEFAULT_CHUNK_PACKETS)]
    pub chunk_packets: usize,

    /// Decode worker threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Open `path` as a byte source. `-` is standard input, which cannot be
/// rewound; files can.
pub(crate) fn open_input(path: &Path) -> Result<Box<dyn ByteSource>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(Box::new(file))
}

/// Display name for `path` in reports.
pub(crate) fn input_name(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "<stdin>".to_string()
    } else {
        path.display().to_string()
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Probe(args) => cmd_probe::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
