/// PCX command-line tool: compress, decompress and inspect `.pcx` files
/// using parallel block Deflate.
///
/// # Command overview
///
/// ```text
/// pcx <COMMAND> [OPTIONS]
///
/// Commands:
///   compress     Compress a file into PCX frames
///   decompress   Restore the original bytes of a PCX file
///   inspect      Walk and validate the frames of a PCX file
///   help         Print help information
///
/// Global options:
///   -v, --verbose    Raise log verbosity (repeat for more; RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                            |
/// |------|----------------------------------------------------|
/// | 0    | Success                                            |
/// | 1    | Error (I/O failure, malformed file, cancelled...)  |
///
/// All error details are written to stderr so stdout can be piped cleanly.
/// Ctrl-C cancels a running compress or decompress; the partial output
/// file is removed.
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pcx_driver::DEFAULT_BLOCK_SIZE;
use pcx_types::{CancelToken, CompressionLevel, ConfigError, NoProgress, PipelineConfig, SharedProgress};
use tracing_subscriber::EnvFilter;

mod cmd_compress;
mod cmd_decompress;
mod cmd_inspect;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Parallel block Deflate for large files.
#[derive(Parser)]
#[command(name = "pcx", version, about = "Parallel block Deflate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise log verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into PCX frames.
    Compress(CompressArgs),
    /// Restore the original bytes of a PCX file.
    Decompress(DecompressArgs),
    /// Walk and validate the frames of a PCX file.
    Inspect(InspectArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Worker pool sizing shared by `compress` and `decompress`.
#[derive(clap::Args)]
pub struct PipelineArgs {
    /// Concurrent codec workers (default: one per CPU).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Queue depth in blocks (default: 8 per worker).
    #[arg(long)]
    pub capacity: Option<usize>,
}

impl PipelineArgs {
    pub fn config(&self) -> PipelineConfig {
        let mut config = match self.jobs {
            Some(jobs) => PipelineConfig::with_parallelism(jobs),
            None => PipelineConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config = config.capacity(capacity);
        }
        config
    }
}

/// Arguments for `pcx compress`.
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────────────────┐
/// │ Flag         │ Values / default                                     │
/// ├──────────────┼──────────────────────────────────────────────────────┤
/// │ --level      │ none | fastest | optimal (default) | smallest        │
/// │ --block-size │ raw bytes per frame (default 131072)                 │
/// │ -j / --jobs  │ worker count (default: CPU count)                    │
/// │ --capacity   │ queue depth (default: 8 × jobs)                      │
/// │ --progress   │ print a percentage on stderr                         │
/// │ -o/--output  │ output path (default: INPUT.pcx)                     │
/// └──────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct CompressArgs {
    /// File to compress.
    pub input: PathBuf,

    /// Output file (default: the input path with `.pcx` appended).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compression level: `none`, `fastest`, `optimal` or `smallest`.
    #[arg(short, long, default_value = "optimal", value_parser = parse_level)]
    pub level: CompressionLevel,

    /// Raw bytes per block. Smaller blocks parallelise better, larger ones
    /// compress better.
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Report progress on stderr.
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for `pcx decompress`.
#[derive(clap::Args)]
pub struct DecompressArgs {
    /// PCX file to decompress.
    pub input: PathBuf,

    /// Output file (default: the input path without its `.pcx` extension).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Reject blocks that decompress to more than this many bytes.
    #[arg(long)]
    pub max_block_len: Option<usize>,

    /// Report progress on stderr.
    #[arg(long)]
    pub progress: bool,
}

/// Arguments for `pcx inspect`.
///
/// Reads the whole file, checks every frame header and decompresses each
/// payload to report raw sizes. Exits with code 1 if the file is not a
/// well-formed PCX stream.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the `.pcx` file to inspect.
    pub file: PathBuf,

    /// List every frame, not just the totals.
    #[arg(long)]
    pub frames: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

fn parse_level(s: &str) -> Result<CompressionLevel, ConfigError> {
    s.parse()
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Progress sink printing a percentage on stderr, or a no-op.
pub fn progress_sink(enabled: bool) -> SharedProgress {
    if !enabled {
        return Arc::new(NoProgress);
    }
    Arc::new(|p: f64| eprint!("\r{:5.1}%", p * 100.0))
}

/// `compressed` as a percentage of `raw`.
#[allow(clippy::cast_precision_loss)]
pub fn percent(compressed: u64, raw: u64) -> f64 {
    if raw == 0 {
        0.0
    } else {
        compressed as f64 / raw as f64 * 100.0
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    let result = match cli.command {
        Commands::Compress(args) => cmd_compress::run(&args, cancel).await,
        Commands::Decompress(args) => cmd_decompress::run(&args, cancel).await,
        Commands::Inspect(args) => cmd_inspect::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
