/// Implementation of `pcx compress`.
///
/// # Output format
///
/// ```text
/// big.log -> big.log.pcx: 9 blocks, 1114112 -> 123456 bytes (11.1%)
/// ```
use std::path::PathBuf;

use anyhow::{Context, Result};
use pcx_driver::{CompressOptions, compress_file};
use pcx_types::CancelToken;

use crate::{CompressArgs, percent, progress_sink};

/// Run the `pcx compress` command.
///
/// # Errors
///
/// Returns an error for invalid options, I/O failures and cancellation.
/// A partially written output file is removed.
pub async fn run(args: &CompressArgs, cancel: CancelToken) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));
    let options = CompressOptions {
        level: args.level,
        block_size: args.block_size,
        pipeline: args.pipeline.config(),
        ..CompressOptions::default()
    };

    let result = compress_file(
        &args.input,
        &output,
        &options,
        progress_sink(args.progress),
        cancel,
    )
    .await;
    if args.progress {
        eprintln!();
    }

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(e).with_context(|| format!("failed to compress {}", args.input.display()));
        }
    };

    println!(
        "{} -> {}: {} block{}, {} -> {} bytes ({:.1}%)",
        args.input.display(),
        output.display(),
        stats.blocks,
        if stats.blocks == 1 { "" } else { "s" },
        stats.bytes_read,
        stats.bytes_written,
        percent(stats.bytes_written, stats.bytes_read),
    );
    Ok(())
}

fn default_output(input: &std::path::Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".pcx");
    PathBuf::from(name)
}
