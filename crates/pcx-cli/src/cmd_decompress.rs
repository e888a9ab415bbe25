/// Implementation of `pcx decompress`.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pcx_driver::{DecompressOptions, decompress_file};
use pcx_types::CancelToken;

use crate::{DecompressArgs, progress_sink};

/// Run the `pcx decompress` command.
///
/// # Errors
///
/// Returns an error if the input is not a well-formed PCX stream, on I/O
/// failure, or when cancelled. A partially written output file is removed.
pub async fn run(args: &DecompressArgs, cancel: CancelToken) -> Result<()> {
    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.input)?,
    };
    let options = DecompressOptions {
        pipeline: args.pipeline.config(),
        max_block_len: args.max_block_len,
        ..DecompressOptions::default()
    };

    let result = decompress_file(
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
            return Err(e)
                .with_context(|| format!("failed to decompress {}", args.input.display()));
        }
    };

    println!(
        "{} -> {}: {} block{}, {} -> {} bytes",
        args.input.display(),
        output.display(),
        stats.blocks,
        if stats.blocks == 1 { "" } else { "s" },
        stats.bytes_read,
        stats.bytes_written,
    );
    Ok(())
}

/// Strip a trailing `.pcx`; refuse to guess otherwise so the input is
/// never overwritten.
fn default_output(input: &Path) -> Result<PathBuf> {
    match input.extension() {
        Some(ext) if ext == "pcx" => Ok(input.with_extension("")),
        _ => anyhow::bail!(
            "cannot derive an output name from {}; pass -o/--output",
            input.display()
        ),
    }
}
