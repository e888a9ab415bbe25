//! Progress reporting through the copy functions and the file helpers.
//!
//! With a known source length each direction reports once per block and
//! then a final 1.0, so `ceil(len / block_size) + 1` reports in total, in
//! non-decreasing order.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use pcx_driver::{
    CompressOptions, DecompressOptions, compress_file, compress_parallel_to, decompress_file,
    decompress_parallel_to,
};
use pcx_tests::{progress_recorder, sample_data};
use pcx_types::{CancelToken, NoProgress, PipelineConfig};

const LEN: usize = 1024 * 1088;
const BLOCK: usize = 128 * 1024;

fn compress_options(source_len: Option<u64>) -> CompressOptions {
    CompressOptions {
        block_size: BLOCK,
        pipeline: PipelineConfig::with_parallelism(4),
        source_len,
        ..CompressOptions::default()
    }
}

fn assert_well_formed(seen: &[f64], expected_reports: usize) {
    assert_eq!(seen.len(), expected_reports, "{seen:?}");
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert!(seen.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(seen.last().copied(), Some(1.0));
}

async fn compressed_sample() -> (Vec<u8>, Vec<u8>) {
    let data = sample_data(LEN, 42);
    let (compressed, _) = compress_parallel_to(
        &mut &data[..],
        Vec::new(),
        &compress_options(None),
        Arc::new(NoProgress),
        CancelToken::new(),
    )
    .await
    .unwrap();
    (data, compressed)
}

#[tokio::test]
async fn compression_reports_once_per_block() {
    let data = sample_data(LEN, 42);
    let (progress, seen) = progress_recorder();

    compress_parallel_to(
        &mut &data[..],
        Vec::new(),
        &compress_options(Some(LEN as u64)),
        progress,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_well_formed(&seen.lock().unwrap(), LEN.div_ceil(BLOCK) + 1);
}

#[tokio::test]
async fn decompression_reports_once_per_block() {
    let (_, compressed) = compressed_sample().await;
    let (progress, seen) = progress_recorder();

    let mut out = Vec::new();
    decompress_parallel_to(
        Cursor::new(compressed.clone()),
        &mut out,
        &DecompressOptions {
            source_len: Some(compressed.len() as u64),
            ..DecompressOptions::default()
        },
        progress,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_well_formed(&seen.lock().unwrap(), LEN.div_ceil(BLOCK) + 1);
}

#[tokio::test]
async fn unknown_length_reports_only_completion() {
    let (_, compressed) = compressed_sample().await;
    let (progress, seen) = progress_recorder();

    let mut out = Vec::new();
    decompress_parallel_to(
        Cursor::new(compressed),
        &mut out,
        &DecompressOptions::default(),
        progress,
        CancelToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1.0]);
}

struct TempFiles(Vec<PathBuf>);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[tokio::test]
async fn file_helpers_report_and_roundtrip() {
    let dir = std::env::temp_dir();
    let stem = format!("pcx-progress-{}", std::process::id());
    let files = TempFiles(vec![
        dir.join(format!("{stem}.bin")),
        dir.join(format!("{stem}.pcx")),
        dir.join(format!("{stem}.out")),
    ]);
    let [plain, packed, restored] = [&files.0[0], &files.0[1], &files.0[2]];

    let data = sample_data(LEN, 7);
    tokio::fs::write(plain, &data).await.unwrap();

    let (progress, seen) = progress_recorder();
    let stats = compress_file(plain, packed, &compress_options(None), progress, CancelToken::new())
        .await
        .unwrap();
    assert_eq!(stats.bytes_read, LEN as u64);
    assert_well_formed(&seen.lock().unwrap(), LEN.div_ceil(BLOCK) + 1);

    let (progress, seen) = progress_recorder();
    decompress_file(
        packed,
        restored,
        &DecompressOptions::default(),
        progress,
        CancelToken::new(),
    )
    .await
    .unwrap();
    assert_well_formed(&seen.lock().unwrap(), LEN.div_ceil(BLOCK) + 1);

    assert_eq!(tokio::fs::read(restored).await.unwrap(), data);
}
