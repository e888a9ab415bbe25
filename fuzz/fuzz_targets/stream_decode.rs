#![no_main]

use std::io::Cursor;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use pcx_driver::{decompress_parallel_to, DecompressOptions};
use pcx_types::{CancelToken, NoProgress, PipelineConfig};

// Fuzz target: the full parallel decompression path over arbitrary bytes.
//
// Every outcome is acceptable except a panic, a hang, or an error that is
// neither a format error nor I/O.
fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let options = DecompressOptions {
        pipeline: PipelineConfig::with_parallelism(2).capacity(2),
        max_block_len: Some(1 << 20),
        ..DecompressOptions::default()
    };

    let mut out = Vec::new();
    let result = rt.block_on(decompress_parallel_to(
        Cursor::new(data.to_vec()),
        &mut out,
        &options,
        Arc::new(NoProgress),
        CancelToken::new(),
    ));

    if let Err(pcx_driver::DriverError::Decode(e)) = result {
        assert!(e.is_format_error(), "{e:?}");
    }
});
