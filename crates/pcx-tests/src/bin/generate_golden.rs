//! Golden fixture generator for the PCX conformance suite.
//!
//! Writes every fixture under `tests/golden/`. Run it after a deliberate
//! wire-format change, then review the inline snapshots in
//! `tests/conformance.rs`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_golden -p pcx-tests
//! ```
//!
//! # Generated fixtures
//!
//! | File              | Contents                                        |
//! |-------------------|-------------------------------------------------|
//! | hello.pcx         | Three stored-Deflate frames: "Hello, parallel world!\n" |
//! | zero_length.pcx   | One frame holding an empty stored-Deflate block |
//!
//! Stored blocks keep the fixtures independent of any particular Deflate
//! implementation's choices.

#![allow(clippy::pedantic)]

use std::path::Path;

use pcx_tests::{HELLO_BLOCKS, golden_dir, stored_stream};

fn main() {
    let dir = golden_dir();
    std::fs::create_dir_all(&dir).unwrap();

    write(&dir, "hello.pcx", &stored_stream(&HELLO_BLOCKS));
    write(&dir, "zero_length.pcx", &stored_stream(&[&b""[..]]));

    println!("All golden fixtures written to {}", dir.display());
}

fn write(dir: &Path, name: &str, bytes: &[u8]) {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    println!("  {name}: {} bytes", bytes.len());
}
