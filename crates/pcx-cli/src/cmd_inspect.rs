/// Implementation of `pcx inspect`.
///
/// Reads a PCX file, walks its frames, verifies every header and inflates
/// every payload to measure the raw size. Nothing is written.
///
/// # Output format
///
/// ```text
/// File:        big.log.pcx (123528 bytes)
/// Frames:      9
/// Compressed:  123456 payload bytes
/// Raw:         1114112 bytes
/// Ratio:       11.1%
/// Status:      ok
/// ```
///
/// With `--frames`, one line per frame follows the totals:
///
/// ```text
/// Frame 0  offset=0x00000000  compressed=13741  raw=131072
/// ```
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use pcx_decoder::decompress_block;
use pcx_wire::{Frames, HEADER_SIZE};
use serde::Serialize;

use crate::{InspectArgs, percent};

// ── Report types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct FrameReport {
    index: usize,
    offset: usize,
    compressed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Report {
    file: String,
    file_size: usize,
    frames: usize,
    compressed_bytes: u64,
    raw_bytes: u64,
    ratio_percent: f64,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frame_details: Vec<FrameReport>,
}

/// Run the `pcx inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or after printing the
/// report if the file is not a well-formed PCX stream.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let report = inspect(&args.file, &bytes, args.frames);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    if let Some(error) = &report.error {
        bail!("{} is not a well-formed PCX stream: {error}", args.file.display());
    }
    Ok(())
}

/// Walk every frame of `bytes`. Stops at the first framing error; codec
/// errors are recorded per frame and the walk continues, since the next
/// header is still trustworthy.
fn inspect(path: &Path, bytes: &[u8], keep_frames: bool) -> Report {
    let mut report = Report {
        file: path.display().to_string(),
        file_size: bytes.len(),
        frames: 0,
        compressed_bytes: 0,
        raw_bytes: 0,
        ratio_percent: 0.0,
        valid: true,
        error: None,
        frame_details: Vec::new(),
    };

    for (index, frame) in Frames::new(bytes).enumerate() {
        let (offset, payload) = match frame {
            Ok(frame) => frame,
            Err(e) => {
                report.valid = false;
                report.error = Some(format!("frame {index}: {e}"));
                break;
            }
        };

        let (raw, error) = match decompress_block(payload, None) {
            Ok(raw) => (Some(raw.len()), None),
            Err(e) => (None, Some(e.to_string())),
        };

        report.frames += 1;
        report.compressed_bytes += payload.len() as u64;
        report.raw_bytes += raw.unwrap_or(0) as u64;
        if let Some(e) = &error
            && report.error.is_none()
        {
            report.valid = false;
            report.error = Some(format!("frame {index} at offset {offset}: {e}"));
        }

        if keep_frames {
            report.frame_details.push(FrameReport {
                index,
                offset,
                compressed: payload.len(),
                raw,
                error,
            });
        }
    }

    report.ratio_percent = percent(report.compressed_bytes, report.raw_bytes);
    report
}

fn print_text(report: &Report) {
    println!("File:        {} ({} bytes)", report.file, report.file_size);
    println!("Frames:      {}", report.frames);
    println!(
        "Compressed:  {} payload bytes (+{} header bytes)",
        report.compressed_bytes,
        report.frames * HEADER_SIZE
    );
    println!("Raw:         {} bytes", report.raw_bytes);
    println!("Ratio:       {:.1}%", report.ratio_percent);
    match &report.error {
        None => println!("Status:      ok"),
        Some(e) => println!("Status:      INVALID ({e})"),
    }

    for frame in &report.frame_details {
        let raw = frame
            .raw
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        print!(
            "Frame {}  offset=0x{:08x}  compressed={}  raw={raw}",
            frame.index, frame.offset, frame.compressed
        );
        match &frame.error {
            Some(e) => println!("  error: {e}"),
            None => println!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcx_encoder::compress_block;
    use pcx_types::CompressionLevel;
    use pcx_wire::write_frame;

    fn stream(blocks: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for block in blocks {
            let payload = compress_block(block, CompressionLevel::Fastest).unwrap();
            write_frame(&mut out, &payload).unwrap();
        }
        out
    }

    #[test]
    fn totals_for_a_valid_stream() {
        let a = vec![b'a'; 5000];
        let b = vec![b'b'; 3000];
        let bytes = stream(&[&a[..], &b[..]]);

        let report = inspect(Path::new("x.pcx"), &bytes, true);
        assert!(report.valid);
        assert_eq!(report.frames, 2);
        assert_eq!(report.raw_bytes, 8000);
        assert_eq!(
            report.compressed_bytes as usize + 2 * HEADER_SIZE,
            bytes.len()
        );
        assert_eq!(report.frame_details[1].raw, Some(3000));
    }

    #[test]
    fn framing_error_stops_the_walk() {
        let mut bytes = stream(&[&[1u8; 100][..], &[2u8; 100][..]]);
        let second = stream(&[&[1u8; 100][..]]).len();
        bytes[second] ^= 0x40;

        let report = inspect(Path::new("x.pcx"), &bytes, false);
        assert!(!report.valid);
        assert_eq!(report.frames, 1);
        assert!(report.error.unwrap().starts_with("frame 1"));
        assert!(report.frame_details.is_empty());
    }

    #[test]
    fn codec_error_is_recorded_and_walk_continues() {
        let mut bytes = Vec::new();
        write_frame(&mut bytes, &[0xFF; 8]).unwrap();
        bytes.extend(stream(&[&[3u8; 10][..]]));

        let report = inspect(Path::new("x.pcx"), &bytes, true);
        assert!(!report.valid);
        assert_eq!(report.frames, 2);
        assert!(report.frame_details[0].error.is_some());
        assert_eq!(report.frame_details[1].raw, Some(10));
    }

    #[test]
    fn json_report_omits_empty_details() {
        let bytes = stream(&[&b"hello"[..]]);
        let report = inspect(Path::new("x.pcx"), &bytes, false);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["frames"], 1);
        assert_eq!(json["raw_bytes"], 5);
        assert!(json.get("frame_details").is_none());
        assert!(json.get("error").is_none());
    }
}
