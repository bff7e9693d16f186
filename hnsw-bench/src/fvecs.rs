//! fvecs/ivecs dataset loaders (SPEC_FULL §6, "Fvecs/ivecs format").
//!
//! Little-endian stream of records, each `i32` dim header followed by
//! `dim` little-endian 32-bit values (`f32` for fvecs, `i32` for ivecs).
//! A partial trailing record — a header with fewer than `dim * 4` bytes
//! left in the file — is dropped silently rather than treated as an
//! error, matching the spec's "truncate gracefully" requirement.
//!
//! Grounded in `examples/deven96-ahnlich/ahnlich/similarity/benches/hnsw_bench.rs`'s
//! `read_fvec_file`/`read_ivec_file`, generalized to return `io::Result`
//! and to drop (rather than `expect`-panic on) a truncated final record.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

fn read_records<T>(
    path: impl AsRef<Path>,
    decode: impl Fn(&[u8]) -> T,
) -> io::Result<Vec<Vec<T>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 4];
    let mut records = Vec::new();

    loop {
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        let dim = i32::from_le_bytes(header).max(0) as usize;

        let mut body = vec![0u8; dim * 4];
        match reader.read_exact(&mut body) {
            Ok(()) => {}
            // A truncated trailing record: stop, keep what was read so far.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let record: Vec<T> = body.chunks_exact(4).map(|c| decode(c)).collect();
        records.push(record);
    }

    Ok(records)
}

/// Reads a `.fvecs` file: each record is a vector of `f32`.
pub fn read_fvecs(path: impl AsRef<Path>) -> io::Result<Vec<Vec<f32>>> {
    read_records(path, |chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
}

/// Reads a `.ivecs` file: each record is a vector of `i32` (typically
/// ground-truth neighbor ids).
pub fn read_ivecs(path: impl AsRef<Path>) -> io::Result<Vec<Vec<i32>>> {
    read_records(path, |chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
}
