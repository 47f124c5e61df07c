//! Paired on-disk artifact for a saved store.
//!
//! `<prefix>.index` holds the vectors: magic `DCIX`, format version (u32),
//! dimension (u32), row count (u64), then `count * dimension` f32 values, all
//! little-endian, in insertion order. `<prefix>.json` holds
//! `{texts, metadata, dimension}` in the same order. Both files must exist and
//! agree for a load to succeed.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use docchat_core::error::{Error, Result};
use docchat_core::types::ChunkMetadata;

use crate::IndexEntry;

const MAGIC: &[u8; 4] = b"DCIX";
const FORMAT_VERSION: u32 = 1;
/// Magic, version, dimension and count.
const HEADER_LEN: u64 = 4 + 4 + 4 + 8;

#[derive(Debug, Serialize, Deserialize)]
struct Bundle {
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
    dimension: usize,
}

pub fn index_path(prefix: &Path) -> PathBuf { with_suffix(prefix, ".index") }

pub fn bundle_path(prefix: &Path) -> PathBuf { with_suffix(prefix, ".json") }

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(prefix.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

pub fn save(prefix: &Path, dimension: usize, entries: &[IndexEntry]) -> Result<()> {
    let header_dim = u32::try_from(dimension)
        .map_err(|_| Error::Persist(format!("dimension {} does not fit the index header", dimension)))?;
    let header_count = u64::try_from(entries.len())
        .map_err(|_| Error::Persist(format!("{} entries do not fit the index header", entries.len())))?;
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut w = BufWriter::new(File::create(index_path(prefix))?);
    w.write_all(MAGIC)?;
    w.write_all(&FORMAT_VERSION.to_le_bytes())?;
    w.write_all(&header_dim.to_le_bytes())?;
    w.write_all(&header_count.to_le_bytes())?;
    for entry in entries {
        for x in &entry.vector {
            w.write_all(&x.to_le_bytes())?;
        }
    }
    w.flush()?;

    let bundle = Bundle {
        texts: entries.iter().map(|e| e.text.clone()).collect(),
        metadata: entries.iter().map(|e| e.metadata.clone()).collect(),
        dimension,
    };
    let w = BufWriter::new(File::create(bundle_path(prefix))?);
    serde_json::to_writer(w, &bundle)?;
    Ok(())
}

/// Read both files and join them back into entries. Returns the stored
/// dimension alongside the entries.
///
/// The index header is checked against the bundle and against the file size
/// before any row is read, so a damaged header fails the load instead of
/// driving the allocation.
pub fn load(prefix: &Path) -> Result<(usize, Vec<IndexEntry>)> {
    let (index_file, bundle_file) = (index_path(prefix), bundle_path(prefix));
    for p in [&index_file, &bundle_file] {
        if !p.exists() {
            return Err(Error::NotFound(p.display().to_string()));
        }
    }

    let mut r = BufReader::new(File::open(&index_file)?);
    let header = read_header(&mut r, &index_file)?;
    let bundle: Bundle = serde_json::from_reader(BufReader::new(File::open(&bundle_file)?))?;

    if u64::from(header.dimension) != bundle.dimension as u64 {
        return Err(Error::Persist(format!(
            "index dimension {} does not match bundle dimension {}",
            header.dimension, bundle.dimension
        )));
    }
    if bundle.texts.len() as u64 != header.count || bundle.metadata.len() as u64 != header.count {
        return Err(Error::Persist(format!(
            "{} vectors but {} texts and {} metadata records",
            header.count,
            bundle.texts.len(),
            bundle.metadata.len()
        )));
    }
    let expected_len = header
        .count
        .checked_mul(u64::from(header.dimension))
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| Error::Persist("index header sizes overflow".to_string()))?;
    let actual_len = fs::metadata(&index_file)?.len();
    if actual_len != expected_len {
        return Err(Error::Persist(format!(
            "index file is {} bytes, header describes {}",
            actual_len, expected_len
        )));
    }

    let dimension = bundle.dimension;
    let mut row = vec![0u8; dimension * 4];
    let mut entries = Vec::with_capacity(bundle.texts.len());
    for (text, metadata) in bundle.texts.into_iter().zip(bundle.metadata) {
        r.read_exact(&mut row)
            .map_err(|e| Error::Persist(format!("truncated index file: {}", e)))?;
        let vector = row
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        entries.push(IndexEntry { vector, text, metadata });
    }
    Ok((dimension, entries))
}

struct Header {
    dimension: u32,
    count: u64,
}

fn read_header(r: &mut impl Read, path: &Path) -> Result<Header> {
    let truncated = |e: std::io::Error| Error::Persist(format!("truncated index header in {}: {}", path.display(), e));
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(truncated)?;
    if &magic != MAGIC {
        return Err(Error::Persist(format!("{} is not an index file", path.display())));
    }
    let mut word = [0u8; 4];
    r.read_exact(&mut word).map_err(truncated)?;
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(Error::Persist(format!("unsupported index format version {}", version)));
    }
    r.read_exact(&mut word).map_err(truncated)?;
    let dimension = u32::from_le_bytes(word);
    let mut count = [0u8; 8];
    r.read_exact(&mut count).map_err(truncated)?;
    Ok(Header { dimension, count: u64::from_le_bytes(count) })
}
