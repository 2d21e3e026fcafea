//! Upload sources: block splitting, hashing and random-access block reads.
//!
//! A source is restartable: every [`DataSource::open`] yields a fresh
//! cursor at offset zero, so concurrent block reads each work on their own
//! stream. The derived fields (`size`, `blocks`, `hashes`, `content_hash`)
//! are materialized together on first use and never change afterwards;
//! materialization costs one full read of the source.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::OnceLock;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::block::{hash_blocks, BlockInfo, BLOCK_SIZE};
use crate::{Error, Result};

/// Creates the scratch files that back spilled upload streams.
pub trait TempFileProvider: Send + Sync {
    fn create_temp_file(&self) -> io::Result<NamedTempFile>;
}

/// Default provider: a configured directory, or the system temp directory.
#[derive(Debug, Clone, Default)]
pub struct SystemTempFiles {
    dir: Option<PathBuf>,
}

impl SystemTempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl TempFileProvider for SystemTempFiles {
    fn create_temp_file(&self) -> io::Result<NamedTempFile> {
        match &self.dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
    }
}

enum Backing {
    Memory(Bytes),
    Disk {
        path: PathBuf,
        /// Deletes the spill file when the source is dropped.
        _temp: Option<NamedTempFile>,
    },
}

struct Materialized {
    size: u64,
    blocks: Vec<BlockInfo>,
    hashes: HashSet<String>,
    content_hash: String,
}

/// A restartable, random-access byte source for one upload.
pub struct DataSource {
    backing: Backing,
    materialized: OnceLock<Materialized>,
}

impl DataSource {
    /// Source over an in-memory buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            backing: Backing::Memory(data.into()),
            materialized: OnceLock::new(),
        }
    }

    /// Source over an existing file. The file must stay unmodified for the
    /// lifetime of the source.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::Disk {
                path: path.into(),
                _temp: None,
            },
            materialized: OnceLock::new(),
        }
    }

    /// Copies a non-restartable stream into a fresh temp file and returns
    /// a source backed by it. The file is removed when the source drops.
    pub fn spill(reader: &mut dyn Read, provider: &dyn TempFileProvider) -> Result<Self> {
        let mut temp = provider.create_temp_file()?;
        let copied = io::copy(reader, temp.as_file_mut())?;
        debug!(bytes = copied, path = %temp.path().display(), "spilled upload stream to temp file");
        Ok(Self {
            backing: Backing::Disk {
                path: temp.path().to_path_buf(),
                _temp: Some(temp),
            },
            materialized: OnceLock::new(),
        })
    }

    /// Opens a fresh cursor at offset zero.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match &self.backing {
            Backing::Memory(data) => Ok(Box::new(io::Cursor::new(data.clone()))),
            Backing::Disk { path, .. } => Ok(Box::new(File::open(path)?)),
        }
    }

    /// Total size in bytes.
    ///
    /// File-backed sources answer from filesystem metadata until the block
    /// list has been materialized.
    pub fn size(&self) -> Result<u64> {
        if let Some(m) = self.materialized.get() {
            return Ok(m.size);
        }
        match &self.backing {
            Backing::Memory(data) => Ok(data.len() as u64),
            Backing::Disk { path, .. } => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// The ordered block list. Empty for a zero-length source.
    pub fn blocks(&self) -> Result<&[BlockInfo]> {
        Ok(&self.materialized()?.blocks)
    }

    /// The set of distinct block hashes, hex encoded.
    pub fn hashes(&self) -> Result<&HashSet<String>> {
        Ok(&self.materialized()?.hashes)
    }

    /// Digest of the ordered block-hash list, see [`hash_blocks`].
    pub fn content_hash(&self) -> Result<&str> {
        Ok(&self.materialized()?.content_hash)
    }

    /// Reads one block and verifies it against the expected hex hash.
    ///
    /// A mismatch means the backing bytes changed after the block list was
    /// announced; the error poisons the whole upload.
    pub fn block(&self, offset: u64, size: usize, expected_hex: &str) -> Result<Vec<u8>> {
        let mut stream = self.open()?;
        skip_exact(stream.as_mut(), offset)?;
        let mut buffer = vec![0u8; size];
        let got = read_full(stream.as_mut(), &mut buffer)?;
        if got < size {
            return Err(Error::ShortRead {
                offset,
                wanted: size,
                got,
            });
        }
        let computed = hex::encode(Sha256::digest(&buffer));
        if computed != expected_hex {
            return Err(Error::HashMismatch {
                offset,
                expected: expected_hex.to_string(),
                computed,
            });
        }
        Ok(buffer)
    }

    fn materialized(&self) -> Result<&Materialized> {
        if let Some(m) = self.materialized.get() {
            return Ok(m);
        }
        // A concurrent caller may have raced us through process_stream;
        // first set wins and both observe the same backing bytes.
        let m = self.process_stream()?;
        Ok(self.materialized.get_or_init(|| m))
    }

    fn process_stream(&self) -> Result<Materialized> {
        let mut stream = self.open()?;
        let mut blocks = Vec::new();
        let mut offset = 0u64;
        loop {
            let mut chunk = vec![0u8; BLOCK_SIZE];
            let read = read_full(stream.as_mut(), &mut chunk)?;
            if read == 0 {
                break;
            }
            chunk.truncate(read);
            let hash: [u8; 32] = Sha256::digest(&chunk).into();
            blocks.push(BlockInfo {
                offset,
                size: read as u32,
                hash,
            });
            offset += read as u64;
            if read < BLOCK_SIZE {
                break;
            }
        }
        let hashes = blocks.iter().map(BlockInfo::hash_hex).collect();
        let content_hash = hash_blocks(&blocks);
        Ok(Materialized {
            size: offset,
            blocks,
            hashes,
            content_hash,
        })
    }
}

/// Fills as much of `buffer` as the stream allows; short only at EOF.
fn read_full(stream: &mut dyn Read, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match stream.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Consumes exactly `offset` bytes from the front of the stream.
fn skip_exact(stream: &mut dyn Read, offset: u64) -> Result<()> {
    let mut remaining = offset;
    let mut scratch = [0u8; 8192];
    while remaining > 0 {
        let want = scratch.len().min(remaining as usize);
        match stream.read(&mut scratch[..want]) {
            Ok(0) => {
                return Err(Error::ShortSeek {
                    offset,
                    missing: remaining,
                })
            }
            Ok(n) => remaining -= n as u64,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_empty_source_has_no_blocks() {
        let source = DataSource::from_bytes(Vec::new());
        assert_eq!(source.size().unwrap(), 0);
        assert!(source.blocks().unwrap().is_empty());
        assert!(source.hashes().unwrap().is_empty());
    }

    #[test]
    fn test_single_short_block() {
        let data = patterned(1024);
        let source = DataSource::from_bytes(data.clone());
        let blocks = source.blocks().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].offset, 0);
        assert_eq!(blocks[0].size, 1024);
        let expected: [u8; 32] = Sha256::digest(&data).into();
        assert_eq!(blocks[0].hash, expected);
    }

    #[test]
    fn test_multi_block_partition() {
        let source = DataSource::from_bytes(patterned(300_000));
        let blocks = source.blocks().unwrap();
        let sizes: Vec<_> = blocks.iter().map(|b| b.size).collect();
        let offsets: Vec<_> = blocks.iter().map(|b| b.offset).collect();
        assert_eq!(sizes, [131_072, 131_072, 37_856]);
        assert_eq!(offsets, [0, 131_072, 262_144]);
        assert_eq!(source.size().unwrap(), 300_000);
    }

    #[test]
    fn test_exact_multiple_of_block_size() {
        let source = DataSource::from_bytes(patterned(2 * BLOCK_SIZE));
        let blocks = source.blocks().unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.size as usize == BLOCK_SIZE));
    }

    #[test]
    fn test_block_round_trip() {
        let data = patterned(300_000);
        let source = DataSource::from_bytes(data.clone());
        let blocks = source.blocks().unwrap().to_vec();
        let mut reassembled = Vec::new();
        for block in &blocks {
            let bytes = source
                .block(block.offset, block.size as usize, &block.hash_hex())
                .unwrap();
            reassembled.extend_from_slice(&bytes);
        }
        assert_eq!(reassembled, data);
    }

    #[test]
    fn test_block_rejects_wrong_hash() {
        let source = DataSource::from_bytes(patterned(1024));
        let err = source.block(0, 1024, &"00".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::HashMismatch { .. }));
    }

    #[test]
    fn test_block_rejects_offset_beyond_end() {
        let source = DataSource::from_bytes(patterned(10));
        let err = source.block(100, 4, &"00".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::ShortSeek { .. }));
    }

    #[test]
    fn test_block_rejects_short_read() {
        let source = DataSource::from_bytes(patterned(10));
        let err = source.block(4, 100, &"00".repeat(32)).unwrap_err();
        assert!(matches!(err, Error::ShortRead { .. }));
    }

    #[test]
    fn test_file_backed_source_matches_memory_source() {
        let data = patterned(200_000);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        let on_disk = DataSource::from_path(file.path());
        let in_memory = DataSource::from_bytes(data);
        assert_eq!(on_disk.size().unwrap(), in_memory.size().unwrap());
        assert_eq!(on_disk.blocks().unwrap(), in_memory.blocks().unwrap());
        assert_eq!(
            on_disk.content_hash().unwrap(),
            in_memory.content_hash().unwrap()
        );
    }

    #[test]
    fn test_spill_is_restartable_and_cleans_up() {
        let data = patterned(5000);
        let provider = SystemTempFiles::new();
        let source = DataSource::spill(&mut &data[..], &provider).unwrap();
        let path = match &source.backing {
            Backing::Disk { path, .. } => path.clone(),
            Backing::Memory(_) => unreachable!(),
        };
        // two independent cursors over the same spilled bytes
        for _ in 0..2 {
            let mut copy = Vec::new();
            source.open().unwrap().read_to_end(&mut copy).unwrap();
            assert_eq!(copy, data);
        }
        drop(source);
        assert!(!path.exists());
    }

    #[test]
    fn test_derived_fields_are_stable() {
        let source = DataSource::from_bytes(patterned(300_000));
        let first = source.content_hash().unwrap().to_string();
        let blocks = source.blocks().unwrap().to_vec();
        assert_eq!(source.content_hash().unwrap(), first);
        assert_eq!(source.blocks().unwrap(), blocks);
    }
}
