//! OpenSubtitles-style content hash.
//!
//! The hash is the file size plus the wrapping sum of the little-endian
//! 64-bit words in the first and last 64 KiB, printed as 16 hex digits. It
//! identifies a file by content while reading at most 128 KiB of it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use webmeta_core::FileInfo;

const CHUNK_SIZE: u64 = 64 * 1024; // 64 KB

/// Hash of a file together with the size it was computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    pub hash: String,
    pub size: u64,
}

/// Compute the content hash of any seekable reader.
pub fn compute_hash<R: Read + Seek>(reader: &mut R) -> io::Result<ContentHash> {
    let size = reader.seek(SeekFrom::End(0))?;
    let chunk = CHUNK_SIZE.min(size);

    let mut sum = size;
    reader.seek(SeekFrom::Start(0))?;
    sum = sum.wrapping_add(sum_words(reader, chunk)?);
    reader.seek(SeekFrom::Start(size - chunk))?;
    sum = sum.wrapping_add(sum_words(reader, chunk)?);

    Ok(ContentHash {
        hash: format!("{sum:016x}"),
        size,
    })
}

/// Wrapping sum of the little-endian words in the next `len` bytes. A short
/// trailing word is zero-padded.
fn sum_words<R: Read>(reader: &mut R, len: u64) -> io::Result<u64> {
    let mut buf = Vec::with_capacity(len as usize);
    reader.take(len).read_to_end(&mut buf)?;
    Ok(buf.chunks(8).fold(0u64, |acc, word| {
        let mut bytes = [0u8; 8];
        bytes[..word.len()].copy_from_slice(word);
        acc.wrapping_add(u64::from_le_bytes(bytes))
    }))
}

pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    compute_hash(&mut file)
}

/// Hash a file on the blocking pool.
pub async fn hash_file_async(path: PathBuf) -> io::Result<ContentHash> {
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(io::Error::other)?
}

/// Fill in the content hash of `info` if the host did not supply one.
///
/// A file that cannot be read keeps its attributes unchanged; the resolver
/// reports it as not found on its own.
pub async fn fill_hash(mut info: FileInfo) -> FileInfo {
    if info.hash.is_some() {
        return info;
    }
    match hash_file_async(info.path.clone()).await {
        Ok(hashed) => {
            log::debug!("Hashed {}: {}", info.path.display(), hashed.hash);
            info.hash = Some(hashed.hash);
            info.file_size = Some(hashed.size);
        }
        Err(e) => log::debug!("Could not hash {}: {}", info.path.display(), e),
    }
    info
}

#[cfg(test)]
#[path = "tests/hasher_tests.rs"]
mod tests;
