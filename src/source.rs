//! Byte sources: the storage capability every container reads through.
//!
//! A [`ByteSource`] is an immutable, length-known, randomly addressable run
//! of bytes.  Two backends ship with the crate:
//!
//! - [`MmapSource`]: a read-only memory map of a resource file.
//! - [`MemorySource`]: a shared, reference-counted byte array.  Reads only
//!   ever slice the array, so clones may be read from any thread.
//!
//! Closing a source releases its backing memory.  A closed source reports a
//! length of zero and reads as zeros; containers built on it therefore fall
//! back to empty results instead of faulting.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

// ── ByteSource ────────────────────────────────────────────────────────────────

pub trait ByteSource: Send + Sync + fmt::Debug {
    /// Copy bytes starting at `offset` into `buf`.
    ///
    /// A short count means the end of the source was reached.  An `offset`
    /// past the end is an `InvalidInput` error.
    fn read_at(&self, buf: &mut [u8], offset: usize) -> io::Result<usize>;

    /// Total length in bytes, header and padding included.
    fn len(&self) -> usize;

    /// Single byte at `index`; zero when `index` is out of range.
    fn byte_at(&self, index: usize) -> u8;

    /// Release the backing memory.  Calling it again is a no-op.
    fn close(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the whole source when the backend is slice-addressable.
    fn as_slice(&self) -> Option<&[u8]> {
        None
    }
}

fn read_from_slice(data: &[u8], buf: &mut [u8], offset: usize) -> io::Result<usize> {
    if offset > data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("offset {offset} beyond end of source ({} bytes)", data.len()),
        ));
    }
    let n = buf.len().min(data.len() - offset);
    buf[..n].copy_from_slice(&data[offset..offset + n]);
    Ok(n)
}

// ── MmapSource ────────────────────────────────────────────────────────────────

/// Read-only memory map of a single resource file.
#[derive(Debug)]
pub struct MmapSource {
    path: PathBuf,
    map:  Option<Mmap>,
}

impl MmapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::open(&path)?;
        // SAFETY: archives are immutable once written; the map is read-only
        // and never outlives the source that owns it.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { path, map: Some(map) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for MmapSource {
    fn read_at(&self, buf: &mut [u8], offset: usize) -> io::Result<usize> {
        read_from_slice(self.map.as_deref().unwrap_or(&[]), buf, offset)
    }

    fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.len())
    }

    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        self.map
            .as_deref()
            .and_then(|m| m.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn close(&mut self) {
        if self.map.take().is_some() {
            tracing::debug!(path = %self.path.display(), "unmapped resource");
        }
    }

    fn as_slice(&self) -> Option<&[u8]> {
        self.map.as_deref()
    }
}

// ── MemorySource ──────────────────────────────────────────────────────────────

/// Byte source over a shared in-memory array.
#[derive(Clone)]
pub struct MemorySource {
    data: Option<Arc<[u8]>>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: Some(data.into()) }
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("len", &self.len())
            .field("open", &self.data.is_some())
            .finish()
    }
}

impl ByteSource for MemorySource {
    fn read_at(&self, buf: &mut [u8], offset: usize) -> io::Result<usize> {
        read_from_slice(self.data.as_deref().unwrap_or(&[]), buf, offset)
    }

    fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        self.data
            .as_deref()
            .and_then(|d| d.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn close(&mut self) {
        self.data = None;
    }

    fn as_slice(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn memory_read_at_short_read_at_end() {
        let src = MemorySource::new(vec![1u8, 2, 3, 4]);
        let mut buf = [0u8; 3];
        assert_eq!(src.read_at(&mut buf, 2).unwrap(), 2);
        assert_eq!(&buf[..2], &[3, 4]);
        assert_eq!(src.read_at(&mut buf, 4).unwrap(), 0);
        assert!(src.read_at(&mut buf, 5).is_err());
    }

    #[test]
    fn byte_at_out_of_range_is_zero() {
        let src = MemorySource::new(vec![0xAB]);
        assert_eq!(src.byte_at(0), 0xAB);
        assert_eq!(src.byte_at(1), 0);
    }

    #[test]
    fn close_releases_and_is_idempotent() {
        let mut src = MemorySource::new(vec![7u8; 16]);
        assert_eq!(src.len(), 16);
        src.close();
        src.close();
        assert_eq!(src.len(), 0);
        assert_eq!(src.byte_at(0), 0);
        assert!(src.as_slice().is_none());
    }

    #[test]
    fn mmap_reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789abcdef").unwrap();
        file.flush().unwrap();

        let mut src = MmapSource::open(file.path()).unwrap();
        assert_eq!(src.len(), 16);
        assert_eq!(src.byte_at(10), b'a');
        assert_eq!(src.as_slice().unwrap(), b"0123456789abcdef");

        src.close();
        assert!(src.is_empty());
    }

    #[test]
    fn mmap_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MmapSource::open(dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
