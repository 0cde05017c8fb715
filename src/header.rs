//! Resource framing.
//!
//! ```text
//! [ payload length : u64 LE ][ payload ... ][ 8 zero bytes ]
//! ```
//!
//! Every resource, whatever container it backs, is framed this way.  The
//! length prefix counts payload bytes only; the zero tail lets the bit-field
//! codec over-read the last struct of a resource by up to one word.

use std::io;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::source::ByteSource;

/// Bytes taken by the payload length prefix.
pub const SIZE_HEADER_LEN: usize = 8;
/// Bytes of zero padding after the payload.
pub const PADDING_LEN: usize = 8;
/// Smallest well-formed resource: empty payload, header and padding only.
pub const MIN_RESOURCE_LEN: usize = SIZE_HEADER_LEN + PADDING_LEN;

/// Read the payload length prefix, or `None` when it cannot be read
/// (closed or truncated source).
pub fn payload_len<S: ByteSource + ?Sized>(source: &S) -> Option<u64> {
    let mut buf = [0u8; SIZE_HEADER_LEN];
    match source.read_at(&mut buf, 0) {
        Ok(SIZE_HEADER_LEN) => Some(LittleEndian::read_u64(&buf)),
        _                   => None,
    }
}

// ── ResourceHeader ────────────────────────────────────────────────────────────

/// Decoded framing of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceHeader {
    pub payload_len: u64,
    pub total_len:   u64,
}

impl ResourceHeader {
    pub fn read<S: ByteSource + ?Sized>(source: &S) -> io::Result<Self> {
        let total_len = source.len() as u64;
        if (total_len as usize) < MIN_RESOURCE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("resource is {total_len} bytes, minimum is {MIN_RESOURCE_LEN}"),
            ));
        }
        let payload_len = payload_len(source).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "size header unreadable")
        })?;
        Ok(Self { payload_len, total_len })
    }

    /// `true` when header, payload and padding fit in the source.
    pub fn is_consistent(&self) -> bool {
        self.payload_len
            .checked_add(MIN_RESOURCE_LEN as u64)
            .is_some_and(|framed| framed <= self.total_len)
    }

    /// `true` when the eight bytes after the payload are all zero.
    pub fn padding_is_zero<S: ByteSource + ?Sized>(&self, source: &S) -> bool {
        if !self.is_consistent() {
            return false;
        }
        let start = SIZE_HEADER_LEN + self.payload_len as usize;
        (start..start + PADDING_LEN).all(|i| source.byte_at(i) == 0)
    }
}
