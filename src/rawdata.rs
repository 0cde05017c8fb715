//! Untyped byte blob.

use std::borrow::Cow;

use crate::describe::{ContainerDescription, ContainerType};
use crate::header::{self, ResourceHeader, SIZE_HEADER_LEN};
use crate::source::ByteSource;

#[derive(Debug)]
pub struct RawData {
    source: Box<dyn ByteSource>,
}

impl RawData {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self { source }
    }

    /// Payload length from the size header.
    pub fn size(&self) -> usize {
        header::payload_len(&*self.source).map_or(0, |len| len as usize)
    }

    /// The payload bytes.
    ///
    /// Borrowed straight from the source when it is slice-addressable,
    /// copied out otherwise.  A payload claiming more bytes than the source
    /// holds yields the bytes that exist.
    pub fn value(&self) -> Cow<'_, [u8]> {
        let size = self.size();
        if let Some(bytes) = self.source.as_slice() {
            let end = SIZE_HEADER_LEN.saturating_add(size).min(bytes.len());
            return Cow::Borrowed(bytes.get(SIZE_HEADER_LEN..end).unwrap_or(&[]));
        }
        let size = size.min(self.source.len().saturating_sub(SIZE_HEADER_LEN));
        let mut buf = vec![0u8; size];
        let read = self.source.read_at(&mut buf, SIZE_HEADER_LEN).unwrap_or(0);
        buf.truncate(read);
        Cow::Owned(buf)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.source.len()
    }

    pub fn header(&self) -> Option<ResourceHeader> {
        ResourceHeader::read(&*self.source).ok()
    }

    pub fn is_open(&self) -> bool {
        !self.source.is_empty()
    }

    pub fn close(&mut self) {
        self.source.close();
    }

    pub fn describe(&self) -> ContainerDescription {
        ContainerDescription {
            container_type: ContainerType::RawData,
            size:           self.size(),
            size_in_bytes:  self.size_in_bytes(),
            element_types:  Vec::new(),
            index_type:     None,
            archive:        None,
        }
    }

    pub(crate) fn source(&self) -> &dyn ByteSource {
        &*self.source
    }
}
