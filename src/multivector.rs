//! Multivector: per-index buckets of tagged, heterogeneous structs.
//!
//! # Layout
//! A multivector is two resources.  The payload resource holds every bucket
//! back to back; each element is a one-byte type tag followed by the packed
//! struct of the variant the tag selects:
//!
//! ```text
//! [ size ][ tag | struct ][ tag | struct ] ... [ padding ]
//!          '---- bucket 0 ----'  '- bucket 1 -' ...
//! ```
//!
//! The companion `<name>_index` resource is a [`Vector`] of unsigned offsets;
//! entry `i` is where bucket `i` starts, relative to the payload start.
//! Bucket `i` ends where bucket `i + 1` starts; the last bucket ends at the
//! padding tail.  Buckets carry no in-band delimiters.
//!
//! # Tags
//! Tag `t` selects `variants[t]`.  A tag outside the declared variants makes
//! the bucket malformed.  Under [`BucketPolicy::Strict`] the read fails with
//! [`DecodeError::MalformedBucket`]; under [`BucketPolicy::Lenient`] the
//! bucket is cut short at the bad tag and a warning is logged.

use std::ops::Range;

use thiserror::Error;

use crate::codec;
use crate::describe::{ContainerDescription, ContainerType, StructDescription};
use crate::error::ErrorKind;
use crate::header::{ResourceHeader, PADDING_LEN, SIZE_HEADER_LEN};
use crate::source::ByteSource;
use crate::structs::{StructLayout, StructView};
use crate::vector::Vector;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bucket {bucket}: tag {tag} at byte {offset} matches none of the {variants} declared variants")]
    MalformedBucket {
        bucket:   usize,
        offset:   usize,
        tag:      u8,
        variants: usize,
    },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::MalformedBucket { .. } => ErrorKind::MalformedBucket,
        }
    }
}

/// How bucket reads treat a tag outside the declared variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketPolicy {
    /// Fail the read.
    #[default]
    Strict,
    /// Log and end the bucket at the bad tag.  Matches what older readers
    /// did; data after the bad tag is silently lost.
    Lenient,
}

// ── Variant ───────────────────────────────────────────────────────────────────

/// One element of a bucket: its tag and the struct it selects.
#[derive(Debug, Clone, Copy)]
pub struct Variant<'a> {
    pub tag:  u8,
    pub view: StructView<'a>,
}

/// Typed sum over the variants of one multivector.
///
/// Implementations match on `variant.tag` over `0..VARIANTS.len()` and
/// return `None` for anything else.
pub trait VariantSet<'a>: Sized {
    const VARIANTS: &'static [&'static StructLayout];

    fn from_variant(variant: Variant<'a>) -> Option<Self>;
}

// ── Multivector ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Multivector {
    source:   Box<dyn ByteSource>,
    index:    Vector,
    variants: &'static [&'static StructLayout],
    policy:   BucketPolicy,
}

impl Multivector {
    pub fn new(
        source:   Box<dyn ByteSource>,
        index:    Vector,
        variants: &'static [&'static StructLayout],
    ) -> Self {
        Self { source, index, variants, policy: BucketPolicy::default() }
    }

    pub fn with_policy(mut self, policy: BucketPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BucketPolicy {
        self.policy
    }

    pub fn variants(&self) -> &'static [&'static StructLayout] {
        self.variants
    }

    pub fn index(&self) -> &Vector {
        &self.index
    }

    /// Number of buckets.
    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// Bytes of the payload resource.  The index resource is accounted
    /// separately through [`Multivector::index`].
    pub fn size_in_bytes(&self) -> usize {
        self.source.len()
    }

    /// Raw index entry `i`: bucket start relative to the payload start.
    pub fn index_value(&self, i: usize) -> u64 {
        self.index
            .layout()
            .fields
            .first()
            .map_or(0, |field| self.index.get(i).read::<u64>(field))
    }

    /// Absolute byte range of bucket `i`; empty when `i` is out of range.
    pub fn bucket_range(&self, i: usize) -> Range<usize> {
        let size = self.size();
        if i >= size {
            return 0..0;
        }
        self.bucket_offset(i, size)..self.bucket_offset(i + 1, size)
    }

    /// Elements of bucket `i`, in stored order.
    pub fn bucket(&self, i: usize) -> Bucket<'_> {
        self.bucket_with(i, self.policy)
    }

    pub fn bucket_with(&self, i: usize, policy: BucketPolicy) -> Bucket<'_> {
        let range = self.bucket_range(i);
        Bucket {
            multivector: self,
            bucket:      i,
            offset:      range.start,
            end:         range.end,
            policy,
            done:        false,
        }
    }

    /// Collect bucket `i`.
    pub fn get(&self, i: usize) -> Result<Vec<Variant<'_>>, DecodeError> {
        self.bucket(i).collect()
    }

    /// Collect bucket `i` through a typed variant set.
    pub fn get_as<'a, E: VariantSet<'a>>(&'a self, i: usize) -> Result<Vec<E>, DecodeError> {
        self.bucket(i)
            .map(|item| {
                let variant = item?;
                E::from_variant(variant).ok_or(DecodeError::MalformedBucket {
                    bucket:   i,
                    offset:   variant.view.position() - 1,
                    tag:      variant.tag,
                    variants: E::VARIANTS.len(),
                })
            })
            .collect()
    }

    pub fn header(&self) -> Option<ResourceHeader> {
        ResourceHeader::read(&*self.source).ok()
    }

    pub fn is_open(&self) -> bool {
        !self.source.is_empty()
    }

    pub fn close(&mut self) {
        self.source.close();
        self.index.close();
    }

    pub fn describe(&self) -> ContainerDescription {
        ContainerDescription {
            container_type: ContainerType::Multivector,
            size:           self.size(),
            size_in_bytes:  self.size_in_bytes(),
            element_types:  self.variants.iter().map(|l| StructDescription::from(*l)).collect(),
            index_type:     Some(StructDescription::from(self.index.layout())),
            archive:        None,
        }
    }

    fn bucket_offset(&self, i: usize, size: usize) -> usize {
        if i == size {
            return self.source.len().saturating_sub(PADDING_LEN);
        }
        (self.index_value(i) as usize).saturating_add(SIZE_HEADER_LEN)
    }

    pub(crate) fn source(&self) -> &dyn ByteSource {
        &*self.source
    }
}

// ── Bucket ────────────────────────────────────────────────────────────────────

/// Lazy walk over one bucket; see [`Multivector::bucket`].
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    multivector: &'a Multivector,
    bucket:      usize,
    offset:      usize,
    end:         usize,
    policy:      BucketPolicy,
    done:        bool,
}

impl<'a> Iterator for Bucket<'a> {
    type Item = Result<Variant<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.end {
            return None;
        }
        let mv = self.multivector;
        let tag_at = self.offset;
        let tag: u8 = codec::read(&*mv.source, tag_at.saturating_mul(8), 8);
        self.offset += 1;

        let Some(layout) = mv.variants.get(usize::from(tag)) else {
            self.done = true;
            return match self.policy {
                BucketPolicy::Strict => Some(Err(DecodeError::MalformedBucket {
                    bucket:   self.bucket,
                    offset:   tag_at,
                    tag,
                    variants: mv.variants.len(),
                })),
                BucketPolicy::Lenient => {
                    tracing::warn!(
                        bucket = self.bucket,
                        offset = tag_at,
                        tag,
                        "unknown multivector tag, dropping rest of bucket"
                    );
                    None
                }
            };
        };

        let view = StructView::new(&*mv.source, self.offset, layout);
        self.offset = self.offset.saturating_add(layout.size_in_bytes);
        Some(Ok(Variant { tag, view }))
    }
}
