//! Zero-copy reader for bit-packed, schema-checked binary archives.
//!
//! An archive is a directory of resources.  Each resource is a framed byte
//! blob (see [`header`]) plus a schema sidecar; each backs one container:
//! a [`Vector`], [`RawData`], [`Instance`], [`Multivector`] or a nested
//! [`Archive`].  Struct fields are read straight from mapped memory by the
//! bit-field [`codec`]; nothing is copied or deserialized up front.

pub mod codec;
pub mod header;
pub mod source;
pub mod error;
pub mod resolver;
pub mod structs;
pub mod describe;
pub mod vector;
pub mod rawdata;
pub mod instance;
pub mod multivector;
pub mod archive;
pub mod verify;

pub use archive::{Archive, ArchiveError, ArchiveSchema, OpenOptions, ResourceKind, ResourceSpec};
pub use error::ErrorKind;
pub use instance::Instance;
pub use multivector::{BucketPolicy, DecodeError, Multivector, Variant, VariantSet};
pub use rawdata::RawData;
pub use resolver::{FileResolver, MemoryResolver, ResourceError, ResourceResolver};
pub use source::{ByteSource, MemorySource, MmapSource};
pub use structs::{Field, FieldValue, Struct, StructLayout, StructView};
pub use vector::Vector;
pub use verify::{verify_archive, VerifyReport};
