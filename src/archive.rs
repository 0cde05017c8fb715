//! High-level [`Archive`] API: the primary embedding surface.
//!
//! An archive type is described by a static [`ArchiveSchema`]: its name and
//! the ordered list of resources it declares, each with its container kind,
//! element layouts, optionality and the canonical schema text the resource
//! must have been written with.  Generated bindings supply that table;
//! [`Archive::open`] does the rest.
//!
//! ```
//! use packview::archive::{Archive, ArchiveSchema, ResourceKind, ResourceSpec};
//! use packview::resolver::MemoryResolver;
//!
//! static BLOBS: ArchiveSchema = ArchiveSchema {
//!     name: "Blobs",
//!     resources: &[ResourceSpec {
//!         name: "payload",
//!         optional: false,
//!         schema: "archive Blobs { payload : raw_data; }",
//!         kind: ResourceKind::RawData,
//!     }],
//! };
//!
//! let mut resource = 3u64.to_le_bytes().to_vec();
//! resource.extend_from_slice(b"abc");
//! resource.extend_from_slice(&[0; 8]);
//! let resolver = MemoryResolver::new()
//!     .with_resource("payload", resource, "archive Blobs { payload : raw_data; }");
//!
//! let mut archive = Archive::open(&BLOBS, &resolver)?;
//! assert_eq!(&*archive.raw_data("payload").unwrap().value(), b"abc");
//! archive.close();
//! # Ok::<(), packview::archive::ArchiveError>(())
//! ```
//!
//! # Opening
//! Resources are opened in declaration order.  A resource the resolver
//! cannot locate is left closed when optional and aborts the open when
//! mandatory.  A located resource whose schema text differs byte-for-byte
//! from the expected text always aborts the open.  On abort every resource
//! opened so far is closed again before the error is returned.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::describe::{ArchiveDescription, ContainerDescription, ContainerType, ResourceDescription, StructDescription};
use crate::error::ErrorKind;
use crate::instance::Instance;
use crate::multivector::{BucketPolicy, Multivector};
use crate::rawdata::RawData;
use crate::resolver::{ResourceError, ResourceResolver};
use crate::source::ByteSource;
use crate::structs::StructLayout;
use crate::vector::Vector;

/// Suffix naming the index resource of a multivector.
pub const INDEX_SUFFIX: &str = "_index";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("required resource '{resource}' is unavailable")]
    MissingResource { resource: String },
    #[error("failed to open resource '{resource}': {source}")]
    Resource {
        resource: String,
        #[source]
        source:   ResourceError,
    },
    #[error(
        "schema mismatch for resource '{resource}': expected {expected_digest}, \
         found {actual_digest} (first difference on line {line})"
    )]
    SchemaMismatch {
        resource:        String,
        expected_digest: String,
        actual_digest:   String,
        line:            usize,
    },
    #[error("failed to open sub-archive '{resource}': {source}")]
    SubArchive {
        resource: String,
        #[source]
        source:   Box<ArchiveError>,
    },
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::MissingResource { .. } => ErrorKind::ResourceUnavailable,
            ArchiveError::Resource { source, .. } => source.kind(),
            ArchiveError::SchemaMismatch { .. }  => ErrorKind::SchemaMismatch,
            ArchiveError::SubArchive { source, .. } => source.kind(),
        }
    }

    /// Name of the resource the failure is attributed to.
    pub fn resource(&self) -> &str {
        match self {
            ArchiveError::MissingResource { resource }
            | ArchiveError::Resource { resource, .. }
            | ArchiveError::SchemaMismatch { resource, .. }
            | ArchiveError::SubArchive { resource, .. } => resource,
        }
    }
}

// ── Schema topology ──────────────────────────────────────────────────────────

/// Static description of one archive type.
#[derive(Debug)]
pub struct ArchiveSchema {
    pub name:      &'static str,
    pub resources: &'static [ResourceSpec],
}

/// One declared resource.
#[derive(Debug)]
pub struct ResourceSpec {
    pub name:     &'static str,
    pub optional: bool,
    /// Canonical schema text the stored resource must carry.
    pub schema:   &'static str,
    pub kind:     ResourceKind,
}

#[derive(Debug, Clone, Copy)]
pub enum ResourceKind {
    Vector(&'static StructLayout),
    RawData,
    Instance(&'static StructLayout),
    Multivector {
        index:    &'static StructLayout,
        variants: &'static [&'static StructLayout],
    },
    /// A nested archive stored under the resource name.
    Archive(&'static ArchiveSchema),
}

impl ResourceKind {
    pub fn container_type(&self) -> ContainerType {
        match self {
            ResourceKind::Vector(_)          => ContainerType::Vector,
            ResourceKind::RawData            => ContainerType::RawData,
            ResourceKind::Instance(_)        => ContainerType::Instance,
            ResourceKind::Multivector { .. } => ContainerType::Multivector,
            ResourceKind::Archive(_)         => ContainerType::Archive,
        }
    }

    /// Description of an unopened container of this kind.
    fn describe_closed(&self) -> ContainerDescription {
        let (element_types, index_type) = match self {
            ResourceKind::Vector(layout) | ResourceKind::Instance(layout) => {
                (vec![StructDescription::from(*layout)], None)
            }
            ResourceKind::Multivector { index, variants } => (
                variants.iter().map(|l| StructDescription::from(*l)).collect(),
                Some(StructDescription::from(*index)),
            ),
            ResourceKind::RawData | ResourceKind::Archive(_) => (Vec::new(), None),
        };
        ContainerDescription {
            container_type: self.container_type(),
            size:           0,
            size_in_bytes:  0,
            element_types,
            index_type,
            archive:        None,
        }
    }
}

// ── OpenOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`Archive::open_with_options`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Handling of unknown multivector tags.
    pub bucket_policy:       BucketPolicy,
    /// Also check the schema text of each multivector's index resource,
    /// which is stored as `index(<schema>)`.
    pub verify_index_schema: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            bucket_policy:       BucketPolicy::Strict,
            verify_index_schema: true,
        }
    }
}

// ── Containers and resource state ────────────────────────────────────────────

#[derive(Debug)]
pub enum Container {
    Vector(Vector),
    RawData(RawData),
    Instance(Instance),
    Multivector(Multivector),
    Archive(Box<Archive>),
}

impl Container {
    pub fn size(&self) -> usize {
        match self {
            Container::Vector(v)      => v.size(),
            Container::RawData(r)     => r.size(),
            Container::Instance(i)    => i.size(),
            Container::Multivector(m) => m.size(),
            Container::Archive(a)     => a.resources.len(),
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            Container::Vector(v)      => v.size_in_bytes(),
            Container::RawData(r)     => r.size_in_bytes(),
            Container::Instance(i)    => i.size_in_bytes(),
            Container::Multivector(m) => m.size_in_bytes(),
            Container::Archive(a)     => a.size_in_bytes(),
        }
    }

    pub fn close(&mut self) {
        match self {
            Container::Vector(v)      => v.close(),
            Container::RawData(r)     => r.close(),
            Container::Instance(i)    => i.close(),
            Container::Multivector(m) => m.close(),
            Container::Archive(a)     => a.close(),
        }
    }

    pub fn describe(&self) -> ContainerDescription {
        match self {
            Container::Vector(v)      => v.describe(),
            Container::RawData(r)     => r.describe(),
            Container::Instance(i)    => i.describe(),
            Container::Multivector(m) => m.describe(),
            Container::Archive(a)     => ContainerDescription {
                container_type: ContainerType::Archive,
                size:           a.resources.len(),
                size_in_bytes:  a.size_in_bytes(),
                element_types:  Vec::new(),
                index_type:     None,
                archive:        Some(Box::new(a.describe())),
            },
        }
    }
}

/// Run-time state of one declared resource.
#[derive(Debug)]
pub enum ResourceState {
    Open(Container),
    /// Optional resource the resolver could not locate.
    Absent,
    /// Opened, then closed by [`Archive::close`].
    Closed,
}

#[derive(Debug)]
pub struct Resource {
    spec:  &'static ResourceSpec,
    state: ResourceState,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &'static ResourceSpec {
        self.spec
    }

    pub fn is_optional(&self) -> bool {
        self.spec.optional
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ResourceState::Open(_))
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn container(&self) -> Option<&Container> {
        match &self.state {
            ResourceState::Open(c) => Some(c),
            _                      => None,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.container().map_or(0, Container::size_in_bytes)
    }

    fn close(&mut self) {
        if let ResourceState::Open(container) = &mut self.state {
            container.close();
            self.state = ResourceState::Closed;
            tracing::debug!(resource = self.spec.name, "closed resource");
        }
    }

    fn describe(&self) -> ResourceDescription {
        ResourceDescription {
            name:      self.spec.name,
            optional:  self.spec.optional,
            open:      self.is_open(),
            container: self
                .container()
                .map_or_else(|| self.spec.kind.describe_closed(), Container::describe),
        }
    }
}

// ── Archive ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Archive {
    schema:    &'static ArchiveSchema,
    base_path: PathBuf,
    resources: Vec<Resource>,
}

impl Archive {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open(
        schema:   &'static ArchiveSchema,
        resolver: &dyn ResourceResolver,
    ) -> Result<Self, ArchiveError> {
        Self::open_with_options(schema, resolver, &OpenOptions::default())
    }

    pub fn open_with_options(
        schema:   &'static ArchiveSchema,
        resolver: &dyn ResourceResolver,
        opts:     &OpenOptions,
    ) -> Result<Self, ArchiveError> {
        let mut resources = Vec::with_capacity(schema.resources.len());

        for spec in schema.resources {
            match open_container(spec, resolver, opts) {
                Ok(container) => {
                    tracing::debug!(archive = schema.name, resource = spec.name, "opened resource");
                    resources.push(Resource { spec, state: ResourceState::Open(container) });
                }
                Err(e) if spec.optional && e.kind().is_recoverable() => {
                    tracing::warn!(archive = schema.name, resource = spec.name, error = %e,
                        "optional resource unavailable");
                    resources.push(Resource { spec, state: ResourceState::Absent });
                }
                Err(e) => {
                    let e = promote_missing(e);
                    tracing::error!(archive = schema.name, resource = spec.name, error = %e,
                        "failed to open archive");
                    resources.iter_mut().for_each(Resource::close);
                    return Err(e);
                }
            }
        }

        Ok(Self {
            schema,
            base_path: resolver.base_path().to_owned(),
            resources,
        })
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn schema(&self) -> &'static ArchiveSchema {
        self.schema
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// `true` iff `name` is declared and currently open.
    pub fn is_open(&self, name: &str) -> bool {
        self.resource(name).is_some_and(Resource::is_open)
    }

    // ── Typed access ─────────────────────────────────────────────────────────

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.resource(name).and_then(Resource::container)
    }

    pub fn vector(&self, name: &str) -> Option<&Vector> {
        match self.container(name)? {
            Container::Vector(v) => Some(v),
            _                    => None,
        }
    }

    pub fn raw_data(&self, name: &str) -> Option<&RawData> {
        match self.container(name)? {
            Container::RawData(r) => Some(r),
            _                     => None,
        }
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        match self.container(name)? {
            Container::Instance(i) => Some(i),
            _                      => None,
        }
    }

    pub fn multivector(&self, name: &str) -> Option<&Multivector> {
        match self.container(name)? {
            Container::Multivector(m) => Some(m),
            _                         => None,
        }
    }

    pub fn sub_archive(&self, name: &str) -> Option<&Archive> {
        match self.container(name)? {
            Container::Archive(a) => Some(a),
            _                     => None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Close every open resource in declaration order.  Closing again is a
    /// no-op.
    pub fn close(&mut self) {
        self.resources.iter_mut().for_each(Resource::close);
    }

    /// Sum of the byte sizes of all open resources.
    pub fn size_in_bytes(&self) -> usize {
        self.resources.iter().map(Resource::size_in_bytes).sum()
    }

    pub fn describe(&self) -> ArchiveDescription {
        ArchiveDescription {
            name:           self.schema.name,
            container_type: ContainerType::Archive,
            size_in_bytes:  self.size_in_bytes(),
            resources:      self.resources.iter().map(Resource::describe).collect(),
        }
    }
}

// ── Opening helpers ──────────────────────────────────────────────────────────

fn open_container(
    spec:     &'static ResourceSpec,
    resolver: &dyn ResourceResolver,
    opts:     &OpenOptions,
) -> Result<Container, ArchiveError> {
    let container = match spec.kind {
        ResourceKind::Vector(layout) => {
            Container::Vector(Vector::new(resolve_checked(resolver, spec.name, spec.schema)?, layout))
        }
        ResourceKind::RawData => {
            Container::RawData(RawData::new(resolve_checked(resolver, spec.name, spec.schema)?))
        }
        ResourceKind::Instance(layout) => {
            Container::Instance(Instance::new(resolve_checked(resolver, spec.name, spec.schema)?, layout))
        }
        ResourceKind::Multivector { index, variants } => {
            let data = resolve_checked(resolver, spec.name, spec.schema)?;
            let index_name = format!("{}{INDEX_SUFFIX}", spec.name);
            let index_source = if opts.verify_index_schema {
                resolve_checked(resolver, &index_name, &index_schema(spec.schema))?
            } else {
                resolver
                    .resolve(&index_name)
                    .map_err(|source| ArchiveError::Resource { resource: index_name.clone(), source })?
                    .source
            };
            Container::Multivector(
                Multivector::new(data, Vector::new(index_source, index), variants)
                    .with_policy(opts.bucket_policy),
            )
        }
        ResourceKind::Archive(schema) => {
            let sub_resolver = resolver.subdir(spec.name);
            let archive = Archive::open_with_options(schema, &*sub_resolver, opts).map_err(|e| {
                ArchiveError::SubArchive { resource: spec.name.to_owned(), source: Box::new(e) }
            })?;
            Container::Archive(Box::new(archive))
        }
    };
    Ok(container)
}

fn resolve_checked(
    resolver: &dyn ResourceResolver,
    name:     &str,
    expected: &str,
) -> Result<Box<dyn ByteSource>, ArchiveError> {
    let resolved = resolver
        .resolve(name)
        .map_err(|source| ArchiveError::Resource { resource: name.to_owned(), source })?;
    verify_schema(name, expected, &resolved.schema)?;
    Ok(resolved.source)
}

/// Schema text stored with the index resource of a multivector.
pub fn index_schema(schema: &str) -> String {
    format!("index({schema})")
}

/// Byte-for-byte schema comparison.
pub fn verify_schema(resource: &str, expected: &str, actual: &str) -> Result<(), ArchiveError> {
    if expected == actual {
        return Ok(());
    }
    let line = expected
        .lines()
        .zip(actual.lines())
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| expected.lines().count().min(actual.lines().count()))
        + 1;
    Err(ArchiveError::SchemaMismatch {
        resource:        resource.to_owned(),
        expected_digest: schema_digest(expected),
        actual_digest:   schema_digest(actual),
        line,
    })
}

/// Hex BLAKE3 digest of a schema text, for diagnostics.
pub fn schema_digest(schema: &str) -> String {
    hex::encode(blake3::hash(schema.as_bytes()).as_bytes())
}

/// An unlocatable mandatory resource is reported as missing rather than as
/// a plain resolver failure.
fn promote_missing(e: ArchiveError) -> ArchiveError {
    match e {
        ArchiveError::Resource { resource, source } if source.is_unavailable() => {
            ArchiveError::MissingResource { resource }
        }
        other => other,
    }
}
