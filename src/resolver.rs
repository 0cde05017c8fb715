//! Resource resolution: map a resource name to bytes plus declared schema.
//!
//! A resolver answers one question: given a resource name, where are its
//! bytes and which schema were they written with?  Absence is reported as
//! [`ResourceError::Unavailable`], the only failure an archive tolerates (and
//! only for optional resources).  Everything else (an undersized resource, a
//! missing or empty schema, an I/O failure on an existing file) is fatal.
//!
//! # Backends
//! - [`FileResolver`]: `<base>/<name>` is memory-mapped, `<base>/<name>.schema`
//!   holds the schema text.
//! - [`MemoryResolver`]: a fixed name → (bytes, schema) table, for embedded
//!   fixtures and tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::header::MIN_RESOURCE_LEN;
use crate::source::{ByteSource, MemorySource, MmapSource};

/// Default extension of schema sidecar files.
pub const SCHEMA_EXTENSION: &str = "schema";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("resource '{name}' not found")]
    Unavailable { name: String },
    #[error("resource '{name}' is {len} bytes, below the {MIN_RESOURCE_LEN}-byte minimum")]
    Invalid { name: String, len: usize },
    #[error("schema of resource '{name}' not found")]
    MissingSchema { name: String },
    #[error("schema of resource '{name}' is empty")]
    EmptySchema { name: String },
    #[error("I/O error on resource '{name}': {source}")]
    Io {
        name:   String,
        #[source]
        source: io::Error,
    },
}

impl ResourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::Unavailable { .. }   => ErrorKind::ResourceUnavailable,
            ResourceError::Invalid { .. }
            | ResourceError::MissingSchema { .. }
            | ResourceError::EmptySchema { .. } => ErrorKind::InvalidResource,
            ResourceError::Io { .. }            => ErrorKind::IoFailure,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResourceError::Unavailable { .. })
    }
}

// ── ResourceResolver ─────────────────────────────────────────────────────────

/// A located resource.
#[derive(Debug)]
pub struct Resolved {
    pub source: Box<dyn ByteSource>,
    pub schema: String,
}

pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Resolved, ResourceError>;

    /// Location of the archive this resolver serves.
    fn base_path(&self) -> &Path;

    /// Resolver for a nested archive stored under `name`.
    fn subdir(&self, name: &str) -> Box<dyn ResourceResolver>;
}

fn check_schema(name: &str, schema: String) -> Result<String, ResourceError> {
    if schema.is_empty() {
        return Err(ResourceError::EmptySchema { name: name.to_owned() });
    }
    Ok(schema)
}

// ── FileResolver ─────────────────────────────────────────────────────────────

/// Resolves resources as memory-mapped files inside one directory.
#[derive(Debug, Clone)]
pub struct FileResolver {
    base:             PathBuf,
    schema_extension: String,
}

impl FileResolver {
    /// Resolver over the directory `dir`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            base:             dir.into(),
            schema_extension: SCHEMA_EXTENSION.to_owned(),
        }
    }

    /// Resolver over the directory containing the archive file `path`.
    pub fn for_archive_file<P: AsRef<Path>>(path: P) -> Self {
        let dir = path.as_ref().parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(dir)
    }

    pub fn with_schema_extension(mut self, extension: impl Into<String>) -> Self {
        self.schema_extension = extension.into();
        self
    }

    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    pub fn schema_path(&self, name: &str) -> PathBuf {
        self.base.join(format!("{name}.{}", self.schema_extension))
    }
}

impl ResourceResolver for FileResolver {
    fn resolve(&self, name: &str) -> Result<Resolved, ResourceError> {
        let path = self.resource_path(name);
        let io_err = |source: io::Error| ResourceError::Io { name: name.to_owned(), source };

        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(ResourceError::Unavailable { name: name.to_owned() }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResourceError::Unavailable { name: name.to_owned() });
            }
            Err(e) => return Err(io_err(e)),
        };

        let len = meta.len() as usize;
        if len < MIN_RESOURCE_LEN {
            return Err(ResourceError::Invalid { name: name.to_owned(), len });
        }

        let source = MmapSource::open(&path).map_err(io_err)?;

        let schema = match fs::read_to_string(self.schema_path(name)) {
            Ok(text) => check_schema(name, text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResourceError::MissingSchema { name: name.to_owned() });
            }
            Err(e) => return Err(io_err(e)),
        };

        tracing::debug!(resource = name, path = %path.display(), len, "mapped resource");
        Ok(Resolved { source: Box::new(source), schema })
    }

    fn base_path(&self) -> &Path {
        &self.base
    }

    fn subdir(&self, name: &str) -> Box<dyn ResourceResolver> {
        Box::new(Self {
            base:             self.base.join(name),
            schema_extension: self.schema_extension.clone(),
        })
    }
}

// ── MemoryResolver ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct MemoryEntry {
    bytes:  Arc<[u8]>,
    schema: String,
}

/// Resolves resources from an in-memory table.
///
/// Nested archives live under `"<subdir>/<name>"` keys.  Clones share the
/// table; resolved sources share the inserted bytes without copying.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: Arc<BTreeMap<String, MemoryEntry>>,
    prefix:  String,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a resource.  `name` is relative to this resolver's
    /// sub-directory.
    pub fn insert(&mut self, name: &str, bytes: impl Into<Arc<[u8]>>, schema: impl Into<String>) {
        let key = self.key(name);
        Arc::make_mut(&mut self.entries).insert(key, MemoryEntry {
            bytes:  bytes.into(),
            schema: schema.into(),
        });
    }

    pub fn with_resource(
        mut self,
        name:   &str,
        bytes:  impl Into<Arc<[u8]>>,
        schema: impl Into<String>,
    ) -> Self {
        self.insert(name, bytes, schema);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let key = self.key(name);
        Arc::make_mut(&mut self.entries).remove(&key).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&self.key(name))
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, name: &str) -> Result<Resolved, ResourceError> {
        let entry = self
            .entries
            .get(&self.key(name))
            .ok_or_else(|| ResourceError::Unavailable { name: name.to_owned() })?;

        if entry.bytes.len() < MIN_RESOURCE_LEN {
            return Err(ResourceError::Invalid { name: name.to_owned(), len: entry.bytes.len() });
        }
        let schema = check_schema(name, entry.schema.clone())?;

        tracing::debug!(resource = name, len = entry.bytes.len(), "resolved in-memory resource");
        Ok(Resolved {
            source: Box::new(MemorySource::new(Arc::clone(&entry.bytes))),
            schema,
        })
    }

    fn base_path(&self) -> &Path {
        Path::new(&self.prefix)
    }

    fn subdir(&self, name: &str) -> Box<dyn ResourceResolver> {
        Box::new(Self {
            entries: Arc::clone(&self.entries),
            prefix:  format!("{}{name}/", self.prefix),
        })
    }
}
