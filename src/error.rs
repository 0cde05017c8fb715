//! Failure taxonomy shared by every error type in the crate.
//!
//! Each module reports failures through its own error enum; `kind()` on any
//! of them maps the failure onto one of these classes.  Only
//! [`ErrorKind::ResourceUnavailable`] is ever recoverable, and only for
//! resources an archive declares optional.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The resource could not be located.
    ResourceUnavailable,
    /// The resource was located but is not a well-formed resource
    /// (undersized, missing or empty schema).
    InvalidResource,
    /// The stored schema differs from the schema the reader was built for.
    SchemaMismatch,
    /// Storage failed after the resource was located.
    IoFailure,
    /// A multivector element carries a tag outside its declared variants.
    MalformedBucket,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ResourceUnavailable => "resource unavailable",
            ErrorKind::InvalidResource     => "invalid resource",
            ErrorKind::SchemaMismatch      => "schema mismatch",
            ErrorKind::IoFailure           => "I/O failure",
            ErrorKind::MalformedBucket     => "malformed bucket",
        }
    }

    /// Whether an archive may continue opening after this failure on an
    /// optional resource.
    pub fn is_recoverable(self) -> bool {
        self == ErrorKind::ResourceUnavailable
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
