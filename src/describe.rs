//! Structured introspection records.
//!
//! Every container and archive can describe itself as a tree of plain
//! serializable records: container kind, logical size, byte size and the
//! layouts of the structs it holds.  The records exist for diagnostics and
//! debug dumps; nothing in the crate parses them back.

use serde::Serialize;

use crate::structs::{Field, FieldValue, StructLayout, StructView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerType {
    Vector,
    RawData,
    Instance,
    Multivector,
    Archive,
}

// ── Layout descriptions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescription {
    pub name:      &'static str,
    pub offset:    usize,
    pub width:     u32,
    pub is_signed: bool,
}

impl From<&Field> for FieldDescription {
    fn from(f: &Field) -> Self {
        FieldDescription {
            name:      f.name,
            offset:    f.offset,
            width:     f.width,
            is_signed: f.signed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructDescription {
    pub name:          &'static str,
    pub size_in_bytes: usize,
    pub attributes:    Vec<FieldDescription>,
}

impl From<&StructLayout> for StructDescription {
    fn from(layout: &StructLayout) -> Self {
        StructDescription {
            name:          layout.name,
            size_in_bytes: layout.size_in_bytes,
            attributes:    layout.fields.iter().map(FieldDescription::from).collect(),
        }
    }
}

// ── Value descriptions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub name:  &'static str,
    pub value: FieldValue,
}

/// Decoded contents of one struct instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructValue {
    pub name:       &'static str,
    pub position:   usize,
    pub attributes: Vec<FieldEntry>,
}

impl StructView<'_> {
    pub fn describe(&self) -> StructValue {
        StructValue {
            name:       self.layout().name,
            position:   self.position(),
            attributes: self.values().map(|(name, value)| FieldEntry { name, value }).collect(),
        }
    }
}

// ── Container / archive descriptions ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDescription {
    pub container_type: ContainerType,
    pub size:           usize,
    pub size_in_bytes:  usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub element_types:  Vec<StructDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_type:     Option<StructDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive:        Option<Box<ArchiveDescription>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescription {
    pub name:      &'static str,
    pub optional:  bool,
    pub open:      bool,
    #[serde(flatten)]
    pub container: ContainerDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveDescription {
    pub name:           &'static str,
    pub container_type: ContainerType,
    pub size_in_bytes:  usize,
    pub resources:      Vec<ResourceDescription>,
}

impl ArchiveDescription {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ContainerDescription {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
