//! Packed struct layouts and zero-copy struct views.
//!
//! A [`StructLayout`] is the runtime description of one schema struct: its
//! byte stride and the bit position of every field.  A [`StructView`] pairs a
//! layout with a byte position inside a [`ByteSource`]; it owns nothing and
//! is created on demand by the containers.
//!
//! Generated bindings wrap a view in a named type and implement [`Struct`]
//! for it, giving typed accessors without per-type decoding code:
//!
//! ```
//! use packview::structs::{Field, StructLayout, StructView, Struct};
//!
//! pub const POINT: StructLayout = StructLayout::new("Point", 4, &[
//!     Field::signed("x", 0, 16),
//!     Field::signed("y", 16, 16),
//! ]);
//!
//! pub struct Point<'a>(StructView<'a>);
//!
//! impl<'a> Struct<'a> for Point<'a> {
//!     const LAYOUT: &'static StructLayout = &POINT;
//!     fn from_view(view: StructView<'a>) -> Self { Point(view) }
//! }
//!
//! impl Point<'_> {
//!     pub fn x(&self) -> i16 { self.0.read(&POINT.fields[0]) }
//!     pub fn y(&self) -> i16 { self.0.read(&POINT.fields[1]) }
//! }
//! ```

use std::fmt;

use serde::Serialize;

use crate::codec::{self, Primitive};
use crate::source::ByteSource;

// ── Field / StructLayout ──────────────────────────────────────────────────────

/// One bit field: `width` bits at bit `offset` from the start of the struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name:   &'static str,
    pub offset: usize,
    pub width:  u32,
    pub signed: bool,
}

impl Field {
    pub const fn unsigned(name: &'static str, offset: usize, width: u32) -> Self {
        Self { name, offset, width, signed: false }
    }

    pub const fn signed(name: &'static str, offset: usize, width: u32) -> Self {
        Self { name, offset, width, signed: true }
    }

    /// Bit just past the end of the field.
    pub const fn end(&self) -> usize {
        self.offset + self.width as usize
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StructLayout {
    pub name:          &'static str,
    /// Byte stride of one packed instance.
    pub size_in_bytes: usize,
    pub fields:        &'static [Field],
}

impl StructLayout {
    pub const fn new(name: &'static str, size_in_bytes: usize, fields: &'static [Field]) -> Self {
        Self { name, size_in_bytes, fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bits actually covered by fields.
    pub fn size_in_bits(&self) -> usize {
        self.fields.iter().map(Field::end).max().unwrap_or(0)
    }
}

// ── Multivector index types ───────────────────────────────────────────────────

pub const INDEX_TYPE_8: StructLayout =
    StructLayout::new("IndexType8", 1, &[Field::unsigned("value", 0, 8)]);
pub const INDEX_TYPE_16: StructLayout =
    StructLayout::new("IndexType16", 2, &[Field::unsigned("value", 0, 16)]);
pub const INDEX_TYPE_32: StructLayout =
    StructLayout::new("IndexType32", 4, &[Field::unsigned("value", 0, 32)]);
pub const INDEX_TYPE_64: StructLayout =
    StructLayout::new("IndexType64", 8, &[Field::unsigned("value", 0, 64)]);

// ── FieldValue ────────────────────────────────────────────────────────────────

/// A decoded field, widened to 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{v}"),
            FieldValue::Signed(v)   => write!(f, "{v}"),
        }
    }
}

// ── StructView ────────────────────────────────────────────────────────────────

/// A struct instance located at byte `position` of a source.
#[derive(Clone, Copy)]
pub struct StructView<'a> {
    source:   &'a dyn ByteSource,
    position: usize,
    layout:   &'static StructLayout,
}

impl<'a> StructView<'a> {
    pub fn new(source: &'a dyn ByteSource, position: usize, layout: &'static StructLayout) -> Self {
        Self { source, position, layout }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn layout(&self) -> &'static StructLayout {
        self.layout
    }

    /// Decode `field` into `T`.
    #[inline]
    pub fn read<T: Primitive>(&self, field: &Field) -> T {
        codec::read(self.source, self.bit_offset(field), field.width)
    }

    pub fn value(&self, field: &Field) -> FieldValue {
        let bit_offset = self.bit_offset(field);
        if field.signed {
            FieldValue::Signed(codec::read_signed(self.source, bit_offset, field.width))
        } else {
            FieldValue::Unsigned(codec::read_bits(self.source, bit_offset, field.width))
        }
    }

    #[inline]
    fn bit_offset(&self, field: &Field) -> usize {
        self.position.saturating_mul(8).saturating_add(field.offset)
    }

    /// Decode the field called `name`, if the layout has one.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.layout.field(name).map(|f| self.value(f))
    }

    pub fn values(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.layout.fields.iter().map(move |f| (f.name, self.value(f)))
    }
}

impl fmt::Debug for StructView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.layout.name);
        s.field("position", &self.position);
        for (name, value) in self.values() {
            s.field(name, &value);
        }
        s.finish()
    }
}

// ── Struct ────────────────────────────────────────────────────────────────────

/// Typed wrapper around a [`StructView`] of a known layout.
pub trait Struct<'a>: Sized {
    const LAYOUT: &'static StructLayout;

    fn from_view(view: StructView<'a>) -> Self;
}
