//! Reference archive shared by the integration tests.
//!
//! Five resources written by an independent writer: an instance, a vector
//! of two `SignedStruct`s, a four-bucket multivector over
//! `SimpleStruct | SignedStruct` with a 33-bit index, and a raw data blob.
#![allow(dead_code)]

use packview::archive::{index_schema, ArchiveSchema, ResourceKind, ResourceSpec};
use packview::multivector::{Variant, VariantSet};
use packview::resolver::MemoryResolver;
use packview::structs::{Field, Struct, StructLayout, StructView};

// ── Layouts ───────────────────────────────────────────────────────────────────

pub const SIGNED_STRUCT: StructLayout = StructLayout::new("SignedStruct", 10, &[
    Field::signed("a", 0, 5),
    Field::unsigned("b", 5, 32),
    Field::signed("c", 37, 7),
    Field::unsigned("d", 44, 32),
]);

pub const SIMPLE_STRUCT: StructLayout = StructLayout::new("SimpleStruct", 8, &[
    Field::unsigned("a", 0, 32),
    Field::unsigned("b", 32, 32),
]);

pub const INDEX_TYPE_33: StructLayout =
    StructLayout::new("IndexType33", 5, &[Field::unsigned("value", 0, 33)]);

// ── Typed bindings ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Signed<'a>(StructView<'a>);

impl<'a> Struct<'a> for Signed<'a> {
    const LAYOUT: &'static StructLayout = &SIGNED_STRUCT;
    fn from_view(view: StructView<'a>) -> Self { Signed(view) }
}

impl Signed<'_> {
    pub fn a(&self) -> i16 { self.0.read(&SIGNED_STRUCT.fields[0]) }
    pub fn b(&self) -> u32 { self.0.read(&SIGNED_STRUCT.fields[1]) }
    pub fn c(&self) -> i32 { self.0.read(&SIGNED_STRUCT.fields[2]) }
    pub fn d(&self) -> u32 { self.0.read(&SIGNED_STRUCT.fields[3]) }
}

#[derive(Debug, Clone, Copy)]
pub struct Simple<'a>(StructView<'a>);

impl<'a> Struct<'a> for Simple<'a> {
    const LAYOUT: &'static StructLayout = &SIMPLE_STRUCT;
    fn from_view(view: StructView<'a>) -> Self { Simple(view) }
}

impl Simple<'_> {
    pub fn a(&self) -> u32 { self.0.read(&SIMPLE_STRUCT.fields[0]) }
    pub fn b(&self) -> u32 { self.0.read(&SIMPLE_STRUCT.fields[1]) }
}

#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Simple(Simple<'a>),
    Signed(Signed<'a>),
}

impl<'a> VariantSet<'a> for Entry<'a> {
    const VARIANTS: &'static [&'static StructLayout] = &[&SIMPLE_STRUCT, &SIGNED_STRUCT];

    fn from_variant(variant: Variant<'a>) -> Option<Self> {
        match variant.tag {
            0 => Some(Entry::Simple(Simple::from_view(variant.view))),
            1 => Some(Entry::Signed(Signed::from_view(variant.view))),
            _ => None,
        }
    }
}

// ── Schemas ───────────────────────────────────────────────────────────────────

pub const INSTANCE_SCHEMA: &str = concat!(
    "namespace backwardcompatibility {
struct SignedStruct
{
    a : i16 : 5;
    b : u32 : 32;
    c : i32 : 7;
    d : u32 : 32;
}
}

",
    "namespace backwardcompatibility {
archive BackwardCompatibilityTest
{
    resource_a : .backwardcompatibility.SignedStruct;
}
}

"
);

pub const VECTOR_SCHEMA: &str = concat!(
    "namespace backwardcompatibility {
struct SignedStruct
{
    a : i16 : 5;
    b : u32 : 32;
    c : i32 : 7;
    d : u32 : 32;
}
}

",
    "namespace backwardcompatibility {
archive BackwardCompatibilityTest
{
    resource_b : vector< .backwardcompatibility.SignedStruct >;
}
}

"
);

pub const MULTIVECTOR_SCHEMA: &str = concat!(
    "namespace backwardcompatibility {
struct SimpleStruct
{
    a : u32 : 32;
    b : u32 : 32;
}
}

",
    "namespace backwardcompatibility {
struct SignedStruct
{
    a : i16 : 5;
    b : u32 : 32;
    c : i32 : 7;
    d : u32 : 32;
}
}

",
    "namespace backwardcompatibility {
archive BackwardCompatibilityTest
{
    resource_c : multivector< 33, .backwardcompatibility.SimpleStruct, .backwardcompatibility.SignedStruct >;
}
}

"
);

pub const RAW_DATA_SCHEMA: &str = "namespace backwardcompatibility {
archive BackwardCompatibilityTest
{
    resource_d : raw_data;
}
}

";

pub static ARCHIVE: ArchiveSchema = ArchiveSchema {
    name: "BackwardCompatibilityTest",
    resources: &[
        ResourceSpec {
            name:     "resource_a",
            optional: false,
            schema:   INSTANCE_SCHEMA,
            kind:     ResourceKind::Instance(&SIGNED_STRUCT),
        },
        ResourceSpec {
            name:     "resource_b",
            optional: false,
            schema:   VECTOR_SCHEMA,
            kind:     ResourceKind::Vector(&SIGNED_STRUCT),
        },
        ResourceSpec {
            name:     "resource_c",
            optional: false,
            schema:   MULTIVECTOR_SCHEMA,
            kind:     ResourceKind::Multivector {
                index:    &INDEX_TYPE_33,
                variants: &[&SIMPLE_STRUCT, &SIGNED_STRUCT],
            },
        },
        ResourceSpec {
            name:     "resource_d",
            optional: true,
            schema:   RAW_DATA_SCHEMA,
            kind:     ResourceKind::RawData,
        },
    ],
};

// ── Payloads ──────────────────────────────────────────────────────────────────

const SIGNED_BYTES: [u8; 10] = [0xFF, 0xAC, 0x68, 0x24, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x00];
const SIMPLE_BYTES: [u8; 8]  = [0xFF, 0xFF, 0xFF, 0xFF, 0xEF, 0xBE, 0xAD, 0xDE];

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut buf = (payload.len() as u64).to_le_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&[0u8; 8]);
    buf
}

pub fn instance_resource() -> Vec<u8> {
    framed(&SIGNED_BYTES)
}

pub fn vector_resource() -> Vec<u8> {
    framed(&[SIGNED_BYTES, SIGNED_BYTES].concat())
}

pub fn multivector_resource() -> Vec<u8> {
    let tagged_signed = [&[1u8][..], &SIGNED_BYTES[..]].concat();
    let tagged_simple = [&[0u8][..], &SIMPLE_BYTES[..]].concat();
    framed(&[
        tagged_signed.as_slice(),
        tagged_simple.as_slice(),
        tagged_simple.as_slice(),
        tagged_signed.as_slice(),
        tagged_simple.as_slice(),
    ].concat())
}

pub fn multivector_index_resource() -> Vec<u8> {
    framed(&[
        0x00, 0x00, 0x00, 0x00, 0x00,
        0x14, 0x00, 0x00, 0x00, 0x00,
        0x14, 0x00, 0x00, 0x00, 0x00,
        0x28, 0x00, 0x00, 0x00, 0x00,
    ])
}

pub fn raw_data_resource() -> Vec<u8> {
    framed(&[0xFF, 0xEF, 0xBE, 0xAD, 0xDE])
}

/// `(name, bytes, schema)` for every stored resource.
pub fn resources() -> Vec<(&'static str, Vec<u8>, String)> {
    vec![
        ("resource_a",       instance_resource(),          INSTANCE_SCHEMA.to_owned()),
        ("resource_b",       vector_resource(),            VECTOR_SCHEMA.to_owned()),
        ("resource_c",       multivector_resource(),       MULTIVECTOR_SCHEMA.to_owned()),
        ("resource_c_index", multivector_index_resource(), index_schema(MULTIVECTOR_SCHEMA)),
        ("resource_d",       raw_data_resource(),          RAW_DATA_SCHEMA.to_owned()),
    ]
}

/// Every resource, stored under `prefix` (empty or ending in `/`).
pub fn insert_all(resolver: &mut MemoryResolver, prefix: &str) {
    for (name, bytes, schema) in resources() {
        resolver.insert(&format!("{prefix}{name}"), bytes, schema);
    }
}

pub fn memory_resolver() -> MemoryResolver {
    let mut resolver = MemoryResolver::new();
    insert_all(&mut resolver, "");
    resolver
}

pub fn assert_signed_reference(s: Signed<'_>) {
    assert_eq!(s.a(), -1);
    assert_eq!(s.b(), 0x0123_4567);
    assert_eq!(s.c(), -0x28);
    assert_eq!(s.d(), 0);
}

pub fn assert_simple_reference(s: Simple<'_>) {
    assert_eq!(s.a(), 0xFFFF_FFFF);
    assert_eq!(s.b(), 0xDEAD_BEEF);
}
