//! Whole-archive integrity walk.
//!
//! Opening an archive only checks what it must: that resources exist, are
//! large enough to frame, and carry the expected schema.  [`verify_archive`]
//! goes further and inspects every open resource for structural damage a
//! reader would otherwise trip over lazily:
//!
//! - size header claiming more bytes than the resource holds, or a non-zero
//!   padding tail
//! - vector payload that is not a whole number of elements
//! - instance payload shorter than its struct
//! - multivector index offsets that go backwards or point past the payload
//! - buckets holding an unknown tag or a struct running past the bucket end
//!
//! Corruption never fails the walk; every finding is recorded in the
//! [`VerifyReport`].  With the `parallel` feature the per-bucket walk of each
//! multivector runs on the rayon pool.

use serde::Serialize;

use crate::archive::{Archive, Container};
use crate::header::ResourceHeader;
use crate::instance::Instance;
use crate::multivector::{BucketPolicy, DecodeError, Multivector};
use crate::source::ByteSource;
use crate::vector::Vector;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    /// Size header + padding exceed the resource length.
    InconsistentHeader { payload_len: u64, total_len: u64 },
    /// The eight bytes after the payload are not all zero.
    DirtyPadding,
    /// Vector payload is not a multiple of the element stride.
    PartialElement { payload_len: u64, stride: usize },
    /// Instance payload cannot hold one struct.
    InstanceTooShort { payload_len: u64, required: usize },
    IndexOutOfOrder { bucket: usize, offset: u64, previous: u64 },
    IndexBeyondPayload { bucket: usize, offset: u64, payload_len: u64 },
    UnknownTag { bucket: usize, offset: usize, tag: u8 },
    /// The last struct of a bucket extends past where the next bucket starts.
    BucketOverrun { bucket: usize, end: usize, consumed_to: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Slash-separated resource path; nested archives prefix their name.
    pub resource: String,
    #[serde(flatten)]
    pub issue:    Issue,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub resources_checked: usize,
    pub buckets_checked:   usize,
    pub findings:          Vec<Finding>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} resource(s), {} bucket(s) checked: {} finding(s)",
            self.resources_checked,
            self.buckets_checked,
            self.findings.len(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn push(&mut self, resource: &str, issue: Issue) {
        tracing::warn!(resource, ?issue, "integrity finding");
        self.findings.push(Finding { resource: resource.to_owned(), issue });
    }
}

// ── Walk ──────────────────────────────────────────────────────────────────────

/// Inspect every open resource of `archive`, recursing into sub-archives.
pub fn verify_archive(archive: &Archive) -> VerifyReport {
    let mut report = VerifyReport::default();
    walk_archive(archive, "", &mut report);
    tracing::info!(archive = archive.name(), summary = %report.summary(), "verification finished");
    report
}

fn walk_archive(archive: &Archive, prefix: &str, report: &mut VerifyReport) {
    for resource in archive.resources() {
        let Some(container) = resource.container() else { continue };
        let path = format!("{prefix}{}", resource.name());
        match container {
            Container::Vector(v)      => check_vector(&path, v, report),
            Container::RawData(r)     => {
                check_frame(&path, r.source(), report);
            }
            Container::Instance(i)    => check_instance(&path, i, report),
            Container::Multivector(m) => check_multivector(&path, m, report),
            Container::Archive(a)     => {
                walk_archive(a, &format!("{path}/"), report);
                continue;
            }
        }
        report.resources_checked += 1;
    }
}

/// Framing checks common to every resource.  Returns the header when the
/// payload can be trusted for further checks.
fn check_frame(path: &str, source: &dyn ByteSource, report: &mut VerifyReport) -> Option<ResourceHeader> {
    let header = ResourceHeader::read(source).ok()?;
    if !header.is_consistent() {
        report.push(path, Issue::InconsistentHeader {
            payload_len: header.payload_len,
            total_len:   header.total_len,
        });
        return None;
    }
    if !header.padding_is_zero(source) {
        report.push(path, Issue::DirtyPadding);
    }
    Some(header)
}

fn check_vector(path: &str, vector: &Vector, report: &mut VerifyReport) {
    let Some(header) = check_frame(path, vector.source(), report) else { return };
    let stride = vector.layout().size_in_bytes;
    if stride != 0 && header.payload_len % stride as u64 != 0 {
        report.push(path, Issue::PartialElement { payload_len: header.payload_len, stride });
    }
}

fn check_instance(path: &str, instance: &Instance, report: &mut VerifyReport) {
    let Some(header) = check_frame(path, instance.source(), report) else { return };
    let required = instance.layout().size_in_bytes;
    if header.payload_len < required as u64 {
        report.push(path, Issue::InstanceTooShort { payload_len: header.payload_len, required });
    }
}

fn check_multivector(path: &str, mv: &Multivector, report: &mut VerifyReport) {
    let index_path = format!("{path}{}", crate::archive::INDEX_SUFFIX);
    check_vector(&index_path, mv.index(), report);
    let Some(header) = check_frame(path, mv.source(), report) else { return };

    // Offsets must be trustworthy before buckets are walked.
    let mut previous = 0u64;
    let mut offsets_ok = true;
    for bucket in 0..mv.size() {
        let offset = mv.index_value(bucket);
        if offset < previous {
            report.push(&index_path, Issue::IndexOutOfOrder { bucket, offset, previous });
            offsets_ok = false;
        }
        if offset > header.payload_len {
            report.push(&index_path, Issue::IndexBeyondPayload {
                bucket,
                offset,
                payload_len: header.payload_len,
            });
            offsets_ok = false;
        }
        previous = offset;
    }
    if !offsets_ok {
        return;
    }

    for issue in walk_buckets(mv) {
        report.push(path, issue);
    }
    report.buckets_checked += mv.size();
}

fn walk_buckets(mv: &Multivector) -> Vec<Issue> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        (0..mv.size())
            .into_par_iter()
            .flat_map_iter(|bucket| check_bucket(mv, bucket))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..mv.size()).flat_map(|bucket| check_bucket(mv, bucket)).collect()
    }
}

fn check_bucket(mv: &Multivector, bucket: usize) -> Option<Issue> {
    let range = mv.bucket_range(bucket);
    let mut consumed_to = range.start;
    for element in mv.bucket_with(bucket, BucketPolicy::Strict) {
        match element {
            Ok(variant) => {
                consumed_to = variant.view.position().saturating_add(variant.view.layout().size_in_bytes);
            }
            Err(DecodeError::MalformedBucket { offset, tag, .. }) => {
                return Some(Issue::UnknownTag { bucket, offset, tag });
            }
        }
    }
    (consumed_to > range.end).then_some(Issue::BucketOverrun { bucket, end: range.end, consumed_to })
}
