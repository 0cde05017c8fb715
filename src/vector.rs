//! Fixed-stride vector of packed structs.
//!
//! Element `i` starts at byte `8 + i * stride`.  `size()` is the payload
//! length divided by the stride, truncating; a trailing partial element is
//! never exposed.  Element access is unchecked: views past `size()` read the
//! padding tail or zeros, and positions saturate rather than overflow.

use crate::describe::{ContainerDescription, ContainerType, StructDescription};
use crate::header::{self, ResourceHeader, SIZE_HEADER_LEN};
use crate::source::ByteSource;
use crate::structs::{Struct, StructLayout, StructView};

#[derive(Debug)]
pub struct Vector {
    source: Box<dyn ByteSource>,
    layout: &'static StructLayout,
}

impl Vector {
    pub fn new(source: Box<dyn ByteSource>, layout: &'static StructLayout) -> Self {
        Self { source, layout }
    }

    pub fn layout(&self) -> &'static StructLayout {
        self.layout
    }

    /// Number of whole elements in the payload.
    pub fn size(&self) -> usize {
        header::payload_len(&*self.source)
            .and_then(|len| (len as usize).checked_div(self.layout.size_in_bytes))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// View of element `i`.  Not checked against `size()`.
    #[inline]
    pub fn get(&self, i: usize) -> StructView<'_> {
        StructView::new(&*self.source, self.position(i), self.layout)
    }

    /// Element `i` through its typed binding.
    pub fn get_as<'a, T: Struct<'a>>(&'a self, i: usize) -> T {
        debug_assert_eq!(T::LAYOUT, self.layout, "binding does not match vector layout");
        T::from_view(self.get(i))
    }

    /// All elements, in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = StructView<'_>> + Clone + '_ {
        (0..self.size()).map(move |i| self.get(i))
    }

    /// Elements `start, start + step, ...` up to and including `end`.
    ///
    /// The sequence is lazy and can be restarted by cloning.  A `step` of
    /// zero never terminates.
    pub fn slice(&self, start: usize, end: usize, step: usize) -> Slice<'_> {
        Slice { vector: self, next: Some(start), end, step }
    }

    /// Total bytes of the backing resource, header and padding included.
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
            container_type: ContainerType::Vector,
            size:           self.size(),
            size_in_bytes:  self.size_in_bytes(),
            element_types:  vec![StructDescription::from(self.layout)],
            index_type:     None,
            archive:        None,
        }
    }

    pub(crate) fn source(&self) -> &dyn ByteSource {
        &*self.source
    }

    #[inline]
    fn position(&self, i: usize) -> usize {
        i.saturating_mul(self.layout.size_in_bytes).saturating_add(SIZE_HEADER_LEN)
    }
}

// ── Slice ─────────────────────────────────────────────────────────────────────

/// Lazy strided walk over a [`Vector`]; see [`Vector::slice`].
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    vector: &'a Vector,
    next:   Option<usize>,
    end:    usize,
    step:   usize,
}

impl<'a> Iterator for Slice<'a> {
    type Item = StructView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.next.filter(|&i| i <= self.end)?;
        self.next = i.checked_add(self.step);
        Some(self.vector.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::structs::{Field, FieldValue};

    const PAIR: StructLayout = StructLayout::new("Pair", 3, &[
        Field::unsigned("a", 0, 8),
        Field::signed("b", 8, 16),
    ]);

    fn vector(payload: &[u8]) -> Vector {
        let mut buf = (payload.len() as u64).to_le_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&[0u8; 8]);
        Vector::new(Box::new(MemorySource::new(buf)), &PAIR)
    }

    #[test]
    fn size_truncates_partial_elements() {
        assert_eq!(vector(&[1, 2, 3, 4, 5, 6]).size(), 2);
        assert_eq!(vector(&[1, 2, 3, 4, 5, 6, 7, 8]).size(), 2);
        assert_eq!(vector(&[]).size(), 0);
        assert!(vector(&[1, 2]).is_empty());
    }

    #[test]
    fn get_reads_element_at_stride() {
        let v = vector(&[1, 0xFE, 0xFF, 2, 0x05, 0x00]);
        assert_eq!(v.get(0).get("a"), Some(FieldValue::Unsigned(1)));
        assert_eq!(v.get(0).get("b"), Some(FieldValue::Signed(-2)));
        let last = v.get(v.size() - 1);
        assert_eq!(last.position(), 11);
        assert_eq!(last.get("b"), Some(FieldValue::Signed(5)));
    }

    #[test]
    fn slice_is_inclusive_and_restartable() {
        let v = vector(&[0, 0, 0, 1, 0, 0, 2, 0, 0, 3, 0, 0, 4, 0, 0]);
        let s = v.slice(1, 4, 2);
        let picked: Vec<_> = s.clone().map(|e| e.get("a")).collect();
        assert_eq!(picked, vec![Some(FieldValue::Unsigned(1)), Some(FieldValue::Unsigned(3))]);
        assert_eq!(s.count(), 2);
        assert_eq!(v.slice(2, 2, 1).count(), 1);
        assert_eq!(v.slice(3, 2, 1).count(), 0);
    }

    #[test]
    fn iter_covers_every_element() {
        let v = vector(&[7, 0, 0, 8, 0, 0]);
        let it = v.iter();
        assert_eq!(it.len(), 2);
        assert_eq!(it.map(|e| e.position()).collect::<Vec<_>>(), vec![8, 11]);
    }

    #[test]
    fn far_out_of_range_get_reads_zeros() {
        let v = vector(&[1, 2, 3]);
        let far = v.get(usize::MAX / 2);
        assert_eq!(far.get("a"), Some(FieldValue::Unsigned(0)));
        assert_eq!(far.get("b"), Some(FieldValue::Signed(0)));
        assert_eq!(v.slice(usize::MAX - 1, usize::MAX, 1).count(), 2);
    }

    #[test]
    fn close_zeroes_sizes() {
        let mut v = vector(&[1, 2, 3]);
        assert_eq!(v.size_in_bytes(), 19);
        assert!(v.is_open());
        v.close();
        assert_eq!(v.size_in_bytes(), 0);
        assert_eq!(v.size(), 0);
        assert!(!v.is_open());
    }

    #[test]
    fn describe_reports_layout() {
        let d = vector(&[1, 2, 3]).describe();
        assert_eq!(d.container_type, ContainerType::Vector);
        assert_eq!(d.size, 1);
        assert_eq!(d.element_types[0].name, "Pair");
    }
}
