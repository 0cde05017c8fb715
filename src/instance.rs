//! Single struct instance.

use crate::describe::{ContainerDescription, ContainerType, StructDescription};
use crate::header::{ResourceHeader, SIZE_HEADER_LEN};
use crate::source::ByteSource;
use crate::structs::{Struct, StructLayout, StructView};

#[derive(Debug)]
pub struct Instance {
    source: Box<dyn ByteSource>,
    layout: &'static StructLayout,
}

impl Instance {
    pub fn new(source: Box<dyn ByteSource>, layout: &'static StructLayout) -> Self {
        Self { source, layout }
    }

    pub fn layout(&self) -> &'static StructLayout {
        self.layout
    }

    /// The struct, which always starts right after the size header.
    pub fn get(&self) -> StructView<'_> {
        StructView::new(&*self.source, SIZE_HEADER_LEN, self.layout)
    }

    pub fn get_as<'a, T: Struct<'a>>(&'a self) -> T {
        debug_assert_eq!(T::LAYOUT, self.layout, "binding does not match instance layout");
        T::from_view(self.get())
    }

    pub fn size(&self) -> usize {
        1
    }

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
            container_type: ContainerType::Instance,
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
}
