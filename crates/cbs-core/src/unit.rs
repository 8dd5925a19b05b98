//! `Unit`: the smallest independently parseable element of a stream.
//!
//! Grounded on `CodedBitstreamUnit` in the original C framework header: a
//! codec-specific numeric type, an optional byte view, and an optional
//! decomposed content value. Rust ownership replaces the C version's
//! type-descriptor table (content size / clone kind / free function) with
//! a trait object: the vtable behind `Box<dyn UnitContent>` already knows
//! how to clone and free itself, so there is nothing left to tabulate.

use std::any::Any;
use std::fmt::Debug;

use crate::buffer::BufferView;

/// Decomposed content of a unit. Implemented per concrete syntax-tree type
/// (`cbs_av1::SequenceHeaderObu`, `cbs_mpeg2::SliceHeader`, ...).
pub trait UnitContent: Any + Debug + Send + Sync {
    /// Deep-clones this content. For "internal-refs" content this clones
    /// the struct and bumps the `Arc<[u8]>` refcount on any owned buffer
    /// fields; for "complex" content it runs whatever bespoke duplication
    /// the type needs (e.g. AV1 metadata re-references its T.35 payload).
    fn clone_content(&self) -> Box<dyn UnitContent>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn UnitContent> {
    fn clone(&self) -> Self {
        self.clone_content()
    }
}

/// A codec-specific unit type tag. Each codec crate defines its own
/// concrete type (AV1's `ObuType`, MPEG-2's `StartCodeType`, ...) and the
/// generic framework stores it behind this small newtype so `Fragment`
/// and `Context` do not need to be generic over it as well as the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitType(pub u32);

impl From<u32> for UnitType {
    fn from(v: u32) -> Self {
        UnitType(v)
    }
}

impl From<u8> for UnitType {
    fn from(v: u8) -> Self {
        UnitType(v as u32)
    }
}

/// The smallest independently parseable element of a stream.
#[derive(Debug, Clone)]
pub struct Unit {
    pub unit_type: UnitType,
    data: Option<BufferView>,
    content: Option<Box<dyn UnitContent>>,
}

impl Unit {
    pub fn from_data(unit_type: UnitType, data: BufferView) -> Self {
        Self {
            unit_type,
            data: Some(data),
            content: None,
        }
    }

    pub fn from_content(unit_type: UnitType, content: Box<dyn UnitContent>) -> Self {
        Self {
            unit_type,
            data: None,
            content: Some(content),
        }
    }

    pub fn data(&self) -> Option<&BufferView> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<BufferView>) {
        self.data = data;
    }

    pub fn content(&self) -> Option<&dyn UnitContent> {
        self.content.as_deref()
    }

    pub fn content_mut(&mut self) -> Option<&mut Box<dyn UnitContent>> {
        self.content.as_mut()
    }

    pub fn set_content(&mut self, content: Option<Box<dyn UnitContent>>) {
        self.content = content;
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Ensures this unit's content is uniquely owned by deep-cloning it.
    /// Since `Box<dyn UnitContent>` has no sharing of its own, the only
    /// case this matters is after `Unit::clone()` handed a logically
    /// shared fragment a content value the caller intends to mutate
    /// independently; calling this first guarantees the mutation does not
    /// alias anything else that still references the same source bytes.
    pub fn make_content_unique(&mut self) {
        if let Some(content) = &self.content {
            self.content = Some(content.clone_content());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::buffer_from_vec;

    #[derive(Debug, Clone)]
    struct Dummy {
        value: u32,
    }

    impl UnitContent for Dummy {
        fn clone_content(&self) -> Box<dyn UnitContent> {
            Box::new(self.clone())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn data_only_unit_has_no_content() {
        let buf = buffer_from_vec(vec![1, 2, 3]);
        let unit = Unit::from_data(UnitType(2), BufferView::whole(buf));
        assert!(unit.has_data());
        assert!(!unit.has_content());
    }

    #[test]
    fn make_content_unique_deep_clones() {
        let mut unit = Unit::from_content(UnitType(1), Box::new(Dummy { value: 7 }));
        unit.make_content_unique();
        let content = unit.content().unwrap().as_any().downcast_ref::<Dummy>().unwrap();
        assert_eq!(content.value, 7);
    }
}
