//! `Fragment`: an ordered sequence of units forming some meaningful whole.

use crate::buffer::{Buffer, BufferView};
use crate::unit::{Unit, UnitContent, UnitType};

#[derive(Debug, Clone, Default)]
pub struct Fragment {
    units: Vec<Unit>,
    /// The assembled bitstream form, populated after a successful read or
    /// a successful `assemble_fragment` on write.
    data: Option<BufferView>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the fragment with raw input bytes but no units yet, the state
    /// `split_fragment` expects to be called on.
    pub fn from_bytes(buffer: Buffer) -> Self {
        Self {
            units: Vec::new(),
            data: Some(BufferView::whole(buffer)),
        }
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn data(&self) -> Option<&BufferView> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<BufferView>) {
        self.data = data;
    }

    pub fn push_unit(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    /// Splices a new unit carrying raw bytes at `position` (`None` means
    /// append).
    pub fn insert_unit_data(&mut self, position: Option<usize>, unit_type: UnitType, data: BufferView) {
        let unit = Unit::from_data(unit_type, data);
        match position {
            Some(pos) => self.units.insert(pos, unit),
            None => self.units.push(unit),
        }
    }

    /// Splices a new unit carrying decomposed content at `position`.
    pub fn insert_unit_content(
        &mut self,
        position: Option<usize>,
        unit_type: UnitType,
        content: Box<dyn UnitContent>,
    ) {
        let unit = Unit::from_content(unit_type, content);
        match position {
            Some(pos) => self.units.insert(pos, unit),
            None => self.units.push(unit),
        }
    }

    pub fn delete_unit(&mut self, position: usize) -> Unit {
        self.units.remove(position)
    }

    /// Clears all units but keeps the `Vec`'s allocated capacity.
    pub fn reset(&mut self) {
        self.units.clear();
        self.data = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::buffer_from_vec;

    #[test]
    fn insert_and_delete_unit() {
        let mut frag = Fragment::new();
        let buf = buffer_from_vec(vec![0, 0, 1, 0xB3]);
        frag.insert_unit_data(None, UnitType(0xB3), BufferView::whole(buf));
        assert_eq!(frag.len(), 1);
        let removed = frag.delete_unit(0);
        assert_eq!(removed.unit_type, UnitType(0xB3));
        assert!(frag.is_empty());
    }

    #[test]
    fn reset_clears_units_and_data() {
        let mut frag = Fragment::from_bytes(buffer_from_vec(vec![1, 2, 3]));
        frag.insert_unit_data(None, UnitType(1), BufferView::whole(buffer_from_vec(vec![1])));
        frag.reset();
        assert!(frag.is_empty());
        assert!(frag.data().is_none());
    }
}
