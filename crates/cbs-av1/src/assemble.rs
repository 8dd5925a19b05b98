//! `cbs_av1_assemble_fragment`: AV1 has no container-level framing of its
//! own once each OBU is a standalone byte string, so this is a
//! concatenation of unit data views in order.

use cbs_core::{buffer::buffer_from_vec, BufferView, Fragment, Result};

pub fn assemble_fragment(fragment: &mut Fragment) -> Result<()> {
    let mut bytes = Vec::new();
    for unit in fragment.units() {
        if let Some(view) = unit.data() {
            bytes.extend_from_slice(view.as_slice());
        }
    }
    fragment.set_data(Some(BufferView::whole(buffer_from_vec(bytes))));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{buffer_from_slice, UnitType};

    #[test]
    fn concatenates_unit_data_in_order() {
        let mut fragment = Fragment::new();
        fragment.insert_unit_data(None, UnitType(2), BufferView::whole(buffer_from_slice(&[0x12, 0x00])));
        fragment.insert_unit_data(None, UnitType(1), BufferView::whole(buffer_from_slice(&[0xAA])));
        assemble_fragment(&mut fragment).unwrap();
        assert_eq!(fragment.data().unwrap().as_slice(), &[0x12, 0x00, 0xAA]);
    }
}
