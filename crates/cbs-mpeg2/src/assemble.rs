//! `cbs_mpeg2_assemble_fragment`: re-inserts the `00 00 01` start-code
//! prefix each unit's bytes were split away from and concatenates the
//! result.

use cbs_core::{buffer::buffer_from_vec, BufferView, Fragment, Result};

pub fn assemble_fragment(fragment: &mut Fragment) -> Result<()> {
    let mut bytes = Vec::new();
    for unit in fragment.units() {
        if let Some(view) = unit.data() {
            bytes.extend_from_slice(&[0x00, 0x00, 0x01]);
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
    fn prefixes_every_unit_with_a_start_code() {
        let mut fragment = Fragment::new();
        fragment.insert_unit_data(None, UnitType(0xB3), BufferView::whole(buffer_from_slice(&[0xB3, 0xAA])));
        fragment.insert_unit_data(None, UnitType(0x00), BufferView::whole(buffer_from_slice(&[0x00, 0xCC])));
        assemble_fragment(&mut fragment).unwrap();
        assert_eq!(
            fragment.data().unwrap().as_slice(),
            &[0x00, 0x00, 0x01, 0xB3, 0xAA, 0x00, 0x00, 0x01, 0x00, 0xCC]
        );
    }
}
