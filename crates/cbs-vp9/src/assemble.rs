//! `cbs_vp9_assemble_fragment`: concatenates unit data, adding a
//! superframe trailer whenever there is more than one unit.

use cbs_core::{buffer::buffer_from_vec, BufferView, Fragment, Result};

use crate::syntax::superframe_index::build_superframe_index;

pub fn assemble_fragment(fragment: &mut Fragment) -> Result<()> {
    let mut frame_bytes = Vec::new();
    let mut frame_sizes = Vec::new();

    for unit in fragment.units() {
        let bytes = unit.data().map(|view| view.as_slice()).unwrap_or(&[]);
        frame_bytes.push(bytes.to_vec());
        frame_sizes.push(bytes.len() as u32);
    }

    let mut out = Vec::new();
    for bytes in &frame_bytes {
        out.extend_from_slice(bytes);
    }

    if let Some(index) = build_superframe_index(&frame_sizes)? {
        out.extend_from_slice(&index);
    }

    fragment.set_data(Some(BufferView::whole(buffer_from_vec(out))));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{buffer_from_slice, UnitType};

    #[test]
    fn single_unit_is_passed_through_with_no_index() {
        let mut fragment = Fragment::new();
        fragment.insert_unit_data(None, UnitType(0), BufferView::whole(buffer_from_slice(&[0x82, 0x49, 0x83, 0x42])));
        assemble_fragment(&mut fragment).unwrap();
        assert_eq!(fragment.data().unwrap().as_slice(), &[0x82, 0x49, 0x83, 0x42]);
    }

    #[test]
    fn multiple_units_get_a_superframe_trailer() {
        let mut fragment = Fragment::new();
        fragment.insert_unit_data(None, UnitType(0), BufferView::whole(buffer_from_slice(&[0xaa; 5])));
        fragment.insert_unit_data(None, UnitType(0), BufferView::whole(buffer_from_slice(&[0xbb; 3])));
        assemble_fragment(&mut fragment).unwrap();

        let data = fragment.data().unwrap().as_slice().to_vec();
        let frames = crate::syntax::superframe_index::extract_frames(&data).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &[0xaa; 5]);
        assert_eq!(frames[1], &[0xbb; 3]);
    }
}
