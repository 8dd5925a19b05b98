//! `slice_header` and the `Slice` unit's opaque macroblock payload.
//!
//! Grounded on `cbs_mpeg2_syntax_template.c`'s `FUNC(slice_header)` and
//! `cbs_mpeg2.c`'s `cbs_mpeg2_read_slice`/`cbs_mpeg2_write_slice` (the
//! byte-aligned-fast-path vs. bit-merge payload copy).

use cbs_core::{BitIo, BufferView, Result};

use crate::codings::{rw_extra_information, Mpeg2BitIo};
use crate::types::{Mpeg2State, SliceExtensionFields, SliceHeader, SCALABLE_MODE_DATA_PARTITIONING};

pub fn rw_slice_header<IO: BitIo + Mpeg2BitIo>(io: &mut IO, current: &mut SliceHeader, state: &Mpeg2State) -> Result<()> {
    let mut vertical_position = current.slice_vertical_position as u32;
    io.rw_bits("slice_vertical_position", 8, 0, 255, &mut vertical_position)?;
    current.slice_vertical_position = vertical_position as u8;

    if state.vertical_size > 2800 {
        let mut ext = current.slice_vertical_position_extension.unwrap_or(0) as u32;
        io.rw_bits("slice_vertical_position_extension", 3, 0, 7, &mut ext)?;
        current.slice_vertical_position_extension = Some(ext as u8);
    } else {
        current.slice_vertical_position_extension = None;
    }

    if state.scalable && state.scalable_mode == SCALABLE_MODE_DATA_PARTITIONING {
        let mut breakpoint = current.priority_breakpoint.unwrap_or(0) as u32;
        io.rw_bits("priority_breakpoint", 7, 0, 0x7f, &mut breakpoint)?;
        current.priority_breakpoint = Some(breakpoint as u8);
    } else {
        current.priority_breakpoint = None;
    }

    let mut quantiser_scale_code = current.quantiser_scale_code as u32;
    io.rw_bits("quantiser_scale_code", 5, 1, 31, &mut quantiser_scale_code)?;
    current.quantiser_scale_code = quantiser_scale_code as u8;

    // `slice_extension_flag` is only actually consumed/emitted when it is
    // `1`: a `0` here is indistinguishable from (and left to double as) the
    // terminating marker bit of the `extra_information` run that follows,
    // matching the `nextbits`-gated `ui(1, slice_extension_flag)` in the
    // reference syntax.
    let would_write = current.extension.is_some();
    if io.peek_flag(would_write)? {
        let mut flag = true;
        io.rw_bit("slice_extension_flag", &mut flag)?;

        let mut fields = current.extension.take().unwrap_or_default();
        io.rw_bit("intra_slice", &mut fields.intra_slice)?;
        io.rw_bit("slice_picture_id_enable", &mut fields.slice_picture_id_enable)?;
        let mut id = fields.slice_picture_id as u32;
        io.rw_bits("slice_picture_id", 6, 0, 63, &mut id)?;
        fields.slice_picture_id = id as u8;
        current.extension = Some(fields);
    } else {
        current.extension = None;
    }

    rw_extra_information(io, &mut current.extra_information.values)?;

    Ok(())
}

/// Copies the opaque macroblock payload into `current` without touching its
/// bits, following `cbs_mpeg2_read_slice`: whatever remains in the unit
/// buffer after the header and (if present) `payload_bit_start` leftover
/// bits becomes `payload`.
pub fn capture_slice_payload(unit_data: &BufferView, header_bit_length: u64, payload: &mut Option<BufferView>, payload_bit_start: &mut u8) {
    let start_byte = (header_bit_length / 8) as usize;
    *payload_bit_start = (header_bit_length % 8) as u8;
    let range_start = unit_data.range().start + start_byte;
    *payload = Some(BufferView::new(unit_data.buffer().clone(), range_start..unit_data.range().end));
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    #[test]
    fn slice_header_without_extension_round_trips() {
        let state = Mpeg2State { vertical_size: 576, scalable: false, ..Default::default() };
        let mut current = SliceHeader {
            slice_vertical_position: 3,
            quantiser_scale_code: 16,
            ..Default::default()
        };
        let mut w = WriteIo::new(false);
        rw_slice_header(&mut w, &mut current, &state).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = SliceHeader::default();
        rw_slice_header(&mut r, &mut decoded, &state).unwrap();
        assert_eq!(decoded.slice_vertical_position, 3);
        assert_eq!(decoded.quantiser_scale_code, 16);
        assert!(decoded.extension.is_none());
        assert!(decoded.slice_vertical_position_extension.is_none());
    }

    #[test]
    fn slice_header_with_extension_round_trips() {
        let state = Mpeg2State { vertical_size: 2900, scalable: true, scalable_mode: SCALABLE_MODE_DATA_PARTITIONING, ..Default::default() };
        let mut current = SliceHeader {
            slice_vertical_position: 1,
            slice_vertical_position_extension: Some(5),
            priority_breakpoint: Some(10),
            quantiser_scale_code: 31,
            extension: Some(SliceExtensionFields { intra_slice: true, slice_picture_id_enable: true, slice_picture_id: 42 }),
            extra_information: Default::default(),
        };
        let mut w = WriteIo::new(false);
        rw_slice_header(&mut w, &mut current, &state).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = SliceHeader::default();
        rw_slice_header(&mut r, &mut decoded, &state).unwrap();
        assert_eq!(decoded.slice_vertical_position_extension, Some(5));
        assert_eq!(decoded.priority_breakpoint, Some(10));
        let extension = decoded.extension.expect("extension fields present");
        assert!(extension.intra_slice);
        assert_eq!(extension.slice_picture_id, 42);
    }
}
