//! Wires start-code splitting, per-unit decomposition, serialisation and
//! re-assembly into [`cbs_core::CodecPlugin`].
//!
//! Grounded on the `cbs_mpeg2_read_unit`/`cbs_mpeg2_write_unit` dispatch
//! (the `switch` on `unit->type` keyed by the `START(...)` macro table) in
//! `examples/original_source/libavcodec/cbs_mpeg2.c`.

use cbs_core::{buffer::buffer_from_vec, BitIo, BufferView, CbsError, CodecPlugin, Fragment, ReadIo, Result, TraceSink, WriteIo};

use crate::start_code::{
    is_slice, START_EXTENSION, START_GROUP, START_PICTURE, START_SEQUENCE_END, START_SEQUENCE_HEADER, START_USER_DATA,
};
use crate::syntax::gop::rw_group_of_pictures_header;
use crate::syntax::picture::{rw_extension_data, rw_picture_header};
use crate::syntax::sequence::rw_sequence_header;
use crate::syntax::slice::{capture_slice_payload, rw_slice_header};
use crate::syntax::user_data::{rw_sequence_end, rw_user_data};
use crate::types::{ExtensionData, GroupOfPicturesHeader, Mpeg2State, PictureHeader, SequenceEnd, SequenceExtension, Slice, SliceHeader, UserData};

#[derive(Debug, Default, Clone, Copy)]
pub struct Mpeg2Codec;

/// Consumes (or, on write, emits) the 8-bit start-code identifier byte that
/// every non-slice unit's data starts with. It duplicates the unit's own
/// type tag, so there is nothing for callers to decompose it into; it only
/// needs to be walked past.
fn rw_start_code_identifier<IO: BitIo>(io: &mut IO, unit_type: u32) -> Result<()> {
    let mut v = unit_type;
    io.rw_bits("start_code", 8, unit_type, unit_type, &mut v)
}

impl CodecPlugin for Mpeg2Codec {
    type State = Mpeg2State;

    fn name(&self) -> &'static str {
        "mpeg2"
    }

    fn split_fragment(&self, fragment: &mut Fragment, _is_header: bool, _trace: &mut TraceSink) -> Result<()> {
        let buffer = match fragment.data() {
            Some(view) => view.buffer().clone(),
            None => return Ok(()),
        };
        for unit in crate::start_code::split_fragment(&buffer)? {
            fragment.push_unit(unit);
        }
        Ok(())
    }

    fn read_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let unit_type = fragment.units()[index].unit_type.0;
        let view = fragment.units()[index]
            .data()
            .cloned()
            .ok_or_else(|| CbsError::invalid_data("unit", "no raw data to decompose"))?;
        let data = view.as_slice();

        if is_slice(unit_type) {
            trace.header("Slice Header");
            let mut io = ReadIo::with_trace(data, *trace);
            let mut header = SliceHeader::default();
            rw_slice_header(&mut io, &mut header, state)?;

            let mut payload = None;
            let mut payload_bit_start = 0u8;
            capture_slice_payload(&view, io.position(), &mut payload, &mut payload_bit_start);

            fragment.units_mut()[index].set_content(Some(Box::new(Slice { header, payload, payload_bit_start })));
            return Ok(());
        }

        let mut io = ReadIo::with_trace(data, *trace);
        rw_start_code_identifier(&mut io, unit_type)?;

        match unit_type {
            START_SEQUENCE_HEADER => {
                trace.header("Sequence Header");
                let mut current = crate::types::SequenceHeader::default();
                rw_sequence_header(&mut io, &mut current, state)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            START_USER_DATA => {
                trace.header("User Data");
                let mut current = UserData::default();
                rw_user_data(&mut io, &mut current)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            START_GROUP => {
                trace.header("Group of Pictures Header");
                let mut current = GroupOfPicturesHeader::default();
                rw_group_of_pictures_header(&mut io, &mut current)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            START_PICTURE => {
                trace.header("Picture Header");
                let mut current = PictureHeader::default();
                rw_picture_header(&mut io, &mut current)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            START_EXTENSION => {
                trace.header("Extension Data");
                let mut current = ExtensionData::Sequence(SequenceExtension::default());
                rw_extension_data(&mut io, &mut current, state)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            START_SEQUENCE_END => {
                trace.header("Sequence End");
                let mut current = SequenceEnd::default();
                rw_sequence_end(&mut io, &mut current)?;
                fragment.units_mut()[index].set_content(Some(Box::new(current)));
            }
            other => {
                return Err(CbsError::Unsupported(format!("unit type 0x{other:02x} has no decomposed form")));
            }
        }
        Ok(())
    }

    fn write_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let unit_type = fragment.units()[index].unit_type.0;

        if is_slice(unit_type) {
            let slice = fragment.units()[index]
                .content()
                .and_then(|content| content.as_any().downcast_ref::<Slice>())
                .ok_or_else(|| CbsError::invalid_data("unit", "no decomposed slice content to serialise"))?
                .clone();

            trace.header("Slice Header");
            let mut io = WriteIo::with_trace(false, *trace);
            let mut header = slice.header.clone();
            rw_slice_header(&mut io, &mut header, state)?;

            let bytes = write_slice_payload(io, &slice)?;
            fragment.units_mut()[index].set_data(Some(BufferView::whole(buffer_from_vec(bytes))));
            return Ok(());
        }

        let content = fragment.units()[index]
            .content()
            .ok_or_else(|| CbsError::invalid_data("unit", "no decomposed content to serialise"))?;

        let mut io = WriteIo::with_trace(false, *trace);
        rw_start_code_identifier(&mut io, unit_type)?;

        if let Some(current) = content.as_any().downcast_ref::<crate::types::SequenceHeader>() {
            let mut current = current.clone();
            rw_sequence_header(&mut io, &mut current, state)?;
        } else if let Some(current) = content.as_any().downcast_ref::<UserData>() {
            let mut current = current.clone();
            rw_user_data(&mut io, &mut current)?;
        } else if let Some(current) = content.as_any().downcast_ref::<GroupOfPicturesHeader>() {
            let mut current = current.clone();
            rw_group_of_pictures_header(&mut io, &mut current)?;
        } else if let Some(current) = content.as_any().downcast_ref::<PictureHeader>() {
            let mut current = current.clone();
            rw_picture_header(&mut io, &mut current)?;
        } else if let Some(current) = content.as_any().downcast_ref::<ExtensionData>() {
            let mut current = current.clone();
            rw_extension_data(&mut io, &mut current, state)?;
        } else if let Some(current) = content.as_any().downcast_ref::<SequenceEnd>() {
            let mut current = current.clone();
            rw_sequence_end(&mut io, &mut current)?;
        } else {
            return Err(CbsError::invalid_data("unit", "unrecognised content type for this unit type"));
        }

        io.writer.byte_align();
        fragment.units_mut()[index].set_data(Some(BufferView::whole(buffer_from_vec(io.writer.into_bytes()))));
        Ok(())
    }

    fn assemble_fragment(&self, fragment: &mut Fragment) -> Result<()> {
        crate::assemble::assemble_fragment(fragment)
    }
}

/// Mirrors `cbs_mpeg2_write_slice`: if the header landed byte-aligned, the
/// opaque payload is just appended; otherwise its leading
/// `payload_bit_start` bits are merged into the still-open last byte and
/// the rest follows, with the whole thing padded to a byte boundary.
fn write_slice_payload(mut io: WriteIo, slice: &Slice) -> Result<Vec<u8>> {
    let Some(payload) = &slice.payload else {
        io.writer.byte_align();
        return Ok(io.writer.into_bytes());
    };
    let payload_bytes = payload.as_slice();

    if io.writer.is_byte_aligned() {
        io.writer.write_bytes(payload_bytes)?;
        io.writer.byte_align();
        return Ok(io.writer.into_bytes());
    }

    let mut reader = cbs_core::BitReader::new(payload_bytes);
    let total_bits = reader.remaining_bits();
    let leading = slice.payload_bit_start as u64;
    let merge_bits = leading.min(total_bits);
    if merge_bits > 0 {
        let chunk = reader.read_bits_u64(merge_bits as u8)?;
        io.writer.write_bits_u64(chunk, merge_bits as u8)?;
    }
    while reader.remaining_bits() >= 8 {
        io.writer.write_byte(reader.read_byte()?)?;
    }
    let tail = reader.remaining_bits() as u8;
    if tail > 0 {
        let chunk = reader.read_bits_u64(tail)?;
        io.writer.write_bits_u64(chunk, tail)?;
    }
    io.writer.byte_align();
    Ok(io.writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::Context;

    #[test]
    fn sequence_header_round_trips_through_context() {
        let mut ctx: Context<Mpeg2Codec> = Context::new(Mpeg2Codec);

        let mut fragment = Fragment::new();
        let mut w = WriteIo::new(false);
        let mut header = crate::types::SequenceHeader {
            horizontal_size_value: 352,
            vertical_size_value: 288,
            aspect_ratio_information: 1,
            frame_rate_code: 3,
            bit_rate_value: 500,
            vbv_buffer_size_value: 20,
            constrained_parameters_flag: true,
            ..Default::default()
        };
        let mut state = Mpeg2State::default();
        rw_start_code_identifier(&mut w, START_SEQUENCE_HEADER).unwrap();
        rw_sequence_header(&mut w, &mut header, &mut state).unwrap();
        w.writer.byte_align();
        let mut body = vec![0x00, 0x00, 0x01];
        body.extend(w.writer.into_bytes());

        ctx.read_packet(&mut fragment, &body).unwrap();
        assert_eq!(fragment.len(), 1);
        let decoded = fragment.units()[0]
            .content()
            .unwrap()
            .as_any()
            .downcast_ref::<crate::types::SequenceHeader>()
            .unwrap();
        assert_eq!(decoded.horizontal_size_value, 352);
    }

    #[test]
    fn slice_payload_passes_through_byte_aligned_case() {
        let state = Mpeg2State::default();
        let mut header = SliceHeader { slice_vertical_position: 1, quantiser_scale_code: 10, ..Default::default() };
        let mut io = WriteIo::new(false);
        rw_slice_header(&mut io, &mut header, &state).unwrap();
        assert!(io.writer.is_byte_aligned());

        let payload_bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        let payload = BufferView::whole(buffer_from_vec(payload_bytes.to_vec()));
        let slice = Slice { header, payload: Some(payload), payload_bit_start: 0 };

        let bytes = write_slice_payload(io, &slice).unwrap();
        assert!(bytes.ends_with(&payload_bytes));
    }
}
