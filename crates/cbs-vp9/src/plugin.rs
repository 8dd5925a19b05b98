//! Wires superframe splitting, per-unit header decomposition,
//! serialisation and re-assembly into [`cbs_core::CodecPlugin`].
//!
//! Grounded on `cbs_vp9_split_fragment`/`cbs_vp9_read_unit`/
//! `cbs_vp9_write_unit`/`cbs_vp9_assemble_fragment` in
//! `examples/original_source/libavcodec/cbs_vp9.c`.

use cbs_core::{buffer::buffer_from_vec, BufferView, CbsError, CodecPlugin, Fragment, ReadIo, Result, TraceSink, Unit, UnitType, WriteIo};

use crate::syntax::frame_header::{rw_trailing_bits, rw_uncompressed_header};
use crate::syntax::superframe_index::extract_frames;
use crate::types::{Frame, FrameHeader, Vp9State};

/// The single, internal-reference unit type a VP9 fragment's frames are
/// split into; VP9 has no unit-type taxonomy the way MPEG-2 or AV1 do.
pub const FRAME_UNIT_TYPE: UnitType = UnitType(0);

#[derive(Debug, Default, Clone, Copy)]
pub struct Vp9Codec;

impl CodecPlugin for Vp9Codec {
    type State = Vp9State;

    fn name(&self) -> &'static str {
        "vp9"
    }

    fn split_fragment(&self, fragment: &mut Fragment, _is_header: bool, _trace: &mut TraceSink) -> Result<()> {
        let Some(view) = fragment.data().cloned() else {
            return Ok(());
        };

        let frames = extract_frames(view.as_slice())?;
        let mut offset = 0usize;
        for frame in frames {
            let len = frame.len();
            let frame_view = BufferView::new(view.buffer().clone(), view.range().start + offset..view.range().start + offset + len);
            fragment.push_unit(Unit::from_data(FRAME_UNIT_TYPE, frame_view));
            offset += len;
        }
        Ok(())
    }

    fn read_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let view = fragment.units()[index]
            .data()
            .cloned()
            .ok_or_else(|| CbsError::invalid_data("unit", "no raw data to decompose"))?;
        let data = view.as_slice();

        trace.header("Uncompressed Header");
        let mut io = ReadIo::with_trace(data, *trace);
        let mut header = FrameHeader::default();
        rw_uncompressed_header(&mut io, &mut header, state)?;
        rw_trailing_bits(&mut io)?;

        let header_bytes = (io.position() / 8) as usize;
        let payload = if header_bytes < view.len() {
            Some(BufferView::new(view.buffer().clone(), view.range().start + header_bytes..view.range().end))
        } else {
            None
        };

        fragment.units_mut()[index].set_content(Some(Box::new(Frame { header, payload })));
        Ok(())
    }

    fn write_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let frame = fragment.units()[index]
            .content()
            .and_then(|content| content.as_any().downcast_ref::<Frame>())
            .ok_or_else(|| CbsError::invalid_data("unit", "no decomposed frame content to serialise"))?
            .clone();

        trace.header("Uncompressed Header");
        let mut io = WriteIo::with_trace(false, *trace);
        let mut header = frame.header.clone();
        rw_uncompressed_header(&mut io, &mut header, state)?;
        rw_trailing_bits(&mut io)?;

        let mut bytes = io.writer.into_bytes();
        if let Some(payload) = &frame.payload {
            bytes.extend_from_slice(payload.as_slice());
        }

        fragment.units_mut()[index].set_data(Some(BufferView::whole(buffer_from_vec(bytes))));
        Ok(())
    }

    fn assemble_fragment(&self, fragment: &mut Fragment) -> Result<()> {
        crate::assemble::assemble_fragment(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{Context, Fragment};

    fn encode_key_frame() -> Vec<u8> {
        let mut io = WriteIo::new(false);
        let mut state = Vp9State::default();
        let mut header = FrameHeader::default();
        header.frame_marker = 2;
        header.frame_type = crate::types::VP9_KEY_FRAME;
        header.show_frame = true;
        header.frame_width_minus_1 = 319;
        header.frame_height_minus_1 = 239;
        header.quantization.base_q_idx = 20;
        rw_uncompressed_header(&mut io, &mut header, &mut state).unwrap();
        rw_trailing_bits(&mut io).unwrap();
        io.writer.into_bytes()
    }

    #[test]
    fn split_and_read_decomposes_a_single_frame() {
        let mut data = encode_key_frame();
        data.extend_from_slice(&[0xff; 4]);

        let mut ctx: Context<Vp9Codec> = Context::new(Vp9Codec);
        let mut fragment = Fragment::new();
        ctx.read_packet(&mut fragment, &data).unwrap();

        assert_eq!(fragment.units().len(), 1);
        let frame = fragment.units()[0].content().unwrap().as_any().downcast_ref::<Frame>().unwrap();
        assert_eq!(frame.header.frame_width_minus_1, 319);
        assert!(frame.payload.is_some());
    }

    #[test]
    fn read_unit_rejects_truncated_header() {
        let mut ctx: Context<Vp9Codec> = Context::new(Vp9Codec);
        let mut fragment = Fragment::new();
        let data = vec![0x00];
        let result = ctx.read_packet(&mut fragment, &data);
        assert!(result.is_err());
    }

    #[test]
    fn write_unit_round_trips_frame_header() {
        let data = encode_key_frame();
        let mut ctx: Context<Vp9Codec> = Context::new(Vp9Codec);
        let mut fragment = Fragment::new();
        ctx.read_packet(&mut fragment, &data).unwrap();

        let mut state = Vp9State::default();
        let mut trace = TraceSink::default();
        let codec = Vp9Codec;
        codec.write_unit(&mut fragment, 0, &mut state, &mut trace).unwrap();

        let rewritten = fragment.units()[0].data().unwrap().as_slice().to_vec();
        assert_eq!(rewritten, data);
    }
}
