//! Wires frame splitting, header decomposition and the read-only
//! `CodecPlugin` surface together.
//!
//! Grounded on `cbs_vp8_split_fragment`/`cbs_vp8_read_unit`/
//! `cbs_vp8_write_unit`/`cbs_vp8_assemble_fragment` in
//! `examples/original_source/libavcodec/cbs_vp8.c`. A VP8 "fragment" here
//! is a single frame: there is no higher-level framing to split on, so
//! `split_fragment` pushes exactly one unit spanning the whole buffer,
//! matching the C source's single-type `ff_cbs_type_vp8` table.

use cbs_core::{BufferView, CbsError, CodecPlugin, Fragment, LsbBitReader, Result, TraceSink, Unit, UnitType};

use crate::bool_decoder::BoolDecoder;
use crate::header::{read_frame_header, read_frame_tag};
use crate::types::{Frame, FrameHeader, Vp8State};

/// The single, internal-reference unit type VP8 fragments are split into.
pub const FRAME_UNIT_TYPE: UnitType = UnitType(0);

#[derive(Debug, Default, Clone, Copy)]
pub struct Vp8Codec;

impl CodecPlugin for Vp8Codec {
    type State = Vp8State;

    fn name(&self) -> &'static str {
        "vp8"
    }

    fn split_fragment(&self, fragment: &mut Fragment, _is_header: bool, _trace: &mut TraceSink) -> Result<()> {
        let Some(view) = fragment.data().cloned() else {
            return Ok(());
        };
        fragment.push_unit(Unit::from_data(FRAME_UNIT_TYPE, view));
        Ok(())
    }

    fn read_unit(&self, fragment: &mut Fragment, index: usize, _state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let view = fragment.units()[index]
            .data()
            .cloned()
            .ok_or_else(|| CbsError::invalid_data("unit", "no raw data to decompose"))?;
        let data = view.as_slice();

        trace.header("Frame Tag");
        let mut header = FrameHeader::default();
        let mut le_reader = LsbBitReader::new(data);
        read_frame_tag(&mut le_reader, &mut header)?;

        let uncompressed_header_bytes = (le_reader.position() / 8) as usize;
        let compressed_header_region = &data[uncompressed_header_bytes..];

        trace.header("Compressed Header");
        let mut bc = BoolDecoder::new(compressed_header_region);
        read_frame_header(&mut bc, &mut header)?;

        let compressed_header_bytes = ((bc.bit_position() + 7) / 8) as usize;
        let payload_start = uncompressed_header_bytes + compressed_header_bytes;
        let payload = if payload_start < view.len() {
            Some(BufferView::new(view.buffer().clone(), view.range().start + payload_start..view.range().end))
        } else {
            None
        };

        fragment.units_mut()[index].set_content(Some(Box::new(Frame { header, payload })));
        Ok(())
    }

    fn write_unit(&self, _fragment: &mut Fragment, _index: usize, _state: &mut Self::State, _trace: &mut TraceSink) -> Result<()> {
        Err(CbsError::Unsupported("VP8 unit serialisation is not implemented".to_string()))
    }

    fn assemble_fragment(&self, _fragment: &mut Fragment) -> Result<()> {
        Err(CbsError::Unsupported("VP8 fragment assembly is not implemented".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{Context, Fragment};

    #[test]
    fn read_unit_rejects_frame_with_truncated_header() {
        let mut ctx: Context<Vp8Codec> = Context::new(Vp8Codec);
        let mut fragment = Fragment::new();
        let data = vec![0x01, 0x00, 0x00];
        let result = ctx.read_packet(&mut fragment, &data);
        assert!(result.is_err());
    }

    #[test]
    fn write_unit_reports_unsupported() {
        let mut fragment = Fragment::new();
        fragment.push_unit(Unit::from_content(FRAME_UNIT_TYPE, Box::new(Frame::default())));
        let mut state = Vp8State::default();
        let mut trace = TraceSink::default();
        let codec = Vp8Codec;
        let err = codec.write_unit(&mut fragment, 0, &mut state, &mut trace).unwrap_err();
        assert!(matches!(err, CbsError::Unsupported(_)));
    }
}
