//! Wires the split/read/write/assemble passes into [`cbs_core::CodecPlugin`].
//!
//! Grounded on the `cbs_type_av1` hook table in
//! `examples/original_source/libavcodec/cbs_av1.c`.

use cbs_core::{buffer::buffer_from_vec, BufferView, CbsError, CodecPlugin, Fragment, Result, TraceSink};

use crate::syntax::obu::{read_obu, write_obu, Av1Obu};
use crate::types::Av1State;

#[derive(Debug, Default, Clone, Copy)]
pub struct Av1Codec;

impl CodecPlugin for Av1Codec {
    type State = Av1State;

    fn name(&self) -> &'static str {
        "av1"
    }

    fn split_fragment(&self, fragment: &mut Fragment, is_header: bool, _trace: &mut TraceSink) -> Result<()> {
        let buffer = match fragment.data() {
            Some(view) => view.buffer().clone(),
            None => return Ok(()),
        };
        for unit in crate::split::split_fragment(&buffer, is_header)? {
            fragment.push_unit(unit);
        }
        Ok(())
    }

    fn read_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let data = fragment.units()[index]
            .data()
            .ok_or_else(|| CbsError::invalid_data("unit", "no raw data to decompose"))?
            .as_slice()
            .to_vec();

        let obu = read_obu(&data, state, trace)?;
        if state.drop_obu(obu.body.obu_type(), obu.header.temporal_id, obu.header.spatial_id) {
            return Err(CbsError::TryAgain);
        }

        fragment.units_mut()[index].set_content(Some(Box::new(obu)));
        Ok(())
    }

    fn write_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()> {
        let obu = fragment.units()[index]
            .content()
            .and_then(|content| content.as_any().downcast_ref::<Av1Obu>())
            .ok_or_else(|| CbsError::invalid_data("unit", "no decomposed AV1 content to serialise"))?
            .clone();

        let bytes = write_obu(&obu, state, trace)?;
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
    use cbs_core::Context;

    #[test]
    fn temporal_delimiter_and_sequence_header_round_trip_through_context() {
        let mut ctx: Context<Av1Codec> = Context::new(Av1Codec);

        // TD (type 2), has_size_field=1, size=0.
        let td = [0x12u8, 0x00];
        let mut fragment = Fragment::new();
        ctx.read_packet(&mut fragment, &td).unwrap();
        assert_eq!(fragment.len(), 1);
        assert!(fragment.units()[0].has_content());
    }
}
