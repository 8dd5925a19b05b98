//! Decomposes one OBU's bytes into typed content and serializes it back.
//!
//! Grounded on `cbs_av1_read_unit`/`cbs_av1_write_unit` in
//! `examples/original_source/libavcodec/cbs_av1.c`: each unit carries its
//! own `obu_header()` fields (extension flag, temporal/spatial id,
//! size-field presence) alongside whichever syntax structure its
//! `obu_type` selects, threading the same per-context [`Av1State`] the
//! split pass and the frame/sequence syntax routines already use.

use serde::{Deserialize, Serialize};

use cbs_core::{BitIo, CbsError, ReadIo, Result, TraceSink, UnitContent, WriteIo};

use crate::codings::{rw_trailing_bits, Av1BitIo};
use crate::split::{read_obu_header, ObuHeader};
use crate::syntax::frame_header::{rw_frame_header_obu, rw_frame_obu, rw_tile_group_obu};
use crate::syntax::metadata::{rw_metadata_obu, MetadataPayload};
use crate::syntax::sequence_header::rw_sequence_header;
use crate::types::{Av1State, FrameHeader, ObuType, SequenceHeader, TileGroup};

/// Resolves `state.operating_point_idc` from a freshly parsed sequence
/// header, matching FFmpeg's `cbs_av1_read_unit`: only reassigned when
/// the caller preselected an operating point (`state.operating_point >=
/// 0`), and only after validating it against the sequence header's
/// declared operating point count.
fn resolve_operating_point_idc(state: &mut Av1State, seq: &SequenceHeader) -> Result<()> {
    if state.operating_point < 0 {
        return Ok(());
    }
    let index = state.operating_point as usize;
    if index >= seq.operating_points.len() {
        return Err(CbsError::invalid_data(
            "operating_point",
            format!(
                "requested operating point {} must not be higher than {}",
                state.operating_point,
                seq.operating_points.len().saturating_sub(1)
            ),
        ));
    }
    state.operating_point_idc = seq.operating_points[index].idc;
    Ok(())
}

/// `obu_header()` fields needed to reproduce the original header bits on
/// write; everything else about an OBU lives in its decomposed body.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ObuHeaderInfo {
    pub extension_flag: bool,
    pub has_size_field: bool,
    pub temporal_id: u8,
    pub spatial_id: u8,
}

#[derive(Debug, Clone, Serialize)]
pub enum Av1ObuBody {
    SequenceHeader(SequenceHeader),
    TemporalDelimiter,
    FrameHeader(FrameHeader),
    RedundantFrameHeader(FrameHeader),
    TileGroup(TileGroup),
    Frame(FrameHeader, TileGroup),
    Metadata(MetadataPayload),
}

impl Av1ObuBody {
    pub fn obu_type(&self) -> ObuType {
        match self {
            Av1ObuBody::SequenceHeader(_) => ObuType::SequenceHeader,
            Av1ObuBody::TemporalDelimiter => ObuType::TemporalDelimiter,
            Av1ObuBody::FrameHeader(_) => ObuType::FrameHeader,
            Av1ObuBody::RedundantFrameHeader(_) => ObuType::RedundantFrameHeader,
            Av1ObuBody::TileGroup(_) => ObuType::TileGroup,
            Av1ObuBody::Frame(_, _) => ObuType::Frame,
            Av1ObuBody::Metadata(_) => ObuType::Metadata,
        }
    }
}

/// Decomposed content of one OBU, stored as a unit's [`UnitContent`].
#[derive(Debug, Clone, Serialize)]
pub struct Av1Obu {
    pub header: ObuHeaderInfo,
    pub body: Av1ObuBody,
}

impl UnitContent for Av1Obu {
    fn clone_content(&self) -> Box<dyn UnitContent> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// OBUs whose declared `obu_size` can exceed the bits their body actually
/// consumes and must therefore be padded with `trailing_bits()` at the OBU
/// level, per the AV1 `obu()` wrapper's own exclusion list (tile group,
/// tile list and frame OBUs own their payload to the byte and never get
/// this extra padding).
fn has_obu_level_trailing_bits(obu_type: ObuType) -> bool {
    !obu_type.has_opaque_trailing_payload()
}

/// Decomposes one OBU's complete bytes (header, optional `leb128` size,
/// payload) into typed content, threading `state` the way
/// `cbs_av1_read_unit` does across a fragment's units.
pub fn read_obu(data: &[u8], state: &mut Av1State, trace: &mut TraceSink) -> Result<Av1Obu> {
    let mut io = ReadIo::with_trace(data, *trace);
    let hdr: ObuHeader = read_obu_header(&mut io)?;

    let mut obu_size: u64 = 0;
    if hdr.has_size_field {
        io.rw_leb128("obu_size", &mut obu_size)?;
    } else {
        let header_bytes = io.reader.byte_position() as u64;
        obu_size = (data.len() as u64).saturating_sub(header_bytes);
    }

    let payload_start_bytes = io.reader.byte_position();
    let payload_end_bytes = payload_start_bytes
        .checked_add(obu_size as usize)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| CbsError::invalid_data("obu", "declared obu_size exceeds unit length"))?;

    state.temporal_id = hdr.temporal_id;
    state.spatial_id = hdr.spatial_id;

    let body = match hdr.obu_type {
        ObuType::SequenceHeader => {
            trace.header("Sequence Header");
            let mut seq = SequenceHeader::default();
            rw_sequence_header(&mut io, &mut seq)?;
            resolve_operating_point_idc(state, &seq)?;
            state.sequence_header = Some(seq.clone());
            Av1ObuBody::SequenceHeader(seq)
        }
        ObuType::TemporalDelimiter => {
            state.seen_frame_header = false;
            Av1ObuBody::TemporalDelimiter
        }
        ObuType::FrameHeader | ObuType::RedundantFrameHeader => {
            trace.header("Frame Header");
            let seq = state
                .sequence_header
                .clone()
                .ok_or_else(|| CbsError::invalid_data("frame_header_obu", "no sequence header seen yet"))?;
            let mut frame = FrameHeader::default();
            rw_frame_header_obu(&mut io, &mut frame, &seq, state)?;
            if matches!(hdr.obu_type, ObuType::FrameHeader) {
                Av1ObuBody::FrameHeader(frame)
            } else {
                Av1ObuBody::RedundantFrameHeader(frame)
            }
        }
        ObuType::TileGroup => {
            trace.header("Tile Group");
            let mut tile_group = TileGroup::default();
            rw_tile_group_obu(&mut io, &mut tile_group, state)?;
            Av1ObuBody::TileGroup(tile_group)
        }
        ObuType::Frame => {
            trace.header("Frame");
            let seq = state
                .sequence_header
                .clone()
                .ok_or_else(|| CbsError::invalid_data("frame_obu", "no sequence header seen yet"))?;
            let mut frame = FrameHeader::default();
            let mut tile_group = TileGroup::default();
            rw_frame_obu(&mut io, &mut frame, &mut tile_group, &seq, state)?;
            Av1ObuBody::Frame(frame, tile_group)
        }
        ObuType::Metadata => {
            let mut metadata = MetadataPayload::default();
            rw_metadata_obu(&mut io, &mut metadata, obu_size)?;
            Av1ObuBody::Metadata(metadata)
        }
        ObuType::Padding | ObuType::TileList | ObuType::Reserved(_) => {
            return Err(CbsError::Unsupported(format!("obu_type {}", hdr.obu_type.to_u8())));
        }
    };

    if has_obu_level_trailing_bits(hdr.obu_type) && io.position() < (payload_end_bytes as u64) * 8 {
        rw_trailing_bits(&mut io)?;
    }

    Ok(Av1Obu {
        header: ObuHeaderInfo {
            extension_flag: hdr.extension_flag,
            has_size_field: hdr.has_size_field,
            temporal_id: hdr.temporal_id,
            spatial_id: hdr.spatial_id,
        },
        body,
    })
}

/// Serialises one decomposed OBU back to bytes: its body is written to a
/// scratch buffer first so `obu_size` (the byte length of everything after
/// the size field) is known before the header's `leb128()` is emitted.
pub fn write_obu(obu: &Av1Obu, state: &mut Av1State, trace: &mut TraceSink) -> Result<Vec<u8>> {
    let obu_type = obu.body.obu_type();
    let mut body_io = WriteIo::with_trace(true, *trace);

    match &obu.body {
        Av1ObuBody::SequenceHeader(seq) => {
            trace.header("Sequence Header");
            let mut seq = seq.clone();
            rw_sequence_header(&mut body_io, &mut seq)?;
            resolve_operating_point_idc(state, &seq)?;
            state.sequence_header = Some(seq);
        }
        Av1ObuBody::TemporalDelimiter => {
            state.seen_frame_header = false;
        }
        Av1ObuBody::FrameHeader(frame) | Av1ObuBody::RedundantFrameHeader(frame) => {
            trace.header("Frame Header");
            let seq = state
                .sequence_header
                .clone()
                .ok_or_else(|| CbsError::invalid_data("frame_header_obu", "no sequence header seen yet"))?;
            let mut frame = frame.clone();
            rw_frame_header_obu(&mut body_io, &mut frame, &seq, state)?;
        }
        Av1ObuBody::TileGroup(tile_group) => {
            trace.header("Tile Group");
            let mut tile_group = tile_group.clone();
            rw_tile_group_obu(&mut body_io, &mut tile_group, state)?;
        }
        Av1ObuBody::Frame(frame, tile_group) => {
            trace.header("Frame");
            let seq = state
                .sequence_header
                .clone()
                .ok_or_else(|| CbsError::invalid_data("frame_obu", "no sequence header seen yet"))?;
            let mut frame = frame.clone();
            let mut tile_group = tile_group.clone();
            rw_frame_obu(&mut body_io, &mut frame, &mut tile_group, &seq, state)?;
        }
        Av1ObuBody::Metadata(metadata) => {
            let mut metadata = metadata.clone();
            rw_metadata_obu(&mut body_io, &mut metadata, 0)?;
        }
    }

    if has_obu_level_trailing_bits(obu_type) && !body_io.writer.is_byte_aligned() {
        rw_trailing_bits(&mut body_io)?;
    }
    body_io.writer.byte_align();
    let body_bytes = body_io.writer.into_bytes();

    let mut header_io = WriteIo::with_trace(true, *trace);
    let mut forbidden = false;
    header_io.rw_bit("obu_forbidden_bit", &mut forbidden)?;
    let mut obu_type_bits = obu_type.to_u8() as u32;
    header_io.rw_bits("obu_type", 4, 0, 15, &mut obu_type_bits)?;
    let mut extension_flag = obu.header.extension_flag;
    header_io.rw_bit("obu_extension_flag", &mut extension_flag)?;
    let mut has_size_field = obu.header.has_size_field;
    header_io.rw_bit("obu_has_size_field", &mut has_size_field)?;
    let mut reserved = false;
    header_io.rw_bit("obu_reserved_1bit", &mut reserved)?;

    if extension_flag {
        let mut temporal_id = obu.header.temporal_id as u32;
        header_io.rw_bits("temporal_id", 3, 0, 7, &mut temporal_id)?;
        let mut spatial_id = obu.header.spatial_id as u32;
        header_io.rw_bits("spatial_id", 2, 0, 3, &mut spatial_id)?;
        let mut reserved3 = 0u32;
        header_io.rw_bits("extension_header_reserved_3bits", 3, 0, 7, &mut reserved3)?;
    }

    if has_size_field {
        let mut size = body_bytes.len() as u64;
        header_io.rw_leb128("obu_size", &mut size)?;
    }

    let mut out = header_io.writer.into_bytes();
    out.extend_from_slice(&body_bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_sequence_header() -> SequenceHeader {
        let mut seq = SequenceHeader::default();
        seq.reduced_still_picture_header = true;
        seq.max_frame_width = 64;
        seq.max_frame_height = 64;
        seq.frame_width_bits = 7;
        seq.frame_height_bits = 7;
        seq
    }

    #[test]
    fn temporal_delimiter_round_trips_with_empty_body() {
        let mut state = Av1State::default();
        let obu = Av1Obu {
            header: ObuHeaderInfo { extension_flag: false, has_size_field: true, temporal_id: 0, spatial_id: 0 },
            body: Av1ObuBody::TemporalDelimiter,
        };
        let bytes = write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap();

        let mut read_state = Av1State::default();
        let decoded = read_obu(&bytes, &mut read_state, &mut TraceSink::disabled()).unwrap();
        assert!(matches!(decoded.body, Av1ObuBody::TemporalDelimiter));
        assert!(!read_state.seen_frame_header);
    }

    #[test]
    fn sequence_header_obu_round_trips_and_populates_state() {
        let mut state = Av1State::default();
        let seq = base_sequence_header();
        let obu = Av1Obu {
            header: ObuHeaderInfo::default(),
            body: Av1ObuBody::SequenceHeader(seq.clone()),
        };
        let bytes = write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap();
        assert!(state.sequence_header.is_some());

        let mut read_state = Av1State::default();
        let decoded = read_obu(&bytes, &mut read_state, &mut TraceSink::disabled()).unwrap();
        match decoded.body {
            Av1ObuBody::SequenceHeader(decoded_seq) => {
                assert_eq!(decoded_seq.max_frame_width, seq.max_frame_width);
            }
            other => panic!("unexpected body: {other:?}"),
        }
        assert!(read_state.sequence_header.is_some());
    }

    #[test]
    fn frame_header_obu_requires_prior_sequence_header() {
        let mut state = Av1State::default();
        let obu = Av1Obu {
            header: ObuHeaderInfo::default(),
            body: Av1ObuBody::FrameHeader(FrameHeader::default()),
        };
        let err = write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap_err();
        assert!(matches!(err, CbsError::InvalidData { .. }));
    }

    #[test]
    fn sequence_header_leaves_operating_point_idc_untouched_by_default() {
        let mut seq = base_sequence_header();
        seq.reduced_still_picture_header = false;
        seq.operating_points = vec![crate::types::OperatingPoint { idc: 0x0f0f, ..Default::default() }];
        let mut state = Av1State::default();
        let obu = Av1Obu {
            header: ObuHeaderInfo::default(),
            body: Av1ObuBody::SequenceHeader(seq),
        };
        write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap();
        assert_eq!(state.operating_point_idc, 0);
    }

    #[test]
    fn sequence_header_resolves_selected_operating_point() {
        let mut seq = base_sequence_header();
        seq.reduced_still_picture_header = false;
        seq.operating_points = vec![
            crate::types::OperatingPoint { idc: 0x0000, ..Default::default() },
            crate::types::OperatingPoint { idc: 0x0101, ..Default::default() },
        ];
        let mut state = Av1State::default();
        state.set_operating_point(1);
        let obu = Av1Obu {
            header: ObuHeaderInfo::default(),
            body: Av1ObuBody::SequenceHeader(seq),
        };
        write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap();
        assert_eq!(state.operating_point_idc, 0x0101);
    }

    #[test]
    fn sequence_header_rejects_out_of_range_operating_point() {
        let mut seq = base_sequence_header();
        seq.reduced_still_picture_header = false;
        seq.operating_points = vec![crate::types::OperatingPoint::default()];
        let mut state = Av1State::default();
        state.set_operating_point(3);
        let obu = Av1Obu {
            header: ObuHeaderInfo::default(),
            body: Av1ObuBody::SequenceHeader(seq),
        };
        let err = write_obu(&obu, &mut state, &mut TraceSink::disabled()).unwrap_err();
        assert!(matches!(err, CbsError::InvalidData { .. }));
    }

    #[test]
    fn metadata_scalability_obu_is_unsupported_on_read() {
        // metadata_type leb128(3) followed by zero payload bytes, with a
        // minimal obu_header (type 5 = Metadata) and an explicit size field.
        let data = [0b0010_1010u8, 0x01, 0x03];
        let mut state = Av1State::default();
        let err = read_obu(&data, &mut state, &mut TraceSink::disabled()).unwrap_err();
        assert!(matches!(err, CbsError::Unsupported(_)));
    }
}
