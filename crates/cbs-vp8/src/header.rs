//! `frame_tag` (the little-endian uncompressed header) and the boolean-
//! coded compressed header that follows it.
//!
//! Grounded on `FUNC(frame_tag)`/`FUNC(frame_header)`/
//! `FUNC(update_segmentation)`/`FUNC(mode_ref_lf_deltas)`/
//! `FUNC(quantization_params)`/`FUNC(update_token_probs)`/
//! `FUNC(update_mv_probs)` in `cbs_vp8_syntax_template.c`. Read-only: VP8
//! encoding is out of scope, matching `cbs_vp8_write_unit`'s own
//! `AVERROR_PATCHWELCOME`.

use cbs_core::{CbsError, LsbBitReader, Result};

use crate::bool_decoder::BoolDecoder;
use crate::types::{FrameHeader, VP8_KEY_FRAME, VP8_NON_KEY_FRAME, VP8_START_CODE};

fn read_le<const MAX: u32>(reader: &mut LsbBitReader, name: &'static str, width: u8) -> Result<u32> {
    let value = reader.read_bits(width)?;
    if value > MAX {
        return Err(CbsError::invalid_data(name, format!("value {value} out of range [0, {MAX}]")));
    }
    Ok(value)
}

pub fn read_frame_tag(reader: &mut LsbBitReader, current: &mut FrameHeader) -> Result<()> {
    current.frame_type = read_le::<1>(reader, "frame_type", 1)? as u8;
    current.profile = read_le::<7>(reader, "profile", 3)? as u8;
    current.show_frame = read_le::<1>(reader, "show_frame", 1)? != 0;
    current.first_partition_length_in_bytes = read_le::<{ (1 << 19) - 1 }>(reader, "first_partition_length_in_bytes", 19)?;

    if current.frame_type == VP8_KEY_FRAME {
        for (index, &expected) in VP8_START_CODE.iter().enumerate() {
            let value = read_le::<255>(reader, "start_code", 8)? as u8;
            if value != expected {
                return Err(CbsError::invalid_data("start_code", format!("byte {index} was 0x{value:02x}, expected 0x{expected:02x}")));
            }
        }

        current.width = read_le::<0x3fff>(reader, "width", 14)? as u16;
        current.horizontal_scale = read_le::<3>(reader, "horizontal_scale", 2)? as u8;
        current.height = read_le::<0x3fff>(reader, "height", 14)? as u16;
        current.vertical_scale = read_le::<3>(reader, "vertical_scale", 2)? as u8;
    }

    Ok(())
}

fn read_update_segmentation(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    current.update_segment_map = bc.read_flag()?;
    current.update_segment_feature_data = bc.read_flag()?;

    if current.update_segment_feature_data {
        current.segment_feature_mode = bc.read_unsigned(1, 0x80)? as u8;
        for i in 0..4 {
            current.segment_qp_update[i] = bc.read_flag()?;
            if current.segment_qp_update[i] {
                current.segment_qp[i] = bc.read_signed(7)? as i8;
            }
        }
        for i in 0..4 {
            current.segment_loop_filter_level_update[i] = bc.read_flag()?;
            if current.segment_loop_filter_level_update[i] {
                current.segment_loop_filter_level[i] = bc.read_signed(6)? as i8;
            }
        }
    }

    if current.update_segment_map {
        for i in 0..3 {
            current.segment_probs_update[i] = bc.read_flag()?;
            if current.segment_probs_update[i] {
                current.segment_probs[i] = bc.read_unsigned(8, 0x80)? as u8;
            }
        }
    }

    Ok(())
}

fn read_mode_ref_lf_deltas(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    current.mode_ref_lf_delta_enable = bc.read_flag()?;
    if current.mode_ref_lf_delta_enable {
        current.mode_ref_lf_delta_update = bc.read_flag()?;
        if current.mode_ref_lf_delta_update {
            for i in 0..4 {
                current.ref_lf_deltas_update[i] = bc.read_flag()?;
                if current.ref_lf_deltas_update[i] {
                    current.ref_lf_deltas[i] = bc.read_signed(6)? as i8;
                }
            }
            for i in 0..4 {
                current.mode_lf_deltas_update[i] = bc.read_flag()?;
                if current.mode_lf_deltas_update[i] {
                    current.mode_lf_deltas[i] = bc.read_signed(6)? as i8;
                }
            }
        }
    }
    Ok(())
}

fn read_quantization_params(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    current.base_qindex = bc.read_unsigned(7, 0x80)? as u8;

    current.y1dc_delta_q_present = bc.read_flag()?;
    if current.y1dc_delta_q_present {
        current.y1dc_delta_q = bc.read_signed(4)? as i8;
    }
    current.y2dc_delta_q_present = bc.read_flag()?;
    if current.y2dc_delta_q_present {
        current.y2dc_delta_q = bc.read_signed(4)? as i8;
    }
    current.y2ac_delta_q_present = bc.read_flag()?;
    if current.y2ac_delta_q_present {
        current.y2ac_delta_q = bc.read_signed(4)? as i8;
    }
    current.uvdc_delta_q_present = bc.read_flag()?;
    if current.uvdc_delta_q_present {
        current.uvdc_delta_q = bc.read_signed(4)? as i8;
    }
    current.uvac_delta_q_present = bc.read_flag()?;
    if current.uvac_delta_q_present {
        current.uvac_delta_q = bc.read_signed(4)? as i8;
    }

    Ok(())
}

// `FUNC(update_token_probs)` decodes each per-coefficient update flag
// against `ff_vp8_token_update_probs[i][j][k][l]` (RFC 6386 §13.4,
// "coeff_update_probs"), not the generic `DEFAULT_PROB` literal every
// other flag in this file uses.
fn read_update_token_probs(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    for i in 0..4 {
        for j in 0..8 {
            for k in 0..3 {
                for l in 0..11 {
                    let prob = TOKEN_UPDATE_PROBS[i][j][k][l];
                    current.coeff_prob_update[i][j][k][l] = bc.read_flag_with_prob(prob)?;
                    if current.coeff_prob_update[i][j][k][l] {
                        current.coeff_prob[i][j][k][l] = bc.read_unsigned(8, 0x80)? as u8;
                    }
                }
            }
        }
    }
    Ok(())
}

/// `coeff_update_probs[4][8][3][11]`, RFC 6386 §13.4. Indexed by block
/// type, coefficient band, previous-token context and node in the token
/// tree; drives whether `coeff_prob[i][j][k][l]` is replaced this frame.
#[rustfmt::skip]
const TOKEN_UPDATE_PROBS: [[[[u8; 11]; 3]; 8]; 4] = [
    [
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [176, 246, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [223, 241, 252, 255, 255, 255, 255, 255, 255, 255, 255],
            [249, 253, 253, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 244, 252, 255, 255, 255, 255, 255, 255, 255, 255],
            [234, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [253, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 246, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [239, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 248, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [251, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [251, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 253, 255, 254, 255, 255, 255, 255, 255, 255],
            [250, 255, 254, 255, 254, 255, 255, 255, 255, 255, 255],
            [254, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
    ],
    [
        [
            [217, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [225, 252, 241, 253, 255, 255, 254, 255, 255, 255, 255],
            [234, 250, 241, 250, 253, 255, 253, 254, 255, 255, 255],
        ],
        [
            [255, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [223, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [238, 253, 254, 254, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 248, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [249, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 253, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [247, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [252, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [253, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [250, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
    ],
    [
        [
            [186, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [234, 251, 244, 254, 255, 255, 255, 255, 255, 255, 255],
            [251, 251, 243, 253, 254, 255, 254, 255, 255, 255, 255],
        ],
        [
            [255, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [236, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [251, 253, 253, 254, 254, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 254, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [254, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
    ],
    [
        [
            [248, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [250, 254, 252, 254, 255, 255, 255, 255, 255, 255, 255],
            [248, 254, 249, 253, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 253, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [246, 253, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [252, 254, 251, 254, 254, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 254, 252, 255, 255, 255, 255, 255, 255, 255, 255],
            [248, 254, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [253, 255, 254, 254, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 251, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [245, 251, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [253, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 251, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [252, 253, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 254, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 252, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [249, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 254, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 253, 255, 255, 255, 255, 255, 255, 255, 255],
            [250, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
        [
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
            [255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255],
        ],
    ],
];

fn read_update_mv_probs(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    for i in 0..2 {
        for j in 0..19 {
            current.mv_prob_update[i][j] = bc.read_flag()?;
            if current.mv_prob_update[i][j] {
                current.mv_prob[i][j] = bc.read_unsigned(7, 0x80)? as u8;
            }
        }
    }
    Ok(())
}

/// `FUNC(frame_header)`: the entropy-probability and filter/quantiser
/// state carried by the compressed header.
pub fn read_frame_header(bc: &mut BoolDecoder, current: &mut FrameHeader) -> Result<()> {
    if current.frame_type == VP8_KEY_FRAME {
        current.color_space = bc.read_unsigned(1, 0x80)? as u8;
        current.clamping_type = bc.read_unsigned(1, 0x80)? as u8;
    }

    current.segmentation_enable = bc.read_flag()?;
    if current.segmentation_enable {
        read_update_segmentation(bc, current)?;
    }

    current.loop_filter_type = bc.read_unsigned(1, 0x80)? as u8;
    current.loop_filter_level = bc.read_unsigned(6, 0x80)? as u8;
    current.loop_filter_sharpness = bc.read_unsigned(3, 0x80)? as u8;

    read_mode_ref_lf_deltas(bc, current)?;

    current.log2_token_partitions = bc.read_unsigned(2, 0x80)? as u8;

    read_quantization_params(bc, current)?;

    if current.frame_type != VP8_KEY_FRAME {
        current.refresh_golden_frame = bc.read_flag()?;
        current.refresh_alternate_frame = bc.read_flag()?;
        if !current.refresh_golden_frame {
            current.copy_buffer_to_golden = bc.read_unsigned(2, 0x80)? as u8;
        }
        if !current.refresh_alternate_frame {
            current.copy_buffer_to_alternate = bc.read_unsigned(2, 0x80)? as u8;
        }
        current.ref_frame_sign_bias_golden = bc.read_flag()?;
        current.ref_frame_sign_bias_alternate = bc.read_flag()?;
    }
    current.refresh_entropy_probs = bc.read_flag()?;
    if current.frame_type != VP8_KEY_FRAME {
        current.refresh_last_frame = bc.read_flag()?;
    }

    read_update_token_probs(bc, current)?;

    current.mb_no_skip_coeff = bc.read_flag()?;
    if current.mb_no_skip_coeff {
        current.prob_skip_false = bc.read_unsigned(8, 0x80)? as u8;
    }

    if current.frame_type != VP8_KEY_FRAME {
        current.prob_intra = bc.read_unsigned(8, 0x80)? as u8;
        current.prob_last = bc.read_unsigned(8, 0x80)? as u8;
        current.prob_golden = bc.read_unsigned(8, 0x80)? as u8;

        current.intra_16x16_prob_update = bc.read_flag()?;
        if current.intra_16x16_prob_update {
            for i in 0..4 {
                current.intra_16x16_prob[i] = bc.read_unsigned(8, 0x80)? as u8;
            }
        }

        current.intra_chroma_prob_update = bc.read_flag()?;
        if current.intra_chroma_prob_update {
            for i in 0..3 {
                current.intra_chroma_prob[i] = bc.read_unsigned(8, 0x80)? as u8;
            }
        }

        read_update_mv_probs(bc, current)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_tag_rejects_key_frame_with_bad_start_code() {
        // frame_type=0 (key), profile=0, show_frame=1, partition len=0,
        // followed by a deliberately wrong start code byte.
        let data = [0x01, 0x00, 0x00, 0xFF, 0x01, 0x2A];
        let mut reader = LsbBitReader::new(&data);
        let mut header = FrameHeader::default();
        let err = read_frame_tag(&mut reader, &mut header).unwrap_err();
        assert!(matches!(err, CbsError::InvalidData { .. }));
    }

    #[test]
    fn frame_tag_non_key_frame_skips_dimensions() {
        // frame_type=1 (non-key), profile=0, show_frame=1, partition len=0.
        let data = [0x03, 0x00, 0x00];
        let mut reader = LsbBitReader::new(&data);
        let mut header = FrameHeader::default();
        read_frame_tag(&mut reader, &mut header).unwrap();
        assert_eq!(header.frame_type, VP8_NON_KEY_FRAME);
        assert_eq!(header.width, 0);
    }
}
