//! The VP9 uncompressed frame header: frame tag, color config, frame/
//! render size, loop filter / quantisation / segmentation parameters and
//! tile info.
//!
//! Grounded on `FUNC(uncompressed_header)` and its helpers in
//! `examples/original_source/libavcodec/cbs_vp9_syntax_template.c`.

use cbs_core::{BitIo, CbsError, Result};

use crate::codings::Vp9BitIo;
use crate::types::{
    FrameHeader, LoopFilterParams, QuantizationParams, SegmentationParams, Vp9State, SEGMENTATION_FEATURE_BITS,
    SEGMENTATION_FEATURE_SIGNED, VP9_FRAME_SYNC, VP9_CS_RGB, VP9_KEY_FRAME, VP9_MAX_REF_FRAMES, VP9_MAX_SEGMENTS,
    VP9_MAX_TILE_WIDTH_B64, VP9_MIN_TILE_WIDTH_B64, VP9_REFS_PER_FRAME, VP9_SEG_LVL_MAX,
};

fn rw_frame_sync_code<IO: BitIo>(io: &mut IO) -> Result<()> {
    for &expected in VP9_FRAME_SYNC.iter() {
        let mut byte = expected as u32;
        io.rw_bits("frame_sync_byte", 8, expected as u32, expected as u32, &mut byte)?;
    }
    Ok(())
}

fn rw_color_config<IO: BitIo>(io: &mut IO, current: &mut FrameHeader, profile: u8) -> Result<()> {
    if profile >= 2 {
        io.rw_bit("ten_or_twelve_bit", &mut current.ten_or_twelve_bit)?;
    }

    let mut color_space = current.color_space as u32;
    io.rw_bits("color_space", 3, 0, 7, &mut color_space)?;
    current.color_space = color_space as u8;

    if current.color_space != VP9_CS_RGB {
        io.rw_bit("color_range", &mut current.color_range)?;
        if profile == 1 || profile == 3 {
            io.rw_bit("subsampling_x", &mut current.subsampling_x)?;
            io.rw_bit("subsampling_y", &mut current.subsampling_y)?;
            let mut reserved = false;
            io.rw_bit("color_config_reserved_zero", &mut reserved)?;
        } else {
            current.subsampling_x = true;
            current.subsampling_y = true;
        }
    } else {
        current.color_range = true;
        if profile == 1 || profile == 3 {
            current.subsampling_x = false;
            current.subsampling_y = false;
        }
    }

    Ok(())
}

fn rw_frame_size<IO: BitIo>(io: &mut IO, current: &mut FrameHeader, state: &mut Vp9State) -> Result<()> {
    let mut width = current.frame_width_minus_1 as u32;
    io.rw_bits("frame_width_minus_1", 16, 0, 0xffff, &mut width)?;
    current.frame_width_minus_1 = width as u16;

    let mut height = current.frame_height_minus_1 as u32;
    io.rw_bits("frame_height_minus_1", 16, 0, 0xffff, &mut height)?;
    current.frame_height_minus_1 = height as u16;

    state.mi_cols = (current.frame_width_minus_1 as u32 + 8) >> 3;
    state.mi_rows = (current.frame_height_minus_1 as u32 + 8) >> 3;
    state.sb64_cols = (state.mi_cols + 7) >> 3;
    state.sb64_rows = (state.mi_rows + 7) >> 3;

    Ok(())
}

fn rw_render_size<IO: BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    io.rw_bit("render_and_frame_size_different", &mut current.render_and_frame_size_different)?;

    if current.render_and_frame_size_different {
        let mut width = current.render_width_minus_1 as u32;
        io.rw_bits("render_width_minus_1", 16, 0, 0xffff, &mut width)?;
        current.render_width_minus_1 = width as u16;

        let mut height = current.render_height_minus_1 as u32;
        io.rw_bits("render_height_minus_1", 16, 0, 0xffff, &mut height)?;
        current.render_height_minus_1 = height as u16;
    }

    Ok(())
}

fn rw_frame_size_with_refs<IO: BitIo>(io: &mut IO, current: &mut FrameHeader, state: &mut Vp9State) -> Result<()> {
    let mut i = 0;
    while i < VP9_REFS_PER_FRAME {
        io.rw_bit("found_ref", &mut current.found_ref[i])?;
        if current.found_ref[i] {
            break;
        }
        i += 1;
    }
    if i >= VP9_REFS_PER_FRAME {
        rw_frame_size(io, current, state)?;
    }
    rw_render_size(io, current)
}

fn rw_interpolation_filter<IO: BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    io.rw_bit("is_filter_switchable", &mut current.is_filter_switchable)?;
    if !current.is_filter_switchable {
        let mut v = current.raw_interpolation_filter_type as u32;
        io.rw_bits("raw_interpolation_filter_type", 2, 0, 3, &mut v)?;
        current.raw_interpolation_filter_type = v as u8;
    }
    Ok(())
}

fn rw_loop_filter_params<IO: BitIo + Vp9BitIo>(io: &mut IO, current: &mut LoopFilterParams) -> Result<()> {
    let mut level = current.level as u32;
    io.rw_bits("loop_filter_level", 6, 0, 63, &mut level)?;
    current.level = level as u8;

    let mut sharpness = current.sharpness as u32;
    io.rw_bits("loop_filter_sharpness", 3, 0, 7, &mut sharpness)?;
    current.sharpness = sharpness as u8;

    io.rw_bit("loop_filter_delta_enabled", &mut current.delta_enabled)?;
    if current.delta_enabled {
        io.rw_bit("loop_filter_delta_update", &mut current.delta_update)?;
        if current.delta_update {
            for i in 0..VP9_MAX_REF_FRAMES {
                io.rw_bit("update_ref_delta", &mut current.update_ref_delta[i])?;
                if current.update_ref_delta[i] {
                    let mut v = current.ref_deltas[i] as i32;
                    io.rw_signed("loop_filter_ref_deltas", 6, &mut v)?;
                    current.ref_deltas[i] = v as i8;
                }
            }
            for i in 0..2 {
                io.rw_bit("update_mode_delta", &mut current.update_mode_delta[i])?;
                if current.update_mode_delta[i] {
                    let mut v = current.mode_deltas[i] as i32;
                    io.rw_signed("loop_filter_mode_deltas", 6, &mut v)?;
                    current.mode_deltas[i] = v as i8;
                }
            }
        }
    }

    Ok(())
}

fn rw_quantization_params<IO: BitIo + Vp9BitIo>(io: &mut IO, current: &mut QuantizationParams) -> Result<()> {
    let mut base = current.base_q_idx as u32;
    io.rw_bits("base_q_idx", 8, 0, 255, &mut base)?;
    current.base_q_idx = base as u8;

    io.rw_delta_q("delta_q_y_dc", &mut current.delta_q_y_dc)?;
    io.rw_delta_q("delta_q_uv_dc", &mut current.delta_q_uv_dc)?;
    io.rw_delta_q("delta_q_uv_ac", &mut current.delta_q_uv_ac)?;

    Ok(())
}

fn rw_segmentation_params<IO: BitIo + Vp9BitIo>(io: &mut IO, current: &mut SegmentationParams) -> Result<()> {
    io.rw_bit("segmentation_enabled", &mut current.enabled)?;
    if !current.enabled {
        return Ok(());
    }

    io.rw_bit("segmentation_update_map", &mut current.update_map)?;
    if current.update_map {
        for i in 0..7 {
            io.rw_prob("segmentation_tree_probs", &mut current.tree_probs[i])?;
        }
        io.rw_bit("segmentation_temporal_update", &mut current.temporal_update)?;
        for i in 0..3 {
            if current.temporal_update {
                io.rw_prob("segmentation_pred_prob", &mut current.pred_prob[i])?;
            } else {
                current.pred_prob[i] = 255;
            }
        }
    }

    io.rw_bit("segmentation_update_data", &mut current.update_data)?;
    if current.update_data {
        io.rw_bit("segmentation_abs_or_delta_update", &mut current.abs_or_delta_update)?;

        for i in 0..VP9_MAX_SEGMENTS {
            for j in 0..VP9_SEG_LVL_MAX {
                io.rw_bit("feature_enabled", &mut current.feature_enabled[i][j])?;

                let bits = SEGMENTATION_FEATURE_BITS[j];
                if current.feature_enabled[i][j] && bits > 0 {
                    let mut v = current.feature_value[i][j] as u32;
                    io.rw_bits("feature_value", bits, 0, (1u32 << bits) - 1, &mut v)?;
                    current.feature_value[i][j] = v as u8;

                    if SEGMENTATION_FEATURE_SIGNED[j] {
                        io.rw_bit("feature_sign", &mut current.feature_sign[i][j])?;
                    } else {
                        current.feature_sign[i][j] = false;
                    }
                } else {
                    current.feature_value[i][j] = 0;
                    current.feature_sign[i][j] = false;
                }
            }
        }
    }

    Ok(())
}

fn rw_tile_info<IO: BitIo + Vp9BitIo>(io: &mut IO, current: &mut FrameHeader, state: &Vp9State) -> Result<()> {
    let mut min_log2_tile_cols = 0u32;
    while (VP9_MAX_TILE_WIDTH_B64 << min_log2_tile_cols) < state.sb64_cols {
        min_log2_tile_cols += 1;
    }
    let mut max_log2_tile_cols = 0u32;
    while (state.sb64_cols >> (max_log2_tile_cols + 1)) >= VP9_MIN_TILE_WIDTH_B64 {
        max_log2_tile_cols += 1;
    }

    let mut cols_log2 = current.tile_info.cols_log2 as u32;
    io.rw_increment("tile_cols_log2", min_log2_tile_cols, max_log2_tile_cols, &mut cols_log2)?;
    current.tile_info.cols_log2 = cols_log2 as u8;

    let mut rows_log2 = current.tile_info.rows_log2 as u32;
    io.rw_increment("tile_rows_log2", 0, 2, &mut rows_log2)?;
    current.tile_info.rows_log2 = rows_log2 as u8;

    Ok(())
}

/// `FUNC(uncompressed_header)`.
pub fn rw_uncompressed_header<IO: BitIo + Vp9BitIo>(io: &mut IO, current: &mut FrameHeader, state: &mut Vp9State) -> Result<()> {
    let mut frame_marker = current.frame_marker as u32;
    io.rw_bits("frame_marker", 2, 0, 3, &mut frame_marker)?;
    current.frame_marker = frame_marker as u8;

    let mut profile_low = current.profile_low_bit != 0;
    io.rw_bit("profile_low_bit", &mut profile_low)?;
    current.profile_low_bit = profile_low as u8;

    let mut profile_high = current.profile_high_bit != 0;
    io.rw_bit("profile_high_bit", &mut profile_high)?;
    current.profile_high_bit = profile_high as u8;

    let profile = current.profile();
    if profile == 3 {
        let mut reserved = false;
        io.rw_bit("profile_reserved_zero", &mut reserved)?;
    }

    io.rw_bit("show_existing_frame", &mut current.show_existing_frame)?;
    if current.show_existing_frame {
        let mut idx = current.frame_to_show_map_idx as u32;
        io.rw_bits("frame_to_show_map_idx", 3, 0, 7, &mut idx)?;
        current.frame_to_show_map_idx = idx as u8;
        current.header_size_in_bytes = 0;
        current.refresh_frame_flags = 0x00;
        current.loop_filter.level = 0;
        return Ok(());
    }

    let mut frame_type = current.frame_type as u32;
    io.rw_bits("frame_type", 1, 0, 1, &mut frame_type)?;
    current.frame_type = frame_type as u8;

    io.rw_bit("show_frame", &mut current.show_frame)?;
    io.rw_bit("error_resilient_mode", &mut current.error_resilient_mode)?;

    if current.frame_type == VP9_KEY_FRAME {
        rw_frame_sync_code(io)?;
        rw_color_config(io, current, profile)?;
        rw_frame_size(io, current, state)?;
        rw_render_size(io, current)?;

        current.refresh_frame_flags = 0xff;
    } else {
        if !current.show_frame {
            io.rw_bit("intra_only", &mut current.intra_only)?;
        } else {
            current.intra_only = false;
        }

        if !current.error_resilient_mode {
            let mut v = current.reset_frame_context as u32;
            io.rw_bits("reset_frame_context", 2, 0, 3, &mut v)?;
            current.reset_frame_context = v as u8;
        } else {
            current.reset_frame_context = 0;
        }

        if current.intra_only {
            rw_frame_sync_code(io)?;

            if profile > 0 {
                rw_color_config(io, current, profile)?;
            } else {
                current.color_space = 1;
                current.subsampling_x = true;
                current.subsampling_y = true;
            }

            let mut flags = current.refresh_frame_flags as u32;
            io.rw_bits("refresh_frame_flags", 8, 0, 255, &mut flags)?;
            current.refresh_frame_flags = flags as u8;

            rw_frame_size(io, current, state)?;
            rw_render_size(io, current)?;
        } else {
            let mut flags = current.refresh_frame_flags as u32;
            io.rw_bits("refresh_frame_flags", 8, 0, 255, &mut flags)?;
            current.refresh_frame_flags = flags as u8;

            for i in 0..VP9_REFS_PER_FRAME {
                let mut idx = current.ref_frame_idx[i] as u32;
                io.rw_bits("ref_frame_idx", 3, 0, 7, &mut idx)?;
                current.ref_frame_idx[i] = idx as u8;

                io.rw_bit("ref_frame_sign_bias", &mut current.ref_frame_sign_bias[1 + i])?;
            }

            rw_frame_size_with_refs(io, current, state)?;

            io.rw_bit("allow_high_precision_mv", &mut current.allow_high_precision_mv)?;

            rw_interpolation_filter(io, current)?;
        }
    }

    if !current.error_resilient_mode {
        io.rw_bit("refresh_frame_context", &mut current.refresh_frame_context)?;
        io.rw_bit("frame_parallel_decoding_mode", &mut current.frame_parallel_decoding_mode)?;
    } else {
        current.refresh_frame_context = false;
        current.frame_parallel_decoding_mode = true;
    }

    let mut ctx_idx = current.frame_context_idx as u32;
    io.rw_bits("frame_context_idx", 2, 0, 3, &mut ctx_idx)?;
    current.frame_context_idx = ctx_idx as u8;

    rw_loop_filter_params(io, &mut current.loop_filter)?;
    rw_quantization_params(io, &mut current.quantization)?;
    rw_segmentation_params(io, &mut current.segmentation)?;
    rw_tile_info(io, current, state)?;

    let mut header_size = current.header_size_in_bytes as u32;
    io.rw_bits("header_size_in_bytes", 16, 0, 0xffff, &mut header_size)?;
    current.header_size_in_bytes = header_size as u16;

    Ok(())
}

/// `FUNC(trailing_bits)`: zero-pads to the next byte boundary.
pub fn rw_trailing_bits<IO: BitIo>(io: &mut IO) -> Result<()> {
    while io.position() % 8 != 0 {
        let mut zero = false;
        io.rw_bit("zero_bit", &mut zero)?;
        if zero {
            return Err(CbsError::invalid_data("zero_bit", "trailing alignment bit must be zero"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    fn key_frame_fixture() -> FrameHeader {
        let mut header = FrameHeader::default();
        header.frame_marker = 2;
        header.frame_type = VP9_KEY_FRAME;
        header.show_frame = true;
        header.frame_width_minus_1 = 639;
        header.frame_height_minus_1 = 479;
        header.header_size_in_bytes = 12;
        header.loop_filter.level = 9;
        header.quantization.base_q_idx = 40;
        header.tile_info.cols_log2 = 0;
        header.tile_info.rows_log2 = 0;
        header
    }

    #[test]
    fn key_frame_header_round_trips() {
        let mut state = Vp9State::default();
        let mut writer = WriteIo::new(false);
        let mut header = key_frame_fixture();
        rw_uncompressed_header(&mut writer, &mut header, &mut state).unwrap();
        rw_trailing_bits(&mut writer).unwrap();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo::new(&bytes);
        let mut decoded = FrameHeader::default();
        let mut read_state = Vp9State::default();
        rw_uncompressed_header(&mut reader, &mut decoded, &mut read_state).unwrap();
        rw_trailing_bits(&mut reader).unwrap();

        assert_eq!(decoded.frame_width_minus_1, 639);
        assert_eq!(decoded.frame_height_minus_1, 479);
        assert_eq!(decoded.refresh_frame_flags, 0xff);
        assert_eq!(decoded.quantization.base_q_idx, 40);
        assert_eq!(read_state.sb64_cols, state.sb64_cols);
    }

    #[test]
    fn show_existing_frame_short_circuits_the_rest_of_the_header() {
        let mut state = Vp9State::default();
        let mut writer = WriteIo::new(false);
        let mut header = FrameHeader::default();
        header.frame_marker = 2;
        header.show_existing_frame = true;
        header.frame_to_show_map_idx = 5;
        rw_uncompressed_header(&mut writer, &mut header, &mut state).unwrap();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo::new(&bytes);
        let mut decoded = FrameHeader::default();
        rw_uncompressed_header(&mut reader, &mut decoded, &mut state).unwrap();

        assert!(decoded.show_existing_frame);
        assert_eq!(decoded.frame_to_show_map_idx, 5);
        assert_eq!(decoded.header_size_in_bytes, 0);
        assert_eq!(decoded.refresh_frame_flags, 0x00);
    }

    #[test]
    fn tile_info_range_grows_with_frame_width() {
        let mut state = Vp9State {
            sb64_cols: 200,
            ..Vp9State::default()
        };
        let mut writer = WriteIo::new(false);
        let mut current = FrameHeader::default();
        current.tile_info.cols_log2 = 2;
        rw_tile_info(&mut writer, &mut current, &state).unwrap();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo::new(&bytes);
        let mut decoded = FrameHeader::default();
        rw_tile_info(&mut reader, &mut decoded, &mut state).unwrap();
        assert_eq!(decoded.tile_info.cols_log2, 2);
        let _ = &mut state;
    }
}
