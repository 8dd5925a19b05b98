//! Sequence header OBU syntax, ported field-for-field from
//! `sequence_header_obu` / `color_config` / `timing_info` /
//! `decoder_model_info` in
//! `examples/original_source/libavcodec/cbs_av1_syntax_template.c`, using
//! the generic dual reader/writer template: one function, monomorphised
//! over [`Av1BitIo`] for both directions.

use cbs_core::{CbsError, Result};

use crate::codings::Av1BitIo;
use crate::types::{
    ColorConfig, DecoderModelInfo, OperatingPoint, SequenceHeader, TimingInfo,
    SELECT_INTEGER_MV, SELECT_SCREEN_CONTENT_TOOLS,
};

pub(crate) fn infer_u32(is_reading: bool, value: &mut u32, inferred: u32, name: &'static str) -> Result<()> {
    if is_reading {
        *value = inferred;
        Ok(())
    } else if *value != inferred {
        Err(CbsError::invalid_data(name, format!("expected inferred value {inferred}, got {value}")))
    } else {
        Ok(())
    }
}

pub(crate) fn infer_bool(is_reading: bool, value: &mut bool, inferred: bool, name: &'static str) -> Result<()> {
    if is_reading {
        *value = inferred;
        Ok(())
    } else if *value != inferred {
        Err(CbsError::invalid_data(name, format!("expected inferred value {inferred}, got {value}")))
    } else {
        Ok(())
    }
}

pub(crate) fn infer_i32(is_reading: bool, value: &mut i32, inferred: i32, name: &'static str) -> Result<()> {
    if is_reading {
        *value = inferred;
        Ok(())
    } else if *value != inferred {
        Err(CbsError::invalid_data(name, format!("expected inferred value {inferred}, got {value}")))
    } else {
        Ok(())
    }
}

fn rw_timing_info<IO: Av1BitIo>(io: &mut IO, current: &mut TimingInfo) -> Result<()> {
    io.rw_bits("num_units_in_display_tick", 32, 1, u32::MAX, &mut current.num_units_in_display_tick)?;
    io.rw_bits("time_scale", 32, 1, u32::MAX, &mut current.time_scale)?;
    io.rw_bit("equal_picture_interval", &mut current.equal_picture_interval)?;
    if current.equal_picture_interval {
        io.rw_uvlc("num_ticks_per_picture_minus_1", &mut current.num_ticks_per_picture_minus_1)?;
    }
    Ok(())
}

fn rw_decoder_model_info<IO: Av1BitIo>(io: &mut IO, current: &mut DecoderModelInfo) -> Result<()> {
    let mut v = current.buffer_delay_length_minus_1 as u32;
    io.rw_bits("buffer_delay_length_minus_1", 5, 0, 31, &mut v)?;
    current.buffer_delay_length_minus_1 = v as u8;

    io.rw_bits("num_units_in_decoding_tick", 32, 0, u32::MAX, &mut current.num_units_in_decoding_tick)?;

    let mut v = current.buffer_removal_time_length_minus_1 as u32;
    io.rw_bits("buffer_removal_time_length_minus_1", 5, 0, 31, &mut v)?;
    current.buffer_removal_time_length_minus_1 = v as u8;

    let mut v = current.frame_presentation_time_length_minus_1 as u32;
    io.rw_bits("frame_presentation_time_length_minus_1", 5, 0, 31, &mut v)?;
    current.frame_presentation_time_length_minus_1 = v as u8;

    Ok(())
}

fn rw_color_config<IO: Av1BitIo>(io: &mut IO, current: &mut ColorConfig, seq_profile: u8) -> Result<()> {
    io.rw_bit("high_bitdepth", &mut current.high_bitdepth)?;

    let bit_depth;
    if seq_profile == 2 && current.high_bitdepth {
        io.rw_bit("twelve_bit", &mut current.twelve_bit)?;
        bit_depth = if current.twelve_bit { 12 } else { 10 };
    } else {
        bit_depth = if current.high_bitdepth { 10 } else { 8 };
    }

    if seq_profile == 1 {
        infer_bool(IO::IS_READING, &mut current.mono_chrome, false, "mono_chrome")?;
    } else {
        io.rw_bit("mono_chrome", &mut current.mono_chrome)?;
    }

    io.rw_bit("color_description_present_flag", &mut current.color_description_present)?;
    if current.color_description_present {
        let mut v = current.color_primaries as u32;
        io.rw_bits("color_primaries", 8, 0, 255, &mut v)?;
        current.color_primaries = v as u8;
        let mut v = current.transfer_characteristics as u32;
        io.rw_bits("transfer_characteristics", 8, 0, 255, &mut v)?;
        current.transfer_characteristics = v as u8;
        let mut v = current.matrix_coefficients as u32;
        io.rw_bits("matrix_coefficients", 8, 0, 255, &mut v)?;
        current.matrix_coefficients = v as u8;
    } else {
        current.color_primaries = 2;
        current.transfer_characteristics = 2;
        current.matrix_coefficients = 2;
    }

    if current.mono_chrome {
        io.rw_bit("color_range", &mut current.color_range)?;
        current.subsampling_x = true;
        current.subsampling_y = true;
        current.chroma_sample_position = 0;
        current.separate_uv_delta_q = false;
    } else if current.color_primaries == 1 && current.transfer_characteristics == 13 && current.matrix_coefficients == 0 {
        current.color_range = true;
        current.subsampling_x = false;
        current.subsampling_y = false;
        io.rw_bit("separate_uv_delta_q", &mut current.separate_uv_delta_q)?;
    } else {
        io.rw_bit("color_range", &mut current.color_range)?;

        if seq_profile == 0 {
            current.subsampling_x = true;
            current.subsampling_y = true;
        } else if seq_profile == 1 {
            current.subsampling_x = false;
            current.subsampling_y = false;
        } else if bit_depth == 12 {
            io.rw_bit("subsampling_x", &mut current.subsampling_x)?;
            if current.subsampling_x {
                io.rw_bit("subsampling_y", &mut current.subsampling_y)?;
            } else {
                current.subsampling_y = false;
            }
        } else {
            current.subsampling_x = true;
            current.subsampling_y = false;
        }

        if current.subsampling_x && current.subsampling_y {
            let mut v = current.chroma_sample_position as u32;
            io.rw_bits("chroma_sample_position", 2, 0, 3, &mut v)?;
            current.chroma_sample_position = v as u8;
        }

        io.rw_bit("separate_uv_delta_q", &mut current.separate_uv_delta_q)?;
    }

    Ok(())
}

/// `bit_depth` resolved by [`rw_color_config`], needed by the caller to
/// populate the per-context bookkeeping the framework keeps outside the
/// bitstream proper.
pub fn color_config_bit_depth(current: &ColorConfig, seq_profile: u8) -> u8 {
    if seq_profile == 2 && current.high_bitdepth {
        if current.twelve_bit {
            12
        } else {
            10
        }
    } else if current.high_bitdepth {
        10
    } else {
        8
    }
}

pub fn rw_sequence_header<IO: Av1BitIo>(io: &mut IO, current: &mut SequenceHeader) -> Result<()> {
    let mut v = current.seq_profile as u32;
    io.rw_bits("seq_profile", 3, 0, 2, &mut v)?;
    current.seq_profile = v as u8;

    io.rw_bit("still_picture", &mut current.still_picture)?;
    io.rw_bit("reduced_still_picture_header", &mut current.reduced_still_picture_header)?;

    if current.operating_points.is_empty() && IO::IS_READING {
        current.operating_points.push(OperatingPoint::default());
    }

    if current.reduced_still_picture_header {
        current.timing_info_present = false;
        current.decoder_model_info_present = false;
        current.initial_display_delay_present = false;
        current.operating_points.truncate(1);
        let op = &mut current.operating_points[0];
        op.idc = 0;

        let mut v = op.seq_level_idx as u32;
        io.rw_bits("seq_level_idx[0]", 5, 0, 31, &mut v)?;
        op.seq_level_idx = v as u8;

        op.seq_tier = 0;
        op.decoder_model_present = false;
        op.initial_display_delay_present = false;
    } else {
        io.rw_bit("timing_info_present_flag", &mut current.timing_info_present)?;
        if current.timing_info_present {
            rw_timing_info(io, &mut current.timing_info)?;
            io.rw_bit("decoder_model_info_present_flag", &mut current.decoder_model_info_present)?;
            if current.decoder_model_info_present {
                rw_decoder_model_info(io, &mut current.decoder_model_info)?;
            }
        } else {
            current.decoder_model_info_present = false;
        }

        io.rw_bit("initial_display_delay_present_flag", &mut current.initial_display_delay_present)?;

        let mut cnt_minus_1 = current.operating_points.len().saturating_sub(1) as u32;
        io.rw_bits("operating_points_cnt_minus_1", 5, 0, 31, &mut cnt_minus_1)?;
        if IO::IS_READING {
            current.operating_points = (0..=cnt_minus_1).map(|_| OperatingPoint::default()).collect();
        }

        for op in current.operating_points.iter_mut() {
            let mut idc = op.idc as u32;
            io.rw_bits("operating_point_idc[i]", 12, 0, 0xFFF, &mut idc)?;
            op.idc = idc as u16;

            let mut level = op.seq_level_idx as u32;
            io.rw_bits("seq_level_idx[i]", 5, 0, 31, &mut level)?;
            op.seq_level_idx = level as u8;

            if op.seq_level_idx > 7 {
                let mut tier = op.seq_tier as u32;
                io.rw_bits("seq_tier[i]", 1, 0, 1, &mut tier)?;
                op.seq_tier = tier as u8;
            } else {
                op.seq_tier = 0;
            }

            if current.decoder_model_info_present {
                io.rw_bit("decoder_model_present_for_this_op[i]", &mut op.decoder_model_present)?;
                if op.decoder_model_present {
                    let n = current.decoder_model_info.buffer_delay_length_minus_1 as u8 + 1;
                    io.rw_bits("decoder_buffer_delay[i]", n, 0, u32::MAX, &mut op.decoder_buffer_delay)?;
                    io.rw_bits("encoder_buffer_delay[i]", n, 0, u32::MAX, &mut op.encoder_buffer_delay)?;
                    io.rw_bit("low_delay_mode_flag[i]", &mut op.low_delay_mode_flag)?;
                }
            } else {
                op.decoder_model_present = false;
            }

            if current.initial_display_delay_present {
                io.rw_bit("initial_display_delay_present_for_this_op[i]", &mut op.initial_display_delay_present)?;
                if op.initial_display_delay_present {
                    let mut v = op.initial_display_delay_minus_1 as u32;
                    io.rw_bits("initial_display_delay_minus_1[i]", 4, 0, 15, &mut v)?;
                    op.initial_display_delay_minus_1 = v as u8;
                }
            } else {
                op.initial_display_delay_present = false;
            }
        }
    }

    let mut v = current.frame_width_bits as u32;
    io.rw_bits("frame_width_bits_minus_1", 4, 0, 15, &mut v)?;
    current.frame_width_bits = v as u8 + 1;
    let mut v = current.frame_height_bits as u32;
    io.rw_bits("frame_height_bits_minus_1", 4, 0, 15, &mut v)?;
    current.frame_height_bits = v as u8 + 1;

    let mut v = current.max_frame_width.wrapping_sub(1);
    io.rw_bits("max_frame_width_minus_1", current.frame_width_bits, 0, u32::MAX, &mut v)?;
    current.max_frame_width = v + 1;
    let mut v = current.max_frame_height.wrapping_sub(1);
    io.rw_bits("max_frame_height_minus_1", current.frame_height_bits, 0, u32::MAX, &mut v)?;
    current.max_frame_height = v + 1;

    if current.reduced_still_picture_header {
        current.frame_id_numbers_present = false;
    } else {
        io.rw_bit("frame_id_numbers_present_flag", &mut current.frame_id_numbers_present)?;
    }
    if current.frame_id_numbers_present {
        let mut v = current.delta_frame_id_length_minus_2 as u32;
        io.rw_bits("delta_frame_id_length_minus_2", 4, 0, 15, &mut v)?;
        current.delta_frame_id_length_minus_2 = v as u8;
        let mut v = current.additional_frame_id_length_minus_1 as u32;
        io.rw_bits("additional_frame_id_length_minus_1", 3, 0, 7, &mut v)?;
        current.additional_frame_id_length_minus_1 = v as u8;
    }

    io.rw_bit("use_128x128_superblock", &mut current.use_128x128_superblock)?;
    io.rw_bit("enable_filter_intra", &mut current.enable_filter_intra)?;
    io.rw_bit("enable_intra_edge_filter", &mut current.enable_intra_edge_filter)?;

    if current.reduced_still_picture_header {
        current.enable_intraintra_compound = false;
        current.enable_masked_compound = false;
        current.enable_warped_motion = false;
        current.enable_dual_filter = false;
        current.enable_order_hint = false;
        current.enable_jnt_comp = false;
        current.enable_ref_frame_mvs = false;
        current.seq_force_screen_content_tools = SELECT_SCREEN_CONTENT_TOOLS;
        current.seq_force_integer_mv = SELECT_INTEGER_MV;
    } else {
        io.rw_bit("enable_intraintra_compound", &mut current.enable_intraintra_compound)?;
        io.rw_bit("enable_masked_compound", &mut current.enable_masked_compound)?;
        io.rw_bit("enable_warped_motion", &mut current.enable_warped_motion)?;
        io.rw_bit("enable_dual_filter", &mut current.enable_dual_filter)?;

        io.rw_bit("enable_order_hint", &mut current.enable_order_hint)?;
        if current.enable_order_hint {
            io.rw_bit("enable_jnt_comp", &mut current.enable_jnt_comp)?;
            io.rw_bit("enable_ref_frame_mvs", &mut current.enable_ref_frame_mvs)?;
        } else {
            current.enable_jnt_comp = false;
            current.enable_ref_frame_mvs = false;
        }

        let mut choose_sct = current.seq_force_screen_content_tools == SELECT_SCREEN_CONTENT_TOOLS;
        io.rw_bit("seq_choose_screen_content_tools", &mut choose_sct)?;
        if choose_sct {
            current.seq_force_screen_content_tools = SELECT_SCREEN_CONTENT_TOOLS;
        } else {
            let mut v = current.seq_force_screen_content_tools;
            io.rw_bits("seq_force_screen_content_tools", 1, 0, 1, &mut v)?;
            current.seq_force_screen_content_tools = v;
        }

        if current.seq_force_screen_content_tools > 0 {
            let mut choose_mv = current.seq_force_integer_mv == SELECT_INTEGER_MV;
            io.rw_bit("seq_choose_integer_mv", &mut choose_mv)?;
            if choose_mv {
                current.seq_force_integer_mv = SELECT_INTEGER_MV;
            } else {
                let mut v = current.seq_force_integer_mv;
                io.rw_bits("seq_force_integer_mv", 1, 0, 1, &mut v)?;
                current.seq_force_integer_mv = v;
            }
        } else {
            current.seq_force_integer_mv = SELECT_INTEGER_MV;
        }

        if current.enable_order_hint {
            let mut v = current.order_hint_bits_minus_1 as u32;
            io.rw_bits("order_hint_bits_minus_1", 3, 0, 7, &mut v)?;
            current.order_hint_bits_minus_1 = v as u8;
        }
    }

    io.rw_bit("enable_superres", &mut current.enable_superres)?;
    io.rw_bit("enable_cdef", &mut current.enable_cdef)?;
    io.rw_bit("enable_restoration", &mut current.enable_restoration)?;

    rw_color_config(io, &mut current.color_config, current.seq_profile)?;

    io.rw_bit("film_grain_params_present", &mut current.film_grain_params_present)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{BitReader, BitWriter, ReadIo, TraceSink, WriteIo};

    fn minimal_header() -> SequenceHeader {
        let mut h = SequenceHeader::default();
        h.reduced_still_picture_header = true;
        h.max_frame_width = 640;
        h.max_frame_height = 480;
        h.frame_width_bits = 10;
        h.frame_height_bits = 9;
        h
    }

    #[test]
    fn reduced_still_picture_header_round_trips() {
        let mut header = minimal_header();

        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        rw_sequence_header(&mut writer, &mut header).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = SequenceHeader::default();
        rw_sequence_header(&mut reader, &mut decoded).unwrap();

        assert_eq!(decoded.max_frame_width, 640);
        assert_eq!(decoded.max_frame_height, 480);
        assert!(decoded.reduced_still_picture_header);
        assert_eq!(decoded.seq_force_screen_content_tools, SELECT_SCREEN_CONTENT_TOOLS);
    }

    #[test]
    fn full_header_with_order_hint_round_trips() {
        let mut header = minimal_header();
        header.reduced_still_picture_header = false;
        header.enable_order_hint = true;
        header.order_hint_bits_minus_1 = 6;
        header.seq_force_screen_content_tools = 1;
        header.seq_force_integer_mv = 1;

        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        rw_sequence_header(&mut writer, &mut header).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = SequenceHeader::default();
        rw_sequence_header(&mut reader, &mut decoded).unwrap();

        assert_eq!(decoded.order_hint_bits_minus_1, 6);
        assert!(decoded.enable_order_hint);
        assert_eq!(decoded.seq_force_screen_content_tools, 1);
    }
}
