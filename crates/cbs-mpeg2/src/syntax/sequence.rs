//! `sequence_header`, `sequence_extension`, `sequence_display_extension`
//! and `sequence_scalable_extension`.
//!
//! Grounded on `cbs_mpeg2_syntax_template.c`'s `FUNC(sequence_header)` /
//! `FUNC(sequence_extension)` / `FUNC(sequence_display_extension)`. The
//! scalable extension is not implemented in that file (its dispatch arm
//! returns `AVERROR_PATCHWELCOME`); this crate adds it per ITU-T H.262
//! §6.2.2.4 so the `Extension` unit type's dispatch is complete and
//! `Mpeg2State::scalable`/`scalable_mode` have a real source (see
//! DESIGN.md).

use cbs_core::Result;

use crate::codings::rw_marker_bit;
use crate::types::{Mpeg2State, SequenceExtension, SequenceHeader, SequenceScalableExtension, SCALABLE_MODE_SPATIAL};

pub fn rw_sequence_header<IO: cbs_core::BitIo>(io: &mut IO, current: &mut SequenceHeader, state: &mut Mpeg2State) -> Result<()> {
    let mut horizontal = current.horizontal_size_value as u32;
    io.rw_bits("horizontal_size_value", 12, 1, 4095, &mut horizontal)?;
    current.horizontal_size_value = horizontal as u16;

    let mut vertical = current.vertical_size_value as u32;
    io.rw_bits("vertical_size_value", 12, 1, 4095, &mut vertical)?;
    current.vertical_size_value = vertical as u16;

    state.horizontal_size = current.horizontal_size_value as u32;
    state.vertical_size = current.vertical_size_value as u32;

    let mut aspect = current.aspect_ratio_information as u32;
    io.rw_bits("aspect_ratio_information", 4, 1, 15, &mut aspect)?;
    current.aspect_ratio_information = aspect as u8;

    let mut frame_rate = current.frame_rate_code as u32;
    io.rw_bits("frame_rate_code", 4, 1, 15, &mut frame_rate)?;
    current.frame_rate_code = frame_rate as u8;

    let mut bit_rate = current.bit_rate_value;
    io.rw_bits("bit_rate_value", 18, 0, 0x3_ffff, &mut bit_rate)?;
    current.bit_rate_value = bit_rate;

    rw_marker_bit(io)?;

    let mut vbv = current.vbv_buffer_size_value as u32;
    io.rw_bits("vbv_buffer_size_value", 10, 0, 0x3ff, &mut vbv)?;
    current.vbv_buffer_size_value = vbv as u16;

    io.rw_bit("constrained_parameters_flag", &mut current.constrained_parameters_flag)?;

    io.rw_bit("load_intra_quantiser_matrix", &mut current.load_intra_quantiser_matrix)?;
    if current.load_intra_quantiser_matrix {
        for i in 0..64 {
            let mut v = current.intra_quantiser_matrix[i] as u32;
            io.rw_bits("intra_quantiser_matrix[i]", 8, 1, 255, &mut v)?;
            current.intra_quantiser_matrix[i] = v as u8;
        }
    }

    io.rw_bit("load_non_intra_quantiser_matrix", &mut current.load_non_intra_quantiser_matrix)?;
    if current.load_non_intra_quantiser_matrix {
        for i in 0..64 {
            let mut v = current.non_intra_quantiser_matrix[i] as u32;
            io.rw_bits("non_intra_quantiser_matrix[i]", 8, 1, 255, &mut v)?;
            current.non_intra_quantiser_matrix[i] = v as u8;
        }
    }

    Ok(())
}

pub fn rw_sequence_extension<IO: cbs_core::BitIo>(io: &mut IO, current: &mut SequenceExtension, state: &mut Mpeg2State) -> Result<()> {
    let mut profile = current.profile_and_level_indication as u32;
    io.rw_bits("profile_and_level_indication", 8, 0, 255, &mut profile)?;
    current.profile_and_level_indication = profile as u8;

    io.rw_bit("progressive_sequence", &mut current.progressive_sequence)?;

    let mut chroma = current.chroma_format as u32;
    io.rw_bits("chroma_format", 2, 1, 3, &mut chroma)?;
    current.chroma_format = chroma as u8;

    let mut h_ext = current.horizontal_size_extension as u32;
    io.rw_bits("horizontal_size_extension", 2, 0, 3, &mut h_ext)?;
    current.horizontal_size_extension = h_ext as u8;

    let mut v_ext = current.vertical_size_extension as u32;
    io.rw_bits("vertical_size_extension", 2, 0, 3, &mut v_ext)?;
    current.vertical_size_extension = v_ext as u8;

    state.horizontal_size = (state.horizontal_size & 0xfff) | ((current.horizontal_size_extension as u32) << 12);
    state.vertical_size = (state.vertical_size & 0xfff) | ((current.vertical_size_extension as u32) << 12);
    state.progressive_sequence = current.progressive_sequence;

    let mut bit_rate_ext = current.bit_rate_extension as u32;
    io.rw_bits("bit_rate_extension", 12, 0, 0xfff, &mut bit_rate_ext)?;
    current.bit_rate_extension = bit_rate_ext as u16;

    rw_marker_bit(io)?;

    let mut vbv_ext = current.vbv_buffer_size_extension as u32;
    io.rw_bits("vbv_buffer_size_extension", 8, 0, 255, &mut vbv_ext)?;
    current.vbv_buffer_size_extension = vbv_ext as u8;

    io.rw_bit("low_delay", &mut current.low_delay)?;

    let mut n = current.frame_rate_extension_n as u32;
    io.rw_bits("frame_rate_extension_n", 2, 0, 3, &mut n)?;
    current.frame_rate_extension_n = n as u8;

    let mut d = current.frame_rate_extension_d as u32;
    io.rw_bits("frame_rate_extension_d", 5, 0, 0x1f, &mut d)?;
    current.frame_rate_extension_d = d as u8;

    Ok(())
}

pub fn rw_sequence_display_extension<IO: cbs_core::BitIo>(io: &mut IO, current: &mut crate::types::SequenceDisplayExtension) -> Result<()> {
    let mut video_format = current.video_format as u32;
    io.rw_bits("video_format", 3, 0, 7, &mut video_format)?;
    current.video_format = video_format as u8;

    io.rw_bit("colour_description", &mut current.colour_description)?;
    if current.colour_description {
        read_and_patch_colour_field(io, "colour_primaries", &mut current.colour_primaries)?;
        read_and_patch_colour_field(io, "transfer_characteristics", &mut current.transfer_characteristics)?;
        read_and_patch_colour_field(io, "matrix_coefficients", &mut current.matrix_coefficients)?;
    } else {
        let mut v = current.colour_primaries as u32;
        crate::codings::infer_u32_tolerant(IO::IS_READING, &mut v, 2, "colour_primaries");
        current.colour_primaries = v as u8;

        let mut v = current.transfer_characteristics as u32;
        crate::codings::infer_u32_tolerant(IO::IS_READING, &mut v, 2, "transfer_characteristics");
        current.transfer_characteristics = v as u8;

        let mut v = current.matrix_coefficients as u32;
        crate::codings::infer_u32_tolerant(IO::IS_READING, &mut v, 2, "matrix_coefficients");
        current.matrix_coefficients = v as u8;
    }

    let mut h = current.display_horizontal_size as u32;
    io.rw_bits("display_horizontal_size", 14, 0, 0x3fff, &mut h)?;
    current.display_horizontal_size = h as u16;

    rw_marker_bit(io)?;

    let mut v = current.display_vertical_size as u32;
    io.rw_bits("display_vertical_size", 14, 0, 0x3fff, &mut v)?;
    current.display_vertical_size = v as u16;

    Ok(())
}

/// Reads an 8-bit colour field and, matching `cbs_mpeg2.c`'s
/// `READ_AND_PATCH` macro, rewrites an invalid `0` to `2` ("unspecified")
/// with a warning rather than leaving a value the spec forbids. On write
/// the field is passed straight through with the normal range check.
fn read_and_patch_colour_field<IO: cbs_core::BitIo>(io: &mut IO, name: &'static str, value: &mut u8) -> Result<()> {
    let mut v = *value as u32;
    io.rw_bits(name, 8, 0, 255, &mut v)?;
    if IO::IS_READING && v == 0 {
        tracing::warn!(element = name, "had the invalid value 0, setting it to 2 (unspecified)");
        v = 2;
    }
    *value = v as u8;
    Ok(())
}

pub fn rw_sequence_scalable_extension<IO: cbs_core::BitIo>(io: &mut IO, current: &mut SequenceScalableExtension, state: &mut Mpeg2State) -> Result<()> {
    let mut mode = current.scalable_mode as u32;
    io.rw_bits("scalable_mode", 2, 0, 3, &mut mode)?;
    current.scalable_mode = mode as u8;
    state.scalable = true;
    state.scalable_mode = current.scalable_mode;

    let mut layer_id = current.layer_id as u32;
    io.rw_bits("layer_id", 4, 0, 15, &mut layer_id)?;
    current.layer_id = layer_id as u8;

    if current.scalable_mode == SCALABLE_MODE_SPATIAL {
        let mut h = current.lower_layer_prediction_horizontal_size as u32;
        io.rw_bits("lower_layer_prediction_horizontal_size", 14, 0, 0x3fff, &mut h)?;
        current.lower_layer_prediction_horizontal_size = h as u16;

        rw_marker_bit(io)?;

        let mut v = current.lower_layer_prediction_vertical_size as u32;
        io.rw_bits("lower_layer_prediction_vertical_size", 14, 0, 0x3fff, &mut v)?;
        current.lower_layer_prediction_vertical_size = v as u16;

        rw_marker_bit(io)?;

        let mut hm = current.horizontal_subsampling_factor_m as u32;
        io.rw_bits("horizontal_subsampling_factor_m", 5, 0, 31, &mut hm)?;
        current.horizontal_subsampling_factor_m = hm as u8;

        let mut hn = current.horizontal_subsampling_factor_n as u32;
        io.rw_bits("horizontal_subsampling_factor_n", 5, 0, 31, &mut hn)?;
        current.horizontal_subsampling_factor_n = hn as u8;

        let mut vm = current.vertical_subsampling_factor_m as u32;
        io.rw_bits("vertical_subsampling_factor_m", 5, 0, 31, &mut vm)?;
        current.vertical_subsampling_factor_m = vm as u8;

        let mut vn = current.vertical_subsampling_factor_n as u32;
        io.rw_bits("vertical_subsampling_factor_n", 5, 0, 31, &mut vn)?;
        current.vertical_subsampling_factor_n = vn as u8;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    #[test]
    fn sequence_header_round_trips_with_quant_matrices() {
        let mut header = SequenceHeader {
            horizontal_size_value: 720,
            vertical_size_value: 480,
            aspect_ratio_information: 2,
            frame_rate_code: 4,
            bit_rate_value: 1000,
            vbv_buffer_size_value: 112,
            constrained_parameters_flag: false,
            load_intra_quantiser_matrix: true,
            intra_quantiser_matrix: [8; 64],
            load_non_intra_quantiser_matrix: false,
            non_intra_quantiser_matrix: [16; 64],
        };
        let mut state = Mpeg2State::default();

        let mut w = WriteIo::new(false);
        rw_sequence_header(&mut w, &mut header, &mut state).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = SequenceHeader::default();
        let mut decoded_state = Mpeg2State::default();
        rw_sequence_header(&mut r, &mut decoded, &mut decoded_state).unwrap();

        assert_eq!(decoded.horizontal_size_value, 720);
        assert_eq!(decoded.vertical_size_value, 480);
        assert!(decoded.load_intra_quantiser_matrix);
        assert_eq!(decoded.intra_quantiser_matrix, [8; 64]);
        assert!(!decoded.load_non_intra_quantiser_matrix);
        assert_eq!(decoded_state.horizontal_size, 720);
    }

    #[test]
    fn sequence_display_extension_patches_zero_colour_fields() {
        let mut w = WriteIo::new(false);
        let mut ext = crate::types::SequenceDisplayExtension {
            video_format: 5,
            colour_description: true,
            colour_primaries: 0,
            transfer_characteristics: 1,
            matrix_coefficients: 1,
            display_horizontal_size: 640,
            display_vertical_size: 480,
        };
        rw_sequence_display_extension(&mut w, &mut ext).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = crate::types::SequenceDisplayExtension::default();
        rw_sequence_display_extension(&mut r, &mut decoded).unwrap();
        assert_eq!(decoded.colour_primaries, 2);
        assert_eq!(decoded.transfer_characteristics, 1);
    }

    #[test]
    fn sequence_scalable_extension_spatial_round_trips() {
        let mut current = SequenceScalableExtension {
            scalable_mode: SCALABLE_MODE_SPATIAL,
            layer_id: 1,
            lower_layer_prediction_horizontal_size: 352,
            lower_layer_prediction_vertical_size: 288,
            horizontal_subsampling_factor_m: 1,
            horizontal_subsampling_factor_n: 2,
            vertical_subsampling_factor_m: 1,
            vertical_subsampling_factor_n: 2,
        };
        let mut state = Mpeg2State::default();
        let mut w = WriteIo::new(false);
        rw_sequence_scalable_extension(&mut w, &mut current, &mut state).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = SequenceScalableExtension::default();
        let mut decoded_state = Mpeg2State::default();
        rw_sequence_scalable_extension(&mut r, &mut decoded, &mut decoded_state).unwrap();
        assert_eq!(decoded.lower_layer_prediction_horizontal_size, 352);
        assert!(decoded_state.scalable);
        assert_eq!(decoded_state.scalable_mode, SCALABLE_MODE_SPATIAL);
    }
}
