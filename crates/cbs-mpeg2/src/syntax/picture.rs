//! `picture_header`, `picture_coding_extension`, `quant_matrix_extension`,
//! `picture_display_extension` and the `extension_data` dispatcher.
//!
//! Grounded on `cbs_mpeg2_syntax_template.c`'s `FUNC(picture_header)` through
//! `FUNC(extension_data)`.

use cbs_core::{BitIo, CbsError, Result};

use crate::codings::{rw_extra_information, rw_marker_bit, rw_signed};
use crate::types::{
    ExtensionData, Mpeg2State, PictureCodingExtension, PictureDisplayExtension, PictureHeader,
    QuantMatrixExtension, SequenceDisplayExtension, SequenceExtension, SequenceScalableExtension,
    EXTENSION_PICTURE_CODING, EXTENSION_PICTURE_DISPLAY, EXTENSION_QUANT_MATRIX, EXTENSION_SEQUENCE,
    EXTENSION_SEQUENCE_DISPLAY, EXTENSION_SEQUENCE_SCALABLE, PICTURE_CODING_TYPE_B, PICTURE_CODING_TYPE_P,
};

use super::sequence::{rw_sequence_display_extension, rw_sequence_extension, rw_sequence_scalable_extension};

fn rw_quantiser_matrix<IO: BitIo>(io: &mut IO, name: &'static str, matrix: &mut [u8; 64]) -> Result<()> {
    for (i, entry) in matrix.iter_mut().enumerate() {
        let mut v = *entry as u32;
        io.rw_bits(name, 8, 1, 255, &mut v)?;
        *entry = v as u8;
        let _ = i;
    }
    Ok(())
}

pub fn rw_picture_header<IO: BitIo>(io: &mut IO, current: &mut PictureHeader) -> Result<()> {
    let mut temporal_reference = current.temporal_reference as u32;
    io.rw_bits("temporal_reference", 10, 0, 0x3ff, &mut temporal_reference)?;
    current.temporal_reference = temporal_reference as u16;

    let mut coding_type = current.picture_coding_type as u32;
    io.rw_bits("picture_coding_type", 3, 1, 4, &mut coding_type)?;
    current.picture_coding_type = coding_type as u8;

    let mut vbv_delay = current.vbv_delay as u32;
    io.rw_bits("vbv_delay", 16, 0, 0xffff, &mut vbv_delay)?;
    current.vbv_delay = vbv_delay as u16;

    if current.picture_coding_type == PICTURE_CODING_TYPE_P || current.picture_coding_type == PICTURE_CODING_TYPE_B {
        io.rw_bit("full_pel_forward_vector", &mut current.full_pel_forward_vector)?;
        let mut f = current.forward_f_code as u32;
        io.rw_bits("forward_f_code", 3, 0, 7, &mut f)?;
        current.forward_f_code = f as u8;
    }

    if current.picture_coding_type == PICTURE_CODING_TYPE_B {
        io.rw_bit("full_pel_backward_vector", &mut current.full_pel_backward_vector)?;
        let mut f = current.backward_f_code as u32;
        io.rw_bits("backward_f_code", 3, 0, 7, &mut f)?;
        current.backward_f_code = f as u8;
    }

    rw_extra_information(io, &mut current.extra_information.values)?;

    Ok(())
}

pub fn rw_picture_coding_extension<IO: BitIo>(io: &mut IO, current: &mut PictureCodingExtension, state: &mut Mpeg2State) -> Result<()> {
    for forward in 0..2 {
        for axis in 0..2 {
            let mut v = current.f_code[forward][axis] as u32;
            io.rw_bits("f_code", 4, 1, 15, &mut v)?;
            current.f_code[forward][axis] = v as u8;
        }
    }

    let mut v = current.intra_dc_precision as u32;
    io.rw_bits("intra_dc_precision", 2, 0, 3, &mut v)?;
    current.intra_dc_precision = v as u8;

    let mut v = current.picture_structure as u32;
    io.rw_bits("picture_structure", 2, 0, 3, &mut v)?;
    current.picture_structure = v as u8;

    io.rw_bit("top_field_first", &mut current.top_field_first)?;
    io.rw_bit("frame_pred_frame_dct", &mut current.frame_pred_frame_dct)?;
    io.rw_bit("concealment_motion_vectors", &mut current.concealment_motion_vectors)?;
    io.rw_bit("q_scale_type", &mut current.q_scale_type)?;
    io.rw_bit("intra_vlc_format", &mut current.intra_vlc_format)?;
    io.rw_bit("alternate_scan", &mut current.alternate_scan)?;
    io.rw_bit("repeat_first_field", &mut current.repeat_first_field)?;
    io.rw_bit("chroma_420_type", &mut current.chroma_420_type)?;
    io.rw_bit("progressive_frame", &mut current.progressive_frame)?;

    // Top field = 1, bottom field = 2 (ITU-T H.262 Table 6-14); anything
    // else (3) is a frame picture.
    state.number_of_frame_centre_offsets = if state.progressive_sequence {
        if current.repeat_first_field {
            if current.top_field_first {
                3
            } else {
                2
            }
        } else {
            1
        }
    } else if current.picture_structure == 1 || current.picture_structure == 2 {
        1
    } else if current.repeat_first_field {
        3
    } else {
        2
    };

    io.rw_bit("composite_display_flag", &mut current.composite_display_flag)?;
    if current.composite_display_flag {
        io.rw_bit("v_axis", &mut current.v_axis)?;
        let mut v = current.field_sequence as u32;
        io.rw_bits("field_sequence", 3, 0, 7, &mut v)?;
        current.field_sequence = v as u8;
        io.rw_bit("sub_carrier", &mut current.sub_carrier)?;
        let mut v = current.burst_amplitude as u32;
        io.rw_bits("burst_amplitude", 7, 0, 0x7f, &mut v)?;
        current.burst_amplitude = v as u8;
        let mut v = current.sub_carrier_phase as u32;
        io.rw_bits("sub_carrier_phase", 8, 0, 0xff, &mut v)?;
        current.sub_carrier_phase = v as u8;
    }

    Ok(())
}

pub fn rw_quant_matrix_extension<IO: BitIo>(io: &mut IO, current: &mut QuantMatrixExtension) -> Result<()> {
    io.rw_bit("load_intra_quantiser_matrix", &mut current.load_intra_quantiser_matrix)?;
    if current.load_intra_quantiser_matrix {
        rw_quantiser_matrix(io, "intra_quantiser_matrix", &mut current.intra_quantiser_matrix)?;
    }

    io.rw_bit("load_non_intra_quantiser_matrix", &mut current.load_non_intra_quantiser_matrix)?;
    if current.load_non_intra_quantiser_matrix {
        rw_quantiser_matrix(io, "non_intra_quantiser_matrix", &mut current.non_intra_quantiser_matrix)?;
    }

    io.rw_bit("load_chroma_intra_quantiser_matrix", &mut current.load_chroma_intra_quantiser_matrix)?;
    if current.load_chroma_intra_quantiser_matrix {
        rw_quantiser_matrix(io, "chroma_intra_quantiser_matrix", &mut current.chroma_intra_quantiser_matrix)?;
    }

    io.rw_bit("load_chroma_non_intra_quantiser_matrix", &mut current.load_chroma_non_intra_quantiser_matrix)?;
    if current.load_chroma_non_intra_quantiser_matrix {
        rw_quantiser_matrix(io, "chroma_non_intra_quantiser_matrix", &mut current.chroma_non_intra_quantiser_matrix)?;
    }

    Ok(())
}

pub fn rw_picture_display_extension<IO: BitIo>(io: &mut IO, current: &mut PictureDisplayExtension, state: &Mpeg2State) -> Result<()> {
    let count = state.number_of_frame_centre_offsets as usize;
    if IO::IS_READING {
        current.frame_centre_horizontal_offset = vec![0; count];
        current.frame_centre_vertical_offset = vec![0; count];
    }
    for i in 0..count {
        rw_signed(io, "frame_centre_horizontal_offset", 16, &mut current.frame_centre_horizontal_offset[i])?;
        rw_marker_bit(io)?;
        rw_signed(io, "frame_centre_vertical_offset", 16, &mut current.frame_centre_vertical_offset[i])?;
        rw_marker_bit(io)?;
    }
    Ok(())
}

pub fn rw_extension_data<IO: BitIo>(io: &mut IO, current: &mut ExtensionData, state: &mut Mpeg2State) -> Result<()> {
    let mut identifier = match current {
        ExtensionData::Sequence(_) => EXTENSION_SEQUENCE,
        ExtensionData::SequenceDisplay(_) => EXTENSION_SEQUENCE_DISPLAY,
        ExtensionData::SequenceScalable(_) => EXTENSION_SEQUENCE_SCALABLE,
        ExtensionData::QuantMatrix(_) => EXTENSION_QUANT_MATRIX,
        ExtensionData::PictureDisplay(_) => EXTENSION_PICTURE_DISPLAY,
        ExtensionData::PictureCoding(_) => EXTENSION_PICTURE_CODING,
    };
    io.rw_bits("extension_start_code_identifier", 4, 1, 8, &mut identifier)?;

    if IO::IS_READING {
        *current = match identifier {
            EXTENSION_SEQUENCE => ExtensionData::Sequence(SequenceExtension::default()),
            EXTENSION_SEQUENCE_DISPLAY => ExtensionData::SequenceDisplay(SequenceDisplayExtension::default()),
            EXTENSION_SEQUENCE_SCALABLE => ExtensionData::SequenceScalable(SequenceScalableExtension::default()),
            EXTENSION_QUANT_MATRIX => ExtensionData::QuantMatrix(QuantMatrixExtension::default()),
            EXTENSION_PICTURE_DISPLAY => ExtensionData::PictureDisplay(PictureDisplayExtension::default()),
            EXTENSION_PICTURE_CODING => ExtensionData::PictureCoding(PictureCodingExtension::default()),
            other => {
                return Err(CbsError::Unsupported(format!("extension start code identifier {other} not supported")));
            }
        };
    }

    match current {
        ExtensionData::Sequence(ext) => rw_sequence_extension(io, ext, state),
        ExtensionData::SequenceDisplay(ext) => rw_sequence_display_extension(io, ext),
        ExtensionData::SequenceScalable(ext) => rw_sequence_scalable_extension(io, ext, state),
        ExtensionData::QuantMatrix(ext) => rw_quant_matrix_extension(io, ext),
        ExtensionData::PictureDisplay(ext) => rw_picture_display_extension(io, ext, state),
        ExtensionData::PictureCoding(ext) => rw_picture_coding_extension(io, ext, state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    #[test]
    fn picture_header_b_picture_carries_both_f_codes() {
        let mut current = PictureHeader {
            temporal_reference: 5,
            picture_coding_type: PICTURE_CODING_TYPE_B,
            vbv_delay: 0xffff,
            full_pel_forward_vector: false,
            forward_f_code: 3,
            full_pel_backward_vector: true,
            backward_f_code: 5,
            extra_information: Default::default(),
        };
        let mut w = WriteIo::new(false);
        rw_picture_header(&mut w, &mut current).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = PictureHeader::default();
        rw_picture_header(&mut r, &mut decoded).unwrap();
        assert_eq!(decoded.forward_f_code, 3);
        assert_eq!(decoded.backward_f_code, 5);
        assert!(decoded.full_pel_backward_vector);
    }

    #[test]
    fn picture_coding_extension_derives_frame_centre_offset_count() {
        let mut current = PictureCodingExtension {
            repeat_first_field: true,
            top_field_first: true,
            ..Default::default()
        };
        let mut state = Mpeg2State { progressive_sequence: true, ..Default::default() };
        let mut w = WriteIo::new(false);
        rw_picture_coding_extension(&mut w, &mut current, &mut state).unwrap();
        assert_eq!(state.number_of_frame_centre_offsets, 3);
    }

    #[test]
    fn picture_display_extension_round_trips_offsets() {
        let state = Mpeg2State { number_of_frame_centre_offsets: 2, ..Default::default() };
        let mut current = PictureDisplayExtension {
            frame_centre_horizontal_offset: vec![10, -20],
            frame_centre_vertical_offset: vec![-5, 7],
        };
        let mut w = WriteIo::new(false);
        rw_picture_display_extension(&mut w, &mut current, &state).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = PictureDisplayExtension::default();
        rw_picture_display_extension(&mut r, &mut decoded, &state).unwrap();
        assert_eq!(decoded.frame_centre_horizontal_offset, vec![10, -20]);
        assert_eq!(decoded.frame_centre_vertical_offset, vec![-5, 7]);
    }
}
