//! Raw MPEG-2 syntax structures and the per-context state the syntax
//! functions read from and update.
//!
//! Field names and shapes are grounded on the `MPEG2Raw*` structs implied
//! by `cbs_mpeg2_syntax_template.c`; doc-comment register matches
//! `bitvue-mpeg2-codec::sequence::SequenceHeader` et al.

use std::any::Any;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use cbs_core::{BufferView, PluginState, UnitContent};

/// `extension_start_code_identifier` values (ITU-T H.262 Table 6-17).
pub const EXTENSION_SEQUENCE: u32 = 1;
pub const EXTENSION_SEQUENCE_DISPLAY: u32 = 2;
pub const EXTENSION_QUANT_MATRIX: u32 = 3;
pub const EXTENSION_SEQUENCE_SCALABLE: u32 = 5;
pub const EXTENSION_PICTURE_DISPLAY: u32 = 7;
pub const EXTENSION_PICTURE_CODING: u32 = 8;

/// `scalable_mode` values (ITU-T H.262 Table 6-28a).
pub const SCALABLE_MODE_DATA_PARTITIONING: u8 = 0;
pub const SCALABLE_MODE_SPATIAL: u8 = 1;
pub const SCALABLE_MODE_SNR: u8 = 2;
pub const SCALABLE_MODE_TEMPORAL: u8 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceHeader {
    pub horizontal_size_value: u16,
    pub vertical_size_value: u16,
    pub aspect_ratio_information: u8,
    pub frame_rate_code: u8,
    pub bit_rate_value: u32,
    pub vbv_buffer_size_value: u16,
    pub constrained_parameters_flag: bool,
    pub load_intra_quantiser_matrix: bool,
    pub intra_quantiser_matrix: [u8; 64],
    pub load_non_intra_quantiser_matrix: bool,
    pub non_intra_quantiser_matrix: [u8; 64],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceExtension {
    pub profile_and_level_indication: u8,
    pub progressive_sequence: bool,
    pub chroma_format: u8,
    pub horizontal_size_extension: u8,
    pub vertical_size_extension: u8,
    pub bit_rate_extension: u16,
    pub vbv_buffer_size_extension: u8,
    pub low_delay: bool,
    pub frame_rate_extension_n: u8,
    pub frame_rate_extension_d: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceDisplayExtension {
    pub video_format: u8,
    pub colour_description: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
    pub display_horizontal_size: u16,
    pub display_vertical_size: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceScalableExtension {
    pub scalable_mode: u8,
    pub layer_id: u8,
    pub lower_layer_prediction_horizontal_size: u16,
    pub lower_layer_prediction_vertical_size: u16,
    pub horizontal_subsampling_factor_m: u8,
    pub horizontal_subsampling_factor_n: u8,
    pub vertical_subsampling_factor_m: u8,
    pub vertical_subsampling_factor_n: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupOfPicturesHeader {
    pub drop_frame_flag: bool,
    pub time_code_hours: u8,
    pub time_code_minutes: u8,
    pub time_code_seconds: u8,
    pub time_code_pictures: u8,
    pub closed_gop: bool,
    pub broken_link: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtraInformation {
    pub values: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PictureHeader {
    pub temporal_reference: u16,
    pub picture_coding_type: u8,
    pub vbv_delay: u16,
    pub full_pel_forward_vector: bool,
    pub forward_f_code: u8,
    pub full_pel_backward_vector: bool,
    pub backward_f_code: u8,
    pub extra_information: ExtraInformation,
}

/// `picture_coding_type` values (ITU-T H.262 Table 6-12).
pub const PICTURE_CODING_TYPE_I: u8 = 1;
pub const PICTURE_CODING_TYPE_P: u8 = 2;
pub const PICTURE_CODING_TYPE_B: u8 = 3;
pub const PICTURE_CODING_TYPE_D: u8 = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PictureCodingExtension {
    pub f_code: [[u8; 2]; 2],
    pub intra_dc_precision: u8,
    pub picture_structure: u8,
    pub top_field_first: bool,
    pub frame_pred_frame_dct: bool,
    pub concealment_motion_vectors: bool,
    pub q_scale_type: bool,
    pub intra_vlc_format: bool,
    pub alternate_scan: bool,
    pub repeat_first_field: bool,
    pub chroma_420_type: bool,
    pub progressive_frame: bool,
    pub composite_display_flag: bool,
    pub v_axis: bool,
    pub field_sequence: u8,
    pub sub_carrier: bool,
    pub burst_amplitude: u8,
    pub sub_carrier_phase: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuantMatrixExtension {
    pub load_intra_quantiser_matrix: bool,
    pub intra_quantiser_matrix: [u8; 64],
    pub load_non_intra_quantiser_matrix: bool,
    pub non_intra_quantiser_matrix: [u8; 64],
    pub load_chroma_intra_quantiser_matrix: bool,
    pub chroma_intra_quantiser_matrix: [u8; 64],
    pub load_chroma_non_intra_quantiser_matrix: bool,
    pub chroma_non_intra_quantiser_matrix: [u8; 64],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PictureDisplayExtension {
    pub frame_centre_horizontal_offset: Vec<i32>,
    pub frame_centre_vertical_offset: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtensionData {
    Sequence(SequenceExtension),
    SequenceDisplay(SequenceDisplayExtension),
    SequenceScalable(SequenceScalableExtension),
    QuantMatrix(QuantMatrixExtension),
    PictureDisplay(PictureDisplayExtension),
    PictureCoding(PictureCodingExtension),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceExtensionFields {
    pub intra_slice: bool,
    pub slice_picture_id_enable: bool,
    pub slice_picture_id: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceHeader {
    pub slice_vertical_position: u8,
    pub slice_vertical_position_extension: Option<u8>,
    pub priority_breakpoint: Option<u8>,
    pub quantiser_scale_code: u8,
    pub extension: Option<SliceExtensionFields>,
    pub extra_information: ExtraInformation,
}

/// `Slice` keeps its header decomposed but its macroblock payload opaque
/// and zero-copy, the same split `cbs_mpeg2_read_unit` makes between
/// `MPEG2RawSliceHeader` and the trailing `data`/`data_bit_start` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    pub header: SliceHeader,
    #[serde(skip)]
    pub payload: Option<BufferView>,
    pub payload_bit_start: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceEnd;

macro_rules! impl_unit_content {
    ($t:ty) => {
        impl UnitContent for $t {
            fn clone_content(&self) -> Box<dyn UnitContent> {
                Box::new(self.clone())
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

impl_unit_content!(SequenceHeader);
impl_unit_content!(GroupOfPicturesHeader);
impl_unit_content!(PictureHeader);
impl_unit_content!(ExtensionData);
impl_unit_content!(Slice);
impl_unit_content!(UserData);
impl_unit_content!(SequenceEnd);

/// Per-stream decode state threaded through the syntax functions, mirroring
/// `CodedBitstreamMPEG2Context`.
#[derive(Debug, Default)]
pub struct Mpeg2State {
    pub horizontal_size: u32,
    pub vertical_size: u32,
    pub progressive_sequence: bool,
    pub scalable: bool,
    pub scalable_mode: u8,
    pub number_of_frame_centre_offsets: u8,
}

impl PluginState for Mpeg2State {
    fn flush(&mut self) {
        *self = Self::default();
    }
}
