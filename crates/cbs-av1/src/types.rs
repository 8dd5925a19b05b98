//! AV1 OBU types and the private per-context state threaded through every
//! unit read/write.
//!
//! `ObuType` numeric values are normative (the AV1 bitstream specification),
//! confirmed against `AV1_OBU_*` usage throughout
//! `examples/original_source/libavcodec/{cbs_av1.c,av1_frame_merge_bsf.c,
//! av1_frame_split_bsf.c,av1_metadata_bsf.c,av1_parser.c}`.

use cbs_core::plugin::PluginState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObuType {
    SequenceHeader,
    TemporalDelimiter,
    FrameHeader,
    TileGroup,
    Metadata,
    Frame,
    RedundantFrameHeader,
    TileList,
    Padding,
    Reserved(u8),
}

impl ObuType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ObuType::SequenceHeader,
            2 => ObuType::TemporalDelimiter,
            3 => ObuType::FrameHeader,
            4 => ObuType::TileGroup,
            5 => ObuType::Metadata,
            6 => ObuType::Frame,
            7 => ObuType::RedundantFrameHeader,
            8 => ObuType::TileList,
            15 => ObuType::Padding,
            other => ObuType::Reserved(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ObuType::SequenceHeader => 1,
            ObuType::TemporalDelimiter => 2,
            ObuType::FrameHeader => 3,
            ObuType::TileGroup => 4,
            ObuType::Metadata => 5,
            ObuType::Frame => 6,
            ObuType::RedundantFrameHeader => 7,
            ObuType::TileList => 8,
            ObuType::Padding => 15,
            ObuType::Reserved(v) => v,
        }
    }

    /// OBUs whose trailing bits are never present because their payload
    /// runs to the declared end of the OBU (tile data, or unparsed
    /// metadata/padding bytes).
    pub fn has_opaque_trailing_payload(self) -> bool {
        matches!(self, ObuType::TileGroup | ObuType::TileList | ObuType::Frame)
    }
}

/// A single AV1 reference frame slot (spec section 3, "8-slot
/// reference-frame table with KEY-FRAME invalidation semantics").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReferenceFrameSlot {
    pub valid: bool,
    pub frame_id: u32,
    pub upscaled_width: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub render_width: u32,
    pub render_height: u32,
    pub frame_type: FrameType,
    pub subsampling_x: bool,
    pub subsampling_y: bool,
    pub bit_depth: u8,
    pub order_hint: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    #[default]
    Key,
    Inter,
    IntraOnly,
    Switch,
}

impl FrameType {
    pub fn from_bits(value: u32) -> Self {
        match value {
            0 => FrameType::Key,
            1 => FrameType::Inter,
            2 => FrameType::IntraOnly,
            _ => FrameType::Switch,
        }
    }

    pub fn to_bits(self) -> u32 {
        match self {
            FrameType::Key => 0,
            FrameType::Inter => 1,
            FrameType::IntraOnly => 2,
            FrameType::Switch => 3,
        }
    }

    pub fn is_key(self) -> bool {
        self == FrameType::Key
    }

    pub fn is_intra(self) -> bool {
        matches!(self, FrameType::Key | FrameType::IntraOnly)
    }
}

pub const NUM_REF_FRAMES: usize = 8;
pub const MAX_OPERATING_POINTS: usize = 32;

/// Timing/decoder-model info carried by the sequence header, kept only to
/// the level of detail later syntax and the operating-point filter need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub idc: u16,
    pub seq_level_idx: u8,
    pub seq_tier: u8,
    pub decoder_model_present: bool,
    pub decoder_buffer_delay: u32,
    pub encoder_buffer_delay: u32,
    pub low_delay_mode_flag: bool,
    pub initial_display_delay_present: bool,
    pub initial_display_delay_minus_1: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimingInfo {
    pub num_units_in_display_tick: u32,
    pub time_scale: u32,
    pub equal_picture_interval: bool,
    pub num_ticks_per_picture_minus_1: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecoderModelInfo {
    pub buffer_delay_length_minus_1: u8,
    pub num_units_in_decoding_tick: u32,
    pub buffer_removal_time_length_minus_1: u8,
    pub frame_presentation_time_length_minus_1: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ColorConfig {
    pub high_bitdepth: bool,
    pub twelve_bit: bool,
    pub mono_chrome: bool,
    pub color_description_present: bool,
    pub color_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
    pub color_range: bool,
    pub subsampling_x: bool,
    pub subsampling_y: bool,
    pub chroma_sample_position: u8,
    pub separate_uv_delta_q: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceHeader {
    pub seq_profile: u8,
    pub still_picture: bool,
    pub reduced_still_picture_header: bool,
    pub timing_info_present: bool,
    pub timing_info: TimingInfo,
    pub decoder_model_info_present: bool,
    pub decoder_model_info: DecoderModelInfo,
    pub initial_display_delay_present: bool,
    pub operating_points: Vec<OperatingPoint>,
    pub frame_width_bits: u8,
    pub frame_height_bits: u8,
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub frame_id_numbers_present: bool,
    pub delta_frame_id_length_minus_2: u8,
    pub additional_frame_id_length_minus_1: u8,
    pub use_128x128_superblock: bool,
    pub enable_filter_intra: bool,
    pub enable_intra_edge_filter: bool,
    pub enable_intraintra_compound: bool,
    pub enable_masked_compound: bool,
    pub enable_warped_motion: bool,
    pub enable_dual_filter: bool,
    pub enable_order_hint: bool,
    pub enable_jnt_comp: bool,
    pub enable_ref_frame_mvs: bool,
    pub seq_force_screen_content_tools: u32,
    pub seq_force_integer_mv: u32,
    pub order_hint_bits_minus_1: u8,
    pub enable_superres: bool,
    pub enable_cdef: bool,
    pub enable_restoration: bool,
    pub color_config: ColorConfig,
    pub film_grain_params_present: bool,
}

pub const SELECT_SCREEN_CONTENT_TOOLS: u32 = 2;
pub const SELECT_INTEGER_MV: u32 = 2;
pub const PRIMARY_REF_NONE: u32 = 7;
pub const MAX_SEGMENTS: usize = 8;
pub const SEG_LVL_MAX: usize = 8;
pub const SEG_LVL_ALT_Q: usize = 0;
pub const REFS_PER_FRAME: usize = 7;
pub const TOTAL_REFS_PER_FRAME: usize = 8;

pub const SUPERRES_NUM: u32 = 8;
pub const SUPERRES_DENOM_MIN: u32 = 9;
pub const MAX_TILE_WIDTH: u32 = 4096;
pub const MAX_TILE_AREA: u32 = 4096 * 2304;
pub const MAX_TILE_COLS: u32 = 64;
pub const MAX_TILE_ROWS: u32 = 64;
pub const INTERPOLATION_FILTER_SWITCHABLE: u32 = 4;

pub const REF_FRAME_INTRA: usize = 0;
pub const REF_FRAME_LAST: usize = 1;
pub const REF_FRAME_GOLDEN: usize = 4;
pub const REF_FRAME_ALTREF: usize = 7;

pub const WARP_MODEL_IDENTITY: u8 = 0;
pub const WARP_MODEL_TRANSLATION: u8 = 1;
pub const WARP_MODEL_ROTZOOM: u8 = 2;
pub const WARP_MODEL_AFFINE: u8 = 3;

pub const GM_ABS_TRANS_ONLY_BITS: u32 = 9;
pub const GM_TRANS_ONLY_PREC_BITS: u32 = 3;
pub const GM_ABS_TRANS_BITS: u32 = 12;
pub const GM_TRANS_PREC_BITS: u32 = 6;
pub const GM_ABS_ALPHA_BITS: u32 = 12;

/// Per-segment feature toggle/value pair (spec section 3's "segmentation
/// feature table", 8 segments x 8 features).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SegmentationFeature {
    pub enabled: bool,
    pub value: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileInfo {
    pub uniform_tile_spacing: bool,
    pub tile_cols_log2: u32,
    pub tile_rows_log2: u32,
    pub tile_cols: u32,
    pub tile_rows: u32,
    pub width_in_sbs_minus_1: Vec<u32>,
    pub height_in_sbs_minus_1: Vec<u32>,
    pub context_update_tile_id: u32,
    pub tile_size_bytes_minus1: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuantizationParams {
    pub base_q_idx: u8,
    pub delta_q_y_dc: i32,
    pub diff_uv_delta: bool,
    pub delta_q_u_dc: i32,
    pub delta_q_u_ac: i32,
    pub delta_q_v_dc: i32,
    pub delta_q_v_ac: i32,
    pub using_qmatrix: bool,
    pub qm_y: u8,
    pub qm_u: u8,
    pub qm_v: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentationParams {
    pub enabled: bool,
    pub update_map: bool,
    pub temporal_update: bool,
    pub update_data: bool,
    pub features: Vec<[SegmentationFeature; SEG_LVL_MAX]>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeltaQParams {
    pub present: bool,
    pub res: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeltaLfParams {
    pub present: bool,
    pub res: u8,
    pub multi: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopFilterParams {
    pub level: [u8; 4],
    pub sharpness: u8,
    pub delta_enabled: bool,
    pub delta_update: bool,
    pub ref_deltas: [i32; TOTAL_REFS_PER_FRAME],
    pub mode_deltas: [i32; 2],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdefParams {
    pub damping_minus_3: u8,
    pub bits: u8,
    pub y_pri_strength: Vec<u8>,
    pub y_sec_strength: Vec<u8>,
    pub uv_pri_strength: Vec<u8>,
    pub uv_sec_strength: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LrParams {
    pub lr_type: Vec<u8>,
    pub unit_shift: u32,
    pub uv_shift: u8,
}

/// One reference frame's global motion parameters (spec section 3's
/// "global motion model table"); `gm_params` holds only the syntax
/// elements actually carried in the bitstream, not the reconstructed
/// warp matrix.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalMotionParams {
    pub gm_type: u8,
    pub params: [u32; 6],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilmGrainParams {
    pub apply_grain: bool,
    pub grain_seed: u16,
    pub update_grain: bool,
    pub film_grain_params_ref_idx: u8,
    pub num_y_points: u8,
    pub point_y_value: Vec<u8>,
    pub point_y_scaling: Vec<u8>,
    pub chroma_scaling_from_luma: bool,
    pub num_cb_points: u8,
    pub point_cb_value: Vec<u8>,
    pub point_cb_scaling: Vec<u8>,
    pub num_cr_points: u8,
    pub point_cr_value: Vec<u8>,
    pub point_cr_scaling: Vec<u8>,
    pub grain_scaling_minus_8: u8,
    pub ar_coeff_lag: u8,
    pub ar_coeffs_y_plus_128: Vec<u8>,
    pub ar_coeffs_cb_plus_128: Vec<u8>,
    pub ar_coeffs_cr_plus_128: Vec<u8>,
    pub ar_coeff_shift_minus_6: u8,
    pub grain_scale_shift: u8,
    pub cb_mult: u8,
    pub cb_luma_mult: u8,
    pub cb_offset: u16,
    pub cr_mult: u8,
    pub cr_luma_mult: u8,
    pub cr_offset: u16,
    pub overlap_flag: bool,
    pub clip_to_restricted_range: bool,
}

/// Uncompressed frame header (spec section 3, AV1 plug-in): every syntax
/// element of `uncompressed_header` needed to exactly reconstruct the bits,
/// plus the handful of frame-size/tile bookkeeping fields later OBUs and
/// `Av1State` need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    pub show_existing_frame: bool,
    pub frame_to_show_map_idx: u8,
    pub frame_presentation_time: u32,
    pub display_frame_id: u32,

    pub frame_type: FrameType,
    pub show_frame: bool,
    pub showable_frame: bool,
    pub error_resilient_mode: bool,
    pub disable_cdf_update: bool,
    pub allow_screen_content_tools: u32,
    pub force_integer_mv: u32,
    pub current_frame_id: u32,
    pub frame_size_override_flag: bool,
    pub order_hint: u32,
    pub primary_ref_frame: u32,

    pub buffer_removal_time_present_flag: bool,
    pub buffer_removal_time: Vec<u32>,

    pub refresh_frame_flags: u8,
    pub ref_order_hint: [u32; NUM_REF_FRAMES],

    pub frame_width_minus_1: u32,
    pub frame_height_minus_1: u32,
    pub render_and_frame_size_different: bool,
    pub render_width_minus_1: u32,
    pub render_height_minus_1: u32,
    pub use_superres: bool,
    pub coded_denom: u32,

    pub allow_intrabc: bool,

    pub frame_refs_short_signaling: bool,
    pub last_frame_idx: u8,
    pub golden_frame_idx: u8,
    pub ref_frame_idx: [i32; REFS_PER_FRAME],
    pub delta_frame_id_minus1: [u32; REFS_PER_FRAME],
    pub found_ref: bool,
    pub found_ref_idx: i32,

    pub allow_high_precision_mv: bool,
    pub is_filter_switchable: bool,
    pub interpolation_filter: u32,
    pub is_motion_mode_switchable: bool,
    pub use_ref_frame_mvs: bool,

    pub disable_frame_end_update_cdf: bool,

    pub tile_info: TileInfo,
    pub quantization_params: QuantizationParams,
    pub segmentation_params: SegmentationParams,
    pub delta_q_params: DeltaQParams,
    pub delta_lf_params: DeltaLfParams,
    pub loop_filter_params: LoopFilterParams,
    pub cdef_params: CdefParams,
    pub lr_params: LrParams,

    pub tx_mode_select: bool,
    pub reference_select: bool,
    pub skip_mode_present: bool,

    pub allow_warped_motion: bool,
    pub reduced_tx_set: bool,
    pub global_motion_params: [GlobalMotionParams; TOTAL_REFS_PER_FRAME],

    pub film_grain_params: FilmGrainParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileGroup {
    pub tile_start_and_end_present_flag: bool,
    pub tg_start: u32,
    pub tg_end: u32,
}

/// Per-context AV1 private state (spec section 3): the active sequence
/// header, continuity flags and the reference-frame table.
///
/// `operating_point` is the caller-set tunable selecting which layer
/// subset to decode (`-1` means "no preference, keep everything");
/// `operating_point_idc` is the resolved 12-bit mask actually used by
/// `drop_obu`, which only changes when a sequence header is parsed
/// while `operating_point >= 0`.
#[derive(Debug)]
pub struct Av1State {
    pub sequence_header: Option<SequenceHeader>,
    pub seen_frame_header: bool,
    pub operating_point: i32,
    pub operating_point_idc: u16,
    pub reference_frames: [ReferenceFrameSlot; NUM_REF_FRAMES],
    pub temporal_id: u8,
    pub spatial_id: u8,
    pub frame_width: u32,
    pub frame_height: u32,
    pub upscaled_width: u32,
    pub render_width: u32,
    pub render_height: u32,
    pub tile_cols: u32,
    pub tile_rows: u32,
    pub num_planes: u8,
    pub bit_depth: u8,
    pub coded_lossless: bool,
    pub all_lossless: bool,
}

impl Default for Av1State {
    fn default() -> Self {
        Self {
            sequence_header: None,
            seen_frame_header: false,
            operating_point: -1,
            operating_point_idc: 0,
            reference_frames: Default::default(),
            temporal_id: 0,
            spatial_id: 0,
            frame_width: 0,
            frame_height: 0,
            upscaled_width: 0,
            render_width: 0,
            render_height: 0,
            tile_cols: 0,
            tile_rows: 0,
            num_planes: 0,
            bit_depth: 0,
            coded_lossless: false,
            all_lossless: false,
        }
    }
}

impl PluginState for Av1State {
    fn flush(&mut self) {
        self.sequence_header = None;
        self.seen_frame_header = false;
        self.operating_point_idc = 0;
        self.reference_frames = Default::default();
        self.temporal_id = 0;
        self.spatial_id = 0;
        self.frame_width = 0;
        self.frame_height = 0;
        self.upscaled_width = 0;
        self.render_width = 0;
        self.render_height = 0;
        self.tile_cols = 0;
        self.tile_rows = 0;
        self.num_planes = 0;
        self.bit_depth = 0;
        self.coded_lossless = false;
        self.all_lossless = false;
    }
}

impl Av1State {
    /// Selects which operating point's `operating_point_idc` resolves on
    /// the next sequence header, mirroring a caller-set config option.
    /// `-1` (the default) keeps every layer; an index is validated
    /// against `operating_points_cnt_minus_1` when the next sequence
    /// header is parsed.
    pub fn set_operating_point(&mut self, operating_point: i32) {
        self.operating_point = operating_point;
    }

    /// Standard AV1 `drop_obu()` filter: when the context has a specific
    /// operating point selected, drop any non-sequence-header,
    /// non-temporal-delimiter OBU whose `(temporal_id, spatial_id)` is not
    /// part of the active operating point.
    pub fn drop_obu(&self, obu_type: ObuType, temporal_id: u8, spatial_id: u8) -> bool {
        if matches!(obu_type, ObuType::SequenceHeader | ObuType::TemporalDelimiter) {
            return false;
        }
        if self.operating_point_idc == 0 {
            return false;
        }
        let in_temporal_layer = (self.operating_point_idc >> temporal_id) & 1 != 0;
        let in_spatial_layer = (self.operating_point_idc >> (spatial_id + 8)) & 1 != 0;
        !(in_temporal_layer && in_spatial_layer)
    }

    /// Invalidates all reference slots, e.g. on a shown key frame.
    pub fn invalidate_all_references(&mut self) {
        self.reference_frames = Default::default();
    }

    pub fn refresh_references(&mut self, refresh_frame_flags: u8, slot: ReferenceFrameSlot) {
        for i in 0..NUM_REF_FRAMES {
            if refresh_frame_flags & (1 << i) != 0 {
                self.reference_frames[i] = slot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obu_type_numeric_values_match_spec() {
        assert_eq!(ObuType::SequenceHeader.to_u8(), 1);
        assert_eq!(ObuType::TemporalDelimiter.to_u8(), 2);
        assert_eq!(ObuType::FrameHeader.to_u8(), 3);
        assert_eq!(ObuType::TileGroup.to_u8(), 4);
        assert_eq!(ObuType::Metadata.to_u8(), 5);
        assert_eq!(ObuType::Frame.to_u8(), 6);
        assert_eq!(ObuType::RedundantFrameHeader.to_u8(), 7);
        assert_eq!(ObuType::TileList.to_u8(), 8);
        assert_eq!(ObuType::Padding.to_u8(), 15);
    }

    #[test]
    fn obu_type_round_trips_through_u8() {
        for &v in &[1u8, 2, 3, 4, 5, 6, 7, 8, 15] {
            assert_eq!(ObuType::from_u8(v).to_u8(), v);
        }
    }

    #[test]
    fn drop_obu_never_drops_sequence_header_or_td() {
        let mut state = Av1State::default();
        state.operating_point_idc = 0x0001;
        assert!(!state.drop_obu(ObuType::SequenceHeader, 5, 5));
        assert!(!state.drop_obu(ObuType::TemporalDelimiter, 5, 5));
    }

    #[test]
    fn drop_obu_passes_everything_when_idc_is_zero() {
        let state = Av1State::default();
        assert!(!state.drop_obu(ObuType::FrameHeader, 3, 2));
    }

    #[test]
    fn key_frame_invalidates_all_references() {
        let mut state = Av1State::default();
        state.reference_frames[0].valid = true;
        state.invalidate_all_references();
        assert!(state.reference_frames.iter().all(|r| !r.valid));
    }
}
