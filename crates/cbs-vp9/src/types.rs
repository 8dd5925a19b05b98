//! `VP9RawFrameHeader`/`VP9RawFrame`/`CodedBitstreamVP9Context`, ported
//! field-for-field from `cbs_vp9.h`.

use std::any::Any;

use serde::{Deserialize, Serialize};

use cbs_core::{BufferView, PluginState, UnitContent};

pub const VP9_REFS_PER_FRAME: usize = 3;
pub const VP9_MAX_REF_FRAMES: usize = 4;
pub const VP9_MAX_SEGMENTS: usize = 8;
pub const VP9_SEG_LVL_MAX: usize = 4;

pub const VP9_MIN_TILE_WIDTH_B64: u32 = 4;
pub const VP9_MAX_TILE_WIDTH_B64: u32 = 64;

pub const VP9_KEY_FRAME: u8 = 0;
pub const VP9_NON_KEY_FRAME: u8 = 1;

pub const VP9_FRAME_SYNC: [u8; 3] = [0x49, 0x83, 0x42];

pub const VP9_CS_RGB: u8 = 7;

pub const VP9_LAST_FRAME: usize = 1;

pub const VP9_MAX_FRAMES_IN_SUPERFRAME: usize = 8;
pub const VP9_SUPERFRAME_MARKER: u8 = 6;

/// Bit widths of the four segmentation feature payloads
/// (`ALT_Q`, `ALT_LF`, `REF_FRAME`, `SKIP`); `0` means the feature carries
/// no extra value beyond its enabled flag.
pub const SEGMENTATION_FEATURE_BITS: [u8; VP9_SEG_LVL_MAX] = [8, 6, 2, 0];
/// Whether each segmentation feature's value carries a sign bit.
pub const SEGMENTATION_FEATURE_SIGNED: [bool; VP9_SEG_LVL_MAX] = [true, true, false, false];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopFilterParams {
    pub level: u8,
    pub sharpness: u8,
    pub delta_enabled: bool,
    pub delta_update: bool,
    pub update_ref_delta: [bool; VP9_MAX_REF_FRAMES],
    pub ref_deltas: [i8; VP9_MAX_REF_FRAMES],
    pub update_mode_delta: [bool; 2],
    pub mode_deltas: [i8; 2],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuantizationParams {
    pub base_q_idx: u8,
    pub delta_q_y_dc: i8,
    pub delta_q_uv_dc: i8,
    pub delta_q_uv_ac: i8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentationParams {
    pub enabled: bool,
    pub update_map: bool,
    pub tree_probs: [u8; 7],
    pub temporal_update: bool,
    pub pred_prob: [u8; 3],
    pub update_data: bool,
    pub abs_or_delta_update: bool,
    pub feature_enabled: [[bool; VP9_SEG_LVL_MAX]; VP9_MAX_SEGMENTS],
    pub feature_value: [[u8; VP9_SEG_LVL_MAX]; VP9_MAX_SEGMENTS],
    pub feature_sign: [[bool; VP9_SEG_LVL_MAX]; VP9_MAX_SEGMENTS],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileInfo {
    pub cols_log2: u8,
    pub rows_log2: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    pub frame_marker: u8,
    pub profile_low_bit: u8,
    pub profile_high_bit: u8,

    pub show_existing_frame: bool,
    pub frame_to_show_map_idx: u8,

    pub frame_type: u8,
    pub show_frame: bool,
    pub error_resilient_mode: bool,

    // Color config.
    pub ten_or_twelve_bit: bool,
    pub color_space: u8,
    pub color_range: bool,
    pub subsampling_x: bool,
    pub subsampling_y: bool,

    pub refresh_frame_flags: u8,

    pub intra_only: bool,
    pub reset_frame_context: u8,

    pub ref_frame_idx: [u8; VP9_REFS_PER_FRAME],
    pub ref_frame_sign_bias: [bool; VP9_MAX_REF_FRAMES],

    pub allow_high_precision_mv: bool,

    pub refresh_frame_context: bool,
    pub frame_parallel_decoding_mode: bool,

    pub frame_context_idx: u8,

    // Frame/render size.
    pub found_ref: [bool; VP9_REFS_PER_FRAME],
    pub frame_width_minus_1: u16,
    pub frame_height_minus_1: u16,
    pub render_and_frame_size_different: bool,
    pub render_width_minus_1: u16,
    pub render_height_minus_1: u16,

    pub is_filter_switchable: bool,
    pub raw_interpolation_filter_type: u8,

    pub loop_filter: LoopFilterParams,
    pub quantization: QuantizationParams,
    pub segmentation: SegmentationParams,
    pub tile_info: TileInfo,

    pub header_size_in_bytes: u16,
}

impl FrameHeader {
    pub fn profile(&self) -> u8 {
        (self.profile_high_bit << 1) + self.profile_low_bit
    }

    pub fn is_key_frame(&self) -> bool {
        self.frame_type == VP9_KEY_FRAME
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    pub header: FrameHeader,
    #[serde(skip)]
    pub payload: Option<BufferView>,
}

impl UnitContent for Frame {
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

/// Per-fragment decode state, ported from `CodedBitstreamVP9Context`.
/// `mi_cols`/`mi_rows`/`sb64_cols`/`sb64_rows` are the only context fields
/// the reference syntax actually reads or writes (`tile_info` derives its
/// allowed `tile_cols_log2` range from `sb64_cols`); its `profile`,
/// `frame_width`, `frame_height`, `subsampling_x`/`_y`, `bit_depth` and
/// per-reference-frame state fields are declared in
/// `CodedBitstreamVP9Context` but never assigned anywhere in
/// `cbs_vp9_syntax_template.c`, so there is nothing to port them from. The
/// original also carries an `AVBufferRef`-backed write scratch buffer for
/// its preallocate-and-retry write path; `BitWriter` grows its `Vec<u8>` on
/// demand, so there is nothing to mirror there either.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp9State {
    pub mi_cols: u32,
    pub mi_rows: u32,
    pub sb64_cols: u32,
    pub sb64_rows: u32,
}

impl PluginState for Vp9State {
    fn flush(&mut self) {}
}
