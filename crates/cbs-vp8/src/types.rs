//! `VP8RawFrameHeader`/`VP8RawFrame`, ported field-for-field from
//! `cbs_vp8.h`.

use std::any::Any;

use serde::{Deserialize, Serialize};

use cbs_core::{BufferView, PluginState, UnitContent};

pub const VP8_START_CODE: [u8; 3] = [0x9D, 0x01, 0x2A];

pub const VP8_KEY_FRAME: u8 = 0;
pub const VP8_NON_KEY_FRAME: u8 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    // Frame tag (uncompressed header).
    pub frame_type: u8,
    pub profile: u8,
    pub show_frame: bool,
    pub first_partition_length_in_bytes: u32,

    pub width: u16,
    pub horizontal_scale: u8,
    pub height: u16,
    pub vertical_scale: u8,

    // Compressed header.
    pub color_space: u8,
    pub clamping_type: u8,

    pub segmentation_enable: bool,
    pub update_segment_map: bool,
    pub update_segment_feature_data: bool,
    pub segment_feature_mode: u8,
    pub segment_qp_update: [bool; 4],
    pub segment_qp: [i8; 4],
    pub segment_loop_filter_level_update: [bool; 4],
    pub segment_loop_filter_level: [i8; 4],
    pub segment_probs_update: [bool; 3],
    pub segment_probs: [u8; 3],

    pub loop_filter_type: u8,
    pub loop_filter_level: u8,
    pub loop_filter_sharpness: u8,
    pub mode_ref_lf_delta_enable: bool,
    pub mode_ref_lf_delta_update: bool,
    pub ref_lf_deltas_update: [bool; 4],
    pub ref_lf_deltas: [i8; 4],
    pub mode_lf_deltas_update: [bool; 4],
    pub mode_lf_deltas: [i8; 4],

    pub log2_token_partitions: u8,

    pub base_qindex: u8,
    pub y1dc_delta_q_present: bool,
    pub y1dc_delta_q: i8,
    pub y2dc_delta_q_present: bool,
    pub y2dc_delta_q: i8,
    pub y2ac_delta_q_present: bool,
    pub y2ac_delta_q: i8,
    pub uvdc_delta_q_present: bool,
    pub uvdc_delta_q: i8,
    pub uvac_delta_q_present: bool,
    pub uvac_delta_q: i8,

    pub refresh_golden_frame: bool,
    pub refresh_alternate_frame: bool,
    pub copy_buffer_to_golden: u8,
    pub copy_buffer_to_alternate: u8,
    pub ref_frame_sign_bias_golden: bool,
    pub ref_frame_sign_bias_alternate: bool,
    pub refresh_last_frame: bool,

    pub refresh_entropy_probs: bool,

    pub coeff_prob_update: [[[[bool; 11]; 3]; 8]; 4],
    pub coeff_prob: [[[[u8; 11]; 3]; 8]; 4],

    pub mb_no_skip_coeff: bool,
    pub prob_skip_false: u8,

    pub prob_intra: u8,
    pub prob_last: u8,
    pub prob_golden: u8,

    pub intra_16x16_prob_update: bool,
    pub intra_16x16_prob: [u8; 4],

    pub intra_chroma_prob_update: bool,
    pub intra_chroma_prob: [u8; 3],

    pub mv_prob_update: [[bool; 19]; 2],
    pub mv_prob: [[u8; 19]; 2],
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

#[derive(Debug, Default)]
pub struct Vp8State;

impl PluginState for Vp8State {
    fn flush(&mut self) {}
}
