//! Frame header, tile group and combined frame OBU syntax, ported
//! field-for-field from `uncompressed_header` / `frame_header_obu` /
//! `tile_group_obu` / `frame_obu` and their helpers in
//! `examples/original_source/libavcodec/cbs_av1_syntax_template.c`.
//!
//! The "Frame" OBU interleaves a frame header and a tile group in one
//! payload with no byte-aligned marker between them, so the full
//! coding-tool parameter tree (tile info through film grain) has to be
//! parsed bit-exactly to find where the header ends, not just
//! summarized down to an opaque tail.

use cbs_core::{CbsError, Result};

use crate::codings::{rw_delta_q, rw_su, rw_trailing_bits, Av1BitIo};
use crate::syntax::sequence_header::{infer_bool, infer_i32, infer_u32};
use crate::types::{
    Av1State, FrameHeader, FrameType, ReferenceFrameSlot, SegmentationFeature, SequenceHeader,
    TileGroup, GM_ABS_ALPHA_BITS, GM_ABS_TRANS_BITS, GM_ABS_TRANS_ONLY_BITS, GM_TRANS_ONLY_PREC_BITS,
    GM_TRANS_PREC_BITS, INTERPOLATION_FILTER_SWITCHABLE, MAX_SEGMENTS, MAX_TILE_AREA, MAX_TILE_COLS,
    MAX_TILE_ROWS, MAX_TILE_WIDTH, NUM_REF_FRAMES, PRIMARY_REF_NONE, REFS_PER_FRAME, REF_FRAME_ALTREF,
    REF_FRAME_GOLDEN, REF_FRAME_INTRA, REF_FRAME_LAST, SEG_LVL_ALT_Q, SEG_LVL_MAX,
    SELECT_INTEGER_MV, SELECT_SCREEN_CONTENT_TOOLS, SUPERRES_DENOM_MIN, SUPERRES_NUM,
    TOTAL_REFS_PER_FRAME, WARP_MODEL_AFFINE, WARP_MODEL_IDENTITY, WARP_MODEL_ROTZOOM,
    WARP_MODEL_TRANSLATION,
};

fn tile_log2(blk_size: u32, target: u32) -> u32 {
    let mut k = 0;
    while (blk_size << k) < target {
        k += 1;
    }
    k
}

fn get_relative_dist(seq: &SequenceHeader, a: u32, b: u32) -> i32 {
    if !seq.enable_order_hint {
        return 0;
    }
    let diff = a.wrapping_sub(b);
    let m = 1u32 << seq.order_hint_bits_minus_1;
    let diff = (diff & (m - 1)).wrapping_sub(diff & m);
    diff as i32
}

fn rw_superres_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &mut Av1State) -> Result<()> {
    if seq.enable_superres {
        io.rw_bit("use_superres", &mut current.use_superres)?;
    } else {
        infer_bool(IO::IS_READING, &mut current.use_superres, false, "use_superres")?;
    }

    let denom = if current.use_superres {
        let mut v = current.coded_denom;
        io.rw_bits("coded_denom", 3, 0, 7, &mut v)?;
        current.coded_denom = v;
        v + SUPERRES_DENOM_MIN
    } else {
        SUPERRES_NUM
    };

    state.upscaled_width = state.frame_width;
    state.frame_width = (state.upscaled_width * SUPERRES_NUM + denom / 2) / denom;
    Ok(())
}

fn rw_frame_size<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &mut Av1State) -> Result<()> {
    if current.frame_size_override_flag {
        io.rw_bits("frame_width_minus_1", seq.frame_width_bits, 0, u32::MAX, &mut current.frame_width_minus_1)?;
        io.rw_bits("frame_height_minus_1", seq.frame_height_bits, 0, u32::MAX, &mut current.frame_height_minus_1)?;
        state.frame_width = current.frame_width_minus_1 + 1;
        state.frame_height = current.frame_height_minus_1 + 1;
    } else {
        state.frame_width = seq.max_frame_width;
        state.frame_height = seq.max_frame_height;
    }
    rw_superres_params(io, current, seq, state)
}

fn rw_render_size<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, state: &mut Av1State) -> Result<()> {
    io.rw_bit("render_and_frame_size_different", &mut current.render_and_frame_size_different)?;
    if current.render_and_frame_size_different {
        io.rw_bits("render_width_minus_1", 16, 0, 0xFFFF, &mut current.render_width_minus_1)?;
        io.rw_bits("render_height_minus_1", 16, 0, 0xFFFF, &mut current.render_height_minus_1)?;
        state.render_width = current.render_width_minus_1 + 1;
        state.render_height = current.render_height_minus_1 + 1;
    } else {
        state.render_width = state.upscaled_width;
        state.render_height = state.frame_height;
    }
    Ok(())
}

fn rw_frame_size_with_refs<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &mut Av1State) -> Result<()> {
    let written_found_ref = current.found_ref;
    let written_found_ref_idx = current.found_ref_idx;
    current.found_ref = false;
    current.found_ref_idx = -1;
    for i in 0..REFS_PER_FRAME {
        let mut found = if IO::IS_READING { false } else { written_found_ref && written_found_ref_idx == i as i32 };
        io.rw_bit("found_ref", &mut found)?;
        if found {
            current.found_ref = true;
            current.found_ref_idx = i as i32;
            let idx = current.ref_frame_idx[i].clamp(0, NUM_REF_FRAMES as i32 - 1) as usize;
            let reference = state.reference_frames[idx];
            if !reference.valid {
                return Err(CbsError::invalid_data(
                    "frame_size_with_refs",
                    format!("missing reference frame needed for frame size (ref = {i}, ref_frame_idx = {idx})"),
                ));
            }
            state.upscaled_width = reference.upscaled_width;
            state.frame_width = reference.frame_width;
            state.frame_height = reference.frame_height;
            state.render_width = reference.render_width;
            state.render_height = reference.render_height;
            break;
        }
    }

    if !current.found_ref {
        rw_frame_size(io, current, seq, state)?;
        rw_render_size(io, current, state)?;
    } else {
        rw_superres_params(io, current, seq, state)?;
    }
    Ok(())
}

fn rw_interpolation_filter<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    io.rw_bit("is_filter_switchable", &mut current.is_filter_switchable)?;
    if current.is_filter_switchable {
        infer_u32(IO::IS_READING, &mut current.interpolation_filter, INTERPOLATION_FILTER_SWITCHABLE, "interpolation_filter")?;
    } else {
        io.rw_bits("interpolation_filter", 2, 0, 3, &mut current.interpolation_filter)?;
    }
    Ok(())
}

fn rw_tile_info<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &mut Av1State) -> Result<()> {
    let mi_cols = 2 * ((state.frame_width + 7) >> 3);
    let mi_rows = 2 * ((state.frame_height + 7) >> 3);

    let (sb_cols, sb_rows, sb_shift) = if seq.use_128x128_superblock {
        ((mi_cols + 31) >> 5, (mi_rows + 31) >> 5, 5)
    } else {
        ((mi_cols + 15) >> 4, (mi_rows + 15) >> 4, 4)
    };
    let sb_size = sb_shift + 2;

    let max_tile_width_sb = MAX_TILE_WIDTH >> sb_size;
    let mut max_tile_area_sb = MAX_TILE_AREA >> (2 * sb_size);

    let min_log2_tile_cols = tile_log2(max_tile_width_sb, sb_cols);
    let max_log2_tile_cols = tile_log2(1, sb_cols.min(MAX_TILE_COLS));
    let max_log2_tile_rows = tile_log2(1, sb_rows.min(MAX_TILE_ROWS));
    let min_log2_tiles = min_log2_tile_cols.max(tile_log2(max_tile_area_sb, sb_rows * sb_cols));

    let t = &mut current.tile_info;
    io.rw_bit("uniform_tile_spacing_flag", &mut t.uniform_tile_spacing)?;

    if t.uniform_tile_spacing {
        io.rw_increment("tile_cols_log2", min_log2_tile_cols, max_log2_tile_cols, &mut t.tile_cols_log2)?;

        let tile_width_sb = (sb_cols + (1 << t.tile_cols_log2) - 1) >> t.tile_cols_log2;
        t.tile_cols = (sb_cols + tile_width_sb - 1) / tile_width_sb;

        let min_log2_tile_rows = min_log2_tiles.saturating_sub(t.tile_cols_log2);
        io.rw_increment("tile_rows_log2", min_log2_tile_rows, max_log2_tile_rows, &mut t.tile_rows_log2)?;

        let tile_height_sb = (sb_rows + (1 << t.tile_rows_log2) - 1) >> t.tile_rows_log2;
        t.tile_rows = (sb_rows + tile_height_sb - 1) / tile_height_sb;
    } else {
        let mut widest_tile_sb = 0u32;
        let mut start_sb = 0u32;
        let mut i = 0u32;
        while start_sb < sb_cols && i < MAX_TILE_COLS {
            let max_width = (sb_cols - start_sb).min(max_tile_width_sb);
            if IO::IS_READING && i as usize == t.width_in_sbs_minus_1.len() {
                t.width_in_sbs_minus_1.push(0);
            }
            io.rw_ns("width_in_sbs_minus_1[i]", max_width, &mut t.width_in_sbs_minus_1[i as usize])?;
            let size_sb = t.width_in_sbs_minus_1[i as usize] + 1;
            widest_tile_sb = widest_tile_sb.max(size_sb);
            start_sb += size_sb;
            i += 1;
        }
        t.width_in_sbs_minus_1.truncate(i as usize);
        t.tile_cols_log2 = tile_log2(1, i);
        t.tile_cols = i;

        if min_log2_tiles > 0 {
            max_tile_area_sb = (sb_rows * sb_cols) >> (min_log2_tiles + 1);
        } else {
            max_tile_area_sb = sb_rows * sb_cols;
        }
        let max_tile_height_sb = (max_tile_area_sb / widest_tile_sb.max(1)).max(1);

        let mut start_sb = 0u32;
        let mut i = 0u32;
        while start_sb < sb_rows && i < MAX_TILE_ROWS {
            let max_height = (sb_rows - start_sb).min(max_tile_height_sb);
            if IO::IS_READING && i as usize == t.height_in_sbs_minus_1.len() {
                t.height_in_sbs_minus_1.push(0);
            }
            io.rw_ns("height_in_sbs_minus_1[i]", max_height, &mut t.height_in_sbs_minus_1[i as usize])?;
            let size_sb = t.height_in_sbs_minus_1[i as usize] + 1;
            start_sb += size_sb;
            i += 1;
        }
        t.height_in_sbs_minus_1.truncate(i as usize);
        t.tile_rows_log2 = tile_log2(1, i);
        t.tile_rows = i;
    }

    if t.tile_cols_log2 > 0 || t.tile_rows_log2 > 0 {
        let bits = (t.tile_cols_log2 + t.tile_rows_log2) as u8;
        io.rw_bits("context_update_tile_id", bits, 0, u32::MAX, &mut t.context_update_tile_id)?;
        let mut v = t.tile_size_bytes_minus1 as u32;
        io.rw_bits("tile_size_bytes_minus1", 2, 0, 3, &mut v)?;
        t.tile_size_bytes_minus1 = v as u8;
    } else {
        infer_u32(IO::IS_READING, &mut t.context_update_tile_id, 0, "context_update_tile_id")?;
    }

    state.tile_cols = t.tile_cols;
    state.tile_rows = t.tile_rows;
    Ok(())
}

fn rw_quantization_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &Av1State) -> Result<()> {
    let q = &mut current.quantization_params;
    let mut v = q.base_q_idx as u32;
    io.rw_bits("base_q_idx", 8, 0, 255, &mut v)?;
    q.base_q_idx = v as u8;

    rw_delta_q(io, "delta_q_y_dc", &mut q.delta_q_y_dc)?;

    if state.num_planes > 1 {
        if seq.color_config.separate_uv_delta_q {
            io.rw_bit("diff_uv_delta", &mut q.diff_uv_delta)?;
        } else {
            infer_bool(IO::IS_READING, &mut q.diff_uv_delta, false, "diff_uv_delta")?;
        }

        rw_delta_q(io, "delta_q_u_dc", &mut q.delta_q_u_dc)?;
        rw_delta_q(io, "delta_q_u_ac", &mut q.delta_q_u_ac)?;

        if q.diff_uv_delta {
            rw_delta_q(io, "delta_q_v_dc", &mut q.delta_q_v_dc)?;
            rw_delta_q(io, "delta_q_v_ac", &mut q.delta_q_v_ac)?;
        } else {
            infer_i32(IO::IS_READING, &mut q.delta_q_v_dc, q.delta_q_u_dc, "delta_q_v_dc")?;
            infer_i32(IO::IS_READING, &mut q.delta_q_v_ac, q.delta_q_u_ac, "delta_q_v_ac")?;
        }
    } else {
        infer_i32(IO::IS_READING, &mut q.delta_q_u_dc, 0, "delta_q_u_dc")?;
        infer_i32(IO::IS_READING, &mut q.delta_q_u_ac, 0, "delta_q_u_ac")?;
        infer_i32(IO::IS_READING, &mut q.delta_q_v_dc, 0, "delta_q_v_dc")?;
        infer_i32(IO::IS_READING, &mut q.delta_q_v_ac, 0, "delta_q_v_ac")?;
    }

    io.rw_bit("using_qmatrix", &mut q.using_qmatrix)?;
    if q.using_qmatrix {
        let mut v = q.qm_y as u32;
        io.rw_bits("qm_y", 4, 0, 15, &mut v)?;
        q.qm_y = v as u8;
        let mut v = q.qm_u as u32;
        io.rw_bits("qm_u", 4, 0, 15, &mut v)?;
        q.qm_u = v as u8;
        if seq.color_config.separate_uv_delta_q {
            let mut v = q.qm_v as u32;
            io.rw_bits("qm_v", 4, 0, 15, &mut v)?;
            q.qm_v = v as u8;
        } else {
            q.qm_v = q.qm_u;
        }
    }
    Ok(())
}

const SEG_FEATURE_BITS: [u8; SEG_LVL_MAX] = [8, 6, 6, 6, 6, 3, 0, 0];
const SEG_FEATURE_SIGNED: [bool; SEG_LVL_MAX] = [true, true, true, true, true, false, false, false];

fn rw_segmentation_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    let s = &mut current.segmentation_params;
    if s.features.is_empty() {
        s.features = vec![[SegmentationFeature::default(); SEG_LVL_MAX]; MAX_SEGMENTS];
    }

    io.rw_bit("segmentation_enabled", &mut s.enabled)?;

    if s.enabled {
        if current.primary_ref_frame == PRIMARY_REF_NONE {
            infer_bool(IO::IS_READING, &mut s.update_map, true, "segmentation_update_map")?;
            infer_bool(IO::IS_READING, &mut s.temporal_update, false, "segmentation_temporal_update")?;
            infer_bool(IO::IS_READING, &mut s.update_data, true, "segmentation_update_data")?;
        } else {
            io.rw_bit("segmentation_update_map", &mut s.update_map)?;
            if s.update_map {
                io.rw_bit("segmentation_temporal_update", &mut s.temporal_update)?;
            } else {
                infer_bool(IO::IS_READING, &mut s.temporal_update, false, "segmentation_temporal_update")?;
            }
            io.rw_bit("segmentation_update_data", &mut s.update_data)?;
        }

        if s.update_data {
            for i in 0..MAX_SEGMENTS {
                for j in 0..SEG_LVL_MAX {
                    io.rw_bit("feature_enabled[i][j]", &mut s.features[i][j].enabled)?;
                    if s.features[i][j].enabled && SEG_FEATURE_BITS[j] > 0 {
                        if SEG_FEATURE_SIGNED[j] {
                            rw_su(io, "feature_value[i][j]", 1 + SEG_FEATURE_BITS[j], &mut s.features[i][j].value)?;
                        } else {
                            let mut v = s.features[i][j].value as u32;
                            io.rw_bits("feature_value[i][j]", SEG_FEATURE_BITS[j], 0, (1 << SEG_FEATURE_BITS[j]) - 1, &mut v)?;
                            s.features[i][j].value = v as i32;
                        }
                    } else {
                        infer_i32(IO::IS_READING, &mut s.features[i][j].value, 0, "feature_value[i][j]")?;
                    }
                }
            }
        }
    } else {
        for i in 0..MAX_SEGMENTS {
            for j in 0..SEG_LVL_MAX {
                infer_bool(IO::IS_READING, &mut s.features[i][j].enabled, false, "feature_enabled[i][j]")?;
                infer_i32(IO::IS_READING, &mut s.features[i][j].value, 0, "feature_value[i][j]")?;
            }
        }
    }
    Ok(())
}

fn rw_delta_q_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    let base_q_idx = current.quantization_params.base_q_idx;
    let d = &mut current.delta_q_params;
    if base_q_idx > 0 {
        io.rw_bit("delta_q_present", &mut d.present)?;
    } else {
        infer_bool(IO::IS_READING, &mut d.present, false, "delta_q_present")?;
    }
    if d.present {
        let mut v = d.res as u32;
        io.rw_bits("delta_q_res", 2, 0, 3, &mut v)?;
        d.res = v as u8;
    }
    Ok(())
}

fn rw_delta_lf_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    let delta_q_present = current.delta_q_params.present;
    let allow_intrabc = current.allow_intrabc;
    let d = &mut current.delta_lf_params;
    if delta_q_present {
        if !allow_intrabc {
            io.rw_bit("delta_lf_present", &mut d.present)?;
        } else {
            infer_bool(IO::IS_READING, &mut d.present, false, "delta_lf_present")?;
        }
        if d.present {
            let mut v = d.res as u32;
            io.rw_bits("delta_lf_res", 2, 0, 3, &mut v)?;
            d.res = v as u8;
            io.rw_bit("delta_lf_multi", &mut d.multi)?;
        } else {
            d.res = 0;
            d.multi = false;
        }
    } else {
        d.present = false;
        d.res = 0;
        d.multi = false;
    }
    Ok(())
}

fn rw_loop_filter_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, state: &Av1State) -> Result<()> {
    let l = &mut current.loop_filter_params;

    if state.coded_lossless || current.allow_intrabc {
        l.level = [0, 0, 0, 0];
        l.ref_deltas = [0; TOTAL_REFS_PER_FRAME];
        l.ref_deltas[REF_FRAME_INTRA] = 1;
        l.ref_deltas[REF_FRAME_GOLDEN] = -1;
        l.ref_deltas[REF_FRAME_ALTREF] = -1;
        l.ref_deltas[6] = -1; // AV1_REF_FRAME_ALTREF2
        l.mode_deltas = [0, 0];
        return Ok(());
    }

    let mut v = l.level[0] as u32;
    io.rw_bits("loop_filter_level[0]", 6, 0, 63, &mut v)?;
    l.level[0] = v as u8;
    let mut v = l.level[1] as u32;
    io.rw_bits("loop_filter_level[1]", 6, 0, 63, &mut v)?;
    l.level[1] = v as u8;

    if state.num_planes > 1 && (l.level[0] != 0 || l.level[1] != 0) {
        let mut v = l.level[2] as u32;
        io.rw_bits("loop_filter_level[2]", 6, 0, 63, &mut v)?;
        l.level[2] = v as u8;
        let mut v = l.level[3] as u32;
        io.rw_bits("loop_filter_level[3]", 6, 0, 63, &mut v)?;
        l.level[3] = v as u8;
    }

    let mut v = l.sharpness as u32;
    io.rw_bits("loop_filter_sharpness", 3, 0, 7, &mut v)?;
    l.sharpness = v as u8;

    io.rw_bit("loop_filter_delta_enabled", &mut l.delta_enabled)?;
    if l.delta_enabled {
        io.rw_bit("loop_filter_delta_update", &mut l.delta_update)?;
        if l.delta_update {
            for i in 0..TOTAL_REFS_PER_FRAME {
                let mut update = false;
                io.rw_bit("update_ref_delta[i]", &mut update)?;
                if update {
                    rw_su(io, "loop_filter_ref_deltas[i]", 7, &mut l.ref_deltas[i])?;
                }
            }
            for i in 0..2 {
                let mut update = false;
                io.rw_bit("update_mode_delta[i]", &mut update)?;
                if update {
                    rw_su(io, "loop_filter_mode_deltas[i]", 7, &mut l.mode_deltas[i])?;
                }
            }
        }
    }
    Ok(())
}

fn rw_cdef_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &Av1State) -> Result<()> {
    let c = &mut current.cdef_params;

    if state.coded_lossless || current.allow_intrabc || !seq.enable_cdef {
        c.damping_minus_3 = 0;
        c.bits = 0;
        c.y_pri_strength = vec![0];
        c.y_sec_strength = vec![0];
        c.uv_pri_strength = vec![0];
        c.uv_sec_strength = vec![0];
        return Ok(());
    }

    let mut v = c.damping_minus_3 as u32;
    io.rw_bits("cdef_damping_minus_3", 2, 0, 3, &mut v)?;
    c.damping_minus_3 = v as u8;
    let mut v = c.bits as u32;
    io.rw_bits("cdef_bits", 2, 0, 3, &mut v)?;
    c.bits = v as u8;

    let count = 1usize << c.bits;
    if IO::IS_READING {
        c.y_pri_strength = vec![0; count];
        c.y_sec_strength = vec![0; count];
        c.uv_pri_strength = vec![0; count];
        c.uv_sec_strength = vec![0; count];
    }
    for i in 0..count {
        let mut v = c.y_pri_strength[i] as u32;
        io.rw_bits("cdef_y_pri_strength[i]", 4, 0, 15, &mut v)?;
        c.y_pri_strength[i] = v as u8;
        let mut v = c.y_sec_strength[i] as u32;
        io.rw_bits("cdef_y_sec_strength[i]", 2, 0, 3, &mut v)?;
        c.y_sec_strength[i] = v as u8;

        if state.num_planes > 1 {
            let mut v = c.uv_pri_strength[i] as u32;
            io.rw_bits("cdef_uv_pri_strength[i]", 4, 0, 15, &mut v)?;
            c.uv_pri_strength[i] = v as u8;
            let mut v = c.uv_sec_strength[i] as u32;
            io.rw_bits("cdef_uv_sec_strength[i]", 2, 0, 3, &mut v)?;
            c.uv_sec_strength[i] = v as u8;
        }
    }
    Ok(())
}

fn rw_lr_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &Av1State) -> Result<()> {
    if state.all_lossless || current.allow_intrabc || !seq.enable_restoration {
        return Ok(());
    }

    let l = &mut current.lr_params;
    if IO::IS_READING {
        l.lr_type = vec![0; state.num_planes as usize];
    }

    let mut uses_lr = false;
    let mut uses_chroma_lr = false;
    for i in 0..state.num_planes as usize {
        let mut v = l.lr_type[i] as u32;
        io.rw_bits("lr_type[i]", 2, 0, 3, &mut v)?;
        l.lr_type[i] = v as u8;
        if l.lr_type[i] != 0 {
            uses_lr = true;
            if i > 0 {
                uses_chroma_lr = true;
            }
        }
    }

    if uses_lr {
        if seq.use_128x128_superblock {
            io.rw_increment("lr_unit_shift", 1, 2, &mut l.unit_shift)?;
        } else {
            io.rw_increment("lr_unit_shift", 0, 2, &mut l.unit_shift)?;
        }

        if seq.color_config.subsampling_x && seq.color_config.subsampling_y && uses_chroma_lr {
            let mut v = l.uv_shift as u32;
            io.rw_bits("lr_uv_shift", 1, 0, 1, &mut v)?;
            l.uv_shift = v as u8;
        } else {
            l.uv_shift = 0;
        }
    }
    Ok(())
}

fn rw_read_tx_mode<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, state: &Av1State) -> Result<()> {
    if state.coded_lossless {
        infer_bool(IO::IS_READING, &mut current.tx_mode_select, false, "tx_mode_select")?;
    } else {
        io.rw_bit("tx_mode_select", &mut current.tx_mode_select)?;
    }
    Ok(())
}

fn rw_frame_reference_mode<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    if matches!(current.frame_type, FrameType::IntraOnly | FrameType::Key) {
        infer_bool(IO::IS_READING, &mut current.reference_select, false, "reference_select")?;
    } else {
        io.rw_bit("reference_select", &mut current.reference_select)?;
    }
    Ok(())
}

fn rw_skip_mode_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &Av1State) -> Result<()> {
    let skip_mode_allowed = if matches!(current.frame_type, FrameType::Key | FrameType::IntraOnly)
        || !current.reference_select
        || !seq.enable_order_hint
    {
        false
    } else {
        let mut forward_idx: i32 = -1;
        let mut forward_hint = 0u32;
        let mut backward_idx: i32 = -1;
        let mut backward_hint = 0u32;

        for i in 0..REFS_PER_FRAME {
            let slot = current.ref_frame_idx[i].clamp(0, NUM_REF_FRAMES as i32 - 1) as usize;
            let ref_hint = state.reference_frames[slot].order_hint;
            let dist = get_relative_dist(seq, ref_hint, current.order_hint);
            if dist < 0 {
                if forward_idx < 0 || get_relative_dist(seq, ref_hint, forward_hint) > 0 {
                    forward_idx = i as i32;
                    forward_hint = ref_hint;
                }
            } else if dist > 0 && (backward_idx < 0 || get_relative_dist(seq, ref_hint, backward_hint) < 0) {
                backward_idx = i as i32;
                backward_hint = ref_hint;
            }
        }

        if forward_idx < 0 {
            false
        } else if backward_idx >= 0 {
            true
        } else {
            let mut second_forward_idx: i32 = -1;
            let mut second_forward_hint = 0u32;
            for i in 0..REFS_PER_FRAME {
                let slot = current.ref_frame_idx[i].clamp(0, NUM_REF_FRAMES as i32 - 1) as usize;
                let ref_hint = state.reference_frames[slot].order_hint;
                if get_relative_dist(seq, ref_hint, forward_hint) < 0
                    && (second_forward_idx < 0 || get_relative_dist(seq, ref_hint, second_forward_hint) > 0)
                {
                    second_forward_idx = i as i32;
                    second_forward_hint = ref_hint;
                }
            }
            second_forward_idx >= 0
        }
    };

    if skip_mode_allowed {
        io.rw_bit("skip_mode_present", &mut current.skip_mode_present)?;
    } else {
        infer_bool(IO::IS_READING, &mut current.skip_mode_present, false, "skip_mode_present")?;
    }
    Ok(())
}

fn rw_global_motion_param<IO: Av1BitIo>(
    io: &mut IO,
    current: &mut FrameHeader,
    gm_type: u8,
    ref_idx: usize,
    idx: usize,
    allow_high_precision_mv: bool,
) -> Result<()> {
    let abs_bits = if idx < 2 {
        if gm_type == WARP_MODEL_TRANSLATION {
            GM_ABS_TRANS_ONLY_BITS - !allow_high_precision_mv as u32
        } else {
            GM_ABS_TRANS_BITS
        }
    } else {
        GM_ABS_ALPHA_BITS
    };
    let _prec_bits = if idx < 2 {
        if gm_type == WARP_MODEL_TRANSLATION {
            GM_TRANS_ONLY_PREC_BITS - !allow_high_precision_mv as u32
        } else {
            GM_TRANS_PREC_BITS
        }
    } else {
        0
    };

    let num_syms = 2 * (1 << abs_bits) + 1;
    io.rw_subexp("gm_params[ref][idx]", num_syms, &mut current.global_motion_params[ref_idx].params[idx])?;
    Ok(())
}

fn rw_global_motion_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader) -> Result<()> {
    if matches!(current.frame_type, FrameType::Key | FrameType::IntraOnly) {
        return Ok(());
    }

    let allow_high_precision_mv = current.allow_high_precision_mv;

    for ref_idx in REF_FRAME_LAST..=REF_FRAME_ALTREF {
        let mut is_global = current.global_motion_params[ref_idx].gm_type != WARP_MODEL_IDENTITY;
        io.rw_bit("is_global[ref]", &mut is_global)?;

        let gm_type = if is_global {
            let mut is_rot_zoom = current.global_motion_params[ref_idx].gm_type == WARP_MODEL_ROTZOOM;
            io.rw_bit("is_rot_zoom[ref]", &mut is_rot_zoom)?;
            if is_rot_zoom {
                WARP_MODEL_ROTZOOM
            } else {
                let mut is_translation = current.global_motion_params[ref_idx].gm_type == WARP_MODEL_TRANSLATION;
                io.rw_bit("is_translation[ref]", &mut is_translation)?;
                if is_translation {
                    WARP_MODEL_TRANSLATION
                } else {
                    WARP_MODEL_AFFINE
                }
            }
        } else {
            WARP_MODEL_IDENTITY
        };
        current.global_motion_params[ref_idx].gm_type = gm_type;

        if gm_type >= WARP_MODEL_ROTZOOM {
            rw_global_motion_param(io, current, gm_type, ref_idx, 2, allow_high_precision_mv)?;
            rw_global_motion_param(io, current, gm_type, ref_idx, 3, allow_high_precision_mv)?;
            if gm_type == WARP_MODEL_AFFINE {
                rw_global_motion_param(io, current, gm_type, ref_idx, 4, allow_high_precision_mv)?;
                rw_global_motion_param(io, current, gm_type, ref_idx, 5, allow_high_precision_mv)?;
            }
        }
        if gm_type >= WARP_MODEL_TRANSLATION {
            rw_global_motion_param(io, current, gm_type, ref_idx, 0, allow_high_precision_mv)?;
            rw_global_motion_param(io, current, gm_type, ref_idx, 1, allow_high_precision_mv)?;
        }
    }
    Ok(())
}

fn rw_film_grain_params<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader) -> Result<()> {
    if !seq.film_grain_params_present || (!current.show_frame && !current.showable_frame) {
        return Ok(());
    }

    let g = &mut current.film_grain_params;
    io.rw_bit("apply_grain", &mut g.apply_grain)?;
    if !g.apply_grain {
        return Ok(());
    }

    let mut v = g.grain_seed as u32;
    io.rw_bits("grain_seed", 16, 0, 0xFFFF, &mut v)?;
    g.grain_seed = v as u16;

    if current.frame_type == FrameType::Inter {
        io.rw_bit("update_grain", &mut g.update_grain)?;
    } else {
        infer_bool(IO::IS_READING, &mut g.update_grain, true, "update_grain")?;
    }

    if !g.update_grain {
        let mut v = g.film_grain_params_ref_idx as u32;
        io.rw_bits("film_grain_params_ref_idx", 3, 0, 7, &mut v)?;
        g.film_grain_params_ref_idx = v as u8;
        return Ok(());
    }

    let mut v = g.num_y_points as u32;
    io.rw_bits("num_y_points", 4, 0, 14, &mut v)?;
    g.num_y_points = v as u8;
    if IO::IS_READING {
        g.point_y_value = vec![0; g.num_y_points as usize];
        g.point_y_scaling = vec![0; g.num_y_points as usize];
    }
    for i in 0..g.num_y_points as usize {
        let mut v = g.point_y_value[i] as u32;
        io.rw_bits("point_y_value[i]", 8, 0, 255, &mut v)?;
        g.point_y_value[i] = v as u8;
        let mut v = g.point_y_scaling[i] as u32;
        io.rw_bits("point_y_scaling[i]", 8, 0, 255, &mut v)?;
        g.point_y_scaling[i] = v as u8;
    }

    if seq.color_config.mono_chrome {
        infer_bool(IO::IS_READING, &mut g.chroma_scaling_from_luma, false, "chroma_scaling_from_luma")?;
    } else {
        io.rw_bit("chroma_scaling_from_luma", &mut g.chroma_scaling_from_luma)?;
    }

    if seq.color_config.mono_chrome
        || g.chroma_scaling_from_luma
        || (seq.color_config.subsampling_x && seq.color_config.subsampling_y && g.num_y_points == 0)
    {
        g.num_cb_points = 0;
        g.num_cr_points = 0;
    } else {
        let mut v = g.num_cb_points as u32;
        io.rw_bits("num_cb_points", 4, 0, 10, &mut v)?;
        g.num_cb_points = v as u8;
        if IO::IS_READING {
            g.point_cb_value = vec![0; g.num_cb_points as usize];
            g.point_cb_scaling = vec![0; g.num_cb_points as usize];
        }
        for i in 0..g.num_cb_points as usize {
            let mut v = g.point_cb_value[i] as u32;
            io.rw_bits("point_cb_value[i]", 8, 0, 255, &mut v)?;
            g.point_cb_value[i] = v as u8;
            let mut v = g.point_cb_scaling[i] as u32;
            io.rw_bits("point_cb_scaling[i]", 8, 0, 255, &mut v)?;
            g.point_cb_scaling[i] = v as u8;
        }

        let mut v = g.num_cr_points as u32;
        io.rw_bits("num_cr_points", 4, 0, 10, &mut v)?;
        g.num_cr_points = v as u8;
        if IO::IS_READING {
            g.point_cr_value = vec![0; g.num_cr_points as usize];
            g.point_cr_scaling = vec![0; g.num_cr_points as usize];
        }
        for i in 0..g.num_cr_points as usize {
            let mut v = g.point_cr_value[i] as u32;
            io.rw_bits("point_cr_value[i]", 8, 0, 255, &mut v)?;
            g.point_cr_value[i] = v as u8;
            let mut v = g.point_cr_scaling[i] as u32;
            io.rw_bits("point_cr_scaling[i]", 8, 0, 255, &mut v)?;
            g.point_cr_scaling[i] = v as u8;
        }
    }

    let mut v = g.grain_scaling_minus_8 as u32;
    io.rw_bits("grain_scaling_minus_8", 2, 0, 3, &mut v)?;
    g.grain_scaling_minus_8 = v as u8;
    let mut v = g.ar_coeff_lag as u32;
    io.rw_bits("ar_coeff_lag", 2, 0, 3, &mut v)?;
    g.ar_coeff_lag = v as u8;

    let num_pos_luma = 2 * g.ar_coeff_lag as usize * (g.ar_coeff_lag as usize + 1);
    let num_pos_chroma = if g.num_y_points > 0 {
        if IO::IS_READING {
            g.ar_coeffs_y_plus_128 = vec![0; num_pos_luma];
        }
        for i in 0..num_pos_luma {
            let mut v = g.ar_coeffs_y_plus_128[i] as u32;
            io.rw_bits("ar_coeffs_y_plus_128[i]", 8, 0, 255, &mut v)?;
            g.ar_coeffs_y_plus_128[i] = v as u8;
        }
        num_pos_luma + 1
    } else {
        num_pos_luma
    };

    if g.chroma_scaling_from_luma || g.num_cb_points > 0 {
        if IO::IS_READING {
            g.ar_coeffs_cb_plus_128 = vec![0; num_pos_chroma];
        }
        for i in 0..num_pos_chroma {
            let mut v = g.ar_coeffs_cb_plus_128[i] as u32;
            io.rw_bits("ar_coeffs_cb_plus_128[i]", 8, 0, 255, &mut v)?;
            g.ar_coeffs_cb_plus_128[i] = v as u8;
        }
    }
    if g.chroma_scaling_from_luma || g.num_cr_points > 0 {
        if IO::IS_READING {
            g.ar_coeffs_cr_plus_128 = vec![0; num_pos_chroma];
        }
        for i in 0..num_pos_chroma {
            let mut v = g.ar_coeffs_cr_plus_128[i] as u32;
            io.rw_bits("ar_coeffs_cr_plus_128[i]", 8, 0, 255, &mut v)?;
            g.ar_coeffs_cr_plus_128[i] = v as u8;
        }
    }

    let mut v = g.ar_coeff_shift_minus_6 as u32;
    io.rw_bits("ar_coeff_shift_minus_6", 2, 0, 3, &mut v)?;
    g.ar_coeff_shift_minus_6 = v as u8;
    let mut v = g.grain_scale_shift as u32;
    io.rw_bits("grain_scale_shift", 2, 0, 3, &mut v)?;
    g.grain_scale_shift = v as u8;

    if g.num_cb_points > 0 {
        let mut v = g.cb_mult as u32;
        io.rw_bits("cb_mult", 8, 0, 255, &mut v)?;
        g.cb_mult = v as u8;
        let mut v = g.cb_luma_mult as u32;
        io.rw_bits("cb_luma_mult", 8, 0, 255, &mut v)?;
        g.cb_luma_mult = v as u8;
        let mut v = g.cb_offset as u32;
        io.rw_bits("cb_offset", 9, 0, 511, &mut v)?;
        g.cb_offset = v as u16;
    }
    if g.num_cr_points > 0 {
        let mut v = g.cr_mult as u32;
        io.rw_bits("cr_mult", 8, 0, 255, &mut v)?;
        g.cr_mult = v as u8;
        let mut v = g.cr_luma_mult as u32;
        io.rw_bits("cr_luma_mult", 8, 0, 255, &mut v)?;
        g.cr_luma_mult = v as u8;
        let mut v = g.cr_offset as u32;
        io.rw_bits("cr_offset", 9, 0, 511, &mut v)?;
        g.cr_offset = v as u16;
    }

    io.rw_bit("overlap_flag", &mut g.overlap_flag)?;
    io.rw_bit("clip_to_restricted_range", &mut g.clip_to_restricted_range)?;
    Ok(())
}

/// `uncompressed_header()`: the whole of the AV1 frame header syntax tree,
/// run bit-exactly so combined "Frame" OBUs can locate the tile group that
/// follows.
pub fn rw_uncompressed_header<IO: Av1BitIo>(
    io: &mut IO,
    current: &mut FrameHeader,
    seq: &SequenceHeader,
    state: &mut Av1State,
) -> Result<()> {
    let id_len = seq.additional_frame_id_length_minus_1 as u32 + seq.delta_frame_id_length_minus_2 as u32 + 3;
    let all_frames: u8 = 0xFF;

    let frame_is_intra;
    if seq.reduced_still_picture_header {
        infer_bool(IO::IS_READING, &mut current.show_existing_frame, false, "show_existing_frame")?;
        current.frame_type = FrameType::Key;
        infer_bool(IO::IS_READING, &mut current.show_frame, true, "show_frame")?;
        infer_bool(IO::IS_READING, &mut current.showable_frame, false, "showable_frame")?;
        frame_is_intra = true;
    } else {
        io.rw_bit("show_existing_frame", &mut current.show_existing_frame)?;

        if current.show_existing_frame {
            let mut v = current.frame_to_show_map_idx as u32;
            io.rw_bits("frame_to_show_map_idx", 3, 0, 7, &mut v)?;
            current.frame_to_show_map_idx = v as u8;

            let frame = state.reference_frames[current.frame_to_show_map_idx as usize];

            if seq.decoder_model_info_present && !seq.timing_info.equal_picture_interval {
                let n = seq.decoder_model_info.frame_presentation_time_length_minus_1 as u8 + 1;
                io.rw_bits("frame_presentation_time", n, 0, u32::MAX, &mut current.frame_presentation_time)?;
            }
            if seq.frame_id_numbers_present {
                io.rw_bits("display_frame_id", id_len as u8, 0, u32::MAX, &mut current.display_frame_id)?;
            }

            current.refresh_frame_flags = if frame.frame_type.is_key() { all_frames } else { 0 };
            return Ok(());
        }

        let mut v = current.frame_type.to_bits();
        io.rw_bits("frame_type", 2, 0, 3, &mut v)?;
        current.frame_type = FrameType::from_bits(v);
        frame_is_intra = current.frame_type.is_intra();

        io.rw_bit("show_frame", &mut current.show_frame)?;
        if current.show_frame && seq.decoder_model_info_present && !seq.timing_info.equal_picture_interval {
            let n = seq.decoder_model_info.frame_presentation_time_length_minus_1 as u8 + 1;
            io.rw_bits("frame_presentation_time", n, 0, u32::MAX, &mut current.frame_presentation_time)?;
        }
        if current.show_frame {
            infer_bool(IO::IS_READING, &mut current.showable_frame, current.frame_type != FrameType::Key, "showable_frame")?;
        } else {
            io.rw_bit("showable_frame", &mut current.showable_frame)?;
        }

        if current.frame_type == FrameType::Switch || (current.frame_type == FrameType::Key && current.show_frame) {
            infer_bool(IO::IS_READING, &mut current.error_resilient_mode, true, "error_resilient_mode")?;
        } else {
            io.rw_bit("error_resilient_mode", &mut current.error_resilient_mode)?;
        }
    }

    if current.frame_type == FrameType::Key && current.show_frame {
        state.invalidate_all_references();
    }

    io.rw_bit("disable_cdf_update", &mut current.disable_cdf_update)?;

    if seq.seq_force_screen_content_tools == SELECT_SCREEN_CONTENT_TOOLS {
        let mut flag = current.allow_screen_content_tools != 0;
        io.rw_bit("allow_screen_content_tools", &mut flag)?;
        current.allow_screen_content_tools = flag as u32;
    } else {
        infer_u32(IO::IS_READING, &mut current.allow_screen_content_tools, seq.seq_force_screen_content_tools, "allow_screen_content_tools")?;
    }

    if current.allow_screen_content_tools != 0 {
        if seq.seq_force_integer_mv == SELECT_INTEGER_MV {
            let mut flag = current.force_integer_mv != 0;
            io.rw_bit("force_integer_mv", &mut flag)?;
            current.force_integer_mv = flag as u32;
        } else {
            infer_u32(IO::IS_READING, &mut current.force_integer_mv, seq.seq_force_integer_mv, "force_integer_mv")?;
        }
    } else {
        infer_u32(IO::IS_READING, &mut current.force_integer_mv, 0, "force_integer_mv")?;
    }

    if seq.frame_id_numbers_present {
        io.rw_bits("current_frame_id", id_len as u8, 0, u32::MAX, &mut current.current_frame_id)?;

        let diff_len = seq.delta_frame_id_length_minus_2 as u32 + 2;
        for i in 0..NUM_REF_FRAMES {
            let reference = &mut state.reference_frames[i];
            let invalid = if current.current_frame_id > (1 << diff_len) {
                reference.frame_id > current.current_frame_id
                    || reference.frame_id < current.current_frame_id - (1 << diff_len)
            } else {
                reference.frame_id > current.current_frame_id
                    && reference.frame_id < (1u32 << id_len) + current.current_frame_id - (1 << diff_len)
            };
            if invalid {
                reference.valid = false;
            }
        }
    } else {
        infer_u32(IO::IS_READING, &mut current.current_frame_id, 0, "current_frame_id")?;
    }

    if current.frame_type == FrameType::Switch {
        infer_bool(IO::IS_READING, &mut current.frame_size_override_flag, true, "frame_size_override_flag")?;
    } else if seq.reduced_still_picture_header {
        infer_bool(IO::IS_READING, &mut current.frame_size_override_flag, false, "frame_size_override_flag")?;
    } else {
        io.rw_bit("frame_size_override_flag", &mut current.frame_size_override_flag)?;
    }

    let order_hint_bits = if seq.enable_order_hint { seq.order_hint_bits_minus_1 as u32 + 1 } else { 0 };
    if order_hint_bits > 0 {
        io.rw_bits("order_hint", order_hint_bits as u8, 0, u32::MAX, &mut current.order_hint)?;
    } else {
        infer_u32(IO::IS_READING, &mut current.order_hint, 0, "order_hint")?;
    }

    if frame_is_intra || current.error_resilient_mode {
        infer_u32(IO::IS_READING, &mut current.primary_ref_frame, PRIMARY_REF_NONE, "primary_ref_frame")?;
    } else {
        io.rw_bits("primary_ref_frame", 3, 0, 7, &mut current.primary_ref_frame)?;
    }

    if seq.decoder_model_info_present {
        io.rw_bit("buffer_removal_time_present_flag", &mut current.buffer_removal_time_present_flag)?;
        if current.buffer_removal_time_present_flag {
            if IO::IS_READING {
                current.buffer_removal_time = vec![0; seq.operating_points.len()];
            }
            for (i, op) in seq.operating_points.iter().enumerate() {
                if op.decoder_model_present {
                    let in_temporal_layer = (op.idc >> state.temporal_id) & 1 != 0;
                    let in_spatial_layer = (op.idc >> (state.spatial_id + 8)) & 1 != 0;
                    if op.idc == 0 || in_temporal_layer || in_spatial_layer {
                        let n = seq.decoder_model_info.buffer_removal_time_length_minus_1 as u8 + 1;
                        io.rw_bits("buffer_removal_time[i]", n, 0, u32::MAX, &mut current.buffer_removal_time[i])?;
                    }
                }
            }
        }
    }

    if current.frame_type == FrameType::Switch || (current.frame_type == FrameType::Key && current.show_frame) {
        if IO::IS_READING {
            current.refresh_frame_flags = all_frames;
        } else if current.refresh_frame_flags != all_frames {
            return Err(CbsError::invalid_data(
                "refresh_frame_flags",
                format!("expected inferred value {all_frames}, got {}", current.refresh_frame_flags),
            ));
        }
    } else {
        let mut v = current.refresh_frame_flags as u32;
        io.rw_bits("refresh_frame_flags", 8, 0, 255, &mut v)?;
        current.refresh_frame_flags = v as u8;
    }

    if !frame_is_intra || current.refresh_frame_flags != all_frames {
        if current.error_resilient_mode && seq.enable_order_hint {
            for i in 0..NUM_REF_FRAMES {
                io.rw_bits("ref_order_hint[i]", order_hint_bits as u8, 0, u32::MAX, &mut current.ref_order_hint[i])?;
                if current.ref_order_hint[i] != state.reference_frames[i].order_hint {
                    state.reference_frames[i].valid = false;
                }
            }
        }
    }

    if frame_is_intra {
        rw_frame_size(io, current, seq, state)?;
        rw_render_size(io, current, state)?;

        if current.allow_screen_content_tools != 0 && state.upscaled_width == state.frame_width {
            io.rw_bit("allow_intrabc", &mut current.allow_intrabc)?;
        } else {
            infer_bool(IO::IS_READING, &mut current.allow_intrabc, false, "allow_intrabc")?;
        }
    } else {
        if !seq.enable_order_hint {
            infer_bool(IO::IS_READING, &mut current.frame_refs_short_signaling, false, "frame_refs_short_signaling")?;
        } else {
            io.rw_bit("frame_refs_short_signaling", &mut current.frame_refs_short_signaling)?;
            if current.frame_refs_short_signaling {
                let mut v = current.last_frame_idx as u32;
                io.rw_bits("last_frame_idx", 3, 0, 7, &mut v)?;
                current.last_frame_idx = v as u8;
                let mut v = current.golden_frame_idx as u32;
                io.rw_bits("golden_frame_idx", 3, 0, 7, &mut v)?;
                current.golden_frame_idx = v as u8;

                for i in 0..REFS_PER_FRAME {
                    current.ref_frame_idx[i] = if i == 0 {
                        current.last_frame_idx as i32
                    } else if i == REF_FRAME_GOLDEN - REF_FRAME_LAST {
                        current.golden_frame_idx as i32
                    } else {
                        -1
                    };
                }
            }
        }

        for i in 0..REFS_PER_FRAME {
            if !current.frame_refs_short_signaling {
                let mut v = current.ref_frame_idx[i].max(0) as u32;
                io.rw_bits("ref_frame_idx[i]", 3, 0, 7, &mut v)?;
                current.ref_frame_idx[i] = v as i32;
            }
            if seq.frame_id_numbers_present {
                let n = seq.delta_frame_id_length_minus_2 as u8 + 2;
                io.rw_bits("delta_frame_id_minus1[i]", n, 0, u32::MAX, &mut current.delta_frame_id_minus1[i])?;
            }
        }

        if current.frame_size_override_flag && !current.error_resilient_mode {
            rw_frame_size_with_refs(io, current, seq, state)?;
        } else {
            rw_frame_size(io, current, seq, state)?;
            rw_render_size(io, current, state)?;
        }

        if current.force_integer_mv != 0 {
            infer_bool(IO::IS_READING, &mut current.allow_high_precision_mv, false, "allow_high_precision_mv")?;
        } else {
            io.rw_bit("allow_high_precision_mv", &mut current.allow_high_precision_mv)?;
        }

        rw_interpolation_filter(io, current)?;

        io.rw_bit("is_motion_mode_switchable", &mut current.is_motion_mode_switchable)?;

        if current.error_resilient_mode || !seq.enable_ref_frame_mvs {
            infer_bool(IO::IS_READING, &mut current.use_ref_frame_mvs, false, "use_ref_frame_mvs")?;
        } else {
            io.rw_bit("use_ref_frame_mvs", &mut current.use_ref_frame_mvs)?;
        }

        infer_bool(IO::IS_READING, &mut current.allow_intrabc, false, "allow_intrabc")?;
    }

    if seq.reduced_still_picture_header || current.disable_cdf_update {
        infer_bool(IO::IS_READING, &mut current.disable_frame_end_update_cdf, true, "disable_frame_end_update_cdf")?;
    } else {
        io.rw_bit("disable_frame_end_update_cdf", &mut current.disable_frame_end_update_cdf)?;
    }

    rw_tile_info(io, current, seq, state)?;
    rw_quantization_params(io, current, seq, state)?;
    rw_segmentation_params(io, current)?;
    rw_delta_q_params(io, current)?;
    rw_delta_lf_params(io, current)?;

    let mut coded_lossless = true;
    for i in 0..MAX_SEGMENTS {
        let feature = current.segmentation_params.features[i][SEG_LVL_ALT_Q];
        let qindex = if feature.enabled {
            current.quantization_params.base_q_idx as i32 + feature.value
        } else {
            current.quantization_params.base_q_idx as i32
        };
        let qindex = qindex.clamp(0, 255);
        if qindex != 0
            || current.quantization_params.delta_q_y_dc != 0
            || current.quantization_params.delta_q_u_ac != 0
            || current.quantization_params.delta_q_u_dc != 0
            || current.quantization_params.delta_q_v_ac != 0
            || current.quantization_params.delta_q_v_dc != 0
        {
            coded_lossless = false;
        }
    }
    state.coded_lossless = coded_lossless;
    state.all_lossless = coded_lossless && state.frame_width == state.upscaled_width;

    rw_loop_filter_params(io, current, state)?;
    rw_cdef_params(io, current, seq, state)?;
    rw_lr_params(io, current, seq, state)?;
    rw_read_tx_mode(io, current, state)?;
    rw_frame_reference_mode(io, current)?;
    rw_skip_mode_params(io, current, seq, state)?;

    if frame_is_intra || current.error_resilient_mode || !seq.enable_warped_motion {
        infer_bool(IO::IS_READING, &mut current.allow_warped_motion, false, "allow_warped_motion")?;
    } else {
        io.rw_bit("allow_warped_motion", &mut current.allow_warped_motion)?;
    }

    io.rw_bit("reduced_tx_set", &mut current.reduced_tx_set)?;

    rw_global_motion_params(io, current)?;
    rw_film_grain_params(io, current, seq)?;

    for i in 0..NUM_REF_FRAMES {
        if current.refresh_frame_flags & (1 << i) != 0 {
            state.reference_frames[i] = ReferenceFrameSlot {
                valid: true,
                frame_id: current.current_frame_id,
                upscaled_width: state.upscaled_width,
                frame_width: state.frame_width,
                frame_height: state.frame_height,
                render_width: state.render_width,
                render_height: state.render_height,
                frame_type: current.frame_type,
                subsampling_x: seq.color_config.subsampling_x,
                subsampling_y: seq.color_config.subsampling_y,
                bit_depth: state.bit_depth,
                order_hint: current.order_hint,
            };
        }
    }

    Ok(())
}

/// `frame_header_obu()`: gated by `seen_frame_header` so a redundant frame
/// header OBU following the first one is a no-op.
pub fn rw_frame_header_obu<IO: Av1BitIo>(io: &mut IO, current: &mut FrameHeader, seq: &SequenceHeader, state: &mut Av1State) -> Result<()> {
    if state.seen_frame_header {
        return Ok(());
    }
    state.seen_frame_header = true;
    rw_uncompressed_header(io, current, seq, state)?;
    state.seen_frame_header = !current.show_existing_frame;
    Ok(())
}

/// `tile_group_obu()`: consumes `tg_start`/`tg_end` and byte-aligns before
/// the opaque tile data that follows; resets `seen_frame_header` once the
/// last tile of the frame has been seen.
pub fn rw_tile_group_obu<IO: Av1BitIo>(io: &mut IO, current: &mut TileGroup, state: &mut Av1State) -> Result<()> {
    let num_tiles = state.tile_cols * state.tile_rows;
    if num_tiles > 1 {
        io.rw_bit("tile_start_and_end_present_flag", &mut current.tile_start_and_end_present_flag)?;
    } else {
        infer_bool(IO::IS_READING, &mut current.tile_start_and_end_present_flag, false, "tile_start_and_end_present_flag")?;
    }

    if num_tiles == 1 || !current.tile_start_and_end_present_flag {
        infer_u32(IO::IS_READING, &mut current.tg_start, 0, "tg_start")?;
        infer_u32(IO::IS_READING, &mut current.tg_end, num_tiles - 1, "tg_end")?;
    } else {
        let tile_bits = (tile_log2(1, state.tile_cols) + tile_log2(1, state.tile_rows)) as u8;
        io.rw_bits("tg_start", tile_bits, 0, u32::MAX, &mut current.tg_start)?;
        io.rw_bits("tg_end", tile_bits, 0, u32::MAX, &mut current.tg_end)?;
    }

    rw_trailing_bits(io)?;

    if current.tg_end == num_tiles - 1 {
        state.seen_frame_header = false;
    }
    Ok(())
}

/// `frame_obu()`: a frame header immediately followed, after byte
/// alignment, by its tile group in the same OBU payload.
pub fn rw_frame_obu<IO: Av1BitIo>(
    io: &mut IO,
    header: &mut FrameHeader,
    tile_group: &mut TileGroup,
    seq: &SequenceHeader,
    state: &mut Av1State,
) -> Result<()> {
    rw_frame_header_obu(io, header, seq, state)?;
    while io.position() % 8 != 0 {
        let mut zero = false;
        io.rw_bit("byte_alignment", &mut zero)?;
    }
    rw_tile_group_obu(io, tile_group, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{BitReader, BitWriter, ReadIo, TraceSink, WriteIo};

    fn base_sequence_header() -> SequenceHeader {
        let mut seq = SequenceHeader::default();
        seq.reduced_still_picture_header = true;
        seq.max_frame_width = 64;
        seq.max_frame_height = 64;
        seq.frame_width_bits = 7;
        seq.frame_height_bits = 7;
        seq
    }

    fn round_trip_header(seq: &SequenceHeader, header: &mut FrameHeader) -> FrameHeader {
        let mut enc_state = Av1State::default();
        enc_state.num_planes = 3;
        enc_state.bit_depth = 8;

        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        rw_uncompressed_header(&mut writer, header, seq, &mut enc_state).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut dec_state = Av1State::default();
        dec_state.num_planes = 3;
        dec_state.bit_depth = 8;
        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = FrameHeader::default();
        rw_uncompressed_header(&mut reader, &mut decoded, seq, &mut dec_state).unwrap();
        decoded
    }

    #[test]
    fn reduced_still_picture_key_frame_round_trips() {
        let seq = base_sequence_header();
        let mut header = FrameHeader::default();
        header.quantization_params.base_q_idx = 40;

        let decoded = round_trip_header(&seq, &mut header);
        assert_eq!(decoded.frame_type, FrameType::Key);
        assert!(decoded.show_frame);
        assert_eq!(decoded.quantization_params.base_q_idx, 40);
        assert_eq!(decoded.primary_ref_frame, PRIMARY_REF_NONE);
    }

    #[test]
    fn segmentation_params_round_trips_signed_feature() {
        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        let mut header = FrameHeader::default();
        header.primary_ref_frame = PRIMARY_REF_NONE;
        header.segmentation_params.features = vec![[SegmentationFeature::default(); SEG_LVL_MAX]; MAX_SEGMENTS];
        header.segmentation_params.enabled = true;
        header.segmentation_params.update_data = true;
        header.segmentation_params.features[0][SEG_LVL_ALT_Q] = SegmentationFeature { enabled: true, value: -12 };
        rw_segmentation_params(&mut writer, &mut header).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = FrameHeader::default();
        decoded.primary_ref_frame = PRIMARY_REF_NONE;
        rw_segmentation_params(&mut reader, &mut decoded).unwrap();

        assert!(decoded.segmentation_params.enabled);
        assert_eq!(decoded.segmentation_params.features[0][SEG_LVL_ALT_Q].value, -12);
        assert!(!decoded.segmentation_params.features[1][SEG_LVL_ALT_Q].enabled);
    }

    fn inter_sequence_header() -> SequenceHeader {
        let mut seq = SequenceHeader::default();
        seq.reduced_still_picture_header = false;
        seq.enable_order_hint = true;
        seq.order_hint_bits_minus_1 = 6;
        seq.max_frame_width = 64;
        seq.max_frame_height = 64;
        seq.frame_width_bits = 7;
        seq.frame_height_bits = 7;
        seq
    }

    #[test]
    fn inter_frame_with_references_round_trips() {
        let seq = inter_sequence_header();

        let mut header = FrameHeader::default();
        header.frame_type = FrameType::Inter;
        header.show_frame = true;
        header.showable_frame = true;
        header.error_resilient_mode = false;
        header.primary_ref_frame = 0;
        header.order_hint = 10;
        header.refresh_frame_flags = 0;
        header.ref_frame_idx = [0, 1, 2, 3, 4, 5, 6];
        header.reference_select = false;
        header.quantization_params.base_q_idx = 40;

        let mut enc_state = Av1State::default();
        enc_state.num_planes = 3;
        enc_state.bit_depth = 8;
        for i in 0..NUM_REF_FRAMES {
            enc_state.reference_frames[i] = ReferenceFrameSlot {
                valid: true,
                frame_width: 64,
                frame_height: 64,
                upscaled_width: 64,
                order_hint: i as u32,
                ..Default::default()
            };
        }

        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        rw_uncompressed_header(&mut writer, &mut header, &seq, &mut enc_state).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut dec_state = Av1State::default();
        dec_state.num_planes = 3;
        dec_state.bit_depth = 8;
        dec_state.reference_frames = enc_state.reference_frames;

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = FrameHeader::default();
        rw_uncompressed_header(&mut reader, &mut decoded, &seq, &mut dec_state).unwrap();

        assert_eq!(decoded.frame_type, FrameType::Inter);
        assert_eq!(decoded.order_hint, 10);
        assert_eq!(decoded.ref_frame_idx, [0, 1, 2, 3, 4, 5, 6]);
        assert!(!decoded.skip_mode_present);
        assert_eq!(decoded.global_motion_params[REF_FRAME_LAST].gm_type, WARP_MODEL_IDENTITY);
    }

    #[test]
    fn tile_group_single_tile_infers_bounds() {
        let mut state = Av1State::default();
        state.tile_cols = 1;
        state.tile_rows = 1;

        let mut writer = WriteIo { writer: BitWriter::new(), strict: true, trace: TraceSink::disabled() };
        let mut tg = TileGroup::default();
        rw_tile_group_obu(&mut writer, &mut tg, &mut state).unwrap();
        writer.writer.byte_align();
        let bytes = writer.writer.into_bytes();

        let mut state2 = Av1State::default();
        state2.tile_cols = 1;
        state2.tile_rows = 1;
        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = TileGroup::default();
        rw_tile_group_obu(&mut reader, &mut decoded, &mut state2).unwrap();

        assert_eq!(decoded.tg_start, 0);
        assert_eq!(decoded.tg_end, 0);
        assert!(!state2.seen_frame_header);
    }
}
