//! The VP9 superframe index: a trailer that packs several frames (most
//! often a visible frame plus one or more hidden alt-ref frames) into a
//! single container unit.
//!
//! Index layout, present only when a superframe is in play:
//! `[marker][size_0 LE]...[size_n LE][marker]`, where the marker byte is
//! `0b110sscc` (`ss` = `bytes_per_framesize - 1`, `cc` = `frame_count - 1`).
//!
//! Grounded on `cbs_vp9_split_fragment`/`cbs_vp9_assemble_fragment` in
//! `examples/original_source/libavcodec/cbs_vp9.c` and
//! `bitvue-vp9::superframe` (`has_superframe_index`/
//! `parse_superframe_index`/`extract_frames`).

use cbs_core::{CbsError, Result};

use crate::types::{VP9_MAX_FRAMES_IN_SUPERFRAME, VP9_SUPERFRAME_MARKER};

/// A parsed superframe index: per-frame byte offsets and sizes within the
/// enclosing unit's data.
#[derive(Debug, Clone)]
pub struct SuperframeIndex {
    pub frame_sizes: Vec<u32>,
    pub frame_offsets: Vec<u32>,
}

impl SuperframeIndex {
    pub fn frame_count(&self) -> usize {
        self.frame_sizes.len()
    }

    pub fn is_superframe(&self) -> bool {
        self.frame_sizes.len() > 1
    }
}

/// Whether `data`'s trailing bytes look like a superframe index: the last
/// byte carries the marker, and the byte `index_size` bytes from the end
/// repeats it.
pub fn has_superframe_index(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }

    let marker = data[data.len() - 1];
    if (marker & 0xe0) != 0xc0 {
        return false;
    }

    let size_bytes = (((marker >> 3) & 0x03) + 1) as usize;
    let frame_count = ((marker & 0x07) + 1) as usize;
    let index_size = 2 + frame_count * size_bytes;

    if data.len() < index_size {
        return false;
    }

    data[data.len() - index_size] == marker
}

/// Parses the superframe index at the end of `data`. If none is present,
/// returns a single-frame index spanning the whole buffer, matching
/// `cbs_vp9_split_fragment`'s fallback when no trailer is found.
pub fn parse_superframe_index(data: &[u8]) -> Result<SuperframeIndex> {
    if !has_superframe_index(data) {
        return Ok(SuperframeIndex {
            frame_sizes: vec![data.len() as u32],
            frame_offsets: vec![0],
        });
    }

    let marker = data[data.len() - 1];
    let size_bytes = (((marker >> 3) & 0x03) + 1) as usize;
    let frame_count = ((marker & 0x07) + 1) as usize;
    let index_size = 2 + frame_count * size_bytes;
    let index_start = data.len() - index_size + 1;

    let mut frame_sizes = Vec::with_capacity(frame_count);
    for i in 0..frame_count {
        let mut size = 0u32;
        for j in 0..size_bytes {
            size |= (data[index_start + i * size_bytes + j] as u32) << (j * 8);
        }
        frame_sizes.push(size);
    }

    let mut frame_offsets = Vec::with_capacity(frame_count);
    let mut offset = 0u32;
    for &size in &frame_sizes {
        frame_offsets.push(offset);
        offset += size;
    }

    let trailer_start = (data.len() - index_size) as u32;
    if offset < trailer_start {
        tracing::warn!(
            leftover_bytes = trailer_start - offset,
            "bytes remain between the last sub-frame and the superframe index"
        );
    }

    Ok(SuperframeIndex { frame_sizes, frame_offsets })
}

/// Splits `data` into its component frames, validating that none of them
/// run past the end of the buffer.
pub fn extract_frames(data: &[u8]) -> Result<Vec<&[u8]>> {
    let index = parse_superframe_index(data)?;
    let mut frames = Vec::with_capacity(index.frame_count());

    for i in 0..index.frame_count() {
        let start = index.frame_offsets[i] as usize;
        let end = start + index.frame_sizes[i] as usize;
        if end > data.len() {
            return Err(CbsError::invalid_data(
                "superframe_index",
                format!("frame {i} extends beyond buffer: end={end}, len={}", data.len()),
            ));
        }
        frames.push(&data[start..end]);
    }

    Ok(frames)
}

/// Number of bytes needed to hold `value` (at least 1).
fn bytes_needed(value: u32) -> usize {
    let mut n = 1;
    while (value >> (n * 8)) != 0 {
        n += 1;
    }
    n
}

/// Builds a superframe trailer for `frame_sizes`, mirroring
/// `cbs_vp9_assemble_fragment`'s index-construction branch. Returns `None`
/// when a single frame needs no index at all.
pub fn build_superframe_index(frame_sizes: &[u32]) -> Result<Option<Vec<u8>>> {
    if frame_sizes.len() <= 1 {
        return Ok(None);
    }
    if frame_sizes.len() > VP9_MAX_FRAMES_IN_SUPERFRAME {
        return Err(CbsError::invalid_data(
            "superframe_index",
            format!("{} frames exceeds the maximum of {VP9_MAX_FRAMES_IN_SUPERFRAME}", frame_sizes.len()),
        ));
    }

    let max_size = *frame_sizes.iter().max().unwrap_or(&0);
    let size_bytes = bytes_needed(max_size).max(1).min(4);

    let marker = (VP9_SUPERFRAME_MARKER << 5) | (((size_bytes - 1) as u8) << 3) | ((frame_sizes.len() - 1) as u8);

    let mut index = Vec::with_capacity(2 + frame_sizes.len() * size_bytes);
    index.push(marker);
    for &size in frame_sizes {
        for j in 0..size_bytes {
            index.push(((size >> (j * 8)) & 0xff) as u8);
        }
    }
    index.push(marker);

    Ok(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_has_no_index() {
        let data = [0x82, 0x49, 0x83, 0x42];
        let index = parse_superframe_index(&data).unwrap();
        assert!(!index.is_superframe());
        assert_eq!(index.frame_sizes, vec![4]);
    }

    #[test]
    fn two_frame_superframe_splits_correctly() {
        let mut data = vec![0xaa; 5];
        data.extend_from_slice(&[0xbb; 3]);
        data.extend_from_slice(&[0xc1, 5, 3, 0xc1]);

        let frames = extract_frames(&data).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], &[0xaa; 5]);
        assert_eq!(frames[1], &[0xbb; 3]);
    }

    #[test]
    fn truncated_trailer_is_not_mistaken_for_an_index() {
        let data = [0x00, 0x01, 0x02, 0x03];
        assert!(!has_superframe_index(&data));
    }

    #[test]
    fn built_index_round_trips_through_extract_frames() {
        let frame_a = vec![0x11; 5];
        let frame_b = vec![0x22; 300];
        let index = build_superframe_index(&[frame_a.len() as u32, frame_b.len() as u32]).unwrap().unwrap();

        let mut data = frame_a.clone();
        data.extend_from_slice(&frame_b);
        data.extend_from_slice(&index);

        let frames = extract_frames(&data).unwrap();
        assert_eq!(frames[0], &frame_a[..]);
        assert_eq!(frames[1], &frame_b[..]);
    }

    #[test]
    fn single_frame_builds_no_index() {
        assert!(build_superframe_index(&[42]).unwrap().is_none());
    }

    #[test]
    fn leftover_bytes_before_index_still_succeeds() {
        // Sub-frames declare 5 and 3 bytes but 2 padding bytes sit between
        // the second sub-frame and the index trailer; parsing must still
        // succeed (only a warning is expected, not an error).
        let mut data = vec![0xaa; 5];
        data.extend_from_slice(&[0xbb; 3]);
        data.extend_from_slice(&[0xee; 2]);
        data.extend_from_slice(&[0xc1, 5, 3, 0xc1]);

        let index = parse_superframe_index(&data).unwrap();
        assert_eq!(index.frame_sizes, vec![5, 3]);
        assert_eq!(index.frame_offsets, vec![0, 5]);
    }
}
