//! Start-code scanning and the unit-type constants each start code maps to.
//!
//! Grounded on `bitvue-mpeg2-codec::start_code::{StartCodeType, find_start_codes}`
//! for the scan loop, including its DoS scan-distance guard, and on
//! `cbs_mpeg2_split_fragment` in `cbs_mpeg2.c` for how a scan is turned into
//! a sequence of units (each unit's bytes include its start-code identifier
//! byte but not the `00 00 01` prefix).

use cbs_core::{buffer_from_slice, Buffer, BufferView, Result, Unit, UnitType};

pub const START_PICTURE: u32 = 0x00;
pub const START_SLICE_MIN: u32 = 0x01;
pub const START_SLICE_MAX: u32 = 0xAF;
pub const START_RESERVED0: u32 = 0xB0;
pub const START_RESERVED1: u32 = 0xB1;
pub const START_USER_DATA: u32 = 0xB2;
pub const START_SEQUENCE_HEADER: u32 = 0xB3;
pub const START_SEQUENCE_ERROR: u32 = 0xB4;
pub const START_EXTENSION: u32 = 0xB5;
pub const START_RESERVED6: u32 = 0xB6;
pub const START_SEQUENCE_END: u32 = 0xB7;
pub const START_GROUP: u32 = 0xB8;
pub const START_SYSTEM_MIN: u32 = 0xB9;

#[inline]
pub fn is_slice(unit_type: u32) -> bool {
    (START_SLICE_MIN..=START_SLICE_MAX).contains(&unit_type)
}

/// Limits how far the scanner will look for the next `00 00 01` prefix
/// before giving up, so a crafted stream of non-start-code bytes can't
/// force an unbounded scan.
const MAX_START_CODE_SCAN_DISTANCE: usize = 100 * 1024 * 1024;

/// Byte offsets of every `00 00 01 XX` prefix in `data`, paired with the
/// `XX` unit-type byte.
fn find_start_codes(data: &[u8]) -> Vec<(usize, u8)> {
    let mut codes = Vec::new();
    let mut i = 0;
    let mut last_code_pos = 0;

    while i + 3 < data.len() {
        if i > last_code_pos && i - last_code_pos > MAX_START_CODE_SCAN_DISTANCE {
            break;
        }
        if data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x01 {
            codes.push((i, data[i + 3]));
            last_code_pos = i;
            i += 4;
        } else {
            i += 1;
        }
    }

    codes
}

/// Splits a whole elementary-stream byte range into start-code-delimited
/// units. Each unit's `data` runs from its start-code-identifier byte up
/// to (but not including) the `00 00 01` prefix of the next start code,
/// or to the end of `data` for the last unit.
pub fn split_fragment(buffer: &Buffer) -> Result<Vec<Unit>> {
    let data = buffer.as_ref();
    let codes = find_start_codes(data);
    if codes.is_empty() {
        return Err(cbs_core::CbsError::invalid_data("mpeg2_stream", "no start code found"));
    }

    let mut units = Vec::with_capacity(codes.len());
    for (index, &(offset, code_value)) in codes.iter().enumerate() {
        let unit_start = offset + 3;
        let unit_end = codes.get(index + 1).map(|&(next_offset, _)| next_offset).unwrap_or(data.len());
        let view = BufferView::new(buffer.clone(), unit_start..unit_end);
        units.push(Unit::from_data(UnitType(code_value as u32), view));
    }

    Ok(units)
}

pub fn buffer_of(data: &[u8]) -> Buffer {
    buffer_from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sequence_header_and_group_and_picture() {
        let data = [0x00, 0x00, 0x01, 0xB3, 0xAA, 0x00, 0x00, 0x01, 0xB8, 0xBB, 0x00, 0x00, 0x01, 0x00, 0xCC];
        let buffer = buffer_of(&data);
        let units = split_fragment(&buffer).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].unit_type.0, START_SEQUENCE_HEADER);
        assert_eq!(units[0].data().unwrap().as_slice(), &[0xB3, 0xAA]);
        assert_eq!(units[1].unit_type.0, START_GROUP);
        assert_eq!(units[2].unit_type.0, START_PICTURE);
        assert_eq!(units[2].data().unwrap().as_slice(), &[0x00, 0xCC]);
    }

    #[test]
    fn rejects_data_with_no_start_code() {
        let buffer = buffer_of(&[1, 2, 3, 4, 5]);
        assert!(split_fragment(&buffer).is_err());
    }

    #[test]
    fn is_slice_covers_the_whole_slice_range() {
        assert!(!is_slice(0x00));
        assert!(is_slice(0x01));
        assert!(is_slice(0xAF));
        assert!(!is_slice(0xB0));
    }
}
