//! Splits a raw byte fragment into OBU-sized units.
//!
//! Grounded on `cbs_av1_split_fragment` in
//! `examples/original_source/libavcodec/cbs_av1.c`: walk the byte stream
//! reading one `obu_header()` plus an optional `leb128` size at a time,
//! slicing out exactly `obu_length` bytes per unit without touching their
//! contents.

use cbs_core::{buffer::BufferView, BitIo, BitReader, Buffer, CbsError, ReadIo, Result, TraceSink, Unit};

use crate::leb128::decode_uleb128;
use crate::types::ObuType;

/// `AV1CodecConfigurationRecord` prefix length (ISO/IEC 14496-12 AV1 box),
/// present only when splitting header/extradata rather than a packet.
const CONFIG_RECORD_PREFIX_LEN: usize = 4;

pub(crate) struct ObuHeader {
    pub(crate) obu_type: ObuType,
    pub(crate) extension_flag: bool,
    pub(crate) has_size_field: bool,
    pub(crate) temporal_id: u8,
    pub(crate) spatial_id: u8,
}

pub(crate) fn read_obu_header(io: &mut ReadIo<'_>) -> Result<ObuHeader> {
    let forbidden = io.reader.read_bit()?;
    if forbidden {
        return Err(CbsError::invalid_data("obu_forbidden_bit", "must be zero"));
    }
    let obu_type = ObuType::from_u8(io.reader.read_bits(4)? as u8);
    let extension_flag = io.reader.read_bit()?;
    let has_size_field = io.reader.read_bit()?;
    let _reserved = io.reader.read_bit()?;

    let (temporal_id, spatial_id) = if extension_flag {
        let t = io.reader.read_bits(3)? as u8;
        let s = io.reader.read_bits(2)? as u8;
        let _reserved3 = io.reader.read_bits(3)?;
        (t, s)
    } else {
        (0, 0)
    };

    Ok(ObuHeader {
        obu_type,
        extension_flag,
        has_size_field,
        temporal_id,
        spatial_id,
    })
}

/// Splits `data` into one [`Unit`] per OBU. When `is_header` is set, a
/// leading byte with its top bit set is interpreted as the start of an
/// `AV1CodecConfigurationRecord` rather than an OBU.
pub fn split_fragment(data: &Buffer, is_header: bool) -> Result<Vec<Unit>> {
    let mut offset = 0usize;
    let len = data.len();

    if is_header && len > 0 && data[0] & 0x80 != 0 {
        let version = data[0] & 0x7F;
        if version != 1 {
            return Err(CbsError::invalid_data(
                "AV1CodecConfigurationRecord",
                format!("unknown version {version}"),
            ));
        }
        if len < CONFIG_RECORD_PREFIX_LEN {
            return Err(CbsError::invalid_data(
                "AV1CodecConfigurationRecord",
                "undersized record",
            ));
        }
        if len == CONFIG_RECORD_PREFIX_LEN {
            return Ok(Vec::new());
        }
        offset = CONFIG_RECORD_PREFIX_LEN;
    }

    let mut units = Vec::new();
    while offset < len {
        let slice = &data[offset..];
        let reader = BitReader::new(slice);
        let mut io = ReadIo { reader, trace: TraceSink::disabled() };

        let header = read_obu_header(&mut io)?;

        let obu_size = if header.has_size_field {
            if io.reader.remaining_bits() < 8 {
                return Err(CbsError::invalid_data(
                    "obu_size",
                    "fragment too short for leb128 size field",
                ));
            }
            let (value, leb_bytes) = decode_uleb128(&slice[io.reader.byte_position()..])?;
            io.reader.skip_bits((leb_bytes as u64) * 8)?;
            value
        } else {
            (slice.len() as u64)
                .checked_sub(1 + header.extension_flag as u64)
                .ok_or_else(|| CbsError::invalid_data("obu_size", "OBU shorter than its header"))?
        };

        debug_assert!(io.reader.is_byte_aligned());
        let header_bytes = io.reader.byte_position();
        let obu_length = header_bytes as u64 + obu_size;

        if (slice.len() as u64) < obu_length {
            return Err(CbsError::invalid_data(
                "obu",
                format!(
                    "OBU length {obu_length} exceeds {} remaining bytes",
                    slice.len()
                ),
            ));
        }

        let unit_len = obu_length as usize;
        let view = BufferView::new(data.clone(), offset..offset + unit_len);
        let unit = Unit::from_data(cbs_core::UnitType(header.obu_type.to_u8() as u32), view);
        units.push(unit);

        offset += unit_len;
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::buffer_from_slice;

    #[test]
    fn splits_temporal_delimiter_obu() {
        // 0x12 = 0b0001_0010: forbidden=0, type=2 (TD), ext=0, has_size=1, reserved=0
        // 0x00 = obu_size leb128 -> 0
        let data = buffer_from_slice(&[0x12, 0x00]);
        let units = split_fragment(&data, false).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_type, cbs_core::UnitType(2));
        assert_eq!(units[0].data().unwrap().len(), 2);
    }

    #[test]
    fn config_record_v1_prefix_is_skipped() {
        // 0x81 -> marker set, version 1. Remaining three bytes are the rest
        // of the fixed config record fields; no OBUs follow in this sample.
        let data = buffer_from_slice(&[0x81, 0x0C, 0x00, 0x00]);
        let units = split_fragment(&data, true).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn config_record_bad_version_is_rejected() {
        let data = buffer_from_slice(&[0x82, 0x00, 0x00, 0x00]);
        let err = split_fragment(&data, true).unwrap_err();
        assert!(matches!(err, CbsError::InvalidData { .. }));
    }
}
