//! `metadata_obu()` and its per-`metadata_type` payloads.
//!
//! Grounded on `cbs_av1_syntax_template.c`'s `cbs_av1_read_metadata`/
//! `cbs_av1_write_metadata` dispatch on `obu_metadata->metadata_type`.
//! HDR_CLL, HDR_MDCV, ITU-T T.35 and timecode are decomposed field by
//! field; scalability is an explicit, never-decoded dispatch arm (the unit
//! stays in raw form); any other `metadata_type` keeps its payload bytes
//! opaque so forward-compatible metadata still round-trips bit-exactly.

use serde::{Deserialize, Serialize};

use cbs_core::{CbsError, Result};

use crate::codings::Av1BitIo;

pub const METADATA_TYPE_HDR_CLL: u64 = 1;
pub const METADATA_TYPE_HDR_MDCV: u64 = 2;
pub const METADATA_TYPE_SCALABILITY: u64 = 3;
pub const METADATA_TYPE_ITUT_T35: u64 = 4;
pub const METADATA_TYPE_TIMECODE: u64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdrCll {
    pub max_cll: u16,
    pub max_fall: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdrMdcv {
    pub primary_chromaticity_x: [u16; 3],
    pub primary_chromaticity_y: [u16; 3],
    pub white_point_chromaticity_x: u16,
    pub white_point_chromaticity_y: u16,
    pub luminance_max: u32,
    pub luminance_min: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItutT35 {
    pub country_code: u8,
    pub country_code_extension_byte: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub counting_type: u8,
    pub full_timestamp_flag: bool,
    pub discontinuity_flag: bool,
    pub cnt_dropped_flag: bool,
    pub n_frames: u16,
    pub seconds_flag: bool,
    pub seconds_value: u8,
    pub minutes_flag: bool,
    pub minutes_value: u8,
    pub hours_flag: bool,
    pub hours_value: u8,
    pub time_offset_length: u8,
    pub time_offset_value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataBody {
    #[default]
    Unset,
    HdrCll(HdrCll),
    HdrMdcv(HdrMdcv),
    /// Never constructed: `rw_metadata_obu` returns `Unsupported` before
    /// reaching this arm. Kept as a named tag so the dispatch's scalability
    /// case reads as a deliberate omission rather than an unhandled one.
    Scalability,
    ItutT35(ItutT35),
    Timecode(Timecode),
    /// Opaque payload for any `metadata_type` this crate doesn't decode a
    /// structure for.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPayload {
    pub metadata_type: u64,
    pub body: MetadataBody,
}

fn rw_raw_bytes<IO: Av1BitIo>(io: &mut IO, name: &'static str, bytes: &mut Vec<u8>, len: usize) -> Result<()> {
    if IO::IS_READING {
        *bytes = Vec::with_capacity(len);
    }
    for i in 0..len {
        let mut v = if IO::IS_READING { 0 } else { bytes[i] as u32 };
        io.rw_bits(name, 8, 0, 0xff, &mut v)?;
        if IO::IS_READING {
            bytes.push(v as u8);
        }
    }
    Ok(())
}

fn rw_hdr_cll<IO: Av1BitIo>(io: &mut IO, current: &mut HdrCll) -> Result<()> {
    let mut max_cll = current.max_cll as u32;
    io.rw_bits("max_cll", 16, 0, 0xffff, &mut max_cll)?;
    current.max_cll = max_cll as u16;

    let mut max_fall = current.max_fall as u32;
    io.rw_bits("max_fall", 16, 0, 0xffff, &mut max_fall)?;
    current.max_fall = max_fall as u16;
    Ok(())
}

fn rw_hdr_mdcv<IO: Av1BitIo>(io: &mut IO, current: &mut HdrMdcv) -> Result<()> {
    for i in 0..3 {
        let mut x = current.primary_chromaticity_x[i] as u32;
        io.rw_bits("primary_chromaticity_x", 16, 0, 0xffff, &mut x)?;
        current.primary_chromaticity_x[i] = x as u16;

        let mut y = current.primary_chromaticity_y[i] as u32;
        io.rw_bits("primary_chromaticity_y", 16, 0, 0xffff, &mut y)?;
        current.primary_chromaticity_y[i] = y as u16;
    }

    let mut wx = current.white_point_chromaticity_x as u32;
    io.rw_bits("white_point_chromaticity_x", 16, 0, 0xffff, &mut wx)?;
    current.white_point_chromaticity_x = wx as u16;

    let mut wy = current.white_point_chromaticity_y as u32;
    io.rw_bits("white_point_chromaticity_y", 16, 0, 0xffff, &mut wy)?;
    current.white_point_chromaticity_y = wy as u16;

    io.rw_bits("luminance_max", 32, 0, u32::MAX, &mut current.luminance_max)?;
    io.rw_bits("luminance_min", 32, 0, u32::MAX, &mut current.luminance_min)?;
    Ok(())
}

fn rw_itut_t35<IO: Av1BitIo>(io: &mut IO, current: &mut ItutT35, obu_size: u64, start_bits: u64) -> Result<()> {
    let mut country_code = current.country_code as u32;
    io.rw_bits("itut_t35_country_code", 8, 0, 0xff, &mut country_code)?;
    current.country_code = country_code as u8;

    if current.country_code == 0xFF {
        let mut ext = current.country_code_extension_byte as u32;
        io.rw_bits("itut_t35_country_code_extension_byte", 8, 0, 0xff, &mut ext)?;
        current.country_code_extension_byte = ext as u8;
    } else {
        current.country_code_extension_byte = 0;
    }

    let len = if IO::IS_READING {
        let consumed_bytes = ((io.position() - start_bits) / 8) as u64;
        obu_size.saturating_sub(consumed_bytes) as usize
    } else {
        current.payload.len()
    };
    rw_raw_bytes(io, "itut_t35_payload_bytes", &mut current.payload, len)
}

fn rw_timecode<IO: Av1BitIo>(io: &mut IO, current: &mut Timecode) -> Result<()> {
    let mut counting_type = current.counting_type as u32;
    io.rw_bits("counting_type", 5, 0, 31, &mut counting_type)?;
    current.counting_type = counting_type as u8;

    io.rw_bit("full_timestamp_flag", &mut current.full_timestamp_flag)?;
    io.rw_bit("discontinuity_flag", &mut current.discontinuity_flag)?;
    io.rw_bit("cnt_dropped_flag", &mut current.cnt_dropped_flag)?;

    let mut n_frames = current.n_frames as u32;
    io.rw_bits("n_frames", 9, 0, 511, &mut n_frames)?;
    current.n_frames = n_frames as u16;

    if current.full_timestamp_flag {
        let mut seconds = current.seconds_value as u32;
        io.rw_bits("seconds_value", 6, 0, 59, &mut seconds)?;
        current.seconds_value = seconds as u8;

        let mut minutes = current.minutes_value as u32;
        io.rw_bits("minutes_value", 6, 0, 59, &mut minutes)?;
        current.minutes_value = minutes as u8;

        let mut hours = current.hours_value as u32;
        io.rw_bits("hours_value", 5, 0, 23, &mut hours)?;
        current.hours_value = hours as u8;

        current.seconds_flag = true;
        current.minutes_flag = true;
        current.hours_flag = true;
    } else {
        io.rw_bit("seconds_flag", &mut current.seconds_flag)?;
        if current.seconds_flag {
            let mut seconds = current.seconds_value as u32;
            io.rw_bits("seconds_value", 6, 0, 59, &mut seconds)?;
            current.seconds_value = seconds as u8;

            io.rw_bit("minutes_flag", &mut current.minutes_flag)?;
            if current.minutes_flag {
                let mut minutes = current.minutes_value as u32;
                io.rw_bits("minutes_value", 6, 0, 59, &mut minutes)?;
                current.minutes_value = minutes as u8;

                io.rw_bit("hours_flag", &mut current.hours_flag)?;
                if current.hours_flag {
                    let mut hours = current.hours_value as u32;
                    io.rw_bits("hours_value", 5, 0, 23, &mut hours)?;
                    current.hours_value = hours as u8;
                } else {
                    current.hours_value = 0;
                }
            } else {
                current.minutes_flag = false;
                current.minutes_value = 0;
                current.hours_flag = false;
                current.hours_value = 0;
            }
        } else {
            current.seconds_value = 0;
            current.minutes_flag = false;
            current.minutes_value = 0;
            current.hours_flag = false;
            current.hours_value = 0;
        }
    }

    let mut time_offset_length = current.time_offset_length as u32;
    io.rw_bits("time_offset_length", 5, 0, 31, &mut time_offset_length)?;
    current.time_offset_length = time_offset_length as u8;

    if current.time_offset_length > 0 {
        let max = if current.time_offset_length >= 32 {
            u32::MAX
        } else {
            (1u32 << current.time_offset_length) - 1
        };
        io.rw_bits("time_offset_value", current.time_offset_length, 0, max, &mut current.time_offset_value)?;
    } else {
        current.time_offset_value = 0;
    }
    Ok(())
}

/// `metadata_obu()`. `obu_size` is the declared payload length in bytes
/// (excluding the OBU header and size field), needed to bound the
/// variable-length ITU-T T.35 payload and any opaque fallback payload on
/// read; on write those lengths come from the struct itself.
pub fn rw_metadata_obu<IO: Av1BitIo>(io: &mut IO, current: &mut MetadataPayload, obu_size: u64) -> Result<()> {
    let start_bits = io.position();
    let mut metadata_type = current.metadata_type;
    io.rw_leb128("metadata_type", &mut metadata_type)?;
    current.metadata_type = metadata_type;

    match metadata_type {
        METADATA_TYPE_HDR_CLL => {
            let mut v = match &current.body {
                MetadataBody::HdrCll(v) => *v,
                _ => HdrCll::default(),
            };
            rw_hdr_cll(io, &mut v)?;
            current.body = MetadataBody::HdrCll(v);
        }
        METADATA_TYPE_HDR_MDCV => {
            let mut v = match &current.body {
                MetadataBody::HdrMdcv(v) => *v,
                _ => HdrMdcv::default(),
            };
            rw_hdr_mdcv(io, &mut v)?;
            current.body = MetadataBody::HdrMdcv(v);
        }
        METADATA_TYPE_SCALABILITY => {
            return Err(CbsError::Unsupported("metadata scalability (metadata_type 3) is not decoded".into()));
        }
        METADATA_TYPE_ITUT_T35 => {
            let mut v = match &current.body {
                MetadataBody::ItutT35(v) => v.clone(),
                _ => ItutT35::default(),
            };
            rw_itut_t35(io, &mut v, obu_size, start_bits)?;
            current.body = MetadataBody::ItutT35(v);
        }
        METADATA_TYPE_TIMECODE => {
            let mut v = match &current.body {
                MetadataBody::Timecode(v) => *v,
                _ => Timecode::default(),
            };
            rw_timecode(io, &mut v)?;
            current.body = MetadataBody::Timecode(v);
        }
        _ => {
            let mut raw = match &current.body {
                MetadataBody::Raw(b) => b.clone(),
                _ => Vec::new(),
            };
            let len = if IO::IS_READING {
                let consumed_bytes = ((io.position() - start_bits) / 8) as u64;
                obu_size.saturating_sub(consumed_bytes) as usize
            } else {
                raw.len()
            };
            rw_raw_bytes(io, "metadata_payload", &mut raw, len)?;
            current.body = MetadataBody::Raw(raw);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{BitReader, BitWriter, ReadIo, TraceSink, WriteIo};

    fn round_trip(write: impl FnOnce(&mut WriteIo, &mut MetadataPayload) -> Result<()>) -> (MetadataPayload, Vec<u8>) {
        let mut writer = WriteIo::new(true);
        let mut current = MetadataPayload::default();
        write(&mut writer, &mut current).unwrap();
        writer.writer.byte_align();
        (current, writer.writer.into_bytes())
    }

    #[test]
    fn hdr_cll_round_trips() {
        let (encoded, bytes) = round_trip(|w, current| {
            current.metadata_type = METADATA_TYPE_HDR_CLL;
            current.body = MetadataBody::HdrCll(HdrCll { max_cll: 1000, max_fall: 400 });
            rw_metadata_obu(w, current, 0)
        });

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = MetadataPayload::default();
        rw_metadata_obu(&mut reader, &mut decoded, bytes.len() as u64).unwrap();
        assert_eq!(decoded.metadata_type, encoded.metadata_type);
        assert_eq!(decoded.body, MetadataBody::HdrCll(HdrCll { max_cll: 1000, max_fall: 400 }));
    }

    #[test]
    fn itut_t35_payload_round_trips_to_end_of_obu() {
        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let (_, bytes) = round_trip(|w, current| {
            current.metadata_type = METADATA_TYPE_ITUT_T35;
            current.body = MetadataBody::ItutT35(ItutT35 {
                country_code: 0xB5,
                country_code_extension_byte: 0,
                payload: payload.clone(),
            });
            rw_metadata_obu(w, current, 0)
        });

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = MetadataPayload::default();
        rw_metadata_obu(&mut reader, &mut decoded, bytes.len() as u64).unwrap();
        match decoded.body {
            MetadataBody::ItutT35(t) => {
                assert_eq!(t.country_code, 0xB5);
                assert_eq!(t.payload, payload);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn scalability_metadata_is_unsupported() {
        let mut writer = WriteIo::new(true);
        let mut current = MetadataPayload { metadata_type: METADATA_TYPE_SCALABILITY, body: MetadataBody::Unset };
        let err = rw_metadata_obu(&mut writer, &mut current, 0).unwrap_err();
        assert!(matches!(err, CbsError::Unsupported(_)));
    }

    #[test]
    fn unknown_metadata_type_keeps_opaque_payload() {
        let raw = vec![1, 2, 3];
        let (_, bytes) = round_trip(|w, current| {
            current.metadata_type = 200;
            current.body = MetadataBody::Raw(raw.clone());
            rw_metadata_obu(w, current, 0)
        });

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = MetadataPayload::default();
        rw_metadata_obu(&mut reader, &mut decoded, bytes.len() as u64).unwrap();
        assert_eq!(decoded.metadata_type, 200);
        assert_eq!(decoded.body, MetadataBody::Raw(raw));
    }

    #[test]
    fn timecode_round_trips_with_minutes_flag_but_no_hours() {
        let (_, bytes) = round_trip(|w, current| {
            current.metadata_type = METADATA_TYPE_TIMECODE;
            current.body = MetadataBody::Timecode(Timecode {
                counting_type: 1,
                full_timestamp_flag: false,
                discontinuity_flag: false,
                cnt_dropped_flag: false,
                n_frames: 24,
                seconds_flag: true,
                seconds_value: 30,
                minutes_flag: true,
                minutes_value: 15,
                hours_flag: false,
                hours_value: 0,
                time_offset_length: 0,
                time_offset_value: 0,
            });
            rw_metadata_obu(w, current, 0)
        });

        let mut reader = ReadIo { reader: BitReader::new(&bytes), trace: TraceSink::disabled() };
        let mut decoded = MetadataPayload::default();
        rw_metadata_obu(&mut reader, &mut decoded, bytes.len() as u64).unwrap();
        match decoded.body {
            MetadataBody::Timecode(t) => {
                assert_eq!(t.seconds_value, 30);
                assert_eq!(t.minutes_value, 15);
                assert!(!t.hours_flag);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
