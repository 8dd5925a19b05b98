//! AV1-specific variable-length codings: uvlc, ns, increment, subexp,
//! delta-q and trailing-bits.
//!
//! Grounded on `cbs_av1_read_*`/`cbs_av1_write_*` in
//! `examples/original_source/libavcodec/cbs_av1.c`. Each coding is exposed
//! as one method pair on [`Av1BitIo`], implemented once for [`ReadIo`] and
//! once for [`WriteIo`], so a syntax routine written generically over
//! `impl Av1BitIo` gets read/write symmetry without branching on direction
//! itself.

use cbs_core::{BitIo, CbsError, ReadIo, Result, WriteIo};

fn log2_floor(value: u32) -> u32 {
    31 - value.leading_zeros()
}

/// AV1-specific bit codings layered on top of [`BitIo`]'s fixed-width,
/// range-checked primitive.
pub trait Av1BitIo: BitIo {
    fn rw_uvlc(&mut self, name: &'static str, value: &mut u32) -> Result<()>;
    fn rw_ns(&mut self, name: &'static str, n: u32, value: &mut u32) -> Result<()>;
    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()>;
    fn rw_subexp(&mut self, name: &'static str, range_max: u32, value: &mut u32) -> Result<()>;
    fn rw_leb128(&mut self, name: &'static str, value: &mut u64) -> Result<()>;
}

impl Av1BitIo for ReadIo<'_> {
    fn rw_uvlc(&mut self, name: &'static str, value: &mut u32) -> Result<()> {
        let position = self.position();
        let mut zeroes: u32 = 0;
        loop {
            if self.reader.remaining_bits() < 1 {
                return Err(CbsError::invalid_data(name, "bitstream ended in uvlc code"));
            }
            if self.reader.read_bit()? {
                break;
            }
            zeroes = zeroes.saturating_add(1);
        }

        *value = if zeroes >= 32 {
            u32::MAX
        } else {
            if (self.reader.remaining_bits() as u32) < zeroes {
                return Err(CbsError::invalid_data(name, "bitstream ended in uvlc code"));
            }
            let bits_value = self.reader.read_bits(zeroes as u8)?;
            bits_value + (1u32 << zeroes) - 1
        };
        self.trace.syntax_element(position, name, &[], 32, *value as u64);
        Ok(())
    }

    fn rw_ns(&mut self, name: &'static str, n: u32, value: &mut u32) -> Result<()> {
        debug_assert!(n > 0, "ns() requires n > 0");
        let position = self.position();
        let w = log2_floor(n) + 1;
        let m = (1u32 << w) - n;

        if (self.reader.remaining_bits() as u32) < w {
            return Err(CbsError::invalid_data(name, "bitstream ended in ns code"));
        }

        let v = if w - 1 > 0 { self.reader.read_bits((w - 1) as u8)? } else { 0 };

        *value = if v < m {
            v
        } else {
            let extra_bit = self.reader.read_bit()? as u32;
            (v << 1) - m + extra_bit
        };
        self.trace.syntax_element(position, name, &[], w as u8, *value as u64);
        Ok(())
    }

    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()> {
        debug_assert!(min <= max && max - min < 32);
        let position = self.position();
        let mut v = min;
        while v < max {
            if self.reader.remaining_bits() < 1 {
                return Err(CbsError::invalid_data(name, "bitstream ended in increment code"));
            }
            if self.reader.read_bit()? {
                v += 1;
            } else {
                break;
            }
        }
        *value = v;
        self.trace.syntax_element(position, name, &[], 32, v as u64);
        Ok(())
    }

    fn rw_subexp(&mut self, name: &'static str, range_max: u32, value: &mut u32) -> Result<()> {
        debug_assert!(range_max > 0);
        let max_len = log2_floor(range_max - 1).saturating_sub(3);
        let mut len = 0u32;
        self.rw_increment("subexp_more_bits", 0, max_len, &mut len)?;

        let (range_bits, range_offset) = if len > 0 {
            let range_bits = 2 + len;
            (range_bits, 1u32 << range_bits)
        } else {
            (3, 0u32)
        };

        let v = if len < max_len {
            let mut v = 0u32;
            let max = if range_bits >= 32 { u32::MAX } else { (1u32 << range_bits) - 1 };
            self.rw_bits("subexp_bits", range_bits as u8, 0, max, &mut v)?;
            v
        } else {
            let mut v = 0u32;
            self.rw_ns("subexp_final_bits", range_max - range_offset, &mut v)?;
            v
        };
        *value = v + range_offset;
        Ok(())
    }

    fn rw_leb128(&mut self, name: &'static str, value: &mut u64) -> Result<()> {
        let mut v: u64 = 0;
        for i in 0..8u32 {
            let mut byte = 0u32;
            self.rw_bits("leb128_byte", 8, 0x00, 0xff, &mut byte)?;
            v |= (byte as u64 & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                break;
            }
        }
        if v > u32::MAX as u64 {
            return Err(CbsError::invalid_data(name, "leb128 value exceeds 2^32 - 1"));
        }
        *value = v;
        Ok(())
    }
}

impl Av1BitIo for WriteIo {
    fn rw_uvlc(&mut self, name: &'static str, value: &mut u32) -> Result<()> {
        let position = self.position();
        let v = *value;
        let zeroes = log2_floor(v + 1);
        let low = v - (1u32 << zeroes) + 1;
        for _ in 0..zeroes {
            self.writer.write_bit(false)?;
        }
        self.writer.write_bit(true)?;
        if zeroes > 0 {
            self.writer.write_bits(low, zeroes as u8)?;
        }
        self.trace.syntax_element(position, name, &[], 32, v as u64);
        Ok(())
    }

    fn rw_ns(&mut self, name: &'static str, n: u32, value: &mut u32) -> Result<()> {
        let position = self.position();
        let v = *value;
        if v > n {
            return Err(CbsError::invalid_data(name, format!("value {v} out of range [0, {n}]")));
        }
        let w = log2_floor(n) + 1;
        let m = (1u32 << w) - n;
        if v < m {
            if w - 1 > 0 {
                self.writer.write_bits(v, (w - 1) as u8)?;
            }
        } else {
            let bits = m + ((v - m) >> 1);
            let extra_bit = (v - m) & 1;
            if w - 1 > 0 {
                self.writer.write_bits(bits, (w - 1) as u8)?;
            }
            self.writer.write_bit(extra_bit == 1)?;
        }
        self.trace.syntax_element(position, name, &[], w as u8, v as u64);
        Ok(())
    }

    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()> {
        let position = self.position();
        let v = *value;
        if v < min || v > max {
            return Err(CbsError::invalid_data(name, format!("value {v} out of range [{min}, {max}]")));
        }
        let len = if v == max { max - min } else { v - min + 1 };
        for i in 0..len {
            self.writer.write_bit(min + i != v)?;
        }
        self.trace.syntax_element(position, name, &[], 32, v as u64);
        Ok(())
    }

    fn rw_subexp(&mut self, name: &'static str, range_max: u32, value: &mut u32) -> Result<()> {
        let v = *value;
        if v > range_max {
            return Err(CbsError::invalid_data(name, format!("value {v} out of range [0, {range_max}]")));
        }
        let max_len = log2_floor(range_max - 1).saturating_sub(3);

        let (range_bits, range_offset, mut len) = if v < 8 {
            (3u32, 0u32, 0u32)
        } else {
            let mut range_bits = log2_floor(v);
            let mut len = range_bits - 2;
            if len > max_len {
                range_bits -= 1;
                len = max_len;
            }
            (range_bits, 1u32 << range_bits, len)
        };

        self.rw_increment("subexp_more_bits", 0, max_len, &mut len)?;

        if len < max_len {
            let mut payload = v - range_offset;
            let max = if range_bits >= 32 { u32::MAX } else { (1u32 << range_bits) - 1 };
            self.rw_bits("subexp_bits", range_bits as u8, 0, max, &mut payload)?;
        } else {
            let mut payload = v - range_offset;
            self.rw_ns("subexp_final_bits", range_max - range_offset, &mut payload)?;
        }
        Ok(())
    }

    fn rw_leb128(&mut self, name: &'static str, value: &mut u64) -> Result<()> {
        let v = *value;
        if v > u32::MAX as u64 {
            return Err(CbsError::invalid_data(name, "leb128 value exceeds 2^32 - 1"));
        }
        let len = (crate::leb128::leb128_size(v)) as u32;
        for i in 0..len {
            let mut byte = ((v >> (7 * i)) & 0x7f) as u32;
            if i < len - 1 {
                byte |= 0x80;
            }
            self.rw_bits("leb128_byte", 8, 0x00, 0xff, &mut byte)?;
        }
        Ok(())
    }
}

/// `delta_q`: a one-bit presence flag followed by a signed 6-bit
/// sign-magnitude delta, or an inferred zero when absent.
pub fn rw_delta_q<IO: Av1BitIo>(io: &mut IO, name: &'static str, value: &mut i32) -> Result<()> {
    let mut present = if IO::IS_READING { false } else { *value != 0 };
    io.rw_bit("delta_coded", &mut present)?;
    if present {
        let mut magnitude = if IO::IS_READING { 0 } else { value.unsigned_abs() };
        io.rw_bits("delta_q", 6, 0, 63, &mut magnitude)?;
        let mut sign = if IO::IS_READING { false } else { *value < 0 };
        io.rw_bit("delta_q_sign", &mut sign)?;
        *value = if sign { -(magnitude as i32) } else { magnitude as i32 };
    } else {
        *value = 0;
    }
    Ok(())
}

/// `su(n)`: an `n`-bit fixed-width field reinterpreted as two's complement,
/// used for signed deltas (loop filter ref/mode deltas, segmentation
/// feature values) that don't need `subexp`'s variable length.
pub fn rw_su<IO: BitIo>(io: &mut IO, name: &'static str, n: u8, value: &mut i32) -> Result<()> {
    let half = 1u32 << (n - 1);
    let max = (1u32 << n) - 1;
    let mut raw = if IO::IS_READING {
        0
    } else if *value < 0 {
        (*value + (1i64 << n) as i32) as u32
    } else {
        *value as u32
    };
    io.rw_bits(name, n, 0, max, &mut raw)?;
    *value = if raw >= half { raw as i32 - (1i64 << n) as i32 } else { raw as i32 };
    Ok(())
}

/// `trailing_bits`: one 1-bit, then 0-padding to byte alignment.
pub fn rw_trailing_bits<IO: BitIo>(io: &mut IO) -> Result<()> {
    let mut one = true;
    io.rw_bit("trailing_one_bit", &mut one)?;
    while io.position() % 8 != 0 {
        let mut zero = false;
        io.rw_bit("trailing_zero_bit", &mut zero)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvlc_round_trips() {
        for &value in &[0u32, 1, 2, 3, 127, 1000, u32::MAX] {
            let mut w = WriteIo::new(true);
            let mut v = value;
            w.rw_uvlc("x", &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0u32;
            r.rw_uvlc("x", &mut decoded).unwrap();
            assert_eq!(decoded, value, "uvlc roundtrip failed for {value}");
        }
    }

    #[test]
    fn ns_round_trips_full_range() {
        let n = 11;
        for value in 0..=n {
            let mut w = WriteIo::new(true);
            let mut v = value;
            w.rw_ns("x", n, &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0u32;
            r.rw_ns("x", n, &mut decoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn increment_round_trips() {
        for value in 0..=5u32 {
            let mut w = WriteIo::new(true);
            let mut v = value;
            w.rw_increment("x", 0, 5, &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0u32;
            r.rw_increment("x", 0, 5, &mut decoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn subexp_round_trips() {
        let range_max = 255;
        for &value in &[0u32, 1, 7, 8, 15, 63, 200, 255] {
            let mut w = WriteIo::new(true);
            let mut v = value;
            w.rw_subexp("x", range_max, &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0u32;
            r.rw_subexp("x", range_max, &mut decoded).unwrap();
            assert_eq!(decoded, value, "subexp roundtrip failed for {value}");
        }
    }

    #[test]
    fn delta_q_inferred_zero_when_absent() {
        let mut w = WriteIo::new(true);
        let mut value = 0;
        rw_delta_q(&mut w, "delta_q_y_dc", &mut value).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();
        let mut r = ReadIo::new(&bytes);
        let mut decoded = 1;
        rw_delta_q(&mut r, "delta_q_y_dc", &mut decoded).unwrap();
        assert_eq!(decoded, 0);
    }

    #[test]
    fn delta_q_round_trips_negative_value() {
        let mut w = WriteIo::new(true);
        let mut value = -17;
        rw_delta_q(&mut w, "delta_q_y_dc", &mut value).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();
        let mut r = ReadIo::new(&bytes);
        let mut decoded = 0;
        rw_delta_q(&mut r, "delta_q_y_dc", &mut decoded).unwrap();
        assert_eq!(decoded, -17);
    }

    #[test]
    fn su_round_trips_negative_and_positive() {
        for &value in &[-64i32, -1, 0, 1, 63] {
            let mut w = WriteIo::new(true);
            let mut v = value;
            rw_su(&mut w, "x", 7, &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0;
            rw_su(&mut r, "x", 7, &mut decoded).unwrap();
            assert_eq!(decoded, value, "su roundtrip failed for {value}");
        }
    }
}
