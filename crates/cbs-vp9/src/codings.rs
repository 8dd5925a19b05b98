//! VP9-specific bit codings layered on top of [`BitIo`]: signed
//! magnitude-plus-sign values, unary-coded increments, little-endian
//! multi-byte fields and the conditional "probability" and "delta-q"
//! shapes the frame header uses.
//!
//! Grounded on `cbs_vp9_read_s`/`cbs_vp9_write_s`,
//! `cbs_vp9_read_increment`/`cbs_vp9_write_increment`,
//! `cbs_vp9_read_le`/`cbs_vp9_write_le` and the `delta_q`/`prob` macros in
//! `examples/original_source/libavcodec/cbs_vp9.c`.

use cbs_core::{BitIo, CbsError, ReadIo, Result, WriteIo};

pub trait Vp9BitIo: BitIo {
    /// `s`/`ss`: a `width`-bit magnitude followed by a dedicated sign bit.
    fn rw_signed(&mut self, name: &'static str, width: u8, value: &mut i32) -> Result<()>;

    /// `increment`: a unary-coded value in `[min, max]` — one `1` bit per
    /// step above `min`, terminated by either a `0` bit or reaching `max`
    /// (where the terminator is implicit, per `cbs_vp9_write_increment`'s
    /// `value != range_max` check).
    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()>;

    /// `fle`: a little-endian field whose width is a multiple of 8 bits,
    /// used only by the superframe index's per-frame size fields.
    fn rw_le(&mut self, name: &'static str, width: u8, value: &mut u32) -> Result<()>;

    /// `delta_q`: a `delta_coded` flag gating a signed 4-bit value,
    /// collapsing to `0` when the flag is false.
    fn rw_delta_q(&mut self, name: &'static str, value: &mut i8) -> Result<()> {
        let mut coded = *value != 0;
        self.rw_bit(name, &mut coded)?;
        if coded {
            let mut v = *value as i32;
            self.rw_signed(name, 4, &mut v)?;
            *value = v as i8;
        } else {
            *value = 0;
        }
        Ok(())
    }

    /// `prob`: a `prob_coded` flag gating an 8-bit probability, collapsing
    /// to the implicit default `255` when the flag is false.
    fn rw_prob(&mut self, name: &'static str, value: &mut u8) -> Result<()> {
        let mut coded = *value != 255;
        self.rw_bit(name, &mut coded)?;
        if coded {
            let mut v = *value as u32;
            self.rw_bits(name, 8, 0, 255, &mut v)?;
            *value = v as u8;
        } else {
            *value = 255;
        }
        Ok(())
    }
}

impl Vp9BitIo for ReadIo<'_> {
    fn rw_signed(&mut self, name: &'static str, width: u8, value: &mut i32) -> Result<()> {
        let position = self.position();
        if (self.reader.remaining_bits() as u64) < width as u64 + 1 {
            return Err(CbsError::insufficient_data(width as usize + 1, self.reader.remaining_bits() as usize));
        }
        let magnitude = self.reader.read_bits(width)?;
        let sign = self.reader.read_bit()?;
        *value = if sign { -(magnitude as i32) } else { magnitude as i32 };
        self.trace.syntax_element(position, name, &[], width + 1, *value as u32 as u64);
        Ok(())
    }

    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()> {
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

    fn rw_le(&mut self, name: &'static str, width: u8, value: &mut u32) -> Result<()> {
        if width % 8 != 0 {
            return Err(CbsError::invalid_data(name, "le width must be a multiple of 8"));
        }
        let position = self.position();
        let mut v = 0u32;
        let mut shift = 0u8;
        while shift < width {
            let byte = self.reader.read_bits(8)?;
            v |= byte << shift;
            shift += 8;
        }
        *value = v;
        self.trace.syntax_element(position, name, &[], width, v as u64);
        Ok(())
    }
}

impl Vp9BitIo for WriteIo {
    fn rw_signed(&mut self, name: &'static str, width: u8, value: &mut i32) -> Result<()> {
        let position = self.position();
        let sign = *value < 0;
        let magnitude = value.unsigned_abs();
        self.writer.write_bits(magnitude, width)?;
        self.writer.write_bit(sign)?;
        self.trace.syntax_element(position, name, &[], width + 1, *value as u32 as u64);
        Ok(())
    }

    fn rw_increment(&mut self, name: &'static str, min: u32, max: u32, value: &mut u32) -> Result<()> {
        if *value < min || *value > max {
            return Err(CbsError::invalid_data(name, format!("value {} out of range [{min}, {max}]", *value)));
        }
        let position = self.position();
        let len = if *value == max { max - min } else { *value - min + 1 };
        for i in 0..len {
            let bit = min + i != *value;
            self.writer.write_bit(bit)?;
        }
        self.trace.syntax_element(position, name, &[], 32, *value as u64);
        Ok(())
    }

    fn rw_le(&mut self, name: &'static str, width: u8, value: &mut u32) -> Result<()> {
        if width % 8 != 0 {
            return Err(CbsError::invalid_data(name, "le width must be a multiple of 8"));
        }
        let position = self.position();
        let mut shift = 0u8;
        while shift < width {
            self.writer.write_bits((*value >> shift) & 0xff, 8)?;
            shift += 8;
        }
        self.trace.syntax_element(position, name, &[], width, *value as u64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_value_round_trips_negative() {
        let mut w = WriteIo::new(false);
        let mut value = -17i32;
        w.rw_signed("delta", 6, &mut value).unwrap();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut back = 0i32;
        r.rw_signed("delta", 6, &mut back).unwrap();
        assert_eq!(back, -17);
    }

    #[test]
    fn increment_stops_at_first_zero_bit() {
        let data = [0b1010_0000];
        let mut r = ReadIo::new(&data);
        let mut value = 0u32;
        r.rw_increment("tile_cols_log2", 0, 4, &mut value).unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn increment_at_max_needs_no_terminator() {
        let mut w = WriteIo::new(false);
        let mut value = 2u32;
        w.rw_increment("tile_rows_log2", 0, 2, &mut value).unwrap();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut back = 0u32;
        r.rw_increment("tile_rows_log2", 0, 2, &mut back).unwrap();
        assert_eq!(back, 2);
    }

    #[test]
    fn le_field_round_trips_little_endian_byte_order() {
        let mut w = WriteIo::new(false);
        let mut value = 0x1234u32;
        w.rw_le("frame_size", 16, &mut value).unwrap();
        let bytes = w.writer.into_bytes();
        assert_eq!(bytes, vec![0x34, 0x12]);

        let mut r = ReadIo::new(&bytes);
        let mut back = 0u32;
        r.rw_le("frame_size", 16, &mut back).unwrap();
        assert_eq!(back, 0x1234);
    }

    #[test]
    fn prob_defaults_to_255_when_not_coded() {
        let data = [0x00];
        let mut r = ReadIo::new(&data);
        let mut value = 0u8;
        r.rw_prob("segmentation_tree_probs", &mut value).unwrap();
        assert_eq!(value, 255);
    }
}
