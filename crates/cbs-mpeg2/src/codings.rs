//! MPEG-2-specific bit codings layered on [`BitIo`]: signed fixed-width
//! fields, marker bits, and the one genuinely direction-asymmetric
//! primitive this codec needs — peeking ahead to decide whether an
//! optional field group is present at all.
//!
//! Grounded on `ff_cbs_read_signed`/`ff_cbs_write_signed` and the
//! `marker_bit`/`nextbits`/`infer` macros in `cbs_mpeg2.c`.

use cbs_core::{BitIo, CbsError, ReadIo, Result, WriteIo};

/// `marker_bit`: a fixed `1` bit inserted to avoid start-code emulation.
pub fn rw_marker_bit<IO: BitIo>(io: &mut IO) -> Result<()> {
    let mut v = 1u32;
    io.rw_bits("marker_bit", 1, 1, 1, &mut v)
}

/// An `n`-bit two's-complement signed field (the `si`/`sis` elements: quant
/// matrix deltas are unsigned, but frame-centre offsets are signed).
pub fn rw_signed<IO: BitIo>(io: &mut IO, name: &'static str, n: u8, value: &mut i32) -> Result<()> {
    let max_unsigned = (1u32 << n) - 1;
    let mut raw = if IO::IS_READING {
        0
    } else {
        let v = *value;
        if v < 0 {
            (v as i64 + (1i64 << n)) as u32
        } else {
            v as u32
        }
    };
    io.rw_bits(name, n, 0, max_unsigned, &mut raw)?;
    let half = 1u32 << (n - 1);
    *value = if raw >= half { raw as i32 - (1i64 << n) as i32 } else { raw as i32 };
    Ok(())
}

/// Assigns an inferred value on read; on write, warns (but does not fail)
/// if the caller's value disagrees, since MPEG-2 tolerates this mismatch
/// rather than treating it as fatal the way AV1 does.
pub fn infer_u32_tolerant(is_reading: bool, value: &mut u32, inferred: u32, name: &'static str) {
    if is_reading {
        *value = inferred;
    } else if *value != inferred {
        tracing::warn!(element = name, got = *value, expected = inferred, "inferred value mismatch");
    }
}

/// Direction-asymmetric presence check for a conditionally-emitted field
/// group (the slice-header extension fields): on read, peeks the next bit
/// without consuming it, matching the C macro's `nextbits(1, 1, var)`; on
/// write there is nothing to peek, so the caller's already-known presence
/// decides the branch, matching the macro's write-side `(var)` expansion.
pub trait Mpeg2BitIo: BitIo {
    fn peek_flag(&mut self, would_write: bool) -> Result<bool>;

    /// Bits left in the source buffer. Only meaningful on the read side;
    /// a writer has nothing to run out of, so it reports `u64::MAX`.
    fn remaining_bits(&self) -> u64;
}

impl Mpeg2BitIo for ReadIo<'_> {
    fn peek_flag(&mut self, _would_write: bool) -> Result<bool> {
        if self.reader.remaining_bits() < 1 {
            return Err(CbsError::insufficient_data(1, 0));
        }
        Ok(self.reader.peek_bits(1)? == 1)
    }

    fn remaining_bits(&self) -> u64 {
        self.reader.remaining_bits()
    }
}

impl Mpeg2BitIo for WriteIo {
    fn peek_flag(&mut self, would_write: bool) -> Result<bool> {
        Ok(would_write)
    }

    fn remaining_bits(&self) -> u64 {
        u64::MAX
    }
}

/// `extra_information`: a run of marker-prefixed bytes terminated by a
/// zero marker bit. The C implementation pre-scans the bitstream under
/// `#ifdef READ` to size an allocation before filling it; a `Vec` needs no
/// such two-pass dance, so the read and write arms here simply diverge on
/// `IO::IS_READING` the way other direction-asymmetric loops in this
/// workspace already do.
pub fn rw_extra_information<IO: BitIo>(io: &mut IO, values: &mut Vec<u8>) -> Result<()> {
    if IO::IS_READING {
        values.clear();
        loop {
            let mut marker = false;
            io.rw_bit("extra_bit", &mut marker)?;
            if !marker {
                break;
            }
            let mut v = 0u32;
            io.rw_bits("extra_information", 8, 0, 255, &mut v)?;
            values.push(v as u8);
        }
    } else {
        for &byte in values.iter() {
            let mut marker = true;
            io.rw_bit("extra_bit", &mut marker)?;
            let mut v = byte as u32;
            io.rw_bits("extra_information", 8, 0, 255, &mut v)?;
        }
        let mut marker = false;
        io.rw_bit("extra_bit", &mut marker)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_round_trips_negative_and_positive() {
        for &value in &[-(1 << 15), -1, 0, 1, (1 << 15) - 1] {
            let mut w = WriteIo::new(false);
            let mut v = value;
            rw_signed(&mut w, "x", 16, &mut v).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = 0;
            rw_signed(&mut r, "x", 16, &mut decoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn extra_information_round_trips_empty_and_nonempty() {
        for values in [vec![], vec![0x11u8], vec![0xAA, 0xBB, 0xCC]] {
            let mut w = WriteIo::new(false);
            let mut input = values.clone();
            rw_extra_information(&mut w, &mut input).unwrap();
            w.writer.byte_align();
            let bytes = w.writer.into_bytes();
            let mut r = ReadIo::new(&bytes);
            let mut decoded = Vec::new();
            rw_extra_information(&mut r, &mut decoded).unwrap();
            assert_eq!(decoded, values);
        }
    }

    #[test]
    fn peek_flag_reads_ahead_without_consuming() {
        let data = [0b1000_0000u8];
        let mut r = ReadIo::new(&data);
        assert!(r.peek_flag(false).unwrap());
        assert_eq!(r.reader.position(), 0);
        let mut bit = false;
        r.rw_bit("slice_extension_flag", &mut bit).unwrap();
        assert!(bit);
    }

    #[test]
    fn marker_bit_round_trips() {
        let mut w = WriteIo::new(false);
        rw_marker_bit(&mut w).unwrap();
        let bytes = w.writer.into_bytes();
        let mut r = ReadIo::new(&bytes);
        rw_marker_bit(&mut r).unwrap();
    }
}
