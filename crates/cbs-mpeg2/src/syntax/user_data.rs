//! `user_data` and `sequence_end`: the two unit types whose payload is
//! either arbitrary trailing bytes or nothing at all.
//!
//! Grounded on `cbs_mpeg2_syntax_template.c`'s `FUNC(user_data)` and
//! `FUNC(sequence_end)`.

use cbs_core::{BitIo, Result};

use crate::codings::Mpeg2BitIo;
use crate::types::{SequenceEnd, UserData};

/// The C implementation pre-sizes its allocation from `get_bits_left`
/// before reading; a `Vec` needs no such pre-pass, so the byte run is just
/// pushed on read and replayed on write.
pub fn rw_user_data<IO: BitIo + Mpeg2BitIo>(io: &mut IO, current: &mut UserData) -> Result<()> {
    if IO::IS_READING {
        current.data.clear();
        while io.remaining_bits() >= 8 {
            let mut v = 0u32;
            io.rw_bits("user_data", 8, 0, 255, &mut v)?;
            current.data.push(v as u8);
        }
    } else {
        for &byte in current.data.iter() {
            let mut v = byte as u32;
            io.rw_bits("user_data", 8, 0, 255, &mut v)?;
        }
    }
    Ok(())
}

pub fn rw_sequence_end<IO: BitIo>(_io: &mut IO, _current: &mut SequenceEnd) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    #[test]
    fn user_data_round_trips_arbitrary_bytes() {
        let mut current = UserData { data: vec![0xDE, 0xAD, 0xBE, 0xEF] };
        let mut w = WriteIo::new(false);
        rw_user_data(&mut w, &mut current).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = UserData::default();
        rw_user_data(&mut r, &mut decoded).unwrap();
        assert_eq!(decoded.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
