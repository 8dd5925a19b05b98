//! `group_of_pictures_header`: a 25-bit `time_code` plus two flags.
//!
//! Grounded on `cbs_mpeg2_syntax_template.c`'s `FUNC(group_of_pictures_header)`
//! and field naming on `bitvue-mpeg2-codec::gop::GopHeader`.

use cbs_core::{BitIo, Result};

use crate::types::GroupOfPicturesHeader;

pub fn rw_group_of_pictures_header<IO: BitIo>(io: &mut IO, current: &mut GroupOfPicturesHeader) -> Result<()> {
    io.rw_bit("drop_frame_flag", &mut current.drop_frame_flag)?;

    let mut hours = current.time_code_hours as u32;
    io.rw_bits("time_code_hours", 5, 0, 23, &mut hours)?;
    current.time_code_hours = hours as u8;

    let mut minutes = current.time_code_minutes as u32;
    io.rw_bits("time_code_minutes", 6, 0, 59, &mut minutes)?;
    current.time_code_minutes = minutes as u8;

    crate::codings::rw_marker_bit(io)?;

    let mut seconds = current.time_code_seconds as u32;
    io.rw_bits("time_code_seconds", 6, 0, 59, &mut seconds)?;
    current.time_code_seconds = seconds as u8;

    let mut pictures = current.time_code_pictures as u32;
    io.rw_bits("time_code_pictures", 6, 0, 59, &mut pictures)?;
    current.time_code_pictures = pictures as u8;

    io.rw_bit("closed_gop", &mut current.closed_gop)?;
    io.rw_bit("broken_link", &mut current.broken_link)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::{ReadIo, WriteIo};

    #[test]
    fn gop_header_round_trips() {
        let mut current = GroupOfPicturesHeader {
            drop_frame_flag: false,
            time_code_hours: 1,
            time_code_minutes: 30,
            time_code_seconds: 45,
            time_code_pictures: 12,
            closed_gop: true,
            broken_link: false,
        };
        let mut w = WriteIo::new(false);
        rw_group_of_pictures_header(&mut w, &mut current).unwrap();
        w.writer.byte_align();
        let bytes = w.writer.into_bytes();

        let mut r = ReadIo::new(&bytes);
        let mut decoded = GroupOfPicturesHeader::default();
        rw_group_of_pictures_header(&mut r, &mut decoded).unwrap();
        assert_eq!(decoded.time_code_hours, 1);
        assert_eq!(decoded.time_code_minutes, 30);
        assert_eq!(decoded.time_code_seconds, 45);
        assert_eq!(decoded.time_code_pictures, 12);
        assert!(decoded.closed_gop);
    }
}
