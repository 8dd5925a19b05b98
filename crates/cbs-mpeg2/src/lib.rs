//! MPEG-2 Video coded bitstream syntax: start-code framing, sequence/
//! picture/slice header parsing and the [`cbs_core::CodecPlugin`] wiring
//! that drives them.

pub mod assemble;
pub mod codings;
pub mod plugin;
pub mod start_code;
pub mod syntax;
pub mod types;

pub use plugin::Mpeg2Codec;
pub use types::{Mpeg2State, PictureHeader, SequenceHeader, Slice, SliceHeader};
