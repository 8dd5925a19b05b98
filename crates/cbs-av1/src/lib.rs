//! AV1 coded bitstream syntax: OBU framing, sequence/frame header parsing,
//! metadata payloads and the [`cbs_core::CodecPlugin`] wiring that drives
//! them.

pub mod assemble;
pub mod codings;
pub mod leb128;
pub mod plugin;
pub mod split;
pub mod syntax;
pub mod types;

pub use plugin::Av1Codec;
pub use syntax::obu::{Av1Obu, Av1ObuBody, ObuHeaderInfo};
pub use types::{Av1State, FrameHeader, ObuType, SequenceHeader, TileGroup};
