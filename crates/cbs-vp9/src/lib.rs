//! VP9 coded bitstream syntax: the uncompressed frame header, the
//! superframe index that packs hidden alt-ref frames alongside a visible
//! one, and the [`cbs_core::CodecPlugin`] wiring that drives both
//! directions.

pub mod assemble;
pub mod codings;
pub mod plugin;
pub mod syntax;
pub mod types;

pub use plugin::Vp9Codec;
pub use types::{Frame, FrameHeader, Vp9State};
