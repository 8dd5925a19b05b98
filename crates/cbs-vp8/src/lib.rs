//! VP8 coded bitstream syntax: the uncompressed frame tag, the boolean-
//! coded compressed header, and the [`cbs_core::CodecPlugin`] wiring that
//! drives them. Read-only: reassembling or re-encoding a VP8 frame from a
//! decomposed [`types::Frame`] is out of scope, matching the upstream
//! reference decoder's own unimplemented write path.

pub mod bool_decoder;
pub mod header;
pub mod plugin;
pub mod types;

pub use plugin::Vp8Codec;
pub use types::{Frame, FrameHeader, Vp8State};
