//! Generic coded bitstream (CBS) framework: context, fragment, unit model,
//! bit I/O, and the dispatcher that drives a codec plug-in's split/read/
//! write/assemble cycle.
//!
//! Codec-specific syntax lives in the sibling `cbs-av1`, `cbs-mpeg2`,
//! `cbs-vp8` and `cbs-vp9` crates, each implementing [`plugin::CodecPlugin`].

pub mod bitio;
pub mod buffer;
pub mod context;
pub mod error;
pub mod fragment;
pub mod plugin;
pub mod trace;
pub mod unit;

pub use bitio::{BitIo, BitReader, BitWriter, LsbBitReader, ReadIo, WriteIo};
pub use buffer::{buffer_from_slice, buffer_from_vec, Buffer, BufferView};
pub use context::Context;
pub use error::{CbsError, Result};
pub use fragment::Fragment;
pub use plugin::{CodecPlugin, PluginState};
pub use trace::TraceSink;
pub use unit::{Unit, UnitContent, UnitType};
