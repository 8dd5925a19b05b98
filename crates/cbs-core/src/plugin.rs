//! `CodecPlugin`: the per-codec hook table that the dispatcher drives.
//!
//! Grounded on the function-pointer table implied by `CodedBitstreamType`
//! in the original C framework (referenced from `CodedBitstreamContext`
//! but not itself reproduced in the excerpt this crate read); translated
//! into a Rust trait so each codec crate provides one `impl` instead of a
//! `static` table of function pointers.

use crate::error::Result;
use crate::fragment::Fragment;
use crate::trace::TraceSink;

/// Per-codec private state, owned by the `Context` and threaded through
/// every call. Each codec crate defines its own concrete type (AV1's
/// sequence header + reference table, MPEG-2's derived sizes, VP9's
/// reference table) and implements `Default` for a fresh session.
pub trait PluginState: Default + std::fmt::Debug {
    /// Called when a context is reused for a new, logically distinct
    /// stream: clears sequence-level continuity state (AV1 `seen_frame_header`,
    /// reference frame tables) without deallocating the state object itself.
    fn flush(&mut self);
}

/// The operations a codec plug-in must provide. `S` is that codec's
/// private state type.
pub trait CodecPlugin {
    type State: PluginState;

    fn name(&self) -> &'static str;

    /// Carves `fragment.data()` into units. `is_header` is set when the
    /// bytes originate from a container parameter-block region (AV1 uses
    /// it to detect an `AV1CodecConfigurationRecord` prefix); other codecs
    /// ignore it.
    fn split_fragment(&self, fragment: &mut Fragment, is_header: bool, trace: &mut TraceSink) -> Result<()>;

    /// Decomposes one unit's raw bytes into typed content, mutating
    /// `state` with any persistent, cross-unit information (sequence
    /// headers, reference frame slots). Returning `Err(CbsError::Unsupported)`
    /// leaves the unit's raw bytes in place; returning `Err(CbsError::TryAgain)`
    /// signals the unit should be dropped (AV1 operating-point filtering).
    fn read_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()>;

    /// Serialises one unit's decomposed content back to bytes, replacing
    /// `fragment.units()[index]`'s data view. Returns `Err(CbsError::Overflow)`
    /// if the supplied scratch capacity was too small; the dispatcher
    /// doubles it and retries.
    fn write_unit(&self, fragment: &mut Fragment, index: usize, state: &mut Self::State, trace: &mut TraceSink) -> Result<()>;

    /// Concatenates every unit's data view into the fragment's assembled
    /// bitstream form, applying any codec-specific framing (MPEG-2 start
    /// codes, VP9 superframe index).
    fn assemble_fragment(&self, fragment: &mut Fragment) -> Result<()>;
}
