//! `Context`: process-wide state for one decode/encode session on one codec.
//!
//! Grounded on `CodedBitstreamContext` in the original C framework: a
//! codec descriptor, private codec state, a decompose-unit-types filter,
//! and trace settings. `close()` in the C API is simply `Drop` here; there
//! is no `priv_data: void*` because `Context` is generic over its plug-in
//! and that plug-in names its own concrete state type.

use std::collections::HashSet;

use tracing::Level;

use crate::error::{CbsError, Result};
use crate::fragment::Fragment;
use crate::plugin::CodecPlugin;
use crate::trace::TraceSink;
use crate::unit::UnitType;

/// Initial capacity of the reusable write scratch buffer. Doubled on
/// `CbsError::Overflow` during `write_unit`.
const INITIAL_WRITE_BUFFER_CAPACITY: usize = 4096;

/// Per-context state for one codec session. Not `Sync`: a caller wanting
/// parallelism constructs one `Context` per thread rather than sharing one,
/// which falls out naturally from this type exposing no shared-mutability
/// API — there is nothing here to make `Sync` even if we wanted to.
pub struct Context<P: CodecPlugin> {
    plugin: P,
    state: P::State,
    decompose_unit_types: Option<HashSet<UnitType>>,
    trace: TraceSink,
    write_buffer_capacity: usize,
}

impl<P: CodecPlugin> Context<P> {
    pub fn new(plugin: P) -> Self {
        Self {
            plugin,
            state: P::State::default(),
            decompose_unit_types: None,
            trace: TraceSink::disabled(),
            write_buffer_capacity: INITIAL_WRITE_BUFFER_CAPACITY,
        }
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn state(&self) -> &P::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut P::State {
        &mut self.state
    }

    /// Restricts which unit types get decomposed on read; types outside the
    /// set remain available in bitstream form only. `None` (the default)
    /// decomposes everything supported.
    pub fn set_decompose_unit_types(&mut self, types: Option<HashSet<UnitType>>) {
        self.decompose_unit_types = types;
    }

    pub fn set_trace(&mut self, enabled: bool, level: Level) {
        self.trace = TraceSink::new(enabled, level);
    }

    pub fn trace(&self) -> &TraceSink {
        &self.trace
    }

    /// Clears sequence-level continuity state without releasing the
    /// context itself; used when a decoder seeks to a new, logically
    /// distinct stream.
    pub fn flush(&mut self) {
        self.state.flush();
    }

    fn should_decompose(&self, unit_type: UnitType) -> bool {
        match &self.decompose_unit_types {
            None => true,
            Some(set) => set.contains(&unit_type),
        }
    }

    fn read_common(&mut self, fragment: &mut Fragment, is_header: bool) -> Result<()> {
        self.plugin.split_fragment(fragment, is_header, &mut self.trace)?;
        fragment.set_data(None);

        for index in 0..fragment.len() {
            let unit_type = fragment.units()[index].unit_type;
            if !self.should_decompose(unit_type) {
                continue;
            }
            match self.plugin.read_unit(fragment, index, &mut self.state, &mut self.trace) {
                Ok(()) => {}
                Err(CbsError::Unsupported(reason)) => {
                    tracing::warn!(unit_type = unit_type.0, reason, "unit left in raw form");
                }
                Err(CbsError::TryAgain) => {
                    tracing::debug!(unit_type = unit_type.0, "unit dropped by operating point filter");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Reads a container "extradata" byte blob (`header = true`): AV1 uses
    /// this to detect an `AV1CodecConfigurationRecord` prefix.
    pub fn read_extradata(&mut self, fragment: &mut Fragment, data: &[u8]) -> Result<()> {
        *fragment = Fragment::from_bytes(crate::buffer::buffer_from_slice(data));
        self.read_common(fragment, true)
    }

    /// Reads one packet's worth of bytes (`header = false`).
    pub fn read_packet(&mut self, fragment: &mut Fragment, data: &[u8]) -> Result<()> {
        *fragment = Fragment::from_bytes(crate::buffer::buffer_from_slice(data));
        self.read_common(fragment, false)
    }

    /// Reads a raw byte range with no container framing at all; identical
    /// to `read_packet` for every plug-in in this workspace.
    pub fn read(&mut self, fragment: &mut Fragment, data: &[u8]) -> Result<()> {
        self.read_packet(fragment, data)
    }

    /// Serialises every unit with decomposed content, then assembles the
    /// fragment's final bitstream form.
    pub fn write_fragment_data(&mut self, fragment: &mut Fragment) -> Result<()> {
        for index in 0..fragment.len() {
            if !fragment.units()[index].has_content() {
                continue;
            }
            loop {
                match self.plugin.write_unit(fragment, index, &mut self.state, &mut self.trace) {
                    Ok(()) => break,
                    Err(CbsError::Overflow { needed, .. }) => {
                        self.write_buffer_capacity = self.write_buffer_capacity.max(needed).saturating_mul(2);
                    }
                    Err(other) => return Err(other),
                }
            }
        }
        self.plugin.assemble_fragment(fragment)
    }

    pub fn write_extradata(&mut self, fragment: &mut Fragment) -> Result<Vec<u8>> {
        self.write_fragment_data(fragment)?;
        Ok(fragment.data().map(|d| d.as_slice().to_vec()).unwrap_or_default())
    }

    pub fn write_packet(&mut self, fragment: &mut Fragment) -> Result<Vec<u8>> {
        self.write_extradata(fragment)
    }

    pub fn write_buffer_capacity(&self) -> usize {
        self.write_buffer_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferView;
    use crate::fragment::Fragment as Frag;
    use crate::unit::UnitType as UT;

    #[derive(Debug, Default)]
    struct NoopState;
    impl crate::plugin::PluginState for NoopState {
        fn flush(&mut self) {}
    }

    struct NoopPlugin;
    impl CodecPlugin for NoopPlugin {
        type State = NoopState;
        fn name(&self) -> &'static str {
            "noop"
        }
        fn split_fragment(&self, fragment: &mut Frag, _is_header: bool, _trace: &mut TraceSink) -> Result<()> {
            if let Some(view) = fragment.data().cloned() {
                fragment.insert_unit_data(None, UT(0), view);
            }
            Ok(())
        }
        fn read_unit(&self, _fragment: &mut Frag, _index: usize, _state: &mut Self::State, _trace: &mut TraceSink) -> Result<()> {
            Ok(())
        }
        fn write_unit(&self, _fragment: &mut Frag, _index: usize, _state: &mut Self::State, _trace: &mut TraceSink) -> Result<()> {
            Ok(())
        }
        fn assemble_fragment(&self, fragment: &mut Frag) -> Result<()> {
            let bytes: Vec<u8> = fragment.units().iter().flat_map(|u| u.data().map(|d| d.as_slice().to_vec()).unwrap_or_default()).collect();
            fragment.set_data(Some(BufferView::whole(crate::buffer::buffer_from_vec(bytes))));
            Ok(())
        }
    }

    #[test]
    fn read_packet_splits_into_units() {
        let mut ctx = Context::new(NoopPlugin);
        let mut frag = Frag::new();
        ctx.read_packet(&mut frag, &[1, 2, 3]).unwrap();
        assert_eq!(frag.len(), 1);
    }

    #[test]
    fn decompose_filter_skips_excluded_types() {
        let mut ctx = Context::new(NoopPlugin);
        ctx.set_decompose_unit_types(Some(HashSet::new()));
        let mut frag = Frag::new();
        ctx.read_packet(&mut frag, &[9]).unwrap();
        assert_eq!(frag.len(), 1);
    }
}
