//! Structured per-syntax-element trace sink.
//!
//! This is a narrower concept than application logging: a side channel
//! that, when enabled, emits one line per syntax element read or written,
//! carrying its name, subscripts, bit pattern and decoded value. It is
//! built on `tracing` spans/events under a dedicated target rather than a
//! bespoke logging stack, per this workspace's general preference for
//! `tracing` over hand-rolled alternatives.

use tracing::Level;

/// Dedicated tracing target for bitstream syntax traces, kept separate from
/// ordinary application logs so a consumer can filter on it independently
/// (`RUST_LOG=cbs::trace=trace`).
pub const TRACE_TARGET: &str = "cbs::trace";

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceSink {
    enabled: bool,
    level: Level,
}

impl TraceSink {
    pub fn new(enabled: bool, level: Level) -> Self {
        Self { enabled, level }
    }

    pub fn disabled() -> Self {
        Self::new(false, Level::TRACE)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Temporarily disables tracing for the duration of `f`, restoring the
    /// previous state afterwards. Used to silence trace output around
    /// framing reads (start-code scan, superframe index) the way the
    /// dispatcher silences it around split_fragment.
    pub fn suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_enabled = self.enabled;
        self.enabled = false;
        let result = f(self);
        self.enabled = was_enabled;
        result
    }

    /// Emits a section banner, e.g. "Sequence Header".
    pub fn header(&self, name: &str) {
        if !self.enabled {
            return;
        }
        match self.level {
            Level::ERROR => tracing::error!(target: TRACE_TARGET, "--- {name} ---"),
            Level::WARN => tracing::warn!(target: TRACE_TARGET, "--- {name} ---"),
            Level::INFO => tracing::info!(target: TRACE_TARGET, "--- {name} ---"),
            Level::DEBUG => tracing::debug!(target: TRACE_TARGET, "--- {name} ---"),
            Level::TRACE => tracing::trace!(target: TRACE_TARGET, "--- {name} ---"),
        }
    }

    /// Emits one syntax element: position, name (with optional subscripts),
    /// bit pattern, and decoded value.
    pub fn syntax_element(&self, position: u64, name: &str, subs: &[usize], bits: u8, value: u64) {
        if !self.enabled {
            return;
        }
        let subscript = if subs.is_empty() {
            String::new()
        } else {
            subs.iter()
                .map(|s| format!("[{s}]"))
                .collect::<Vec<_>>()
                .join("")
        };
        let bitstring = format!("{value:0width$b}", width = bits as usize);
        match self.level {
            Level::ERROR => {
                tracing::error!(target: TRACE_TARGET, position, name = %format!("{name}{subscript}"), bitstring = %bitstring, value)
            }
            Level::WARN => {
                tracing::warn!(target: TRACE_TARGET, position, name = %format!("{name}{subscript}"), bitstring = %bitstring, value)
            }
            Level::INFO => {
                tracing::info!(target: TRACE_TARGET, position, name = %format!("{name}{subscript}"), bitstring = %bitstring, value)
            }
            Level::DEBUG => {
                tracing::debug!(target: TRACE_TARGET, position, name = %format!("{name}{subscript}"), bitstring = %bitstring, value)
            }
            Level::TRACE => {
                tracing::trace!(target: TRACE_TARGET, position, name = %format!("{name}{subscript}"), bitstring = %bitstring, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppressed_restores_previous_state() {
        let mut sink = TraceSink::new(true, Level::TRACE);
        sink.suppressed(|s| {
            assert!(!s.is_enabled());
        });
        assert!(sink.is_enabled());
    }

    #[test]
    fn disabled_by_default_via_constructor() {
        let sink = TraceSink::disabled();
        assert!(!sink.is_enabled());
    }
}
