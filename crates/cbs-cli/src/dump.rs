//! Drives one codec plug-in's read path over a whole buffer and renders
//! the resulting fragment as either an indented text tree or JSON.
//!
//! A thin demonstration harness over [`cbs_core::Context::read_packet`] /
//! [`cbs_core::Context::read_extradata`], grounded on `bitvue-cli`'s
//! `commands::info`/`commands::frames` (parse the whole file up front,
//! then print a summary per decoded element) rather than any one of them
//! directly, since none of the teacher's commands dump a raw syntax tree.

use cbs_core::{CodecPlugin, Context, Fragment};
use serde_json::{json, Value};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Av1,
    Mpeg2,
    Vp8,
    Vp9,
}

impl Codec {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "av1" => Ok(Codec::Av1),
            "mpeg2" | "mpeg-2" => Ok(Codec::Mpeg2),
            "vp8" => Ok(Codec::Vp8),
            "vp9" => Ok(Codec::Vp9),
            other => Err(CliError::UnknownCodec(other.to_string())),
        }
    }
}

/// One decoded fragment, rendered into a codec-agnostic shape the CLI can
/// print without needing to know each codec's concrete content types.
/// Content is carried as its `Debug` rendering rather than a structured
/// `serde_json::Value`: AV1's `Av1Obu` wraps variant-specific structs that
/// already derive `Serialize` individually, but not every codec's content
/// type does (and the CLI is explicitly out of the framework's contract,
/// so it leans on `Debug` rather than growing a `Serialize` requirement on
/// `UnitContent` itself).
pub struct DumpedFragment {
    pub units: Vec<DumpedUnit>,
}

pub struct DumpedUnit {
    pub unit_type: u32,
    pub byte_len: usize,
    pub content: Option<String>,
}

/// Parses `data` with the given codec and collects per-unit summaries.
/// `as_header` selects `read_extradata` over `read_packet`, mirroring the
/// distinction a real decoder draws between out-of-band configuration
/// records and ordinary packet payloads.
pub fn dump(codec: Codec, data: &[u8], as_header: bool, trace_level: Option<tracing::Level>) -> Result<DumpedFragment> {
    match codec {
        Codec::Av1 => dump_with(cbs_av1::Av1Codec, data, as_header, trace_level),
        Codec::Mpeg2 => dump_with(cbs_mpeg2::Mpeg2Codec, data, as_header, trace_level),
        Codec::Vp8 => dump_with(cbs_vp8::Vp8Codec, data, as_header, trace_level),
        Codec::Vp9 => dump_with(cbs_vp9::Vp9Codec, data, as_header, trace_level),
    }
}

fn dump_with<P: CodecPlugin>(plugin: P, data: &[u8], as_header: bool, trace_level: Option<tracing::Level>) -> Result<DumpedFragment> {
    let mut ctx: Context<P> = Context::new(plugin);
    if let Some(level) = trace_level {
        ctx.set_trace(true, level);
    }

    let mut fragment = Fragment::new();
    if as_header {
        ctx.read_extradata(&mut fragment, data)?;
    } else {
        ctx.read_packet(&mut fragment, data)?;
    }

    let units = fragment
        .units()
        .iter()
        .map(|unit| DumpedUnit {
            unit_type: unit.unit_type.0,
            byte_len: unit.data().map(|view| view.len()).unwrap_or(0),
            content: unit.content().map(|content| format!("{content:?}")),
        })
        .collect();

    Ok(DumpedFragment { units })
}

pub fn render_json(fragment: &DumpedFragment) -> Result<String> {
    let units: Vec<Value> = fragment
        .units
        .iter()
        .map(|unit| {
            json!({
                "unit_type": unit.unit_type,
                "byte_len": unit.byte_len,
                "content": unit.content,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&json!({ "units": units }))?)
}

pub fn render_text(fragment: &DumpedFragment) -> String {
    let mut out = String::new();
    for (index, unit) in fragment.units.iter().enumerate() {
        out.push_str(&format!("unit[{index}] type={} bytes={}\n", unit.unit_type, unit.byte_len));
        if let Some(content) = &unit.content {
            out.push_str(&format!("  {content}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codec_name_is_rejected() {
        assert!(matches!(Codec::parse("h264"), Err(CliError::UnknownCodec(_))));
    }

    #[test]
    fn codec_names_are_case_insensitive() {
        assert_eq!(Codec::parse("AV1").unwrap(), Codec::Av1);
        assert_eq!(Codec::parse("Vp9").unwrap(), Codec::Vp9);
    }

    #[test]
    fn dumping_a_truncated_vp8_frame_fails() {
        let result = dump(Codec::Vp8, &[0x01, 0x00], false, None);
        assert!(result.is_err());
    }

    #[test]
    fn render_text_lists_each_unit() {
        let fragment = DumpedFragment {
            units: vec![DumpedUnit {
                unit_type: 7,
                byte_len: 42,
                content: Some("Frame { .. }".to_string()),
            }],
        };
        let text = render_text(&fragment);
        assert!(text.contains("unit[0] type=7 bytes=42"));
        assert!(text.contains("Frame { .. }"));
    }
}
