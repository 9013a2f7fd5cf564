//! Typed metadata extraction from an export's header block.
//!
//! Instrument preambles look like:
//!
//! ```text
//! Nov. 8, 2023   16:05:41
//! A.C. Impedance
//! File: C:\data\cell_11.bin
//! Instrument Model:  CHI660E
//! Init E (V) = 0
//! High Frequency (Hz) = 1e+5
//! ```
//!
//! Extraction is best effort: lines matching no pattern are ignored and a
//! header never fails to parse.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use eis_core::models::{HeaderBlock, HeaderInfo, HeaderParameter, MARKER_LINE};
use regex::Regex;

/// Formats tried, in order, after [`normalize_date_line`].
const DATE_FORMATS: &[&str] = &["%b %d, %Y %H:%M:%S", "%B %d, %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Build a [`HeaderInfo`] from the raw header lines.
pub fn parse_header_info(header: &HeaderBlock) -> HeaderInfo {
    let mut info = HeaderInfo::default();

    for line in header.lines.iter().map(|l| l.trim()) {
        if line.is_empty() || line == MARKER_LINE {
            continue;
        }

        if info.acquired_at.is_none() {
            if let Some(ts) = parse_acquisition_time(line) {
                info.acquired_at = Some(ts);
                continue;
            }
        }

        if let Some(param) = parse_parameter(line) {
            info.parameters.push(param);
            continue;
        }

        if let Some(caps) = field_regex().captures(line) {
            info.fields
                .insert(caps[1].trim().to_string(), caps[2].trim().to_string());
            continue;
        }

        if info.technique.is_none() {
            info.technique = Some(line.to_string());
        }
    }

    info
}

/// Parse an acquisition timestamp such as `Nov. 8, 2023   16:05:41`.
pub fn parse_acquisition_time(line: &str) -> Option<NaiveDateTime> {
    let normalized = normalize_date_line(line);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
}

/// Parse a `Name (unit) = value` line whose value is numeric.
pub fn parse_parameter(line: &str) -> Option<HeaderParameter> {
    let caps = parameter_regex().captures(line)?;
    let value = caps.name("value")?.as_str().parse::<f64>().ok()?;
    Some(HeaderParameter {
        name: caps.name("name")?.as_str().trim().to_string(),
        unit: caps
            .name("unit")
            .map(|u| u.as_str().trim().to_string())
            .filter(|u| !u.is_empty()),
        value,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parameter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[^=()]+?)\s*(?:\((?P<unit>[^)]*)\))?\s*=\s*(?P<value>\S+)\s*$")
            .expect("regex is valid")
    })
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z .]*?):\s*(.*)$").expect("regex is valid"))
}

/// Collapse runs of whitespace, drop the period after an abbreviated month
/// and map `Sept` to the `Sep` chrono understands.
fn normalize_date_line(line: &str) -> String {
    line.split_whitespace()
        .map(|tok| {
            let tok = tok.strip_suffix('.').unwrap_or(tok);
            if tok.eq_ignore_ascii_case("sept") {
                "Sep"
            } else {
                tok
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
