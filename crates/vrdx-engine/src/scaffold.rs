//! Scaffold insertion.
//!
//! Callers must obtain explicit user confirmation before applying the result;
//! the engine only transforms text.

use tracing::debug;

use crate::error::EngineError;
use crate::markers::{locate_markers, marker_kind, MarkerStatus, MARKER_END, MARKER_START};
use crate::newline::NewlineStyle;

/// The empty marker pair: start, blank line, end, each line terminated.
pub fn scaffold_text(newline: NewlineStyle) -> String {
    let nl = newline.as_str();
    format!("{MARKER_START}{nl}{nl}{MARKER_END}{nl}")
}

/// Append an empty marker pair to `buffer`.
///
/// A buffer with malformed markers has every stray marker line removed first;
/// all other bytes are kept. A buffer that already holds a well-formed pair
/// is rejected with [`EngineError::ScaffoldExists`].
pub fn insert_scaffold(buffer: &str, newline: NewlineStyle) -> Result<String, EngineError> {
    let mut out = match locate_markers(buffer) {
        MarkerStatus::Present(_) => return Err(EngineError::ScaffoldExists),
        MarkerStatus::Absent => buffer.to_string(),
        MarkerStatus::Malformed(malformed) => {
            debug!(%malformed, "removing stray markers before scaffolding");
            buffer
                .split_inclusive('\n')
                .filter(|line| marker_kind(line).is_none())
                .collect()
        }
    };
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline.as_str());
    }
    out.push_str(&scaffold_text(newline));
    debug!(%newline, "scaffold appended");
    Ok(out)
}
