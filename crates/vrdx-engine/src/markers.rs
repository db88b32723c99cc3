//! Marker detection for the vrdx decision block.
//!
//! A decision block is the region between exactly one `<!-- vrdx start -->`
//! line and exactly one later `<!-- vrdx end -->` line. Markers are only
//! recognised as whole lines; marker text embedded in prose is ordinary
//! content.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::newline::strip_terminator;

/// Canonical start marker.
pub const MARKER_START: &str = "<!-- vrdx start -->";

/// Canonical end marker.
pub const MARKER_END: &str = "<!-- vrdx end -->";

/// Which of the two markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Start,
    End,
}

impl MarkerKind {
    /// The canonical marker text.
    pub fn text(self) -> &'static str {
        match self {
            MarkerKind::Start => MARKER_START,
            MarkerKind::End => MARKER_END,
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKind::Start => write!(f, "start"),
            MarkerKind::End => write!(f, "end"),
        }
    }
}

/// Byte offsets of a well-formed marker pair.
///
/// `start..content_start` is the start-marker line including its terminator,
/// `content_start..content_end` is the block body, `content_end..end` is the
/// end-marker line including its terminator (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkerSpan {
    pub start: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub end: usize,
    /// 1-based line number of the start marker.
    pub start_line: usize,
}

impl MarkerSpan {
    /// The text strictly between the two marker lines.
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.content_start..self.content_end]
    }

    /// Return `text` with the body replaced; everything outside the body is
    /// copied unchanged.
    pub fn replace_body(&self, text: &str, body: &str) -> String {
        let old_len = self.content_end - self.content_start;
        let mut out = String::with_capacity(text.len() - old_len + body.len());
        out.push_str(&text[..self.content_start]);
        out.push_str(body);
        out.push_str(&text[self.content_end..]);
        out
    }

    /// 1-based line number of the first body line.
    pub fn body_first_line(&self) -> usize {
        self.start_line + 1
    }
}

/// What is wrong with a buffer's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "problem", content = "marker")]
pub enum MarkerProblem {
    /// More than one occurrence of the marker.
    Duplicate(MarkerKind),
    /// The marker is absent while its partner is present.
    Missing(MarkerKind),
    /// The end marker precedes the start marker.
    EndBeforeStart,
}

/// Diagnostic for a malformed marker layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedMarkers {
    pub problem: MarkerProblem,
    /// 1-based lines holding a start marker.
    pub start_lines: Vec<usize>,
    /// 1-based lines holding an end marker.
    pub end_lines: Vec<usize>,
}

impl MalformedMarkers {
    /// Number of occurrences of the given marker.
    pub fn occurrences(&self, kind: MarkerKind) -> usize {
        self.lines(kind).len()
    }

    fn lines(&self, kind: MarkerKind) -> &[usize] {
        match kind {
            MarkerKind::Start => &self.start_lines,
            MarkerKind::End => &self.end_lines,
        }
    }
}

impl fmt::Display for MalformedMarkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            MarkerProblem::Duplicate(kind) => write!(
                f,
                "found {} {kind} markers `{}` on lines {}; expected exactly one",
                self.occurrences(kind),
                kind.text(),
                join_lines(self.lines(kind)),
            ),
            MarkerProblem::Missing(kind) => {
                let other = match kind {
                    MarkerKind::Start => MarkerKind::End,
                    MarkerKind::End => MarkerKind::Start,
                };
                write!(
                    f,
                    "{other} marker on line {} has no matching {kind} marker `{}`",
                    join_lines(self.lines(other)),
                    kind.text(),
                )
            }
            MarkerProblem::EndBeforeStart => write!(
                f,
                "end marker on line {} appears before start marker on line {}",
                join_lines(&self.end_lines),
                join_lines(&self.start_lines),
            ),
        }
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of scanning a buffer for markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MarkerStatus {
    Absent,
    Present(MarkerSpan),
    Malformed(MalformedMarkers),
}

impl MarkerStatus {
    pub fn is_present(&self) -> bool {
        matches!(self, MarkerStatus::Present(_))
    }

    pub fn span(&self) -> Option<MarkerSpan> {
        match self {
            MarkerStatus::Present(span) => Some(*span),
            _ => None,
        }
    }
}

/// Classify a marker line, if `line` is one.
pub(crate) fn marker_kind(line: &str) -> Option<MarkerKind> {
    match strip_terminator(line).trim() {
        MARKER_START => Some(MarkerKind::Start),
        MARKER_END => Some(MarkerKind::End),
        _ => None,
    }
}

struct Occurrence {
    line: usize,
    offset: usize,
    len: usize,
}

/// Locate the canonical marker pair in `text`.
pub fn locate_markers(text: &str) -> MarkerStatus {
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let occurrence = Occurrence {
            line: idx + 1,
            offset,
            len: line.len(),
        };
        match marker_kind(line) {
            Some(MarkerKind::Start) => starts.push(occurrence),
            Some(MarkerKind::End) => ends.push(occurrence),
            None => {}
        }
        offset += line.len();
    }

    let malformed = |problem| {
        let status = MarkerStatus::Malformed(MalformedMarkers {
            problem,
            start_lines: starts.iter().map(|o| o.line).collect(),
            end_lines: ends.iter().map(|o| o.line).collect(),
        });
        debug!(?status, "markers malformed");
        status
    };

    if starts.is_empty() && ends.is_empty() {
        return MarkerStatus::Absent;
    }
    if starts.len() > 1 {
        return malformed(MarkerProblem::Duplicate(MarkerKind::Start));
    }
    if ends.len() > 1 {
        return malformed(MarkerProblem::Duplicate(MarkerKind::End));
    }
    if ends.is_empty() {
        return malformed(MarkerProblem::Missing(MarkerKind::End));
    }
    if starts.is_empty() {
        return malformed(MarkerProblem::Missing(MarkerKind::Start));
    }

    let (start, end) = (&starts[0], &ends[0]);
    if end.offset < start.offset {
        return malformed(MarkerProblem::EndBeforeStart);
    }

    let span = MarkerSpan {
        start: start.offset,
        content_start: start.offset + start.len,
        content_end: end.offset,
        end: end.offset + end.len,
        start_line: start.line,
    };
    debug!(
        start_line = span.start_line,
        body_len = span.content_end - span.content_start,
        "markers located"
    );
    MarkerStatus::Present(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(parts: &[&str]) -> String {
        parts.join("\n")
    }

    #[test]
    fn absent_when_no_markers() {
        assert_eq!(locate_markers("# Title\n\nNo markers here.\n"), MarkerStatus::Absent);
        assert_eq!(locate_markers(""), MarkerStatus::Absent);
    }

    #[test]
    fn present_happy_path() {
        let text = lines(&["# Heading", "", MARKER_START, "### 1 Decision", MARKER_END, ""]);
        let span = locate_markers(&text).span().unwrap();
        assert_eq!(span.body(&text), "### 1 Decision\n");
        assert_eq!(span.start_line, 3);
        assert_eq!(span.body_first_line(), 4);
        assert_eq!(&text[span.start..span.content_start], "<!-- vrdx start -->\n");
        assert_eq!(&text[span.content_end..span.end], "<!-- vrdx end -->\n");

        let replaced = span.replace_body(&text, "New Body\n");
        assert!(replaced.contains("New Body"));
        assert!(!replaced.contains("### 1 Decision"));
        assert!(replaced.starts_with("# Heading\n\n<!-- vrdx start -->\n"));
    }

    #[test]
    fn end_marker_without_trailing_newline() {
        let text = format!("{MARKER_START}\n\n{MARKER_END}");
        let span = locate_markers(&text).span().unwrap();
        assert_eq!(span.body(&text), "\n");
        assert_eq!(span.end, text.len());
    }

    #[test]
    fn crlf_and_indented_markers_are_recognised() {
        let text = format!("intro\r\n  {MARKER_START}  \r\nbody\r\n{MARKER_END}\r\n");
        let span = locate_markers(&text).span().unwrap();
        assert_eq!(span.body(&text), "body\r\n");
    }

    #[test]
    fn inline_marker_text_is_not_a_marker() {
        let text = format!("See `{MARKER_START}` for details.\n");
        assert_eq!(locate_markers(&text), MarkerStatus::Absent);
    }

    #[test]
    fn duplicate_start_is_reported_with_lines() {
        let text = lines(&[MARKER_START, MARKER_START, "body", MARKER_END]);
        match locate_markers(&text) {
            MarkerStatus::Malformed(m) => {
                assert_eq!(m.problem, MarkerProblem::Duplicate(MarkerKind::Start));
                assert_eq!(m.occurrences(MarkerKind::Start), 2);
                assert_eq!(m.start_lines, vec![1, 2]);
                let msg = m.to_string();
                assert!(msg.contains("2 start markers"), "{msg}");
                assert!(msg.contains("lines 1, 2"), "{msg}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_end_is_reported() {
        let text = lines(&[MARKER_START, MARKER_END, MARKER_END]);
        let status = locate_markers(&text);
        assert!(matches!(
            status,
            MarkerStatus::Malformed(MalformedMarkers {
                problem: MarkerProblem::Duplicate(MarkerKind::End),
                ..
            })
        ));
    }

    #[test]
    fn lone_markers_are_missing_partners() {
        match locate_markers(MARKER_START) {
            MarkerStatus::Malformed(m) => {
                assert_eq!(m.problem, MarkerProblem::Missing(MarkerKind::End));
                assert!(m.to_string().contains("no matching end marker"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match locate_markers(MARKER_END) {
            MarkerStatus::Malformed(m) => {
                assert_eq!(m.problem, MarkerProblem::Missing(MarkerKind::Start))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn end_before_start() {
        let text = lines(&[MARKER_END, MARKER_START]);
        match locate_markers(&text) {
            MarkerStatus::Malformed(m) => {
                assert_eq!(m.problem, MarkerProblem::EndBeforeStart);
                assert_eq!(
                    m.to_string(),
                    "end marker on line 1 appears before start marker on line 2"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
