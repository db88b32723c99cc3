//! Block serializer.
//!
//! Canonical layout of one record (blank line between fields and between
//! records, none after the heading):
//!
//! ```text
//! ### 3 Add cache
//! * Status: 📝 Draft
//!
//! * Decision: Put Redis in front of the API.
//!
//! * Context: p99 latency.
//!
//! * Consequences: One more service to run.
//! ```

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::newline::NewlineStyle;
use crate::record::{DecisionRecord, FieldLabel};

fn push_field(out: &mut String, label: FieldLabel, value: &str) {
    out.push_str("* ");
    out.push_str(label.as_str());
    out.push(':');
    if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
}

/// Render one record in canonical form, without a trailing line terminator.
pub fn render_record(record: &DecisionRecord, newline: NewlineStyle) -> String {
    let mut out = format!("### {} {}\n", record.id, record.title);
    push_field(&mut out, FieldLabel::Status, &record.status.to_string());
    for label in [FieldLabel::Decision, FieldLabel::Context, FieldLabel::Consequences] {
        out.push_str("\n\n");
        push_field(&mut out, label, record.body(label).unwrap_or_default());
    }
    newline.apply(&out)
}

/// Render `records` in the given order. Every record is terminated by a line
/// break and records are separated by one blank line.
pub fn serialize_block(records: &[DecisionRecord], newline: NewlineStyle) -> String {
    render_records(records, newline, false)
}

/// Like [`serialize_block`], but records still matching their source span are
/// copied from it verbatim when `reuse_raw` is set.
pub(crate) fn render_records(
    records: &[DecisionRecord],
    newline: NewlineStyle,
    reuse_raw: bool,
) -> String {
    let nl = newline.as_str();
    let mut out = String::new();
    for (n, record) in records.iter().enumerate() {
        if n > 0 {
            out.push_str(nl);
        }
        match record.raw.as_ref() {
            Some(raw) if reuse_raw && raw.matches(record) && newline.matches(&raw.text) => {
                trace!(id = %record.id, "re-emitting source span");
                out.push_str(&raw.text);
            }
            _ => out.push_str(&render_record(record, newline)),
        }
        out.push_str(nl);
    }
    out
}

/// Hex SHA-256 of `text`.
pub(crate) fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Digest of a record's canonical `\n` rendering.
pub(crate) fn canonical_digest(record: &DecisionRecord) -> String {
    digest(&render_record(record, NewlineStyle::Lf))
}
