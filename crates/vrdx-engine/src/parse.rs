//! Decision block parser.
//!
//! Splits the marker body into entries at level-3 headings and parses each
//! entry's four labelled fields:
//!
//! ```text
//! ### 2 Use Postgres
//! * Status: ✅ Accepted
//! * Decision: Store orders in Postgres.
//! * Context: We need transactions.
//! * Consequences: Ops runs backups.
//! ```
//!
//! The bold label form (`* **Status**: ...`) written by earlier versions of
//! the tool is accepted as well. Text before the first heading is the block
//! preamble and is left to the caller.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{ParseError, ParseErrorKind};
use crate::newline::{normalize_body, strip_terminator};
use crate::record::{DecisionId, DecisionRecord, FieldLabel, RawSpan};
use crate::status::Status;

/// `### <id> <title>`
static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^###[ \t]+(?P<id>\d+)(?:[ \t]+(?P<title>.*?))?[ \t]*$").expect("heading regex")
});

/// `* Label: value`, `- Label: value` or `* **Label**: value`
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[*-][ \t]+(?:\*\*(?P<bold>Status|Decision|Context|Consequences)\*\*|(?P<plain>Status|Decision|Context|Consequences)):(?P<value>.*)$",
    )
    .expect("field regex")
});

/// True for a level-3 heading line (`###` followed by whitespace or nothing).
pub(crate) fn is_heading(line: &str) -> bool {
    let line = strip_terminator(line);
    match line.strip_prefix("###") {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

/// The label of a field line, if `line` is one.
pub(crate) fn field_label(line: &str) -> Option<FieldLabel> {
    field_line(strip_terminator(line)).map(|(label, _)| label)
}

fn field_line(line: &str) -> Option<(FieldLabel, &str)> {
    let caps = FIELD_RE.captures(line)?;
    let name = caps.name("bold").or_else(|| caps.name("plain"))?.as_str();
    let label = match name {
        "Status" => FieldLabel::Status,
        "Decision" => FieldLabel::Decision,
        "Context" => FieldLabel::Context,
        _ => FieldLabel::Consequences,
    };
    let value = caps.name("value").map_or("", |m| m.as_str());
    Some((label, value))
}

/// One physical line of the body.
struct Line<'a> {
    number: usize,
    offset: usize,
    text: &'a str,
}

/// Records plus the length of the preamble that precedes the first heading.
#[derive(Debug)]
pub(crate) struct ParsedBody {
    pub preamble_len: usize,
    pub records: Vec<DecisionRecord>,
}

/// Parse the text strictly between the markers into decision records.
///
/// Line numbers in errors are relative to `body` (first line is 1).
pub fn parse_block(body: &str) -> Result<Vec<DecisionRecord>, ParseError> {
    parse_body(body, 1).map(|parsed| parsed.records)
}

/// Parse `body`, numbering lines from `first_line`.
pub(crate) fn parse_body(body: &str, first_line: usize) -> Result<ParsedBody, ParseError> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (idx, raw) in body.split_inclusive('\n').enumerate() {
        lines.push(Line {
            number: first_line + idx,
            offset,
            text: strip_terminator(raw),
        });
        offset += raw.len();
    }

    let headings: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_heading(line.text))
        .map(|(idx, _)| idx)
        .collect();

    let preamble_len = headings.first().map_or(body.len(), |&h| lines[h].offset);

    let mut records = Vec::with_capacity(headings.len());
    let mut seen: HashMap<DecisionId, usize> = HashMap::new();
    for (n, &head) in headings.iter().enumerate() {
        let next = headings.get(n + 1).copied().unwrap_or(lines.len());
        let record = parse_entry(body, &lines[head..next])?;
        if let Some(&first_line) = seen.get(&record.id) {
            return Err(ParseError {
                line: lines[head].number,
                kind: ParseErrorKind::DuplicateId {
                    id: record.id,
                    first_line,
                },
            });
        }
        seen.insert(record.id, lines[head].number);
        trace!(id = %record.id, title = %record.title, "parsed decision");
        records.push(record);
    }

    debug!(count = records.len(), preamble_len, "parsed decision block");
    Ok(ParsedBody {
        preamble_len,
        records,
    })
}

fn parse_heading(line: &Line<'_>) -> Result<(DecisionId, String), ParseError> {
    let fail = |kind| ParseError {
        line: line.number,
        kind,
    };
    let heading = line.text.trim_end().to_string();
    let caps = HEADING_RE.captures(line.text).ok_or_else(|| {
        fail(ParseErrorKind::MissingId {
            heading: heading.clone(),
        })
    })?;
    let id = caps["id"]
        .parse::<u32>()
        .ok()
        .and_then(DecisionId::new)
        .ok_or_else(|| {
            fail(ParseErrorKind::InvalidId {
                heading: heading.clone(),
            })
        })?;
    let title = caps.name("title").map_or("", |m| m.as_str()).trim();
    if title.is_empty() {
        return Err(fail(ParseErrorKind::MissingTitle { id }));
    }
    Ok((id, title.to_string()))
}

/// A field being collected: label, first line number, value lines.
struct OpenField<'a> {
    label: FieldLabel,
    line: usize,
    parts: Vec<&'a str>,
}

type FieldValues = [Option<(usize, String)>; 4];

fn close(field: OpenField<'_>, values: &mut FieldValues) {
    let value = normalize_body(&field.parts.join("\n"));
    values[field.label.index()] = Some((field.line, value));
}

fn parse_entry(body: &str, lines: &[Line<'_>]) -> Result<DecisionRecord, ParseError> {
    let heading = &lines[0];
    let (id, title) = parse_heading(heading)?;

    let mut values: FieldValues = Default::default();
    let mut open: Option<OpenField<'_>> = None;

    for line in &lines[1..] {
        if let Some((label, first)) = field_line(line.text) {
            let repeated = values[label.index()].is_some()
                || open.as_ref().is_some_and(|f| f.label == label);
            if repeated {
                return Err(ParseError {
                    line: line.number,
                    kind: ParseErrorKind::DuplicateField { id, label },
                });
            }
            if let Some(field) = open.take() {
                close(field, &mut values);
            }
            open = Some(OpenField {
                label,
                line: line.number,
                parts: vec![first],
            });
        } else if let Some(field) = open.as_mut() {
            field.parts.push(line.text);
        } else if !line.text.trim().is_empty() {
            return Err(ParseError {
                line: line.number,
                kind: ParseErrorKind::UnexpectedContent {
                    id,
                    text: line.text.trim().to_string(),
                },
            });
        }
    }
    if let Some(field) = open.take() {
        close(field, &mut values);
    }

    let missing: Vec<FieldLabel> = FieldLabel::ALL
        .into_iter()
        .filter(|label| values[label.index()].is_none())
        .collect();
    if !missing.is_empty() {
        return Err(ParseError {
            line: heading.number,
            kind: ParseErrorKind::MissingField { id, missing },
        });
    }

    let [status, decision, context, consequences] = values.map(Option::unwrap_or_default);
    let (status_line, status_text) = status;
    let status: Status = status_text.parse().map_err(|_| ParseError {
        line: status_line,
        kind: ParseErrorKind::InvalidStatus {
            id,
            value: status_text.clone(),
        },
    })?;

    let mut record = DecisionRecord::new(id, title)
        .with_status(status)
        .with_decision(decision.1)
        .with_context(context.1)
        .with_consequences(consequences.1);

    // The source span ends at the last non-blank line of the entry.
    let last = lines
        .iter()
        .rev()
        .find(|line| !line.text.trim().is_empty())
        .unwrap_or(heading);
    let range = heading.offset..last.offset + last.text.len();
    record.raw = Some(RawSpan::capture(range.clone(), &body[range], &record));
    Ok(record)
}
