//! The decision record model.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::MutationError;
use crate::links::DecisionLink;
use crate::markers::marker_kind;
use crate::newline::normalize_body;
use crate::parse::{field_label, is_heading};
use crate::serialize::canonical_digest;
use crate::status::Status;

/// Positive decision identifier, unique within one decision block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DecisionId(u32);

impl DecisionId {
    /// Wrap a raw ID; zero is not a valid decision ID.
    pub fn new(raw: u32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The following ID, or `None` on overflow.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl TryFrom<u32> for DecisionId {
    type Error = String;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| "decision IDs must be positive".to_string())
    }
}

impl From<DecisionId> for u32 {
    fn from(id: DecisionId) -> u32 {
        id.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four labelled fields of a decision entry, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldLabel {
    Status,
    Decision,
    Context,
    Consequences,
}

impl FieldLabel {
    pub const ALL: [FieldLabel; 4] = [
        FieldLabel::Status,
        FieldLabel::Decision,
        FieldLabel::Context,
        FieldLabel::Consequences,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldLabel::Status => "Status",
            FieldLabel::Decision => "Decision",
            FieldLabel::Context => "Context",
            FieldLabel::Consequences => "Consequences",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source text a record was parsed from.
///
/// The digest is taken over the record's canonical rendering at parse time,
/// so the span can be re-emitted verbatim for as long as the structured
/// fields still produce the same digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpan {
    /// Byte range within the marker body.
    pub range: Range<usize>,
    /// Exact source text, trailing blank lines excluded.
    pub text: String,
    digest: String,
}

impl RawSpan {
    pub(crate) fn capture(range: Range<usize>, text: &str, record: &DecisionRecord) -> Self {
        Self {
            range,
            text: text.to_string(),
            digest: canonical_digest(record),
        }
    }

    /// True when `record` still holds the values this span was parsed into.
    pub fn matches(&self, record: &DecisionRecord) -> bool {
        self.digest == canonical_digest(record)
    }
}

/// One parsed decision entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: DecisionId,
    pub title: String,
    pub status: Status,
    pub decision: String,
    pub context: String,
    pub consequences: String,
    /// Derived by the link resolver; never authoritative.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<DecisionLink>,
    #[serde(skip)]
    pub raw: Option<RawSpan>,
}

impl PartialEq for DecisionRecord {
    /// Field-for-field equality; derived links and source spans are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.status == other.status
            && self.decision == other.decision
            && self.context == other.context
            && self.consequences == other.consequences
    }
}

impl Eq for DecisionRecord {}

impl DecisionRecord {
    /// A draft record with empty narrative fields.
    pub fn new(id: DecisionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: Status::default(),
            decision: String::new(),
            context: String::new(),
            consequences: String::new(),
            links: Vec::new(),
            raw: None,
        }
    }

    /// Builder: set status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Builder: set decision text.
    pub fn with_decision(mut self, text: impl Into<String>) -> Self {
        self.decision = text.into();
        self
    }

    /// Builder: set context text.
    pub fn with_context(mut self, text: impl Into<String>) -> Self {
        self.context = text.into();
        self
    }

    /// Builder: set consequences text.
    pub fn with_consequences(mut self, text: impl Into<String>) -> Self {
        self.consequences = text.into();
        self
    }

    /// Narrative body of a field; `None` for [`FieldLabel::Status`].
    pub fn body(&self, label: FieldLabel) -> Option<&str> {
        match label {
            FieldLabel::Status => None,
            FieldLabel::Decision => Some(&self.decision),
            FieldLabel::Context => Some(&self.context),
            FieldLabel::Consequences => Some(&self.consequences),
        }
    }

    /// True when the record can be re-emitted from its source span.
    pub fn is_pristine(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.matches(self))
    }

    /// Trim title and bodies at the edges and store bodies with `\n` line
    /// endings, matching what the parser produces.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        for body in [&mut self.decision, &mut self.context, &mut self.consequences] {
            *body = normalize_body(body);
        }
    }

    /// Check that the record serializes to text that parses back into it.
    pub fn validate(&self) -> Result<(), MutationError> {
        if self.title.trim().is_empty() {
            return Err(MutationError::EmptyTitle);
        }
        if self.title.contains(['\n', '\r']) {
            return Err(MutationError::MultilineTitle);
        }
        if self.status.target() == Some(self.id) {
            return Err(MutationError::SelfLink(self.id));
        }
        for label in [FieldLabel::Decision, FieldLabel::Context, FieldLabel::Consequences] {
            let body = self.body(label).unwrap_or_default();
            // The first line follows the label on the same line, so only
            // continuation lines can be mistaken for structure.
            for line in body.lines().skip(1) {
                if is_heading(line) || field_label(line).is_some() || marker_kind(line).is_some() {
                    return Err(MutationError::ReservedLine {
                        field: label,
                        line: line.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
