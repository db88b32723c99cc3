//! Error types for the decision record engine.

use crate::markers::MalformedMarkers;
use crate::record::{DecisionId, FieldLabel};

/// A status value outside the canonical grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised status `{0}`")]
pub struct StatusParseError(pub String);

/// Failure to parse a decision block. Parsing is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number of the offending line.
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// What went wrong while parsing a decision entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("heading `{heading}` has no numeric decision ID")]
    MissingId { heading: String },

    #[error("heading `{heading}` has an invalid decision ID (must be a positive 32-bit integer)")]
    InvalidId { heading: String },

    #[error("decision {id} has no title")]
    MissingTitle { id: DecisionId },

    #[error("decision {id} is missing required field(s): {}", join_labels(.missing))]
    MissingField {
        id: DecisionId,
        missing: Vec<FieldLabel>,
    },

    #[error("decision {id} repeats the {label} field")]
    DuplicateField { id: DecisionId, label: FieldLabel },

    #[error("decision ID {id} is already used by the entry on line {first_line}")]
    DuplicateId { id: DecisionId, first_line: usize },

    #[error("decision {id} has an unrecognised status `{value}`")]
    InvalidStatus { id: DecisionId, value: String },

    #[error("decision {id} has unexpected content before its fields: `{text}`")]
    UnexpectedContent { id: DecisionId, text: String },
}

fn join_labels(labels: &[FieldLabel]) -> String {
    labels
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A requested mutation would break a block invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("decision ID {0} is already in use")]
    DuplicateId(DecisionId),

    #[error("decision {0} not found")]
    NotFound(DecisionId),

    #[error("position {index} is out of range for {len} decisions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no decision IDs left to allocate")]
    IdsExhausted,

    #[error("decision title must not be empty")]
    EmptyTitle,

    #[error("decision title must be a single line")]
    MultilineTitle,

    #[error("{field} line `{line}` would be read back as a heading, field label or marker")]
    ReservedLine { field: FieldLabel, line: String },

    #[error("decision {0} cannot link to itself")]
    SelfLink(DecisionId),

    #[error("decision {0} has no supersedes/deprecated link")]
    NotALink(DecisionId),
}

/// Umbrella error for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no vrdx marker block found")]
    MarkersAbsent,

    #[error("malformed vrdx markers: {0}")]
    MarkerMalformed(MalformedMarkers),

    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    #[error("invalid mutation: {0}")]
    InvalidMutation(#[from] MutationError),

    #[error("buffer no longer matches the marker block it was parsed from")]
    StaleBuffer,

    #[error("buffer already contains a vrdx marker block")]
    ScaffoldExists,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
