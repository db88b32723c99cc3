//! Decision record engine for vrdx.
//!
//! Decision records live in Markdown files between a pair of sentinel lines:
//!
//! ```text
//! <!-- vrdx start -->
//!
//! ### 2 Use Postgres
//! * Status: ✅ Accepted
//! ...
//! <!-- vrdx end -->
//! ```
//!
//! The engine locates that region, parses it into [`DecisionRecord`]s, keeps
//! `Supersedes`/`Deprecated by` statuses reciprocal, and renders the records
//! back without touching a byte outside the markers. It performs no I/O:
//! text goes in, text comes out, and writing is left to the caller.
//!
//! [`DecisionBlock`] bundles the whole read/mutate/write cycle; the free
//! functions expose each stage on its own.

pub mod block;
pub mod error;
pub mod links;
pub mod markers;
pub mod newline;
pub mod order;
pub mod parse;
pub mod record;
pub mod scaffold;
pub mod serialize;
pub mod status;

pub use block::{DecisionBlock, DecisionUpdate, NewDecision};
pub use error::{EngineError, MutationError, ParseError, ParseErrorKind, StatusParseError};
pub use links::{
    resolve_links, DanglingRef, DecisionLink, LinkConflict, LinkRelation, LinkReport,
    LinkResolver, StatusChange,
};
pub use markers::{
    locate_markers, MalformedMarkers, MarkerKind, MarkerProblem, MarkerSpan, MarkerStatus,
    MARKER_END, MARKER_START,
};
pub use newline::NewlineStyle;
pub use order::next_id;
pub use parse::parse_block;
pub use record::{DecisionId, DecisionRecord, FieldLabel, RawSpan};
pub use scaffold::{insert_scaffold, scaffold_text};
pub use serialize::{render_record, serialize_block};
pub use status::Status;
