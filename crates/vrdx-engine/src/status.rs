//! Decision status grammar.
//!
//! Five canonical tokens, two of which carry a reference to another decision:
//!
//! | Token                  | Variant                    |
//! |------------------------|----------------------------|
//! | `📝 Draft`             | [`Status::Draft`]          |
//! | `✅ Accepted`          | [`Status::Accepted`]       |
//! | `❌ Rejected`          | [`Status::Rejected`]       |
//! | `⛔ Deprecated by <ID>` | [`Status::DeprecatedBy`]   |
//! | `⬆️ Supersedes <ID>`   | [`Status::Supersedes`]     |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StatusParseError;
use crate::links::LinkRelation;
use crate::record::DecisionId;

const DRAFT: &str = "📝";
const ACCEPTED: &str = "✅";
const REJECTED: &str = "❌";
const DEPRECATED: &str = "⛔";
const SUPERSEDES: &str = "⬆️";
/// `⬆` without the emoji variation selector, as some editors strip it.
const SUPERSEDES_BARE: &str = "⬆";

/// Labels offered by status pickers, in presentation order.
const STATUS_OPTIONS: [&str; 5] = [
    "📝 Draft",
    "✅ Accepted",
    "❌ Rejected",
    "⛔ Deprecated by …",
    "⬆️ Supersedes …",
];

/// Status of a decision record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Draft,
    Accepted,
    Rejected,
    /// Replaced by the referenced decision.
    DeprecatedBy(DecisionId),
    /// Replaces the referenced decision.
    Supersedes(DecisionId),
}

impl Status {
    /// The picker labels for all five statuses.
    pub fn options() -> &'static [&'static str] {
        &STATUS_OPTIONS
    }

    /// The cross-link this status expresses, if any.
    pub fn link(&self) -> Option<(LinkRelation, DecisionId)> {
        match *self {
            Status::DeprecatedBy(target) => Some((LinkRelation::DeprecatedBy, target)),
            Status::Supersedes(target) => Some((LinkRelation::Supersedes, target)),
            _ => None,
        }
    }

    /// Referenced decision, if any.
    pub fn target(&self) -> Option<DecisionId> {
        self.link().map(|(_, target)| target)
    }

    /// The status the referenced decision must hold for this one to be
    /// reciprocated, given that this status belongs to `owner`.
    pub fn reciprocal(&self, owner: DecisionId) -> Option<Status> {
        self.link()
            .map(|(relation, _)| relation.reciprocal().status_for(owner))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Draft => write!(f, "{DRAFT} Draft"),
            Status::Accepted => write!(f, "{ACCEPTED} Accepted"),
            Status::Rejected => write!(f, "{REJECTED} Rejected"),
            Status::DeprecatedBy(id) => write!(f, "{DEPRECATED} Deprecated by {id}"),
            Status::Supersedes(id) => write!(f, "{SUPERSEDES} Supersedes {id}"),
        }
    }
}

fn parse_reference(token: &str) -> Option<DecisionId> {
    let digits = token.strip_prefix('#').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().and_then(DecisionId::new)
}

impl FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let parsed = match words.as_slice() {
            [DRAFT, "Draft"] => Some(Status::Draft),
            [ACCEPTED, "Accepted"] => Some(Status::Accepted),
            [REJECTED, "Rejected"] => Some(Status::Rejected),
            [DEPRECATED, "Deprecated", "by", id] => parse_reference(id).map(Status::DeprecatedBy),
            [SUPERSEDES | SUPERSEDES_BARE, "Supersedes", id] => {
                parse_reference(id).map(Status::Supersedes)
            }
            _ => None,
        };
        parsed.ok_or_else(|| StatusParseError(s.trim().to_string()))
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
