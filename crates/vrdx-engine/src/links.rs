//! Cross-link resolution.
//!
//! A record's status is the only authoritative statement of a link. The
//! resolver walks the whole block and brings the other side of every
//! `Supersedes`/`Deprecated by` status in line, then rebuilds each record's
//! derived [`DecisionRecord::links`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{DecisionId, DecisionRecord};
use crate::status::Status;

/// Direction of a link between two decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    Supersedes,
    DeprecatedBy,
}

impl LinkRelation {
    /// The relation the other side of the link holds.
    pub fn reciprocal(self) -> Self {
        match self {
            LinkRelation::Supersedes => LinkRelation::DeprecatedBy,
            LinkRelation::DeprecatedBy => LinkRelation::Supersedes,
        }
    }

    /// The status expressing this relation towards `target`.
    pub fn status_for(self, target: DecisionId) -> Status {
        match self {
            LinkRelation::Supersedes => Status::Supersedes(target),
            LinkRelation::DeprecatedBy => Status::DeprecatedBy(target),
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRelation::Supersedes => write!(f, "supersedes"),
            LinkRelation::DeprecatedBy => write!(f, "deprecated by"),
        }
    }
}

/// One derived link held by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionLink {
    pub relation: LinkRelation,
    pub target: DecisionId,
}

/// A status that references a decision missing from the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    pub source: DecisionId,
    pub relation: LinkRelation,
    pub target: DecisionId,
}

impl fmt::Display for DanglingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decision {} {} {}, which does not exist",
            self.source, self.relation, self.target
        )
    }
}

/// A link that could not be made reciprocal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LinkConflict {
    /// The status references the record itself.
    SelfReference { source: DecisionId },
    /// The target is already linked, reciprocally, to `holder`.
    Contested {
        source: DecisionId,
        relation: LinkRelation,
        target: DecisionId,
        holder: DecisionId,
    },
    /// Reported by [`LinkResolver::check`]: the target does not hold the
    /// reciprocal status.
    Unreciprocated {
        source: DecisionId,
        relation: LinkRelation,
        target: DecisionId,
        found: Status,
    },
}

impl fmt::Display for LinkConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkConflict::SelfReference { source } => {
                write!(f, "decision {source} references itself")
            }
            LinkConflict::Contested {
                source,
                relation,
                target,
                holder,
            } => write!(
                f,
                "decision {source} {relation} {target}, but {target} is already linked to {holder}"
            ),
            LinkConflict::Unreciprocated {
                source,
                relation,
                target,
                found,
            } => write!(
                f,
                "decision {source} {relation} {target}, but {target} has status `{found}`"
            ),
        }
    }
}

/// A status rewritten by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub id: DecisionId,
    pub from: Status,
    pub to: Status,
}

/// Warnings and edits produced by one resolver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub dangling: Vec<DanglingRef>,
    pub conflicts: Vec<LinkConflict>,
    pub updated: Vec<StatusChange>,
}

impl LinkReport {
    /// True when the pass found nothing to warn about.
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.conflicts.is_empty()
    }

    pub(crate) fn absorb(&mut self, other: LinkReport) {
        self.dangling.extend(other.dangling);
        self.conflicts.extend(other.conflicts);
        self.updated.extend(other.updated);
    }
}

/// Full-block link resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver {
    anchor: Option<DecisionId>,
}

impl LinkResolver {
    /// Resolver that processes records in list order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that processes `anchor` first and lets its link win over an
    /// existing reciprocal pair.
    pub fn anchored(anchor: DecisionId) -> Self {
        Self {
            anchor: Some(anchor),
        }
    }

    /// Bring every reciprocal status in line and refresh derived links.
    pub fn resolve(&self, records: &mut [DecisionRecord]) -> LinkReport {
        let report = self.pass(records, true);
        refresh_links(records);
        for change in &report.updated {
            debug!(
                id = %change.id,
                from = %change.from,
                to = %change.to,
                "reciprocal status updated"
            );
        }
        log_warnings(&report);
        report
    }

    /// Report links that are not reciprocal without changing anything.
    pub fn check(&self, records: &[DecisionRecord]) -> LinkReport {
        let mut scratch = records.to_vec();
        self.pass(&mut scratch, false)
    }

    fn order(&self, records: &[DecisionRecord]) -> Vec<usize> {
        let anchor = self
            .anchor
            .and_then(|id| records.iter().position(|r| r.id == id));
        anchor
            .into_iter()
            .chain((0..records.len()).filter(|&idx| Some(idx) != anchor))
            .collect()
    }

    fn pass(&self, records: &mut [DecisionRecord], apply: bool) -> LinkReport {
        let index: HashMap<DecisionId, usize> = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id, idx))
            .collect();
        let mut report = LinkReport::default();

        for idx in self.order(records) {
            let source = records[idx].id;
            let Some((relation, target)) = records[idx].status.link() else {
                continue;
            };
            if target == source {
                report.conflicts.push(LinkConflict::SelfReference { source });
                continue;
            }
            let Some(&t) = index.get(&target) else {
                report.dangling.push(DanglingRef {
                    source,
                    relation,
                    target,
                });
                continue;
            };
            let wanted = relation.reciprocal().status_for(source);
            let found = records[t].status;
            if found == wanted {
                continue;
            }
            if !apply {
                report.conflicts.push(LinkConflict::Unreciprocated {
                    source,
                    relation,
                    target,
                    found,
                });
                continue;
            }
            if let Some(holder) = reciprocated_partner(records, &index, t) {
                if holder != source {
                    if self.anchor != Some(source) {
                        report.conflicts.push(LinkConflict::Contested {
                            source,
                            relation,
                            target,
                            holder,
                        });
                        continue;
                    }
                    // The anchor takes the target over; its old partner lets go.
                    if let Some(&h) = index.get(&holder) {
                        let from = records[h].status;
                        records[h].status = Status::Accepted;
                        report.updated.push(StatusChange {
                            id: holder,
                            from,
                            to: Status::Accepted,
                        });
                    }
                }
            }
            records[t].status = wanted;
            report.updated.push(StatusChange {
                id: target,
                from: found,
                to: wanted,
            });
        }
        report
    }
}

/// The record that `records[idx]` is linked to and that links back.
fn reciprocated_partner(
    records: &[DecisionRecord],
    index: &HashMap<DecisionId, usize>,
    idx: usize,
) -> Option<DecisionId> {
    let (relation, partner) = records[idx].status.link()?;
    let &p = index.get(&partner)?;
    let owner = records[idx].id;
    (records[p].status == relation.reciprocal().status_for(owner)).then_some(partner)
}

/// Rebuild each record's derived link set from the statuses in the block.
pub(crate) fn refresh_links(records: &mut [DecisionRecord]) {
    let mut derived: HashMap<DecisionId, Vec<DecisionLink>> = HashMap::new();
    for record in records.iter() {
        if let Some((relation, target)) = record.status.link() {
            derived.entry(record.id).or_default().push(DecisionLink { relation, target });
            derived.entry(target).or_default().push(DecisionLink {
                relation: relation.reciprocal(),
                target: record.id,
            });
        }
    }
    for record in records.iter_mut() {
        let mut links = derived.remove(&record.id).unwrap_or_default();
        links.sort();
        links.dedup();
        record.links = links;
    }
}

fn log_warnings(report: &LinkReport) {
    for dangling in &report.dangling {
        debug!(source = %dangling.source, target = %dangling.target, "dangling decision reference");
    }
    for conflict in &report.conflicts {
        debug!(%conflict, "link conflict");
    }
}

/// Revert the former target of `previous` to Accepted if it still holds the
/// reciprocal status towards `owner`.
pub(crate) fn release(
    records: &mut [DecisionRecord],
    owner: DecisionId,
    previous: Status,
) -> Option<StatusChange> {
    let target = previous.target()?;
    let reciprocal = previous.reciprocal(owner)?;
    let record = records.iter_mut().find(|r| r.id == target)?;
    if record.status != reciprocal {
        return None;
    }
    record.status = Status::Accepted;
    Some(StatusChange {
        id: target,
        from: reciprocal,
        to: Status::Accepted,
    })
}

/// Resolve reciprocal links across `records` in list order.
///
/// Returns the updated records and every reference to a missing decision.
pub fn resolve_links(mut records: Vec<DecisionRecord>) -> (Vec<DecisionRecord>, Vec<DanglingRef>) {
    let report = LinkResolver::new().resolve(&mut records);
    (records, report.dangling)
}
