//! The decision block: parsed records plus everything needed to splice an
//! edited rendering back into the host text.
//!
//! A block is parsed from a full buffer, mutated in memory and applied back
//! to the same buffer. Every mutation validates the record it touches so the
//! rendered text always parses back into the in-memory list, and every link
//! change is followed by a full resolver pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, MutationError};
use crate::links::{self, LinkRelation, LinkReport, LinkResolver};
use crate::markers::{locate_markers, MarkerSpan, MarkerStatus};
use crate::newline::NewlineStyle;
use crate::order;
use crate::parse::parse_body;
use crate::record::{DecisionId, DecisionRecord};
use crate::serialize::{digest, render_records};
use crate::status::Status;

/// Fields for a new decision. An empty title becomes `Decision <id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewDecision {
    pub title: String,
    pub status: Status,
    pub decision: String,
    pub context: String,
    pub consequences: String,
}

impl NewDecision {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_decision(mut self, text: impl Into<String>) -> Self {
        self.decision = text.into();
        self
    }

    pub fn with_context(mut self, text: impl Into<String>) -> Self {
        self.context = text.into();
        self
    }

    pub fn with_consequences(mut self, text: impl Into<String>) -> Self {
        self.consequences = text.into();
        self
    }
}

/// A partial edit; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionUpdate {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub decision: Option<String>,
    pub context: Option<String>,
    pub consequences: Option<String>,
}

impl DecisionUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A parsed marker region and its records.
#[derive(Debug, Clone)]
pub struct DecisionBlock {
    span: MarkerSpan,
    newline: NewlineStyle,
    preamble: String,
    records: Vec<DecisionRecord>,
    body_digest: String,
    modified: bool,
}

impl DecisionBlock {
    /// Locate the markers in `text` and parse the region between them.
    ///
    /// Parse errors carry absolute line numbers within `text`.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let span = match locate_markers(text) {
            MarkerStatus::Present(span) => span,
            MarkerStatus::Absent => return Err(EngineError::MarkersAbsent),
            MarkerStatus::Malformed(malformed) => {
                return Err(EngineError::MarkerMalformed(malformed))
            }
        };
        let body = span.body(text);
        let parsed = parse_body(body, span.body_first_line())?;
        let mut records = parsed.records;
        links::refresh_links(&mut records);

        let newline = NewlineStyle::detect(text);
        debug!(records = records.len(), %newline, "decision block parsed");
        Ok(Self {
            span,
            newline,
            preamble: body[..parsed.preamble_len].to_string(),
            records,
            body_digest: digest(body),
            modified: false,
        })
    }

    pub fn span(&self) -> MarkerSpan {
        self.span
    }

    pub fn newline(&self) -> NewlineStyle {
        self.newline
    }

    /// Text inside the markers before the first decision heading.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn get(&self, id: DecisionId) -> Option<&DecisionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once any mutation has been applied.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn next_id(&self) -> Result<DecisionId, MutationError> {
        order::next_id(&self.records)
    }

    fn index_of(&self, id: DecisionId) -> Result<usize, MutationError> {
        order::position_of(&self.records, id).ok_or(MutationError::NotFound(id))
    }

    /// Add a decision with the next free ID at the head of the list.
    pub fn create(&mut self, new: NewDecision) -> Result<(DecisionId, LinkReport), MutationError> {
        let id = self.next_id()?;
        let title = match new.title.trim() {
            "" => format!("Decision {id}"),
            title => title.to_string(),
        };
        let record = DecisionRecord::new(id, title)
            .with_status(new.status)
            .with_decision(new.decision)
            .with_context(new.context)
            .with_consequences(new.consequences);
        let report = self.insert(record)?;
        Ok((id, report))
    }

    /// Add a fully specified record at the head of the list.
    pub fn insert(&mut self, mut record: DecisionRecord) -> Result<LinkReport, MutationError> {
        if self.get(record.id).is_some() {
            return Err(MutationError::DuplicateId(record.id));
        }
        record.normalize();
        record.validate()?;
        record.raw = None;
        let id = record.id;
        self.records.insert(0, record);
        debug!(%id, "decision inserted");
        Ok(self.relink(id, Status::Draft))
    }

    /// Apply a partial edit to one record.
    pub fn update(
        &mut self,
        id: DecisionId,
        update: DecisionUpdate,
    ) -> Result<LinkReport, MutationError> {
        let idx = self.index_of(id)?;
        let mut candidate = self.records[idx].clone();
        if let Some(title) = update.title {
            candidate.title = title;
        }
        if let Some(status) = update.status {
            candidate.status = status;
        }
        if let Some(text) = update.decision {
            candidate.decision = text;
        }
        if let Some(text) = update.context {
            candidate.context = text;
        }
        if let Some(text) = update.consequences {
            candidate.consequences = text;
        }
        candidate.normalize();
        candidate.validate()?;

        let previous = std::mem::replace(&mut self.records[idx], candidate).status;
        Ok(self.relink(id, previous))
    }

    pub fn set_status(
        &mut self,
        id: DecisionId,
        status: Status,
    ) -> Result<LinkReport, MutationError> {
        self.update(
            id,
            DecisionUpdate {
                status: Some(status),
                ..DecisionUpdate::default()
            },
        )
    }

    /// Make `source` supersede, or be deprecated by, `target`.
    ///
    /// A missing target is accepted and reported as dangling.
    pub fn link(
        &mut self,
        source: DecisionId,
        relation: LinkRelation,
        target: DecisionId,
    ) -> Result<LinkReport, MutationError> {
        if source == target {
            return Err(MutationError::SelfLink(source));
        }
        self.set_status(source, relation.status_for(target))
    }

    /// Drop the link held by `source`; it becomes Accepted and its former
    /// partner reverts to Accepted as well.
    pub fn unlink(&mut self, source: DecisionId) -> Result<LinkReport, MutationError> {
        let idx = self.index_of(source)?;
        if self.records[idx].status.link().is_none() {
            return Err(MutationError::NotALink(source));
        }
        self.set_status(source, Status::Accepted)
    }

    fn relink(&mut self, id: DecisionId, previous: Status) -> LinkReport {
        self.modified = true;
        let mut report = LinkReport::default();
        let current = self.get(id).map(|r| r.status);
        if current.and_then(|s| s.link()) != previous.link() {
            if let Some(change) = links::release(&mut self.records, id, previous) {
                report.updated.push(change);
            }
        }
        report.absorb(LinkResolver::anchored(id).resolve(&mut self.records));
        report
    }

    /// Move the record at index `from` to index `to`.
    pub fn move_record(&mut self, from: usize, to: usize) -> Result<(), MutationError> {
        order::move_within(&mut self.records, from, to)?;
        if from != to {
            self.modified = true;
        }
        Ok(())
    }

    /// Swap `id` with its predecessor. Returns false when already first.
    pub fn move_up(&mut self, id: DecisionId) -> Result<bool, MutationError> {
        let idx = self.index_of(id)?;
        if idx == 0 {
            return Ok(false);
        }
        self.records.swap(idx, idx - 1);
        self.modified = true;
        Ok(true)
    }

    /// Swap `id` with its successor. Returns false when already last.
    pub fn move_down(&mut self, id: DecisionId) -> Result<bool, MutationError> {
        let idx = self.index_of(id)?;
        if idx + 1 >= self.records.len() {
            return Ok(false);
        }
        self.records.swap(idx, idx + 1);
        self.modified = true;
        Ok(true)
    }

    /// Remove a record. Statuses pointing at it are left as they are and
    /// reported as dangling.
    pub fn delete(
        &mut self,
        id: DecisionId,
    ) -> Result<(DecisionRecord, LinkReport), MutationError> {
        let idx = self.index_of(id)?;
        let removed = self.records.remove(idx);
        self.modified = true;
        debug!(%id, "decision deleted");
        let report = LinkResolver::new().resolve(&mut self.records);
        Ok((removed, report))
    }

    /// Reorder highest ID first.
    pub fn sort_descending(&mut self) {
        if !order::is_descending(&self.records) {
            order::sort_descending(&mut self.records);
            self.modified = true;
        }
    }

    /// Run a full resolver pass in list order.
    pub fn resolve_links(&mut self) -> LinkReport {
        let report = LinkResolver::new().resolve(&mut self.records);
        if !report.updated.is_empty() {
            self.modified = true;
        }
        report
    }

    /// Report one-sided, contested and dangling links without fixing them.
    pub fn check_links(&self) -> LinkReport {
        LinkResolver::new().check(&self.records)
    }

    /// The text to place between the markers.
    ///
    /// Preamble first, then one blank line, the records, and a blank line
    /// before the end marker. An empty block renders as the scaffold body.
    pub fn render_body(&self) -> String {
        let nl = self.newline.as_str();
        let mut out = String::new();
        let preamble = self.preamble.trim_end();
        if !preamble.is_empty() {
            out.push_str(preamble);
            out.push_str(nl);
        }
        out.push_str(nl);
        if !self.records.is_empty() {
            out.push_str(&render_records(&self.records, self.newline, true));
            out.push_str(nl);
        }
        out
    }

    /// Splice the block back into `original`, the buffer it was parsed from.
    ///
    /// Bytes outside the marker body are copied unchanged. An unmodified
    /// block returns `original` as is.
    pub fn apply_to(&self, original: &str) -> Result<String, EngineError> {
        let span = locate_markers(original)
            .span()
            .ok_or(EngineError::StaleBuffer)?;
        if span != self.span || digest(span.body(original)) != self.body_digest {
            return Err(EngineError::StaleBuffer);
        }
        if !self.modified {
            return Ok(original.to_string());
        }
        Ok(span.replace_body(original, &self.render_body()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;
    use pretty_assertions::assert_eq;

    fn id(raw: u32) -> DecisionId {
        DecisionId::new(raw).unwrap()
    }

    const DOC: &str = "# Architecture\n\
        \n\
        Intro prose.\n\
        <!-- vrdx start -->\n\
        \n\
        ### 2 Use Postgres\n\
        * Status: ✅ Accepted\n\
        * Decision: Store orders in Postgres.\n\
        * Context: We need transactions.\n\
        * Consequences: Ops runs backups.\n\
        \n\
        ### 1 Write a monolith\n\
        * Status: ✅ Accepted\n\
        * Decision: One deployable.\n\
        * Context: Small team.\n\
        * Consequences: Slower builds later.\n\
        \n\
        <!-- vrdx end -->\n\
        Trailing notes.\n";

    fn ids(block: &DecisionBlock) -> Vec<u32> {
        block.records().iter().map(|r| r.id.get()).collect()
    }

    #[test]
    fn parse_reports_marker_state() {
        assert_eq!(
            DecisionBlock::parse("# nothing\n").unwrap_err(),
            EngineError::MarkersAbsent
        );
        let err = DecisionBlock::parse("<!-- vrdx end -->\n<!-- vrdx start -->\n").unwrap_err();
        assert!(matches!(err, EngineError::MarkerMalformed(_)));
    }

    #[test]
    fn parse_errors_use_file_line_numbers() {
        let text = "# T\n<!-- vrdx start -->\n### Use Postgres\n<!-- vrdx end -->\n";
        match DecisionBlock::parse(text).unwrap_err() {
            EngineError::Parse(err) => {
                assert_eq!(err.line, 3);
                assert!(matches!(err.kind, ParseErrorKind::MissingId { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unmodified_block_applies_byte_for_byte() {
        let block = DecisionBlock::parse(DOC).unwrap();
        assert_eq!(ids(&block), vec![2, 1]);
        assert!(!block.is_modified());
        assert_eq!(block.apply_to(DOC).unwrap(), DOC);
    }

    #[test]
    fn create_inserts_at_head_and_keeps_outside_bytes() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        let (new_id, report) = block.create(NewDecision::new("Add cache")).unwrap();
        assert_eq!(new_id, id(3));
        assert!(report.is_clean());
        assert_eq!(ids(&block), vec![3, 2, 1]);

        let out = block.apply_to(DOC).unwrap();
        assert!(out.starts_with(
            "# Architecture\n\nIntro prose.\n<!-- vrdx start -->\n\n### 3 Add cache\n"
        ));
        assert!(out.ends_with("<!-- vrdx end -->\nTrailing notes.\n"));
        let cache = out.find("### 3 Add cache").unwrap();
        let postgres = out.find("### 2 Use Postgres").unwrap();
        assert!(cache < postgres);
        // Untouched records keep their source text.
        assert!(out.contains("### 2 Use Postgres\n* Status: ✅ Accepted\n* Decision:"));

        let reparsed = DecisionBlock::parse(&out).unwrap();
        assert_eq!(reparsed.records(), block.records());
    }

    #[test]
    fn blank_title_gets_a_default() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        let (new_id, _) = block.create(NewDecision::new("  ")).unwrap();
        assert_eq!(block.get(new_id).unwrap().title, "Decision 3");
    }

    #[test]
    fn insert_rejects_duplicates_and_invalid_records() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        let err = block.insert(DecisionRecord::new(id(2), "Again")).unwrap_err();
        assert_eq!(err, MutationError::DuplicateId(id(2)));
        let err = block
            .insert(DecisionRecord::new(id(9), "Bad").with_context("ok\n### 10 Smuggled"))
            .unwrap_err();
        assert!(matches!(err, MutationError::ReservedLine { .. }));
        assert_eq!(block.len(), 2);
        assert!(!block.is_modified());
    }

    #[test]
    fn set_status_links_both_sides() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        let report = block.set_status(id(2), Status::Supersedes(id(1))).unwrap();
        assert_eq!(block.get(id(1)).unwrap().status, Status::DeprecatedBy(id(2)));
        assert_eq!(report.updated.len(), 1);
    }

    #[test]
    fn retargeting_releases_the_old_target() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block.create(NewDecision::new("Cache")).unwrap();
        block.link(id(3), LinkRelation::Supersedes, id(2)).unwrap();
        assert_eq!(block.get(id(2)).unwrap().status, Status::DeprecatedBy(id(3)));

        block.link(id(3), LinkRelation::Supersedes, id(1)).unwrap();
        assert_eq!(block.get(id(2)).unwrap().status, Status::Accepted);
        assert_eq!(block.get(id(1)).unwrap().status, Status::DeprecatedBy(id(3)));
    }

    #[test]
    fn taking_over_a_linked_target_releases_its_old_partner() {
        let doc = "<!-- vrdx start -->\n\
            ### 5 Use Kafka\n\
            * Status: ⬆️ Supersedes 2\n\
            * Decision: d\n* Context: c\n* Consequences: q\n\
            \n\
            ### 3 Use NATS\n\
            * Status: ✅ Accepted\n\
            * Decision: d\n* Context: c\n* Consequences: q\n\
            \n\
            ### 2 Use RabbitMQ\n\
            * Status: ⛔ Deprecated by 5\n\
            * Decision: d\n* Context: c\n* Consequences: q\n\
            <!-- vrdx end -->\n";
        let mut block = DecisionBlock::parse(doc).unwrap();
        let report = block.link(id(3), LinkRelation::Supersedes, id(2)).unwrap();

        assert_eq!(block.get(id(3)).unwrap().status, Status::Supersedes(id(2)));
        assert_eq!(block.get(id(2)).unwrap().status, Status::DeprecatedBy(id(3)));
        assert_eq!(block.get(id(5)).unwrap().status, Status::Accepted);
        assert!(report.conflicts.is_empty(), "{:?}", report.conflicts);
        assert!(report.updated.iter().any(|c| c.id == id(5) && c.to == Status::Accepted));
        assert!(block.check_links().is_clean());
    }

    #[test]
    fn stray_carriage_returns_do_not_break_round_trips() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block
            .insert(DecisionRecord::new(id(3), "Cache").with_context("a\r\r\nb\r"))
            .unwrap();
        assert_eq!(block.get(id(3)).unwrap().context, "a\nb");

        let out = block.apply_to(DOC).unwrap();
        let reparsed = DecisionBlock::parse(&out).unwrap();
        assert_eq!(reparsed.records(), block.records());

        let doc = "<!-- vrdx start -->\n### 1 T\n* Status: 📝 Draft\n\
            * Decision: x\r\r\n  y\n* Context:\n* Consequences:\n<!-- vrdx end -->\n";
        let parsed = DecisionBlock::parse(doc).unwrap();
        assert_eq!(parsed.get(id(1)).unwrap().decision, "x\n  y");
    }

    #[test]
    fn unlink_reverts_both_sides() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block.link(id(1), LinkRelation::DeprecatedBy, id(2)).unwrap();
        assert_eq!(block.get(id(2)).unwrap().status, Status::Supersedes(id(1)));
        block.unlink(id(2)).unwrap();
        assert_eq!(block.get(id(2)).unwrap().status, Status::Accepted);
        assert_eq!(block.get(id(1)).unwrap().status, Status::Accepted);
        assert_eq!(block.unlink(id(2)), Err(MutationError::NotALink(id(2))));
    }

    #[test]
    fn link_rejects_self_and_reports_dangling() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        assert_eq!(
            block.link(id(1), LinkRelation::Supersedes, id(1)),
            Err(MutationError::SelfLink(id(1)))
        );
        let report = block.link(id(1), LinkRelation::Supersedes, id(40)).unwrap();
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(block.get(id(1)).unwrap().status, Status::Supersedes(id(40)));
    }

    #[test]
    fn update_edits_fields_and_validates() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block
            .update(
                id(1),
                DecisionUpdate {
                    title: Some(" Modular monolith ".into()),
                    context: Some("Small team.\r\n\r\nTight deadline.".into()),
                    ..DecisionUpdate::default()
                },
            )
            .unwrap();
        let r = block.get(id(1)).unwrap();
        assert_eq!(r.title, "Modular monolith");
        assert_eq!(r.context, "Small team.\n\nTight deadline.");
        assert!(!r.is_pristine());

        let err = block
            .update(
                id(1),
                DecisionUpdate {
                    title: Some("".into()),
                    ..DecisionUpdate::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, MutationError::EmptyTitle);
        assert_eq!(block.get(id(1)).unwrap().title, "Modular monolith");
        assert_eq!(
            block.update(id(7), DecisionUpdate::default()),
            Err(MutationError::NotFound(id(7)))
        );
    }

    #[test]
    fn moves_and_sorting() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block.create(NewDecision::new("C")).unwrap();
        assert_eq!(ids(&block), vec![3, 2, 1]);
        assert!(!block.move_up(id(3)).unwrap());
        assert!(block.move_down(id(3)).unwrap());
        assert_eq!(ids(&block), vec![2, 3, 1]);
        assert!(!block.move_down(id(1)).unwrap());
        block.move_record(0, 2).unwrap();
        assert_eq!(ids(&block), vec![3, 1, 2]);
        block.sort_descending();
        assert_eq!(ids(&block), vec![3, 2, 1]);
    }

    #[test]
    fn delete_leaves_dangling_references() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block.link(id(2), LinkRelation::Supersedes, id(1)).unwrap();
        let (removed, report) = block.delete(id(1)).unwrap();
        assert_eq!(removed.id, id(1));
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(block.get(id(2)).unwrap().status, Status::Supersedes(id(1)));

        block.delete(id(2)).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.next_id().unwrap(), id(1));
        let out = block.apply_to(DOC).unwrap();
        assert!(out.contains("<!-- vrdx start -->\n\n<!-- vrdx end -->\n"));
    }

    #[test]
    fn stale_buffers_are_rejected() {
        let mut block = DecisionBlock::parse(DOC).unwrap();
        block.create(NewDecision::new("X")).unwrap();
        let edited = DOC.replace("Small team.", "Large team.");
        assert_eq!(block.apply_to(&edited), Err(EngineError::StaleBuffer));
        assert_eq!(block.apply_to("no markers"), Err(EngineError::StaleBuffer));
    }

    #[test]
    fn crlf_buffers_stay_crlf() {
        let doc = DOC.replace('\n', "\r\n");
        let mut block = DecisionBlock::parse(&doc).unwrap();
        assert_eq!(block.newline(), NewlineStyle::CrLf);
        block.create(NewDecision::new("Add cache").with_context("a\nb")).unwrap();
        let out = block.apply_to(&doc).unwrap();
        assert!(NewlineStyle::CrLf.matches(&out));
        assert!(out.contains("* Context: a\r\nb"));
    }

    #[test]
    fn preamble_is_preserved() {
        let doc = "<!-- vrdx start -->\nSee ADR guide.\n\n<!-- vrdx end -->\n";
        let mut block = DecisionBlock::parse(doc).unwrap();
        assert_eq!(block.preamble(), "See ADR guide.\n\n");
        block.create(NewDecision::new("First")).unwrap();
        let out = block.apply_to(doc).unwrap();
        assert!(out.starts_with("<!-- vrdx start -->\nSee ADR guide.\n\n### 1 First\n"));
        assert_eq!(DecisionBlock::parse(&out).unwrap().preamble(), "See ADR guide.\n\n");
    }
}
