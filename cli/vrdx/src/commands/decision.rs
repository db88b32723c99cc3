//! Commands that read or edit the decisions of a single file.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::info;
use vrdx_engine::{
    DecisionId, DecisionRecord, DecisionUpdate, FieldLabel, LinkRelation, LinkReport, NewDecision,
};

use super::{edit_block, load_block, print_json, report_links};
use crate::persistence::MarkdownFile;

/// Where `vrdx move` should put a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    Up,
    Down,
    /// 1-based position in the list.
    Position(usize),
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    id: DecisionId,
    title: &'a str,
    status: String,
}

/// `vrdx list`: one line per decision, in file order.
pub fn list(path: &Path, json: bool) -> anyhow::Result<()> {
    let file = MarkdownFile::read(path)?;
    let block = load_block(&file)?;

    if json {
        let entries: Vec<ListEntry<'_>> = block
            .records()
            .iter()
            .map(|r| ListEntry {
                id: r.id,
                title: &r.title,
                status: r.status.to_string(),
            })
            .collect();
        return print_json(&entries);
    }
    if block.is_empty() {
        println!("No decisions in {}.", path.display());
        return Ok(());
    }
    for r in block.records() {
        println!("{:>4}  {:<22}  {}", r.id, r.status.to_string(), r.title);
    }
    Ok(())
}

fn print_record(record: &DecisionRecord) {
    println!("### {} {}", record.id, record.title);
    println!("Status: {}", record.status);
    for label in [FieldLabel::Decision, FieldLabel::Context, FieldLabel::Consequences] {
        let text = record.body(label).unwrap_or_default();
        println!();
        println!("{}:", label.as_str());
        if text.is_empty() {
            println!("  (empty)");
        }
        for line in text.lines() {
            println!("  {line}");
        }
    }
    if !record.links.is_empty() {
        println!();
        for link in &record.links {
            println!("{} {}", link.relation, link.target);
        }
    }
}

/// `vrdx show`: one decision in full.
pub fn show(path: &Path, id: DecisionId, json: bool) -> anyhow::Result<()> {
    let file = MarkdownFile::read(path)?;
    let block = load_block(&file)?;
    let record = block
        .get(id)
        .with_context(|| format!("no decision {id} in {}", path.display()))?;
    if json {
        return print_json(record);
    }
    print_record(record);
    Ok(())
}

#[derive(Debug, Serialize)]
struct EditSummary {
    id: DecisionId,
    #[serde(flatten)]
    links: LinkReport,
}

fn finish(id: DecisionId, report: LinkReport, json: bool, message: &str) -> anyhow::Result<()> {
    report_links(&report, json);
    if json {
        return print_json(&EditSummary { id, links: report });
    }
    println!("{message}");
    Ok(())
}

/// `vrdx add`: create a decision with the next free ID.
pub fn add(path: &Path, new: NewDecision, json: bool) -> anyhow::Result<DecisionId> {
    let (id, report) = edit_block(path, |block| Ok(block.create(new)?))?;
    info!(%id, path = %path.display(), "decision added");
    finish(id, report, json, &format!("Added decision {id}"))?;
    Ok(id)
}

/// `vrdx edit`: change some fields of a decision.
pub fn edit(path: &Path, id: DecisionId, update: DecisionUpdate, json: bool) -> anyhow::Result<()> {
    if update.is_empty() {
        anyhow::bail!(
            "nothing to change; pass at least one of \
             --title, --status, --decision, --context, --consequences"
        );
    }
    let report = edit_block(path, |block| Ok(block.update(id, update)?))?;
    finish(id, report, json, &format!("Updated decision {id}"))
}

/// `vrdx link`: make `source` supersede, or be deprecated by, `target`.
pub fn link(
    path: &Path,
    source: DecisionId,
    relation: LinkRelation,
    target: DecisionId,
    json: bool,
) -> anyhow::Result<()> {
    let report = edit_block(path, |block| Ok(block.link(source, relation, target)?))?;
    let message = match relation {
        LinkRelation::Supersedes => format!("Decision {source} now supersedes {target}"),
        LinkRelation::DeprecatedBy => format!("Decision {source} is now deprecated by {target}"),
    };
    finish(source, report, json, &message)
}

/// `vrdx unlink`: drop the link held by `source`.
pub fn unlink(path: &Path, source: DecisionId, json: bool) -> anyhow::Result<()> {
    let report = edit_block(path, |block| Ok(block.unlink(source)?))?;
    finish(source, report, json, &format!("Decision {source} is no longer linked"))
}

/// `vrdx move`: reposition a decision within the list.
pub fn move_decision(
    path: &Path,
    id: DecisionId,
    target: MoveTarget,
    json: bool,
) -> anyhow::Result<()> {
    let moved = edit_block(path, |block| {
        let moved = match target {
            MoveTarget::Up => block.move_up(id)?,
            MoveTarget::Down => block.move_down(id)?,
            MoveTarget::Position(position) => {
                let from = block
                    .records()
                    .iter()
                    .position(|r| r.id == id)
                    .with_context(|| format!("no decision {id} in {}", path.display()))?;
                let to = position.checked_sub(1).context("positions start at 1")?;
                block.move_record(from, to)?;
                from != to
            }
        };
        Ok(moved)
    })?;

    if json {
        return print_json(&serde_json::json!({ "id": id, "moved": moved }));
    }
    if moved {
        println!("Moved decision {id}");
    } else {
        println!("Decision {id} is already there");
    }
    Ok(())
}

/// `vrdx sort`: order decisions highest ID first.
pub fn sort(path: &Path, json: bool) -> anyhow::Result<()> {
    let changed = edit_block(path, |block| {
        let before: Vec<DecisionId> = block.records().iter().map(|r| r.id).collect();
        block.sort_descending();
        Ok(block.records().iter().map(|r| r.id).ne(before))
    })?;
    if json {
        return print_json(&serde_json::json!({ "sorted": changed }));
    }
    if changed {
        println!("Sorted decisions in {}", path.display());
    } else {
        println!("Decisions in {} are already sorted", path.display());
    }
    Ok(())
}

/// `vrdx delete`: remove a decision. Links pointing at it are reported, not
/// rewritten.
pub fn delete(path: &Path, id: DecisionId, json: bool) -> anyhow::Result<()> {
    let (removed, report) = edit_block(path, |block| Ok(block.delete(id)?))?;
    info!(%id, path = %path.display(), "decision deleted");
    finish(
        id,
        report,
        json,
        &format!("Deleted decision {id} ({})", removed.title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use vrdx_engine::Status;

    const DOC: &str = "# Notes\n\n<!-- vrdx start -->\n\n### 2 Use Postgres\n* Status: ✅ Accepted\n\n* Decision: Postgres.\n\n* Context: Relational data.\n\n* Consequences: Ops.\n\n### 1 Use SQLite\n* Status: ✅ Accepted\n\n* Decision: SQLite.\n\n* Context: Prototype.\n\n* Consequences: None.\n\n<!-- vrdx end -->\n\nFooter\n";

    fn id(raw: u32) -> DecisionId {
        DecisionId::new(raw).unwrap()
    }

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adr.md");
        fs::write(&path, DOC).unwrap();
        (dir, path)
    }

    fn ids(path: &Path) -> Vec<u32> {
        let file = MarkdownFile::read(path).unwrap();
        load_block(&file)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.id.get())
            .collect()
    }

    fn status_of(path: &Path, raw: u32) -> Status {
        let file = MarkdownFile::read(path).unwrap();
        load_block(&file).unwrap().get(id(raw)).unwrap().status
    }

    #[test]
    fn add_allocates_next_id_at_head() {
        let (_dir, path) = fixture();
        let new = NewDecision::new("Cache reads").with_decision("Use Redis.");
        assert_eq!(add(&path, new, true).unwrap(), id(3));
        assert_eq!(ids(&path), vec![3, 2, 1]);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Notes\n\n<!-- vrdx start -->\n"));
        assert!(text.ends_with("<!-- vrdx end -->\n\nFooter\n"));
        assert!(
            text.contains("### 3 Cache reads\n* Status: 📝 Draft\n\n* Decision: Use Redis.\n")
        );
    }

    #[test]
    fn edit_requires_a_change() {
        let (_dir, path) = fixture();
        let err = edit(&path, id(1), DecisionUpdate::default(), false).unwrap_err();
        assert!(err.to_string().contains("nothing to change"));
        assert_eq!(fs::read_to_string(&path).unwrap(), DOC);

        let update = DecisionUpdate {
            title: Some("Use SQLite for tests".into()),
            ..DecisionUpdate::default()
        };
        edit(&path, id(1), update, false).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("### 1 Use SQLite for tests\n"));
    }

    #[test]
    fn link_and_unlink_keep_statuses_reciprocal() {
        let (_dir, path) = fixture();
        link(&path, id(2), LinkRelation::Supersedes, id(1), false).unwrap();
        assert_eq!(status_of(&path, 2), Status::Supersedes(id(1)));
        assert_eq!(status_of(&path, 1), Status::DeprecatedBy(id(2)));

        unlink(&path, id(2), false).unwrap();
        assert_eq!(status_of(&path, 2), Status::Accepted);
        assert_eq!(status_of(&path, 1), Status::Accepted);

        assert!(unlink(&path, id(2), false).is_err());
    }

    #[test]
    fn link_to_self_is_rejected() {
        let (_dir, path) = fixture();
        let err = link(&path, id(1), LinkRelation::Supersedes, id(1), false).unwrap_err();
        assert!(err.to_string().contains("itself"), "{err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), DOC);
    }

    #[test]
    fn move_and_sort() {
        let (_dir, path) = fixture();
        move_decision(&path, id(1), MoveTarget::Up, false).unwrap();
        assert_eq!(ids(&path), vec![1, 2]);
        move_decision(&path, id(1), MoveTarget::Up, false).unwrap();
        assert_eq!(ids(&path), vec![1, 2]);
        move_decision(&path, id(1), MoveTarget::Position(2), false).unwrap();
        assert_eq!(ids(&path), vec![2, 1]);
        assert!(move_decision(&path, id(1), MoveTarget::Position(0), false).is_err());
        assert!(move_decision(&path, id(1), MoveTarget::Position(5), false).is_err());

        move_decision(&path, id(2), MoveTarget::Down, false).unwrap();
        sort(&path, false).unwrap();
        assert_eq!(ids(&path), vec![2, 1]);
    }

    #[test]
    fn delete_leaves_dangling_reference() {
        let (_dir, path) = fixture();
        link(&path, id(2), LinkRelation::Supersedes, id(1), false).unwrap();
        delete(&path, id(1), false).unwrap();
        assert_eq!(ids(&path), vec![2]);
        assert_eq!(status_of(&path, 2), Status::Supersedes(id(1)));
        assert!(delete(&path, id(1), false).is_err());
    }

    #[test]
    fn show_and_list_unknown_ids() {
        let (_dir, path) = fixture();
        list(&path, true).unwrap();
        show(&path, id(2), false).unwrap();
        let err = show(&path, id(9), false).unwrap_err();
        assert!(err.to_string().contains("no decision 9"));
    }

    #[test]
    fn file_without_markers_points_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        fs::write(&path, "# plain\n").unwrap();
        let err = list(&path, false).unwrap_err();
        assert!(err.to_string().contains("vrdx init"));
    }
}
