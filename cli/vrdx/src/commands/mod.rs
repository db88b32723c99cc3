//! CLI command implementations.

pub mod decision;
pub mod files;
pub mod markers;

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::warn;
use vrdx_engine::{DecisionBlock, EngineError, LinkReport};

use crate::persistence::MarkdownFile;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse the decision block of an already-read file.
pub fn load_block(file: &MarkdownFile) -> anyhow::Result<DecisionBlock> {
    let path = file.path().display();
    match DecisionBlock::parse(file.text()) {
        Ok(block) => Ok(block),
        Err(EngineError::MarkersAbsent) => anyhow::bail!(
            "{path} has no vrdx marker block (run `vrdx init {path} --yes` to add one)"
        ),
        Err(e) => Err(e).with_context(|| format!("parsing {path}")),
    }
}

/// Read `path`, apply `edit` to its block and write the result back if the
/// block changed.
pub fn edit_block<T>(
    path: &Path,
    edit: impl FnOnce(&mut DecisionBlock) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let file = MarkdownFile::read(path)?;
    let mut block = load_block(&file)?;
    let result = edit(&mut block)?;
    if block.is_modified() {
        let text = block
            .apply_to(file.text())
            .with_context(|| format!("updating {}", path.display()))?;
        file.write(&text)?;
    }
    Ok(result)
}

/// Log warnings from a link pass and echo the statuses it rewrote.
pub fn report_links(report: &LinkReport, json: bool) {
    for dangling in &report.dangling {
        warn!("{dangling}");
    }
    for conflict in &report.conflicts {
        warn!("{conflict}");
    }
    if !json {
        for change in &report.updated {
            println!("  decision {} is now {}", change.id, change.to);
        }
    }
}
