//! `vrdx init`: add the marker block to a file.

use std::path::Path;

use serde::Serialize;
use tracing::info;
use vrdx_engine::{insert_scaffold, locate_markers, MarkerStatus, NewlineStyle};

use crate::persistence::MarkdownFile;

/// What `vrdx init` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitOutcome {
    AlreadyPresent,
    Inserted,
    Recreated,
}

/// Scaffold the marker block into `path`.
///
/// Nothing is written unless `confirmed` is set; a file with malformed
/// markers additionally needs `recreate`. `default_newline` is used when the
/// file has no line ending to follow.
pub fn init(
    path: &Path,
    confirmed: bool,
    recreate: bool,
    default_newline: NewlineStyle,
) -> anyhow::Result<InitOutcome> {
    let file = MarkdownFile::read_or_empty(path)?;
    let outcome = match locate_markers(file.text()) {
        MarkerStatus::Present(_) => return Ok(InitOutcome::AlreadyPresent),
        MarkerStatus::Absent => InitOutcome::Inserted,
        MarkerStatus::Malformed(malformed) => {
            if !recreate {
                anyhow::bail!(
                    "{} has malformed markers: {malformed}; pass --recreate to replace them",
                    path.display()
                );
            }
            InitOutcome::Recreated
        }
    };
    if !confirmed {
        anyhow::bail!(
            "refusing to modify {} without confirmation; pass --yes",
            path.display()
        );
    }

    let newline = if file.text().contains('\n') {
        NewlineStyle::detect(file.text())
    } else {
        default_newline
    };
    let text = insert_scaffold(file.text(), newline)?;
    file.write(&text)?;
    info!(path = %path.display(), %newline, "inserted marker block");
    Ok(outcome)
}

/// Print the outcome of [`init`].
pub fn report(path: &Path, outcome: InitOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return super::print_json(&serde_json::json!({
            "path": path,
            "outcome": outcome,
        }));
    }
    match outcome {
        InitOutcome::AlreadyPresent => println!("{} already has a vrdx block", path.display()),
        InitOutcome::Inserted => println!("Added vrdx block to {}", path.display()),
        InitOutcome::Recreated => println!("Recreated vrdx block in {}", path.display()),
    }
    Ok(())
}
