//! `vrdx files` and `vrdx check`: survey the Markdown files under a directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use vrdx_engine::{locate_markers, DecisionBlock, MarkerStatus};

use crate::discovery::{find_markdown_files, DiscoveryConfig};
use crate::persistence::MarkdownFile;

/// Marker state of one file, as shown by `vrdx files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    Absent,
    Present,
    Malformed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub markers: BlockState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decisions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn display_path(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Summarise one file. Read errors are folded into the summary.
pub fn summarize(base: &Path, path: &Path) -> FileSummary {
    let rel = display_path(base, path);
    let file = match MarkdownFile::read(path) {
        Ok(file) => file,
        Err(e) => {
            return FileSummary {
                path: rel,
                markers: BlockState::Absent,
                decisions: None,
                error: Some(format!("{e:#}")),
            }
        }
    };
    match locate_markers(file.text()) {
        MarkerStatus::Absent => FileSummary {
            path: rel,
            markers: BlockState::Absent,
            decisions: None,
            error: None,
        },
        MarkerStatus::Malformed(malformed) => FileSummary {
            path: rel,
            markers: BlockState::Malformed,
            decisions: None,
            error: Some(malformed.to_string()),
        },
        MarkerStatus::Present(_) => match DecisionBlock::parse(file.text()) {
            Ok(block) => FileSummary {
                path: rel,
                markers: BlockState::Present,
                decisions: Some(block.len()),
                error: None,
            },
            Err(e) => FileSummary {
                path: rel,
                markers: BlockState::Present,
                decisions: None,
                error: Some(e.to_string()),
            },
        },
    }
}

/// `vrdx files`: list discovered files with their marker state.
pub fn files(base: &Path, config: &DiscoveryConfig, json: bool) -> anyhow::Result<()> {
    let summaries: Vec<FileSummary> = find_markdown_files(base, config)?
        .iter()
        .map(|path| summarize(base, path))
        .collect();

    if json {
        return super::print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No Markdown files found under {}.", base.display());
        return Ok(());
    }
    println!("{:<10}  {:>9}  PATH", "MARKERS", "DECISIONS");
    for s in &summaries {
        let state = match s.markers {
            BlockState::Absent => "-",
            BlockState::Present if s.error.is_some() => "invalid",
            BlockState::Present => "present",
            BlockState::Malformed => "malformed",
        };
        let count = s.decisions.map_or_else(|| "-".to_string(), |n| n.to_string());
        println!("{:<10}  {:>9}  {}", state, count, s.path.display());
    }
    Ok(())
}

/// Findings for one file, as reported by `vrdx check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub path: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Check one file. Files without a marker block pass trivially.
pub fn check_file(base: &Path, path: &Path) -> CheckResult {
    let mut result = CheckResult {
        path: display_path(base, path),
        ok: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    let file = match MarkdownFile::read(path) {
        Ok(file) => file,
        Err(e) => {
            result.ok = false;
            result.errors.push(format!("{e:#}"));
            return result;
        }
    };
    if locate_markers(file.text()) == MarkerStatus::Absent {
        return result;
    }
    match DecisionBlock::parse(file.text()) {
        Ok(block) => {
            let report = block.check_links();
            result.warnings.extend(report.dangling.iter().map(|d| d.to_string()));
            result.warnings.extend(report.conflicts.iter().map(|c| c.to_string()));
        }
        Err(e) => {
            result.ok = false;
            result.errors.push(e.to_string());
        }
    }
    result
}

/// `vrdx check`: validate every discovered file. Fails if any file has
/// malformed markers or an unparseable block.
pub fn check(base: &Path, config: &DiscoveryConfig, json: bool) -> anyhow::Result<()> {
    let results: Vec<CheckResult> = find_markdown_files(base, config)?
        .iter()
        .map(|path| check_file(base, path))
        .collect();
    let failed = results.iter().filter(|r| !r.ok).count();

    if json {
        super::print_json(&results)?;
    } else {
        for r in &results {
            for error in &r.errors {
                println!("error   {}: {error}", r.path.display());
            }
            for warning in &r.warnings {
                println!("warning {}: {warning}", r.path.display());
            }
        }
        println!(
            "checked {} file(s): {} ok, {} failed",
            results.len(),
            results.len() - failed,
            failed
        );
    }
    info!(files = results.len(), failed, "check finished");

    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed checks");
    }
    Ok(())
}
