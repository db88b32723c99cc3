//! Markdown file discovery.
//!
//! Walks a directory tree and collects files whose extension matches the
//! configured list (case-insensitive), skipping ignored directory names.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// `[discovery]` section of `vrdx.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File suffixes to include, with the leading dot.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub ignored_directories: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".md".to_string(), ".markdown".to_string()],
            ignored_directories: [
                ".git",
                ".hg",
                ".svn",
                ".venv",
                "__pycache__",
                "node_modules",
                "target",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DiscoveryConfig {
    fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect()
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored_directories.iter().any(|ignored| ignored == name)
    }
}

/// Sorted list of Markdown files beneath `base`.
pub fn find_markdown_files(base: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
    if !base.exists() {
        anyhow::bail!("directory not found: {}", base.display());
    }
    if !base.is_dir() {
        anyhow::bail!("not a directory: {}", base.display());
    }

    let extensions = config.normalized_extensions();
    let mut found = Vec::new();
    let mut pending = vec![base.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .with_context(|| format!("inspecting {}", path.display()))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if file_type.is_dir() {
                if config.is_ignored(&name) {
                    trace!(dir = %path.display(), "skipping ignored directory");
                } else {
                    pending.push(path);
                }
            } else if path.is_file() && has_extension(&name, &extensions) {
                found.push(path);
            }
        }
    }
    found.sort();
    debug!(base = %base.display(), count = found.len(), "markdown files discovered");
    Ok(found)
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    match lower.rfind('.') {
        Some(dot) if dot > 0 => extensions.iter().any(|ext| lower[dot..] == *ext),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "# doc\n").unwrap();
    }

    #[test]
    fn finds_markdown_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.md"));
        touch(&root.join("A.MD"));
        touch(&root.join("docs/adr/decisions.markdown"));
        touch(&root.join("docs/notes.txt"));
        touch(&root.join(".md"));

        let files = find_markdown_files(root, &DiscoveryConfig::default()).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["A.MD", "b.md", "docs/adr/decisions.markdown"]);
    }

    #[test]
    fn skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("node_modules/pkg/README.md"));
        touch(&root.join(".git/info.md"));
        touch(&root.join("target/doc.md"));
        touch(&root.join("keep/README.md"));

        let files = find_markdown_files(root, &DiscoveryConfig::default()).unwrap();
        assert_eq!(files, vec![root.join("keep/README.md")]);
    }

    #[test]
    fn custom_extensions_and_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("notes.mdx"));
        touch(&root.join("skip/notes.mdx"));
        touch(&root.join("plain.md"));

        let config = DiscoveryConfig {
            extensions: vec!["MDX".into()],
            ignored_directories: vec!["skip".into()],
        };
        let files = find_markdown_files(root, &config).unwrap();
        assert_eq!(files, vec![root.join("notes.mdx")]);
    }

    #[test]
    fn rejects_missing_or_file_base() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = find_markdown_files(&missing, &DiscoveryConfig::default()).unwrap_err();
        assert!(err.to_string().contains("directory not found"));

        let file = dir.path().join("file.md");
        touch(&file);
        let err = find_markdown_files(&file, &DiscoveryConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
