//! Reading and writing Markdown files.
//!
//! A file is read once, and a write is refused if its bytes on disk no longer
//! hash to what was read. Writes go to a temporary file in the same directory
//! that is then renamed over the original.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A Markdown file as it was read.
#[derive(Debug, Clone)]
pub struct MarkdownFile {
    path: PathBuf,
    text: String,
    /// `None` when the file did not exist at read time.
    sha256: Option<String>,
}

impl MarkdownFile {
    /// Read `path` as UTF-8.
    pub fn read(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading markdown file");
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let sha256 = sha256_hex(&bytes);
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
            sha256: Some(sha256),
        })
    }

    /// Read `path`, treating a missing file as empty.
    pub fn read_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::read(path);
        }
        Ok(Self {
            path: path.to_path_buf(),
            text: String::new(),
            sha256: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn exists(&self) -> bool {
        self.sha256.is_some()
    }

    /// Check that the file on disk is still the one that was read.
    fn check_unchanged(&self) -> Result<()> {
        let current = match fs::read(&self.path) {
            Ok(bytes) => Some(sha256_hex(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        if current != self.sha256 {
            anyhow::bail!(
                "{} changed on disk since it was read; not overwriting",
                self.path.display()
            );
        }
        Ok(())
    }

    /// Replace the file's contents with `content`.
    pub fn write(&self, content: &str) -> Result<()> {
        self.check_unchanged()?;
        debug!(path = %self.path.display(), bytes = content.len(), "writing markdown file");
        write_atomic(&self.path, content.as_bytes())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("writing temporary file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temporary file for {}", path.display()))?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())
            .with_context(|| format!("copying permissions of {}", path.display()))?;
    }
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
