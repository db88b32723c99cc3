//! Line-ending detection and conversion.
//!
//! The engine stores every multi-line value with `\n` separators and only
//! converts to the host file's convention when emitting text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line terminator convention of a host buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewlineStyle {
    /// Unix `\n`.
    #[default]
    Lf,
    /// Windows `\r\n`.
    CrLf,
}

impl NewlineStyle {
    /// Detect the style of the first line terminator in `text`.
    ///
    /// Buffers without any terminator (including the empty buffer) report
    /// [`NewlineStyle::Lf`].
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(idx) if idx > 0 && text.as_bytes()[idx - 1] == b'\r' => NewlineStyle::CrLf,
            _ => NewlineStyle::Lf,
        }
    }

    /// The terminator itself.
    pub fn as_str(self) -> &'static str {
        match self {
            NewlineStyle::Lf => "\n",
            NewlineStyle::CrLf => "\r\n",
        }
    }

    /// Convert `\n`-separated text to this style.
    pub fn apply(self, text: &str) -> String {
        match self {
            NewlineStyle::Lf => text.to_string(),
            NewlineStyle::CrLf => text.replace('\n', "\r\n"),
        }
    }

    /// True when every terminator in `text` already follows this style.
    pub fn matches(self, text: &str) -> bool {
        let bytes = text.as_bytes();
        bytes.iter().enumerate().all(|(i, &b)| {
            if b != b'\n' {
                return true;
            }
            let crlf = i > 0 && bytes[i - 1] == b'\r';
            match self {
                NewlineStyle::Lf => !crlf,
                NewlineStyle::CrLf => crlf,
            }
        })
    }
}

impl fmt::Display for NewlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewlineStyle::Lf => write!(f, "LF"),
            NewlineStyle::CrLf => write!(f, "CRLF"),
        }
    }
}

/// Strip a single trailing `\n` or `\r\n` from a line.
pub(crate) fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

/// Join `text` back with `\n` after dropping every `\r` that ends a line,
/// then trim the edges. Stored field bodies always have this form.
pub(crate) fn normalize_body(text: &str) -> String {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
