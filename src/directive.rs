use crate::error::{IncflatError, Result};
use regex::bytes::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Whether an include names its target in quotes or in angle brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// `#include "x"`: directory-relative first, then the search path
    Local,
    /// `#include <x>`: search path only
    Global,
}

/// One parsed include directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeToken {
    pub kind: IncludeKind,
    /// Bytes between the delimiters, taken verbatim as a relative path
    pub target: PathBuf,
}

/// A directive together with its 1-based line number in the scanned file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveLine {
    pub line: usize,
    #[serde(flatten)]
    pub token: IncludeToken,
}

/// Line-oriented matcher for include directives.
///
/// A line only counts as a directive when the whole line, apart from
/// surrounding ASCII whitespace, is the directive. Comments and string
/// literals are not understood. Matching is byte-level, so targets need not be
/// valid UTF-8.
#[derive(Debug, Clone)]
pub struct DirectiveClassifier {
    local: Regex,
    global: Regex,
}

impl DirectiveClassifier {
    /// Compiles the local and global directive patterns
    ///
    /// # Errors
    ///
    /// Returns `IncflatError::Regex` if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            local: Regex::new(r#"(?-u)^\s*#\s*include\s*"([^"]*)"\s*$"#)?,
            global: Regex::new(r"(?-u)^\s*#\s*include\s*<([^>]*)>\s*$")?,
        })
    }

    /// Classifies a single line (without its terminator).
    /// Returns `None` for plain text.
    pub fn classify(&self, line: &[u8]) -> Option<IncludeToken> {
        let (kind, captures) = if let Some(c) = self.local.captures(line) {
            (IncludeKind::Local, c)
        } else if let Some(c) = self.global.captures(line) {
            (IncludeKind::Global, c)
        } else {
            return None;
        };

        let target = captures.get(1)?;
        Some(IncludeToken {
            kind,
            target: target_path(target.as_bytes()),
        })
    }
}

#[cfg(unix)]
fn target_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn target_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Strips a trailing `\n` and then a trailing `\r` from a raw line
pub(crate) fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

/// Lists every directive line in a single file, without descending into
/// the included files.
///
/// # Errors
///
/// - `IncflatError::OpenInput` if the file cannot be opened.
/// - `IncflatError::Io` if reading fails part way.
pub fn scan_directives(path: &Path) -> Result<Vec<DirectiveLine>> {
    let file = File::open(path).map_err(|source| IncflatError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;
    let classifier = DirectiveClassifier::new()?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut directives = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;
        if let Some(token) = classifier.classify(trim_line_ending(&buf)) {
            directives.push(DirectiveLine {
                line: line_number,
                token,
            });
        }
    }

    Ok(directives)
}
