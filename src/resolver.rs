use crate::directive::{IncludeKind, IncludeToken};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Ordered list of directories consulted for include targets.
/// The first directory containing the target wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a platform path list (`a:b:c` on Unix, `a;b;c` on Windows)
    pub fn from_env_value(value: &OsStr) -> Self {
        Self {
            dirs: std::env::split_paths(value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Appends a directory with the lowest priority
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    /// Appends the directories of a platform path list after the existing ones
    pub fn append_env_value(&mut self, value: &OsStr) {
        self.extend(Self::from_env_value(value).dirs);
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// First `dir/target` that is an existing file
    fn find(&self, target: &Path) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(target))
            .find(|candidate| candidate.is_file())
    }
}

impl<P: Into<PathBuf>> Extend<P> for SearchPath {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.dirs.extend(iter.into_iter().map(Into::into));
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for SearchPath {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Resolves an include token to the file it refers to.
///
/// Local includes look next to `including_file` first and only fall back to
/// the search path when nothing is there. Global includes go straight to the
/// search path. Returned paths are joined, not canonicalized, so they read the
/// way the user spelled them in diagnostics.
pub fn resolve_include(
    token: &IncludeToken,
    including_file: &Path,
    search_path: &SearchPath,
) -> Option<PathBuf> {
    if token.kind == IncludeKind::Local {
        let dir = including_file.parent().unwrap_or_else(|| Path::new(""));
        let candidate = dir.join(&token.target);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    search_path.find(&token.target)
}

/// Identity of a file for cycle detection. Falls back to the path as given
/// when it cannot be canonicalized.
pub(crate) fn path_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
