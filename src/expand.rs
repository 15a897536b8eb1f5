use crate::directive::{DirectiveClassifier, trim_line_ending};
use crate::error::{IncflatError, Result};
use crate::resolver::{SearchPath, path_key, resolve_include};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration for include expansion
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    /// Directories searched for `<...>` includes and for `"..."` includes
    /// that are not found next to the including file
    pub search_path: SearchPath,
    /// Maximum include nesting; `None` means unlimited
    pub max_depth: Option<usize>,
}

/// Counters collected over one successful expansion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpandStats {
    /// Files opened, the root included
    pub files: usize,
    /// Plain text lines written to the output
    pub lines: usize,
    /// Directives replaced by file contents
    pub directives: usize,
    /// Deepest nesting reached; the root file is depth 0
    pub max_depth: usize,
}

/// Where a nested file was included from
#[derive(Clone, Copy)]
struct Caller<'p> {
    file: &'p Path,
    line: usize,
}

/// Depth-first include expander for a single top-level run
struct Expander<'a> {
    config: &'a PreprocessConfig,
    classifier: DirectiveClassifier,
    /// Canonical paths of the files currently being expanded, root first
    open: Vec<PathBuf>,
    stats: ExpandStats,
}

impl<'a> Expander<'a> {
    fn new(config: &'a PreprocessConfig) -> Result<Self> {
        Ok(Self {
            config,
            classifier: DirectiveClassifier::new()?,
            open: Vec::new(),
            stats: ExpandStats::default(),
        })
    }

    /// Opens an included file and expands it into `out`
    fn expand_file<W: Write>(&mut self, path: &Path, out: &mut W, caller: Caller<'_>) -> Result<()> {
        let file = File::open(path).map_err(|err| {
            debug!(path = %path.display(), error = %err, "cannot open resolved include");
            IncflatError::UnknownInclude {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                file: caller.file.to_path_buf(),
                line: caller.line,
            }
        })?;
        self.expand_reader(path, BufReader::new(file), out)
    }

    /// Expands an already opened file. Owns the per-file line counter.
    fn expand_reader<R: BufRead, W: Write>(&mut self, path: &Path, mut reader: R, out: &mut W) -> Result<()> {
        let depth = self.open.len();
        self.open.push(path_key(path));
        self.stats.files += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);
        debug!(path = %path.display(), depth, "entering file");

        let result = self.expand_lines(path, &mut reader, out);

        self.open.pop();
        debug!(path = %path.display(), ok = result.is_ok(), "leaving file");
        result
    }

    fn expand_lines<R: BufRead, W: Write>(&mut self, path: &Path, reader: &mut R, out: &mut W) -> Result<()> {
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            line_number += 1;
            let line = trim_line_ending(&buf);

            let Some(token) = self.classifier.classify(line) else {
                out.write_all(line)?;
                out.write_all(b"\n")?;
                self.stats.lines += 1;
                continue;
            };

            let Some(resolved) = resolve_include(&token, path, &self.config.search_path) else {
                debug!(
                    include = %token.target.display(),
                    file = %path.display(),
                    line = line_number,
                    "include not found"
                );
                return Err(IncflatError::UnknownInclude {
                    name: token.target.display().to_string(),
                    file: path.to_path_buf(),
                    line: line_number,
                });
            };
            trace!(include = %token.target.display(), resolved = %resolved.display(), "resolved include");

            self.check_descend(&token.target, &resolved, path, line_number)?;
            self.stats.directives += 1;
            self.expand_file(
                &resolved,
                out,
                Caller {
                    file: path,
                    line: line_number,
                },
            )?;
        }
    }

    /// Refuses to descend into a file that is already open, or past the depth limit
    fn check_descend(&self, target: &Path, resolved: &Path, path: &Path, line: usize) -> Result<()> {
        if let Some(limit) = self.config.max_depth
            && self.open.len() > limit
        {
            return Err(IncflatError::DepthExceeded {
                limit,
                file: path.to_path_buf(),
                line,
            });
        }

        let key = path_key(resolved);
        if self.open.contains(&key) {
            debug!(include = %target.display(), file = %path.display(), line, "include cycle");
            return Err(IncflatError::CyclicInclude {
                name: target.display().to_string(),
                file: path.to_path_buf(),
                line,
                chain: self.open.clone(),
            });
        }

        Ok(())
    }
}

fn open_input(input: &Path) -> Result<File> {
    File::open(input).map_err(|source| IncflatError::OpenInput {
        path: input.to_path_buf(),
        source,
    })
}

/// Expands `input` into an arbitrary writer.
///
/// Whatever was written before a failure stays written; the writer is not
/// flushed here.
///
/// # Errors
///
/// - `IncflatError::OpenInput` if `input` cannot be opened.
/// - `IncflatError::UnknownInclude` for the first include that cannot be
///   resolved or opened, located at the including file and line.
/// - `IncflatError::CyclicInclude` / `IncflatError::DepthExceeded` when
///   descending would revisit an open file or nest too deep.
/// - `IncflatError::Io` if reading or writing fails.
pub fn preprocess_to_writer<W: Write>(input: &Path, out: &mut W, config: &PreprocessConfig) -> Result<ExpandStats> {
    let file = open_input(input)?;
    expand_opened(input, file, out, config)
}

fn expand_opened<W: Write>(input: &Path, file: File, out: &mut W, config: &PreprocessConfig) -> Result<ExpandStats> {
    let mut expander = Expander::new(config)?;
    expander.expand_reader(input, BufReader::new(file), out)?;
    Ok(expander.stats)
}

/// Like [`preprocess_to_writer`], then flushes `out` whether or not expansion
/// succeeded. An expansion error takes precedence over a flush error.
///
/// # Errors
///
/// Any error from [`preprocess_to_writer`], else `IncflatError::Io` if the
/// flush fails.
pub fn preprocess_and_flush<W: Write>(input: &Path, out: &mut W, config: &PreprocessConfig) -> Result<ExpandStats> {
    let file = open_input(input)?;
    flush_after(expand_opened(input, file, out, config), out)
}

fn flush_after<W: Write>(result: Result<ExpandStats>, out: &mut W) -> Result<ExpandStats> {
    let flushed = out.flush();
    let stats = result?;
    flushed?;
    Ok(stats)
}

/// Expands `input` into the file at `output`, truncating it first.
///
/// The output is flushed even when expansion fails, so a failed run leaves
/// everything emitted before the failing directive.
///
/// # Errors
///
/// - `IncflatError::OpenInput` / `IncflatError::OpenOutput` if either file
///   cannot be opened; nothing is expanded in that case.
/// - Any error from [`preprocess_to_writer`].
pub fn preprocess(input: &Path, output: &Path, config: &PreprocessConfig) -> Result<ExpandStats> {
    let file = open_input(input)?;
    let out = File::create(output).map_err(|source| IncflatError::OpenOutput {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(out);

    let result = expand_opened(input, file, &mut writer, config);
    flush_after(result, &mut writer)
}

/// Expands `input` without keeping the output, to validate an include tree
///
/// # Errors
///
/// Same as [`preprocess_to_writer`].
pub fn check(input: &Path, config: &PreprocessConfig) -> Result<ExpandStats> {
    preprocess_to_writer(input, &mut io::sink(), config)
}
