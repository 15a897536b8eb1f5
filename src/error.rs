use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for incflat operations
#[derive(Error, Debug)]
pub enum IncflatError {
    /// The top-level input file could not be opened for reading
    #[error("cannot open input file {}: {source}", .path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The top-level output file could not be created or truncated
    #[error("cannot open output file {}: {source}", .path.display())]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An include target was not found, or was found but could not be opened.
    /// `file` and `line` always point at the directive in the including file.
    #[error("unknown include file {name} at file {} at line {line}", .file.display())]
    UnknownInclude {
        name: String,
        file: PathBuf,
        line: usize,
    },

    /// An include target is already being expanded further up the stack
    #[error(
        "cyclic include of {name} at file {} at line {line} (open files: {})",
        .file.display(),
        join_chain(.chain)
    )]
    CyclicInclude {
        name: String,
        file: PathBuf,
        line: usize,
        chain: Vec<PathBuf>,
    },

    /// Include nesting went deeper than the configured limit
    #[error("include depth limit of {limit} exceeded at file {} at line {line}", .file.display())]
    DepthExceeded {
        limit: usize,
        file: PathBuf,
        line: usize,
    },

    /// IO error while reading an open input or writing the output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IncflatError {
    /// Whether the failure was located at a directive inside the include tree,
    /// as opposed to a top-level or stream failure.
    pub fn is_include_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownInclude { .. } | Self::CyclicInclude { .. } | Self::DepthExceeded { .. }
        )
    }
}

fn join_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, IncflatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IncflatError::UnknownInclude {
            name: "dummy.txt".to_string(),
            file: PathBuf::from("sources/a.cpp"),
            line: 8,
        };
        assert_eq!(
            format!("{err}"),
            "unknown include file dummy.txt at file sources/a.cpp at line 8"
        );

        let err = IncflatError::OpenInput {
            path: PathBuf::from("missing.cpp"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            format!("{err}"),
            "cannot open input file missing.cpp: no such file"
        );

        let err = IncflatError::OpenOutput {
            path: PathBuf::from("/ro/out.cpp"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(format!("{err}").starts_with("cannot open output file /ro/out.cpp"));

        let err = IncflatError::CyclicInclude {
            name: "a.h".to_string(),
            file: PathBuf::from("b.h"),
            line: 3,
            chain: vec![PathBuf::from("a.h"), PathBuf::from("b.h")],
        };
        assert_eq!(
            format!("{err}"),
            "cyclic include of a.h at file b.h at line 3 (open files: a.h -> b.h)"
        );

        let err = IncflatError::DepthExceeded {
            limit: 4,
            file: PathBuf::from("deep.h"),
            line: 1,
        };
        assert!(format!("{err}").contains("limit of 4"));
    }

    #[test]
    fn test_include_failure_classification() {
        let err = IncflatError::UnknownInclude {
            name: "x.h".to_string(),
            file: PathBuf::from("a.cpp"),
            line: 1,
        };
        assert!(err.is_include_failure());

        let err = IncflatError::OpenInput {
            path: PathBuf::from("a.cpp"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(!err.is_include_failure());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: IncflatError = io_err.into();
        assert!(matches!(err, IncflatError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: IncflatError = json_err.into();
        assert!(matches!(err, IncflatError::Json(_)));
    }
}
