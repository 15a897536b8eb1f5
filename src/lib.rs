//! # incflat
//!
//! Flattens `#include` directives: every directive line is replaced by the
//! recursively expanded contents of the file it names, producing one output
//! file.
//!
//! ## Resolution
//!
//! - `#include "x"` is looked up next to the including file first, then in
//!   each search path directory in order.
//! - `#include <x>` is looked up in the search path directories only.
//!
//! The first error anywhere in the include tree stops the run. It is reported
//! against the file and line holding the offending directive:
//!
//! ```text
//! unknown include file dummy.txt at file sources/a.cpp at line 8
//! ```
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use incflat::{PreprocessConfig, SearchPath, preprocess};
//! use std::path::Path;
//!
//! let config = PreprocessConfig {
//!     search_path: SearchPath::new(["include1", "include2"]),
//!     ..PreprocessConfig::default()
//! };
//!
//! match preprocess(Path::new("sources/a.cpp"), Path::new("sources/a.in"), &config) {
//!     Ok(stats) => println!("expanded {} files", stats.files),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! incflat sources/a.cpp -o sources/a.in -I sources/include1 -I sources/include2
//! ```

pub mod directive;
pub mod error;
pub mod expand;
pub mod resolver;

// Re-export main types and functions for convenience
pub use directive::{DirectiveClassifier, DirectiveLine, IncludeKind, IncludeToken, scan_directives};
pub use error::{IncflatError, Result};
pub use expand::{ExpandStats, PreprocessConfig, check, preprocess, preprocess_and_flush, preprocess_to_writer};
pub use resolver::{SearchPath, resolve_include};
