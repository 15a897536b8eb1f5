use clap::{Parser, ValueEnum};
use incflat::{
    DirectiveLine, IncludeKind, PreprocessConfig, Result, SearchPath, check,
    preprocess, preprocess_and_flush, resolve_include, scan_directives,
};
use serde::Serialize;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Environment variable holding extra search directories, appended after `-I`
const INCLUDE_PATH_ENV: &str = "INCFLAT_INCLUDE_PATH";

const LONG_HELP: &str = r#"
Directives:
  #include "file.h"    - Look next to the including file, then in the search path
  #include <file.h>    - Look in the search path only

Examples:
  # Flatten into a file, searching two include directories in order
  incflat sources/a.cpp -o sources/a.in -I sources/include1 -I sources/include2
  # Flatten to stdout
  incflat main.c -I include
  # Validate the include tree without writing anything
  incflat main.c -I include --dry-run
  # List the directives of a file and where they resolve
  incflat main.c -I include --list
  # Same, as JSON for scripting
  incflat main.c -I include --list=json

Environment:
  INCFLAT_INCLUDE_PATH  - Extra search directories (platform path list),
                          consulted after every -I directory
  RUST_LOG              - Overrides the log filter chosen by -v/-q
"#;

/// Flatten #include directives into a single file.
#[derive(Parser, Debug)]
#[command(
    name = "incflat",
    version,
    about = "Flatten #include directives into a single file.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Source file to expand
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file, truncated before writing (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Search path directory (repeatable, searched in the order given)
    #[arg(short = 'I', long = "include-dir", value_name = "DIR", action = clap::ArgAction::Append)]
    include_dirs: Vec<PathBuf>,

    /// Maximum include nesting depth
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,

    /// Expand without writing output, only report whether the tree resolves
    #[arg(long, conflicts_with_all = ["list", "output"])]
    dry_run: bool,

    /// List directives of INPUT (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "output")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One directive per line
    Plain,
    /// Detailed information about each directive
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct DirectiveInfo {
    #[serde(flatten)]
    directive: DirectiveLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    found: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = build_config(&cli);
    debug!(search_path = ?config.search_path.dirs(), "configured search path");

    let result = if cli.dry_run {
        dry_run(&cli.input, &config)
    } else if let Some(format) = cli.list {
        list_directives(&cli.input, format, &config)
    } else {
        run(&cli.input, cli.output.as_deref(), &config)
    };

    if let Err(e) = result {
        if e.is_include_failure() {
            eprintln!("{e}");
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn build_config(cli: &Cli) -> PreprocessConfig {
    let mut search_path = SearchPath::new(cli.include_dirs.iter().cloned());
    if let Some(value) = std::env::var_os(INCLUDE_PATH_ENV) {
        search_path.append_env_value(&value);
    }

    PreprocessConfig {
        search_path,
        max_depth: cli.max_depth,
    }
}

fn run(input: &Path, output: Option<&Path>, config: &PreprocessConfig) -> Result<()> {
    info!("Expanding {}", input.display());

    let stats = if let Some(output_path) = output {
        info!("Writing output to {}", output_path.display());
        preprocess(input, output_path, config)?
    } else {
        let mut writer = BufWriter::new(io::stdout().lock());
        preprocess_and_flush(input, &mut writer, config)?
    };

    info!(
        "Expanded {} files ({} directives, {} lines, depth {})",
        stats.files, stats.directives, stats.lines, stats.max_depth
    );
    Ok(())
}

fn dry_run(input: &Path, config: &PreprocessConfig) -> Result<()> {
    info!("Performing dry run - validating include tree...");

    let stats = check(input, config)?;

    println!("Summary: include tree of {} resolves", input.display());
    println!("  {} files", stats.files);
    println!("  {} directives", stats.directives);
    println!("  {} lines", stats.lines);
    println!("  max depth {}", stats.max_depth);
    Ok(())
}

fn list_directives(input: &Path, format: ListFormat, config: &PreprocessConfig) -> Result<()> {
    debug!("Listing directives of {}", input.display());

    let infos: Vec<DirectiveInfo> = scan_directives(input)?
        .into_iter()
        .map(|directive| {
            let resolved = resolve_include(&directive.token, input, &config.search_path);
            DirectiveInfo {
                found: resolved.is_some(),
                resolved: resolved.map(|p| p.display().to_string()),
                directive,
            }
        })
        .collect();

    match format {
        ListFormat::Plain => {
            for info in &infos {
                println!("{}", format_directive(&info.directive));
            }
        }
        ListFormat::Detailed => {
            for info in &infos {
                println!("Directive: {}", format_directive(&info.directive));
                println!("  Line: {}", info.directive.line);
                println!(
                    "  Kind: {}",
                    match info.directive.token.kind {
                        IncludeKind::Local => "local",
                        IncludeKind::Global => "global",
                    }
                );
                match &info.resolved {
                    Some(path) => println!("  Resolved: {path}"),
                    None => println!("  Resolved: not found"),
                }
                println!();
            }
        }
        ListFormat::Json => {
            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}

fn format_directive(directive: &DirectiveLine) -> String {
    match directive.token.kind {
        IncludeKind::Local => format!("{}: \"{}\"", directive.line, directive.token.target.display()),
        IncludeKind::Global => format!("{}: <{}>", directive.line, directive.token.target.display()),
    }
}
