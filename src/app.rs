//! Command execution for the `changecache` binary.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use walkdir::WalkDir;

use crate::batch::{BatchOutput, BatchReport, Item};
use crate::cache::HashStore;
use crate::cli::{CheckArgs, Cli, Commands, ShowArgs};
use crate::config::CacheConfig;
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::session::{CacheSession, FlushOutcome};
use crate::signal::{install_handler, ShutdownHandler};

/// JSON output of `check --json`.
#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    emitted: Vec<&'a str>,
    report: &'a BatchReport,
    saved: bool,
}

/// Run the parsed command line.
///
/// # Errors
///
/// Configuration errors, a corrupt cache file, output failures, and in
/// strict mode the first unreadable item.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);

    let config = CacheConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Check(args) => run_check(config, args),
        Commands::Show(args) => run_show(config, &args),
    }
}

fn run_check(config: CacheConfig, args: CheckArgs) -> anyhow::Result<ExitCode> {
    let shutdown = install_handler().context("Failed to install signal handler")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute_check(config, &args, &shutdown, &mut out)
}

/// Run one check against `out`, stopping early if `shutdown` is raised.
fn execute_check(
    config: CacheConfig,
    args: &CheckArgs,
    shutdown: &ShutdownHandler,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    let config = apply_check_overrides(config, args);
    let io_threads = config.io_threads;

    let items = collect_items(&args.paths);
    log::info!("Checking {} files against {}", items.len(), config.cache_file.display());

    let mut session = CacheSession::open(config).context("Failed to open cache")?;

    let batch = session.batch().with_cancel(shutdown.get_flag());
    let outcome = if args.parallel {
        batch.run_parallel(items, io_threads)
    } else {
        batch.run(items)
    };

    // Digests recorded before a strict failure or an interrupt are kept,
    // so whatever was emitted up to that point is printed below.
    let saved = session.close() == FlushOutcome::Saved;

    let output = match outcome {
        Ok(output) => output,
        Err(err) => {
            if let Some(partial) = err.partial_output() {
                print_check(out, partial, args.json, saved)?;
            }
            return Err(err).context("Batch aborted");
        }
    };

    print_check(out, &output, args.json, saved)?;

    let code = if output.report.interrupted || shutdown.is_shutdown_requested() {
        ExitCode::Interrupted
    } else if !output.report.failures.is_empty() {
        ExitCode::PartialSuccess
    } else if output.emitted.is_empty() {
        ExitCode::NoChanges
    } else {
        ExitCode::Success
    };
    Ok(code)
}

fn apply_check_overrides(mut config: CacheConfig, args: &CheckArgs) -> CacheConfig {
    if let Some(path) = &args.cache_file {
        config = config.with_cache_file(path);
    }
    if args.cascade {
        config = config.with_cascade(true);
    }
    if args.strict {
        config = config.with_strict(true);
    }
    if let Some(algorithm) = args.algorithm {
        config = config.with_algorithm(algorithm);
    }
    if let Some(threads) = args.io_threads {
        config = config.with_io_threads(threads);
    }
    config
}

/// Expand the command-line paths into file items in a stable order.
///
/// Directories are walked recursively with entries sorted by name. Paths
/// that do not exist are kept as file items so that they surface as read
/// failures in the batch report. Paths that are not valid UTF-8 are skipped
/// with a warning, since item names must identify files unambiguously.
pub fn collect_items(paths: &[PathBuf]) -> Vec<Item> {
    let mut items = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        push_file(&mut items, entry.path());
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable entry: {}", e),
                }
            }
        } else {
            push_file(&mut items, path);
        }
    }
    items
}

fn push_file(items: &mut Vec<Item>, path: &Path) {
    let path = absolute(path);
    if path.to_str().is_none() {
        log::warn!("Skipping non-UTF-8 path: {}", path.display());
        return;
    }
    items.push(Item::file(path));
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn print_check(
    out: &mut impl Write,
    output: &BatchOutput,
    json: bool,
    saved: bool,
) -> anyhow::Result<()> {
    if json {
        let report = CheckOutput {
            emitted: output.emitted.iter().map(Item::name).collect(),
            report: &output.report,
            saved,
        };
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        writeln!(out, "{}", text)?;
    } else {
        for item in &output.emitted {
            writeln!(out, "{}", item.name())?;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_show(config: CacheConfig, args: &ShowArgs) -> anyhow::Result<ExitCode> {
    let path = args.cache_file.clone().unwrap_or(config.cache_file);

    let mut store = HashStore::new();
    if !store
        .load_if_exists(&path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?
    {
        log::info!("No cache file at {}", path.display());
    }

    let json = store.to_json().context("Failed to serialize cache")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(ExitCode::Success)
}
