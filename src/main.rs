//! `icon-smith` command-line front end
//!
//! ```text
//! icon-smith scan <dir> [ext,...]
//! icon-smith inconsistencies <dir>
//! icon-smith fix <dir>
//! icon-smith import <path> <name> [category]
//! icon-smith paste <name> [category]
//! icon-smith apply <icon-id> <file>...
//! icon-smith remove <file>...
//! icon-smith undo
//! icon-smith clear-history
//! icon-smith icons [search]
//! icon-smith activity
//! icon-smith open <iconsmith-uri> [icon-id]
//! ```
//!
//! # Environment variables
//!
//! | Variable               | Default                      |
//! |------------------------|------------------------------|
//! | `ICONSMITH_DATA_DIR`   | platform data dir/IconSmith  |
//! | `ICONSMITH_SHARED_DIR` | `<data>/shared`              |
//! | `RUST_LOG`             | `icon_smith=info`            |

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use icon_smith::icon::clipboard::SystemClipboard;
use icon_smith::state::data::{FileRecord, IconCategory};
use icon_smith::{detect_inconsistencies, AppError, AppPaths, AppState, BatchProgress, BatchResult};

#[derive(Parser, Debug)]
#[command(name = "icon-smith", version, about = "Custom file icons in bulk, with undo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a folder and summarize icons per extension
    Scan {
        dir: PathBuf,
        /// Comma-separated extensions to keep, e.g. `ts,tsx`
        #[arg(value_delimiter = ',', value_parser = parse_extension)]
        extensions: Vec<String>,
    },
    /// List extensions whose files disagree on their icon
    Inconsistencies { dir: PathBuf },
    /// Give every outlier the dominant icon of its extension
    Fix { dir: PathBuf },
    /// Import an image file into the icon store
    Import {
        path: PathBuf,
        name: String,
        #[arg(default_value = "custom", value_parser = parse_category)]
        category: IconCategory,
    },
    /// Import the image on the clipboard into the icon store
    Paste {
        name: String,
        #[arg(default_value = "custom", value_parser = parse_category)]
        category: IconCategory,
    },
    /// Apply a stored icon to files
    Apply {
        icon_id: Uuid,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove custom icons from files
    Remove {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Revert the most recent icon change
    Undo,
    /// Drop all undo history
    ClearHistory,
    /// List stored icons, optionally filtered by name
    Icons { search: Option<String> },
    /// Show recent activity
    Activity,
    /// Handle an `iconsmith://apply?files=...` link, optionally applying an icon
    Open { uri: String, icon_id: Option<Uuid> },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    #[error(transparent)]
    App(#[from] AppError),
}

type CliResult<T> = Result<T, CliError>;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icon_smith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let paths = AppPaths::from_env();
    tracing::debug!(data_dir = %paths.data_dir().display(), "using data directory");

    let mut state = AppState::open(paths);

    if let Err(err) = run(&mut state, cli.command).await {
        tracing::error!(error = %err, "command failed");
        std::process::exit(1);
    }
}

async fn run(state: &mut AppState, command: Command) -> CliResult<()> {
    match command {
        Command::Scan { dir, extensions } => {
            let extensions = (!extensions.is_empty())
                .then(|| extensions.into_iter().filter(|ext| !ext.is_empty()).collect());
            let records = scan(state, &dir, extensions).await?;
            print_scan(&records);
        }
        Command::Inconsistencies { dir } => {
            let records = scan(state, &dir, None).await?;
            let found = detect_inconsistencies(&records);
            if found.is_empty() {
                println!("All file types use consistent icons.");
            }
            for info in &found {
                println!(
                    ".{}: {} files, {} different icons, {} outliers",
                    info.extension,
                    info.total_files,
                    info.different_icon_count,
                    info.outlier_files.len()
                );
                for file in &info.outlier_files {
                    println!("    {}", file.path.display());
                }
            }
        }
        Command::Fix { dir } => {
            let records = scan(state, &dir, None).await?;
            let found = detect_inconsistencies(&records);
            if found.is_empty() {
                println!("Nothing to fix.");
            }
            for info in &found {
                println!("Fixing .{} ({} files)", info.extension, info.outlier_files.len());
                let cancel = cancel_on_ctrl_c();
                let result = state.fix_inconsistency(info, cancel, print_progress).await?;
                print_batch(&result);
            }
        }
        Command::Import {
            path,
            name,
            category,
        } => {
            let record = state.import_icon(&path, &name, category)?;
            println!("Imported {} as {}", record.name, record.id);
        }
        Command::Paste { name, category } => {
            let mut clipboard =
                SystemClipboard::new().map_err(|err| CliError::Clipboard(err.to_string()))?;
            match state.paste_icon(&mut clipboard, &name, category)? {
                Some(record) => println!("Pasted {} as {}", record.name, record.id),
                None => println!("No image on the clipboard."),
            }
        }
        Command::Apply { icon_id, files } => apply(state, icon_id, files).await?,
        Command::Remove { files } => {
            let result = state
                .remove_icons(files, cancel_on_ctrl_c(), print_progress)
                .await?;
            print_batch(&result);
        }
        Command::Undo => {
            if state.undo() {
                println!("Undid the last icon change.");
            } else {
                println!("Nothing to undo.");
            }
        }
        Command::ClearHistory => {
            state.clear_history();
            println!("Undo history cleared.");
        }
        Command::Icons { search } => {
            let icons = state.library().search(search.as_deref().unwrap_or(""));
            if icons.is_empty() {
                println!("No icons.");
            }
            for icon in icons {
                println!(
                    "{}  {:<24} {:<8} used {}",
                    icon.id,
                    icon.name,
                    icon.category.display_name(),
                    icon.usage_count
                );
            }
        }
        Command::Activity => {
            for entry in state.activity().entries() {
                println!(
                    "{}  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.summary()
                );
            }
        }
        Command::Open { uri, icon_id } => {
            let pending = state.handle_deep_link(&uri)?;
            println!("Received {} file(s):", pending.len());
            for file in pending {
                println!("    {}", file.display());
            }
            if let Some(icon_id) = icon_id {
                let files = state.take_pending_files();
                apply(state, icon_id, files).await?;
            }
        }
    }

    Ok(())
}

async fn scan(
    state: &mut AppState,
    root: &Path,
    extensions: Option<HashSet<String>>,
) -> CliResult<Vec<FileRecord>> {
    let cancel = cancel_on_ctrl_c();
    let records = state
        .scan_folder(root, extensions, cancel, |count| {
            if count % 100 == 0 {
                eprint!("\rScanned {count} files");
                let _ = std::io::stderr().flush();
            }
        })
        .await?;
    eprintln!("\rScanned {} files", records.len());
    Ok(records)
}

async fn apply(state: &mut AppState, icon_id: Uuid, files: Vec<PathBuf>) -> CliResult<()> {
    let result = state
        .apply_icon(icon_id, files, cancel_on_ctrl_c(), print_progress)
        .await?;
    print_batch(&result);
    Ok(())
}

/// Token that trips on Ctrl-C, so a long batch stops before its next file
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current file");
            trip.cancel();
        }
    });
    cancel
}

fn print_progress(progress: BatchProgress) {
    eprint!("\r{}/{}", progress.completed, progress.total);
    let _ = std::io::stderr().flush();
    if progress.completed == progress.total {
        eprintln!();
    }
}

fn print_batch(result: &BatchResult) {
    println!(
        "{} succeeded, {} failed{}",
        result.success_count(),
        result.failure_count(),
        if result.cancelled { " (cancelled)" } else { "" }
    );
    for (path, err) in &result.failed {
        println!("    {}: {}", path.display(), err);
    }
}

fn print_scan(records: &[FileRecord]) {
    let mut by_extension: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let counts = by_extension.entry(record.extension.as_str()).or_default();
        counts.0 += 1;
        if record.has_custom_icon {
            counts.1 += 1;
        }
    }

    println!("{} files", records.len());
    for (extension, (total, custom)) in by_extension {
        let label = if extension.is_empty() { "(none)" } else { extension };
        println!("    {label:<12} {total:>6} files, {custom} with custom icons");
    }
}

fn parse_category(raw: &str) -> Result<IconCategory, String> {
    IconCategory::parse(raw).ok_or_else(|| {
        let names: Vec<&str> = IconCategory::ALL.iter().map(|c| c.display_name()).collect();
        format!("expected one of {}", names.join(", "))
    })
}

fn parse_extension(raw: &str) -> Result<String, String> {
    Ok(raw.trim().trim_start_matches('.').to_lowercase())
}
