use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Builder;
use linepatch::{
    apply_chunk_fixes, create_fallback_patch, create_patch, extract_chunks, preview_patch,
    validate_patch, ChunkOptions, CodeChunk, FileMap, Patch, DEFAULT_CONTEXT_LINES,
};
use log::{error, info, warn, Level, LevelFilter};
use similar::{udiff::unified_diff, Algorithm};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// --- Main Application Entry Point ---

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        // Using {:?} prints the full error chain from `anyhow`.
        eprintln!("{} {:?}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Contains the primary logic of the application.
fn run(args: Args) -> Result<()> {
    setup_logging(args.verbose);

    match args.command {
        Command::Diff {
            original,
            edited,
            name,
            plain,
            stats,
        } => {
            let name = file_name_or(&original, name)?;
            let original_files = load_single(&name, &original)?;
            let edited_files = load_single(&name, &edited)?;

            let patch = if plain {
                create_fallback_patch(&original_files, &edited_files)
            } else {
                create_patch(&original_files, &edited_files)
            };
            if stats {
                println!("{}", serde_json::to_string_pretty(&patch.statistics())?);
            } else {
                println!("{}", serde_json::to_string_pretty(&patch)?);
            }
        }
        Command::Validate {
            original,
            patch,
            name,
        } => {
            let name = file_name_or(&original, name)?;
            let original_files = load_single(&name, &original)?;
            let patch = load_patch(&patch)?;

            let report = validate_patch(&patch, &original_files);
            if !report.is_valid() {
                for message in report.messages() {
                    error!("{}", message);
                }
                return Err(anyhow!(
                    "Patch is invalid ({} issue(s)).",
                    report.issues.len()
                ));
            }
            info!("Patch is valid: {} edit(s).", patch.len());
        }
        Command::Preview {
            original,
            patch,
            name,
        } => {
            let name = file_name_or(&original, name)?;
            let original_files = load_single(&name, &original)?;
            let patch = load_patch(&patch)?;

            let preview = preview_patch(&original_files, &patch);
            if let Some(content) = preview.get(&name) {
                print!("{}", content);
            }
            for other in preview.keys().filter(|k| **k != name) {
                warn!("Patch also touches '{}', which is not shown.", other);
            }
        }
        Command::Chunks {
            file,
            keywords,
            context_lines,
            pinned_class,
        } => {
            let content = read(&file)?;
            let options = chunk_options(context_lines, pinned_class);
            let chunks = extract_chunks(&content, &keywords, &file.to_string_lossy(), &options);
            info!("Extracted {} chunk(s).", chunks.len());
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        }
        Command::Relocate {
            file,
            chunks,
            replacements,
            context_lines,
            dry_run,
        } => relocate(&file, &chunks, &replacements, context_lines, dry_run)?,
    }
    Ok(())
}

/// Applies replacement texts to previously extracted chunks of `file`.
fn relocate(
    file: &Path,
    chunks_path: &Path,
    replacement_paths: &[PathBuf],
    context_lines: usize,
    dry_run: bool,
) -> Result<()> {
    let content = read(file)?;
    let chunks: Vec<CodeChunk> = serde_json::from_str(&read(chunks_path)?)
        .with_context(|| format!("Failed to parse chunks from '{}'", chunks_path.display()))?;
    if chunks.len() != replacement_paths.len() {
        return Err(anyhow!(
            "Got {} chunk(s) but {} replacement(s).",
            chunks.len(),
            replacement_paths.len()
        ));
    }

    let mut fixes = Vec::with_capacity(chunks.len());
    for (chunk, path) in chunks.into_iter().zip(replacement_paths) {
        let replacement = read(path)?;
        fixes.push((chunk, replacement.trim_end_matches('\n').to_string()));
    }

    let options = chunk_options(context_lines, None);
    let application = apply_chunk_fixes(&content, &fixes, &options);
    for failure in application.report.failures() {
        warn!("  - Fix {} failed: {}", failure.fix_index, failure.reason);
    }

    if dry_run {
        println!("----- Proposed Changes for {} -----", file.display());
        let old_name = format!("a/{}", file.display());
        let new_name = format!("b/{}", file.display());
        print!(
            "{}",
            unified_diff(
                Algorithm::Myers,
                &content,
                &application.new_content,
                3,
                Some((old_name.as_str(), new_name.as_str())),
            )
        );
        println!("------------------------------------");
        info!("DRY RUN completed. No files were modified.");
    } else if application.new_content != content {
        fs::write(file, &application.new_content)
            .with_context(|| format!("Failed to write '{}'", file.display()))?;
        info!("Wrote {}", file.display());
    }

    let failed = application.report.failures().len();
    if failed > 0 {
        return Err(anyhow!("Completed with {} failed fix(es).", failed));
    }
    Ok(())
}

// --- Helper Structs and Functions ---

/// Defines the command-line arguments for the application.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Line-level patches and drift-tolerant chunk relocation.",
    long_about = "Diffs files into line edits, validates and previews them, and extracts code chunks that can later be rewritten even after the file has shifted."
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Increase logging verbosity. Can be used multiple times.
    /// -v for info, -vv for debug, -vvv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff two versions of a file and print the patch as JSON.
    Diff {
        original: PathBuf,
        edited: PathBuf,
        /// The file name recorded in the edits. Defaults to ORIGINAL's file name.
        #[arg(long)]
        name: Option<String>,
        /// Use the plain differencer instead of the optimized one.
        #[arg(long)]
        plain: bool,
        /// Print patch statistics instead of the patch.
        #[arg(long)]
        stats: bool,
    },
    /// Check a JSON patch against the original file.
    Validate {
        original: PathBuf,
        patch: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the file as it would look after applying a JSON patch.
    Preview {
        original: PathBuf,
        patch: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Extract the chunks of a file relevant to some keywords as JSON.
    Chunks {
        file: PathBuf,
        #[arg(short, long = "keyword", required = true, num_args = 1..)]
        keywords: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
        context_lines: usize,
        /// A class to fall back on when a keyword mentions it but nothing matched.
        #[arg(long)]
        pinned_class: Option<String>,
    },
    /// Rewrite previously extracted chunks with replacement texts.
    Relocate {
        file: PathBuf,
        /// JSON list of chunks, as printed by `chunks`.
        chunks: PathBuf,
        /// One file of replacement text per chunk, in the same order.
        #[arg(required = true)]
        replacements: Vec<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
        context_lines: usize,
        #[arg(
            short = 'n',
            long,
            help = "Show what would be done, but don't modify files."
        )]
        dry_run: bool,
    },
}

fn chunk_options(context_lines: usize, pinned_class: Option<String>) -> ChunkOptions {
    let builder = ChunkOptions::builder().context_lines(context_lines);
    match pinned_class {
        Some(class_name) => builder.pinned_class(class_name).build(),
        None => builder.build(),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn file_name_or(path: &Path, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Cannot derive a file name from '{}'", path.display())),
    }
}

fn load_single(name: &str, path: &Path) -> Result<FileMap> {
    Ok(FileMap::from([(name.to_string(), read(path)?)]))
}

fn load_patch(path: &Path) -> Result<Patch> {
    let value: serde_json::Value = serde_json::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse patch from '{}'", path.display()))?;

    // Line numbers are unsigned; report negative ones per edit.
    let edits = value.get("edits").and_then(|e| e.as_array());
    for (i, edit) in edits.into_iter().flatten().enumerate() {
        if let Some(line_number) = edit
            .get("line_number")
            .and_then(|n| n.as_i64())
            .filter(|n| *n < 0)
        {
            return Err(anyhow!(
                "Edit {} in '{}' has a negative line number ({}).",
                i + 1,
                path.display(),
                line_number
            ));
        }
    }

    serde_json::from_value(value)
        .with_context(|| format!("Failed to parse patch from '{}'", path.display()))
}

/// Sets up the global logger with colored level prefixes.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();
}
