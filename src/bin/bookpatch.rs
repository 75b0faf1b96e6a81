//! CLI binary for bookpatch.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `RewriteConfig` / `PreprocessConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use bookpatch::{
    filter_stream, patch_archive, preprocess, require_archive, ArchiveOptions, PreprocessConfig,
    ProgressCallback, RewriteConfig, RewriteProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the archive is opened, then a
/// bar over its entries, with one log line per fetched image.
struct CliProgressCallback {
    bar: ProgressBar,
    images: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Fetching");
        bar.set_message("waiting for input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            images: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} entries  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Patching");
        self.bar.reset_eta();
    }
}

impl RewriteProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_entries: usize) {
        self.activate_bar(total_entries);
    }

    fn on_document_start(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_resource_saved(&self, seq: u32, name: &str, locator: &str) {
        let n = self.images.fetch_add(1, Ordering::SeqCst) + 1;
        // Long chart URLs wreck the layout.
        let shown = match locator.char_indices().nth(72) {
            Some((cut, _)) => format!("{}\u{2026}", &locator[..cut]),
            None => locator.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}  {:<20}  {}",
            green("✓"),
            seq,
            name,
            dim(&shown)
        ));
        if self.bar.length() == Some(0) {
            self.bar.set_message(format!("{n} images"));
        }
    }

    fn on_document_complete(&self, name: &str, resources: usize) {
        if resources > 0 {
            self.bar.println(format!(
                "{} {}  {}",
                cyan("◆"),
                bold(name),
                dim(&format!("{resources} images"))
            ));
        }
        self.bar.inc(1);
    }

    fn on_entry_copied(&self, _name: &str) {
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _documents: usize, _resources: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Localise every chart image in an EPUB (file is replaced on success)
  bookpatch epub book.epub

  # Same, machine-readable summary
  bookpatch epub --json book.epub > stats.json

  # Replace inline TeX with rendered images (tpimg/ must exist)
  mkdir -p tpimg && bookpatch charts < chapter.md > chapter.out.md

  # Prepare LaTeX for pandoc
  bookpatch prepandoc --include-dir book/ < book/main.tex | pandoc -f latex -o book.epub

ENVIRONMENT VARIABLES:
  RUST_LOG                    Override log filter (e.g. bookpatch=debug)
  BOOKPATCH_FETCH_TIMEOUT     Per-image fetch timeout in seconds
  BOOKPATCH_VERBOSE / BOOKPATCH_QUIET / BOOKPATCH_NO_PROGRESS
"#;

/// Make remotely-rendered chart and equation images in book sources local.
#[derive(Parser, Debug)]
#[command(
    name = "bookpatch",
    version,
    about = "Make remotely-rendered chart and equation images in book sources local",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BOOKPATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "BOOKPATCH_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "BOOKPATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Per-image HTTP timeout in seconds.
    #[arg(long, global = true, env = "BOOKPATCH_FETCH_TIMEOUT", default_value_t = 60)]
    fetch_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite chart URLs in an EPUB/zip to images stored inside it.
    Epub {
        /// The e-book archive; replaced in place on success.
        archive: Option<PathBuf>,

        /// Print run statistics as JSON on stdout.
        #[arg(long, env = "BOOKPATCH_JSON")]
        json: bool,
    },
    /// Filter stdin to stdout, replacing inline TeX with images in tpimg/.
    Charts,
    /// Filter LaTeX on stdin to stdout for pandoc.
    Prepandoc {
        /// Directory \input{name} files are read from.
        #[arg(long, default_value = ".")]
        include_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already shows one line per image.
    let json = matches!(cli.command, Command::Epub { json: true, .. });
    let show_progress = !g.quiet && !g.no_progress && !json && wants_progress(&cli.command);
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn RewriteProgressCallback>);

    let result = run(&cli, progress_cb).await;
    clear_on_error(&result, cli_progress.as_deref());
    result
}

async fn run(cli: &Cli, progress_cb: Option<ProgressCallback>) -> Result<()> {
    let g = &cli.global;

    match &cli.command {
        Command::Epub { archive, json } => {
            let archive = match require_archive(archive.as_deref()) {
                Ok(path) => path,
                Err(usage) => {
                    eprintln!("{usage}");
                    return Ok(());
                }
            };
            let config = build_config(RewriteConfig::archive_charts(), g, progress_cb)?;
            let stats = patch_archive(archive, &config, &ArchiveOptions::default())
                .await
                .with_context(|| format!("Failed to patch {}", archive.display()))?;

            if *json {
                let out = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
                println!("{out}");
            } else if !g.quiet {
                eprintln!(
                    "{}  {} documents  {} images  {}ms  →  {}",
                    green("✔"),
                    stats.documents_rewritten,
                    stats.resources_written,
                    stats.duration_ms,
                    bold(&archive.display().to_string()),
                );
            }
        }
        Command::Charts => {
            let config = build_config(RewriteConfig::inline_equations(), g, progress_cb)?;
            let stdin = io::stdin().lock();
            let stdout = io::stdout().lock();
            let stats = filter_stream(stdin, stdout, &config, ".")
                .await
                .context("Failed to filter input")?;

            if !g.quiet {
                eprintln!(
                    "{}  {} lines  {} equations  {}ms",
                    green("✔"),
                    stats.lines_processed,
                    stats.resources_written,
                    stats.duration_ms,
                );
            }
        }
        Command::Prepandoc { include_dir } => {
            let config = PreprocessConfig {
                include_dir: include_dir.clone(),
                ..Default::default()
            };
            let output = preprocess(io::stdin().lock(), &config).context("Failed to read input")?;

            let mut handle = io::stdout().lock();
            handle
                .write_all(output.text.as_bytes())
                .context("Failed to write to stdout")?;
            handle.flush().context("Failed to write to stdout")?;

            if !g.quiet && !output.is_clean() {
                eprintln!(
                    "{}  {} include(s) could not be opened",
                    red("✗"),
                    output.errors.len()
                );
            }
        }
    }

    Ok(())
}

/// Stop the spinner when a run fails; on success `on_run_complete` has
/// already cleared it.
fn clear_on_error<T>(result: &Result<T>, progress: Option<&CliProgressCallback>) {
    if let (Err(_), Some(cb)) = (result, progress) {
        cb.bar.finish_and_clear();
    }
}

/// Only the fetching subcommands report progress.
fn wants_progress(command: &Command) -> bool {
    matches!(command, Command::Epub { archive: Some(_), .. } | Command::Charts)
}

/// Apply CLI flags on top of a preset.
fn build_config(
    preset: RewriteConfig,
    global: &GlobalArgs,
    progress: Option<ProgressCallback>,
) -> Result<RewriteConfig> {
    let mut builder = preset.to_builder().fetch_timeout_secs(global.fetch_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}
