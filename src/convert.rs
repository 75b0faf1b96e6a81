//! Top-level entry points.
//!
//! Each function wires one [`RewriteConfig`] to an [`HttpResolver`], a fresh
//! [`SequenceCounter`] and the sink its mode writes to:
//!
//! | Function | Input | Text goes to | Resources go to |
//! |----------|-------|--------------|-----------------|
//! | [`patch_archive`] | zip/EPUB on disk | same archive (replaced) | same archive |
//! | [`patch_archive_to`] | zip/EPUB on disk | a second archive | that archive |
//! | [`filter_stream`] | any `BufRead` | any `Write` | files below a directory |
//! | [`filter_text`] | `&str` | returned `String` | caller's [`OutputSink`] |
//!
//! [`preprocess`] is the odd one out: it never touches the network.

use crate::config::{ArchiveOptions, PreprocessConfig, RewriteConfig};
use crate::error::BookpatchError;
use crate::output::{PreprocessOutput, RewriteStats};
use crate::pipeline::allocate::SequenceCounter;
use crate::pipeline::archive::rewrite_archive;
use crate::pipeline::preprocess::preprocess_str;
use crate::pipeline::resolve::HttpResolver;
use crate::pipeline::rewrite::Rewriter;
use crate::pipeline::sink::{DirSink, OutputSink};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Reported when `bookpatch epub` is run without an archive.
pub const MISSING_ARCHIVE: &str = "Need a zip file name for the ebook.";

/// The archive argument, or [`BookpatchError::Usage`] when none was given.
pub fn require_archive(path: Option<&Path>) -> Result<&Path, BookpatchError> {
    path.ok_or_else(|| BookpatchError::Usage(MISSING_ARCHIVE.to_string()))
}

/// Rewrite an e-book archive in place.
///
/// Every document entry (see [`ArchiveOptions::document_marker`]) has its
/// chart URLs replaced by local paths and the fetched images are added to the
/// archive. The new archive is written next to the original and renamed over
/// it only once it is complete, so any error leaves the original untouched.
///
/// # Example
/// ```rust,no_run
/// use bookpatch::{patch_archive, ArchiveOptions, RewriteConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = patch_archive(
///     "book.epub",
///     &RewriteConfig::archive_charts(),
///     &ArchiveOptions::default(),
/// )
/// .await?;
/// eprintln!("{} images added", stats.resources_written);
/// # Ok(())
/// # }
/// ```
pub async fn patch_archive(
    path: impl AsRef<Path>,
    config: &RewriteConfig,
    options: &ArchiveOptions,
) -> Result<RewriteStats, BookpatchError> {
    let path = path.as_ref();
    patch_archive_to(path, path, config, options).await
}

/// Like [`patch_archive`], but write the result to `output` and leave
/// `input` alone. `output` may equal `input`.
pub async fn patch_archive_to(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &RewriteConfig,
    options: &ArchiveOptions,
) -> Result<RewriteStats, BookpatchError> {
    let start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.is_file() {
        return Err(BookpatchError::FileNotFound {
            path: input.to_path_buf(),
        });
    }
    info!("Patching {}", input.display());

    let source = File::open(input).map_err(|e| BookpatchError::InvalidArchive {
        path: input.to_path_buf(),
        detail: e.to_string(),
    })?;
    let write_failed = |source: std::io::Error| BookpatchError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };

    // Same directory as the target so the final rename stays on one
    // filesystem.
    let mut tmp = NamedTempFile::new_in(parent_dir(output)).map_err(write_failed)?;
    debug!("Writing to {}", tmp.path().display());

    let rewriter = Rewriter::new(config, resolver_for(config)?);
    let mut counter = SequenceCounter::new();
    let (_, mut stats) = rewrite_archive(
        BufReader::new(source),
        input,
        tmp.as_file_mut(),
        &rewriter,
        options,
        &mut counter,
    )
    .await?;

    // Temp files are created 0600; keep the original's mode.
    let permissions = std::fs::metadata(input).map_err(write_failed)?.permissions();
    tmp.as_file().set_permissions(permissions).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(output).map_err(|e| write_failed(e.error))?;

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Patched {}: {} documents, {} images, {}ms",
        output.display(),
        stats.documents_rewritten,
        stats.resources_written,
        stats.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.documents_rewritten, stats.resources_written);
    }
    Ok(stats)
}

/// Synchronous wrapper around [`patch_archive`].
///
/// Creates a temporary tokio runtime internally.
pub fn patch_archive_sync(
    path: impl AsRef<Path>,
    config: &RewriteConfig,
    options: &ArchiveOptions,
) -> Result<RewriteStats, BookpatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BookpatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(patch_archive(path, config, options))
}

/// Filter `input` to `output` line by line, saving each fetched image as a
/// file named by the config's template relative to `root`.
///
/// Subdirectories named by the template (e.g. `tpimg/`) must already exist.
pub async fn filter_stream<I: BufRead, O: Write>(
    input: I,
    output: O,
    config: &RewriteConfig,
    root: impl Into<PathBuf>,
) -> Result<RewriteStats, BookpatchError> {
    let start = Instant::now();
    let rewriter = Rewriter::new(config, resolver_for(config)?);
    let mut counter = SequenceCounter::new();
    let mut sink = DirSink::new(root);

    let (lines, written) = rewriter
        .rewrite_lines(input, output, &mut counter, &mut sink)
        .await?;

    let stats = RewriteStats {
        lines_processed: lines,
        resources_written: written,
        duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };
    debug!("Filtered {} lines, {} images", lines, written);
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.documents_rewritten, stats.resources_written);
    }
    Ok(stats)
}

/// Rewrite a string held in memory, writing fetched resources to `sink`.
/// Line endings are kept as they are.
pub async fn filter_text<S: OutputSink>(
    text: &str,
    config: &RewriteConfig,
    sink: &mut S,
) -> Result<(String, RewriteStats), BookpatchError> {
    let start = Instant::now();
    let rewriter = Rewriter::new(config, resolver_for(config)?);
    let mut counter = SequenceCounter::new();

    let (rewritten, written) = rewriter.rewrite_text(text, &mut counter, sink).await?;

    let stats = RewriteStats {
        lines_processed: text.split_inclusive('\n').count(),
        resources_written: written,
        duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };
    Ok((rewritten, stats))
}

/// Read all of `input` and run the LaTeX preprocessor over it.
///
/// Missing include files are not fatal; they are listed in
/// [`PreprocessOutput::errors`].
pub fn preprocess<R: BufRead>(
    mut input: R,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput, BookpatchError> {
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .map_err(|e| BookpatchError::InputReadFailed { source: e })?;
    Ok(preprocess_str(&text, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn resolver_for(config: &RewriteConfig) -> Result<HttpResolver, BookpatchError> {
    HttpResolver::new(&config.base_url, config.decoding, config.fetch_timeout_secs)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
