//! # bookpatch
//!
//! Make remotely-rendered images in book sources local.
//!
//! ## Why this crate?
//!
//! Book tool-chains of a certain age embed charts and equations as URLs to an
//! online image service (`http://chart.apis.google.com/…`). E-readers that are
//! offline, and Markdown renderers that cannot do TeX, show nothing. This
//! crate finds each such reference, fetches the image once, stores it next to
//! the text, and rewrites the reference to the local copy.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text / EPUB
//!  │
//!  ├─ 1. Scan      first match of any pattern (display math before inline)
//!  ├─ 2. Resolve   base URL + decoded payload → GET → bytes
//!  ├─ 3. Allocate  run-wide counter → images/eqn_00.png, eqn_01.png, …
//!  ├─ 4. Store     archive entry, file below a directory, or memory
//!  └─ 5. Splice    local reference replaces the match; scan again
//! ```
//!
//! A separate pass, [`preprocess`], prepares LaTeX for pandoc: it inlines
//! `\input`s, drops `\label`s, points `.eps` figures at `.png` and modernises
//! old font switches. It needs no network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bookpatch::{filter_stream, RewriteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // `tpimg/` must exist below the root directory
//!     let stdin = std::io::stdin().lock();
//!     let stats = filter_stream(stdin, std::io::stdout(), &RewriteConfig::inline_equations(), ".").await?;
//!     eprintln!("{} equations", stats.resources_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bookpatch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! bookpatch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArchiveOptions, PreprocessConfig, RewriteConfig, RewriteConfigBuilder};
pub use convert::{
    filter_stream, filter_text, patch_archive, patch_archive_sync, patch_archive_to, preprocess,
    require_archive, MISSING_ARCHIVE,
};
pub use error::{BookpatchError, DirectiveError};
pub use output::{PreprocessOutput, RewriteStats};
pub use pipeline::allocate::{FilenameTemplate, SequenceCounter};
pub use pipeline::preprocess::preprocess_str;
pub use pipeline::resolve::{HttpResolver, PayloadDecoding, Resource, ResourceResolver};
pub use pipeline::rewrite::{ReferenceStyle, Rewriter, RewrittenLine};
pub use pipeline::scan::{Occurrence, ReferencePattern, Scanner};
pub use pipeline::sink::{ArchiveSink, DirSink, MemorySink, OutputSink};
pub use progress::{NoopProgressCallback, ProgressCallback, RewriteProgressCallback};
