//! Error types for the bookpatch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookpatchError`]: **Fatal**: the run cannot continue (unreadable
//!   archive, failed image fetch, unwritable output). Returned as
//!   `Err(BookpatchError)` from the top-level entry points. A fatal error in
//!   archive mode leaves the original archive untouched.
//!
//! * [`DirectiveError`]: **Non-fatal**: a single preprocessor directive could
//!   not be resolved (missing include file). The directive expands to nothing,
//!   the error is stored in [`crate::output::PreprocessOutput::errors`], and
//!   the rest of the document is processed normally.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the bookpatch library.
#[derive(Debug, Error)]
pub enum BookpatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input archive was not found at the given path.
    #[error("Archive not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists but is not a readable zip container.
    #[error("'{path}' is not a valid zip archive: {detail}")]
    InvalidArchive { path: PathBuf, detail: String },

    /// A document entry could not be read, or its rewrite cannot be stored in
    /// the entry's encoding.
    #[error("Entry '{entry}' could not be handled as text: {detail}")]
    UnreadableEntry { entry: String, detail: String },

    /// Reading the input stream failed.
    #[error("Failed to read input: {source}")]
    InputReadFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The remote image service could not be reached or answered with a
    /// non-success status.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// The image request exceeded the configured timeout.
    #[error("Fetch timed out after {secs}s for '{url}'\nIncrease --fetch-timeout.")]
    FetchTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry or could not be finalised.
    #[error("Failed to write archive entry '{entry}': {detail}")]
    ArchiveWriteFailed { entry: String, detail: String },

    /// A resource name was written twice during one run.
    #[error("Resource '{name}' was already written during this run")]
    DuplicateResource { name: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Usage errors ──────────────────────────────────────────────────────
    /// A required invocation argument is missing.
    #[error("{0}")]
    Usage(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single preprocessor directive.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DirectiveError {
    /// The file named by an `\input{…}` directive could not be opened.
    #[error("Can't open {}", .path.display())]
    MissingInclude { name: String, path: PathBuf },
}
