//! Result types returned by the top-level entry points.

use crate::error::DirectiveError;
use serde::{Deserialize, Serialize};

/// Counters for one rewriting run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteStats {
    /// Document entries (archive mode) that were scanned and rewritten.
    pub documents_rewritten: usize,
    /// Archive entries copied through unchanged.
    pub entries_copied: usize,
    /// Lines read (stream mode).
    pub lines_processed: usize,
    /// Resources fetched and written to the sink.
    pub resources_written: usize,
    /// Wall-clock time for the whole run.
    pub duration_ms: u64,
}

/// Output of the LaTeX preprocessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessOutput {
    /// The rewritten document.
    pub text: String,
    /// Directives that could not be resolved. Each expanded to nothing.
    pub errors: Vec<DirectiveError>,
}

impl PreprocessOutput {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
