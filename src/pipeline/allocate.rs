//! Sequential local filenames for fetched resources.
//!
//! The counter is an ordinary value owned by whoever drives the run and
//! passed down by `&mut`, so two runs in one process never share numbering
//! and tests can start from any value.

use serde::{Deserialize, Serialize};

/// Run-scoped monotonic counter. Starts at 0 and advances once per resolved
/// occurrence across the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// A counter whose next allocation is `value`.
    pub fn starting_at(value: u32) -> Self {
        Self(value)
    }

    /// The number the next allocation will use.
    pub fn value(&self) -> u32 {
        self.0
    }

    fn advance(&mut self) -> u32 {
        let current = self.0;
        self.0 += 1;
        current
    }
}

/// `<prefix>_<NN>.<extension>` with `NN` zero-padded to `width` digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameTemplate {
    /// Path-like prefix, e.g. `images/eqn`.
    pub prefix: String,
    /// Minimum number of digits. Wider numbers are printed in full.
    pub width: usize,
    /// Extension without the dot.
    pub extension: String,
}

impl FilenameTemplate {
    pub fn new(prefix: impl Into<String>, width: usize, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            extension: extension.into(),
        }
    }

    /// `images/eqn_NN.png`, used for resources stored inside an e-book.
    pub fn archive_images() -> Self {
        Self::new("images/eqn", 2, "png")
    }

    /// `tpimg/eqn_NN.png`, used for equations saved next to Markdown output.
    pub fn equation_images() -> Self {
        Self::new("tpimg/eqn", 2, "png")
    }

    /// Render the filename for a given sequence number without advancing
    /// anything.
    pub fn render(&self, seq: u32) -> String {
        format!(
            "{}_{:0width$}.{}",
            self.prefix,
            seq,
            self.extension,
            width = self.width
        )
    }

    /// Take the counter's current value, render it, and advance the counter.
    pub fn allocate(&self, counter: &mut SequenceCounter) -> (u32, String) {
        let seq = counter.advance();
        (seq, self.render(seq))
    }
}
