//! Line rewriting: the scan → resolve → store → splice loop.
//!
//! ```text
//! line ──▶ scan ──▶ none? ──▶ done
//!            │
//!            ▼
//!         resolve payload ──▶ allocate name ──▶ sink.write ──▶ splice ──┐
//!            ▲                                                           │
//!            └───────────────────── scan the new line ◀──────────────────┘
//! ```
//!
//! After every splice the *whole* line is scanned again. Offsets of later
//! occurrences shift whenever the reference is shorter or longer than the
//! match it replaces, so nothing found before a splice is reused after it.
//! The loop ends because each replacement removes the delimiters that made
//! the occurrence match. A pattern that matches inside a reference it already
//! spliced in is reported as [`BookpatchError::InvalidConfig`] before anything
//! is fetched for it.

use crate::config::RewriteConfig;
use crate::error::BookpatchError;
use crate::pipeline::allocate::{FilenameTemplate, SequenceCounter};
use crate::pipeline::resolve::ResourceResolver;
use crate::pipeline::scan::{Occurrence, Scanner};
use crate::pipeline::sink::OutputSink;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::ops::Range;
use tracing::info;

/// How the local reference is written back into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceStyle {
    /// `"images/eqn_00.png"`: replaces a quoted attribute value, quotes
    /// included.
    #[default]
    QuotedPath,
    /// `![payload](tpimg/eqn_00.png)`: the original source becomes alt text.
    MarkdownImage,
}

impl ReferenceStyle {
    pub fn render(&self, occurrence: &Occurrence, filename: &str) -> String {
        match self {
            ReferenceStyle::QuotedPath => format!("\"{filename}\""),
            ReferenceStyle::MarkdownImage => format!("![{}]({filename})", occurrence.payload),
        }
    }
}

/// A line after all of its occurrences were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenLine {
    pub text: String,
    /// Names written to the sink for this line, in order.
    pub resources: Vec<String>,
}

/// Drives the rewrite loop for one configuration and one resolver.
pub struct Rewriter<R> {
    scanner: Scanner,
    resolver: R,
    template: FilenameTemplate,
    style: ReferenceStyle,
    progress: Option<ProgressCallback>,
}

impl<R: ResourceResolver> Rewriter<R> {
    pub fn new(config: &RewriteConfig, resolver: R) -> Self {
        Self {
            scanner: Scanner::new(config.patterns.clone()),
            resolver,
            template: config.filename.clone(),
            style: config.style,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_ref()
    }

    /// Rewrite every occurrence in `line`, writing one resource per
    /// occurrence to `sink` and advancing `counter` once per occurrence.
    pub async fn rewrite_line<S: OutputSink>(
        &self,
        line: &str,
        counter: &mut SequenceCounter,
        sink: &mut S,
    ) -> Result<RewrittenLine, BookpatchError> {
        let mut text = line.to_string();
        let mut resources = Vec::new();
        // Byte ranges of references already spliced into `text`.
        let mut spliced: Vec<Range<usize>> = Vec::new();

        while let Some(occurrence) = self.scanner.find(&text) {
            if spliced
                .iter()
                .any(|r| occurrence.start < r.end && r.start < occurrence.end)
            {
                return Err(BookpatchError::InvalidConfig(format!(
                    "pattern matches its own replacement '{}'; rewriting would never end",
                    occurrence.raw
                )));
            }

            let resource = self.resolver.resolve(&occurrence.payload).await?;
            let (seq, filename) = self.template.allocate(counter);
            info!("{} {} {}", seq, filename, resource.locator);
            sink.write_resource(&filename, &resource.bytes)?;

            if let Some(ref cb) = self.progress {
                cb.on_resource_saved(seq, &filename, &resource.locator);
            }

            let reference = self.style.render(&occurrence, &filename);
            text.replace_range(occurrence.start..occurrence.end, &reference);
            let new_end = occurrence.start + reference.len();
            for r in spliced.iter_mut().filter(|r| r.start >= occurrence.end) {
                *r = (r.start - occurrence.end + new_end)..(r.end - occurrence.end + new_end);
            }
            spliced.push(occurrence.start..new_end);
            resources.push(filename);
        }

        Ok(RewrittenLine { text, resources })
    }

    /// Rewrite a whole text line by line, keeping line endings as they are.
    /// Returns the new text and the number of resources written.
    pub async fn rewrite_text<S: OutputSink>(
        &self,
        text: &str,
        counter: &mut SequenceCounter,
        sink: &mut S,
    ) -> Result<(String, usize), BookpatchError> {
        let mut out = String::with_capacity(text.len());
        let mut written = 0;
        for line in text.split_inclusive('\n') {
            let rewritten = self.rewrite_line(line, counter, sink).await?;
            written += rewritten.resources.len();
            out.push_str(&rewritten.text);
        }
        Ok((out, written))
    }

    /// Filter `input` to `output` line by line. Line terminators are
    /// stripped before scanning and every output line ends with `\n`.
    /// Returns `(lines, resources)` processed.
    pub async fn rewrite_lines<I: BufRead, O: Write, S: OutputSink>(
        &self,
        mut input: I,
        mut output: O,
        counter: &mut SequenceCounter,
        sink: &mut S,
    ) -> Result<(usize, usize), BookpatchError> {
        let mut buf = String::new();
        let mut lines = 0;
        let mut written = 0;
        loop {
            buf.clear();
            let n = input
                .read_line(&mut buf)
                .map_err(|e| BookpatchError::InputReadFailed { source: e })?;
            if n == 0 {
                break;
            }
            let line = buf.trim_end_matches(['\n', '\r']);
            let rewritten = self.rewrite_line(line, counter, sink).await?;
            writeln!(output, "{}", rewritten.text).map_err(|e| {
                BookpatchError::OutputWriteFailed {
                    path: "<stdout>".into(),
                    source: e,
                }
            })?;
            lines += 1;
            written += rewritten.resources.len();
        }
        output.flush().map_err(|e| BookpatchError::OutputWriteFailed {
            path: "<stdout>".into(),
            source: e,
        })?;
        Ok((lines, written))
    }
}
