//! Pattern scanning: locate the first embedded reference in a line.
//!
//! A [`Scanner`] holds an ordered list of [`ReferencePattern`]s. Patterns are
//! tried strictly in that order and the first pattern that matches anywhere
//! in the line wins, so overlapping classes must be listed most-specific
//! first: `$$…$$` before `$…$`, otherwise the single-dollar pattern would
//! split a display equation into two bogus inline ones.
//!
//! The scanner is stateless. Every call searches the line it is given from
//! the beginning, which is what lets the rewriter splice a replacement of a
//! different length and simply scan again.

use crate::error::BookpatchError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Chart-API image URL in a double-quoted XHTML attribute. The payload is the
/// path and query after the host, still entity- and percent-encoded.
pub const CHART_URL_PATTERN: &str = r#""http://chart\.apis\.google\.com/([^\s"]+)""#;

/// Display math, `$$…$$`.
pub const DISPLAY_MATH_PATTERN: &str = r"\$\$([^$]+)\$\$";

/// Inline math, `$…$`.
pub const INLINE_MATH_PATTERN: &str = r"\$([^$]+)\$";

static CHART_URL: Lazy<ReferencePattern> =
    Lazy::new(|| ReferencePattern::new("chart-url", CHART_URL_PATTERN).unwrap());
static DISPLAY_MATH: Lazy<ReferencePattern> =
    Lazy::new(|| ReferencePattern::new("display-math", DISPLAY_MATH_PATTERN).unwrap());
static INLINE_MATH: Lazy<ReferencePattern> =
    Lazy::new(|| ReferencePattern::new("inline-math", INLINE_MATH_PATTERN).unwrap());

/// A named regular expression with exactly one capture group (the payload).
#[derive(Clone)]
pub struct ReferencePattern {
    name: String,
    regex: Regex,
}

impl ReferencePattern {
    /// Compile a pattern. Fails unless the expression has exactly one
    /// capture group.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, BookpatchError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|e| {
            BookpatchError::InvalidConfig(format!("pattern '{name}' does not compile: {e}"))
        })?;
        // captures_len() counts the implicit whole-match group.
        if regex.captures_len() != 2 {
            return Err(BookpatchError::InvalidConfig(format!(
                "pattern '{name}' must have exactly one capture group, found {}",
                regex.captures_len() - 1
            )));
        }
        Ok(Self { name, regex })
    }

    /// Quoted chart-API URL inside XHTML markup.
    pub fn chart_url() -> Self {
        CHART_URL.clone()
    }

    /// `$$…$$` display math.
    pub fn display_math() -> Self {
        DISPLAY_MATH.clone()
    }

    /// `$…$` inline math.
    pub fn inline_math() -> Self {
        INLINE_MATH.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn find(&self, line: &str) -> Option<Occurrence> {
        let caps = self.regex.captures(line)?;
        let whole = caps.get(0)?;
        let payload = caps.get(1)?;
        Some(Occurrence {
            start: whole.start(),
            end: whole.end(),
            raw: whole.as_str().to_string(),
            payload: payload.as_str().to_string(),
        })
    }
}

impl fmt::Debug for ReferencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferencePattern")
            .field("name", &self.name)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// One located match of a reference pattern within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset one past the last matched byte.
    pub end: usize,
    /// The full matched text, delimiters included.
    pub raw: String,
    /// The captured inner text (URL tail or math source).
    pub payload: String,
}

/// Ordered set of patterns; earlier patterns take priority.
#[derive(Debug, Clone)]
pub struct Scanner {
    patterns: Vec<ReferencePattern>,
}

impl Scanner {
    pub fn new(patterns: Vec<ReferencePattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[ReferencePattern] {
        &self.patterns
    }

    /// Return the leftmost match of the highest-priority pattern that
    /// matches `line` at all.
    pub fn find(&self, line: &str) -> Option<Occurrence> {
        self.patterns.iter().find_map(|p| p.find(line))
    }

    /// True when no pattern matches anywhere in `line`.
    pub fn is_clean(&self, line: &str) -> bool {
        self.find(line).is_none()
    }
}
