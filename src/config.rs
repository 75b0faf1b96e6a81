//! Configuration types for the rewriting and preprocessing passes.
//!
//! [`RewriteConfig`] controls the scan → fetch → rewrite core. The two
//! presets reproduce the book tool-chain's fixed settings:
//!
//! | Preset | Pattern(s) | Fetched from | Stored as | Reference |
//! |--------|-----------|--------------|-----------|-----------|
//! | [`RewriteConfig::archive_charts`] | quoted chart URL | `http://chart.apis.google.com/` + decoded URL tail | `images/eqn_NN.png` | `"images/eqn_NN.png"` |
//! | [`RewriteConfig::inline_equations`] | `$$…$$`, then `$…$` | `…/chart?cht=tx&chl=` + raw TeX | `tpimg/eqn_NN.png` | `![tex](tpimg/eqn_NN.png)` |
//!
//! [`PreprocessConfig`] and [`ArchiveOptions`] cover the peer utilities.

use crate::error::BookpatchError;
use crate::pipeline::allocate::FilenameTemplate;
use crate::pipeline::resolve::PayloadDecoding;
use crate::pipeline::rewrite::ReferenceStyle;
use crate::pipeline::scan::{Occurrence, ReferencePattern};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Base for chart URLs lifted out of XHTML; the captured tail is appended.
pub const CHART_BASE_URL: &str = "http://chart.apis.google.com/";

/// TeX-rendering endpoint; the raw equation source is appended.
pub const EQUATION_BASE_URL: &str = "http://chart.apis.google.com/chart?cht=tx&chl=";

/// Default per-request timeout for image fetches.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Configuration for one rewriting run.
///
/// Built via [`RewriteConfig::builder()`], or taken from one of the presets.
///
/// # Example
/// ```rust
/// use bookpatch::RewriteConfig;
///
/// let config = RewriteConfig::builder()
///     .base_url("http://localhost:8080/chart?cht=tx&chl=")
///     .fetch_timeout_secs(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RewriteConfig {
    /// Prefix every decoded payload is appended to.
    pub base_url: String,

    /// How payloads are decoded before the URL is built.
    pub decoding: PayloadDecoding,

    /// Local naming scheme for fetched resources.
    pub filename: FilenameTemplate,

    /// Shape of the reference spliced back into the text.
    pub style: ReferenceStyle,

    /// Reference patterns in priority order, most specific first.
    pub patterns: Vec<ReferencePattern>,

    /// Per-request timeout in seconds. Default: 60.
    pub fetch_timeout_secs: u64,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self::inline_equations()
    }
}

impl fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("base_url", &self.base_url)
            .field("decoding", &self.decoding)
            .field("filename", &self.filename)
            .field("style", &self.style)
            .field("patterns", &self.patterns)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RewriteProgressCallback>"),
            )
            .finish()
    }
}

impl RewriteConfig {
    /// Chart-API URLs inside e-book XHTML, stored in the archive under
    /// `images/`.
    pub fn archive_charts() -> Self {
        Self {
            base_url: CHART_BASE_URL.to_string(),
            decoding: PayloadDecoding::EntitiesAndPercent,
            filename: FilenameTemplate::archive_images(),
            style: ReferenceStyle::QuotedPath,
            patterns: vec![ReferencePattern::chart_url()],
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            progress_callback: None,
        }
    }

    /// Inline TeX math in Markdown-bound text, stored under `tpimg/`.
    pub fn inline_equations() -> Self {
        Self {
            base_url: EQUATION_BASE_URL.to_string(),
            decoding: PayloadDecoding::Raw,
            filename: FilenameTemplate::equation_images(),
            style: ReferenceStyle::MarkdownImage,
            patterns: vec![
                ReferencePattern::display_math(),
                ReferencePattern::inline_math(),
            ],
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            progress_callback: None,
        }
    }

    /// Builder starting from [`RewriteConfig::inline_equations`].
    pub fn builder() -> RewriteConfigBuilder {
        RewriteConfigBuilder {
            config: Self::inline_equations(),
        }
    }

    /// Builder starting from an existing configuration (e.g. a preset).
    pub fn to_builder(&self) -> RewriteConfigBuilder {
        RewriteConfigBuilder {
            config: self.clone(),
        }
    }
}

/// Builder for [`RewriteConfig`].
#[derive(Debug)]
pub struct RewriteConfigBuilder {
    config: RewriteConfig,
}

impl RewriteConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn decoding(mut self, decoding: PayloadDecoding) -> Self {
        self.config.decoding = decoding;
        self
    }

    pub fn filename(mut self, template: FilenameTemplate) -> Self {
        self.config.filename = template;
        self
    }

    pub fn style(mut self, style: ReferenceStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Replace the pattern list. Order is priority order.
    pub fn patterns(mut self, patterns: Vec<ReferencePattern>) -> Self {
        self.config.patterns = patterns;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RewriteConfig, BookpatchError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(BookpatchError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.patterns.is_empty() {
            return Err(BookpatchError::InvalidConfig(
                "at least one reference pattern is required".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(BookpatchError::InvalidConfig(
                "fetch timeout must be ≥ 1 second".into(),
            ));
        }
        if c.filename.prefix.is_empty() || c.filename.extension.is_empty() {
            return Err(BookpatchError::InvalidConfig(
                "filename prefix and extension must not be empty".into(),
            ));
        }
        // A reference the scanner finds again would be fetched forever.
        let sample = Occurrence {
            start: 0,
            end: 0,
            raw: String::new(),
            payload: "x".to_string(),
        };
        let reference = c.style.render(&sample, &c.filename.render(0));
        if let Some(p) = c.patterns.iter().find(|p| p.is_match(&reference)) {
            return Err(BookpatchError::InvalidConfig(format!(
                "pattern '{}' matches the reference it is replaced with ({reference})",
                p.name()
            )));
        }
        Ok(self.config)
    }
}

/// Options for archive rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOptions {
    /// Entries whose name contains this string are rewritten; all others are
    /// copied verbatim. Default: `.xhtml`.
    pub document_marker: String,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            document_marker: ".xhtml".to_string(),
        }
    }
}

impl ArchiveOptions {
    pub fn is_document(&self, entry_name: &str) -> bool {
        entry_name.contains(&self.document_marker)
    }
}

/// Configuration for the LaTeX preprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Directory `\input{name}` files are looked up in. Default: current
    /// directory.
    pub include_dir: PathBuf,

    /// Extension appended to include names, without the dot. Default: `tex`.
    pub include_extension: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            include_dir: PathBuf::from("."),
            include_extension: "tex".to_string(),
        }
    }
}

impl PreprocessConfig {
    /// Path an include directive named `name` refers to.
    pub fn include_path(&self, name: &str) -> PathBuf {
        self.include_dir
            .join(format!("{}.{}", name, self.include_extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert!(RewriteConfig::archive_charts().to_builder().build().is_ok());
        assert!(RewriteConfig::inline_equations().to_builder().build().is_ok());
    }

    #[test]
    fn equation_preset_orders_display_before_inline() {
        let c = RewriteConfig::inline_equations();
        let names: Vec<&str> = c.patterns.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["display-math", "inline-math"]);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = RewriteConfig::builder()
            .base_url("ftp://example.org/")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_empty_patterns() {
        assert!(RewriteConfig::builder().patterns(vec![]).build().is_err());
    }

    #[test]
    fn rejects_pattern_that_matches_its_own_reference() {
        let err = RewriteConfig::archive_charts()
            .to_builder()
            .patterns(vec![ReferencePattern::new("quoted", r#""([^"]+)""#).unwrap()])
            .build()
            .unwrap_err();
        assert!(matches!(err, BookpatchError::InvalidConfig(_)));
        assert!(err.to_string().contains("quoted"), "got: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(RewriteConfig::builder().fetch_timeout_secs(0).build().is_err());
    }

    #[test]
    fn document_marker_matches_substring() {
        let o = ArchiveOptions::default();
        assert!(o.is_document("OEBPS/ch01.xhtml"));
        assert!(!o.is_document("OEBPS/cover.jpg"));
        assert!(!o.is_document("mimetype"));
    }

    #[test]
    fn include_path_appends_extension() {
        let c = PreprocessConfig {
            include_dir: PathBuf::from("book"),
            ..Default::default()
        };
        assert_eq!(c.include_path("sec1"), PathBuf::from("book").join("sec1.tex"));
    }
}
