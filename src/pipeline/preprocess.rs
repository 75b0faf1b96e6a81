//! LaTeX clean-up ahead of pandoc.
//!
//! pandoc does not follow `\input`, chokes on stray `\label`s in some
//! contexts, cannot embed `.eps` figures in HTML/EPUB, and ignores the
//! old-style `{\bf …}` font switches. This pass fixes those with plain
//! text substitution; it is not a TeX parser.
//!
//! ## Rule Order
//!
//! Per line: a figure line is replaced wholesale and nothing else applies to
//! it; otherwise labels are removed, then includes are expanded. Included
//! text is inserted as-is and not scanned again. Font switches are rewritten
//! last, over the whole assembled document, so they are also fixed inside
//! included files.

use crate::config::PreprocessConfig;
use crate::error::DirectiveError;
use crate::output::PreprocessOutput;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

static RE_FIGURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\includegraphics\{(\S+)\.eps\}\}").unwrap());

static RE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\label\{[^}\s]+\}").unwrap());

static RE_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\input\{([^}\s]+)\}").unwrap());

static RE_FONT_SWITCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\(bf|tt|em)\s").unwrap());

/// Run every rule over `text`.
pub fn preprocess_str(text: &str, config: &PreprocessConfig) -> PreprocessOutput {
    let mut errors = Vec::new();
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        out.push_str(&preprocess_line(line, config, &mut errors));
    }
    PreprocessOutput {
        text: normalise_font_switches(&out),
        errors,
    }
}

/// Apply the per-line rules. `line` keeps its terminator.
fn preprocess_line(line: &str, config: &PreprocessConfig, errors: &mut Vec<DirectiveError>) -> String {
    if let Some(caps) = RE_FIGURE.captures(line) {
        debug!("Figure {}.eps → png", &caps[1]);
        return format!("<img src=\"{}.png\">\n", &caps[1]);
    }

    let line = RE_LABEL.replace_all(line, "");
    RE_INPUT
        .replace_all(&line, |caps: &Captures<'_>| expand_include(&caps[1], config, errors))
        .into_owned()
}

fn expand_include(name: &str, config: &PreprocessConfig, errors: &mut Vec<DirectiveError>) -> String {
    let path = config.include_path(name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            debug!("Inlined {} ({} bytes)", path.display(), contents.len());
            contents
        }
        Err(e) => {
            warn!("Can't open {}: {}", path.display(), e);
            errors.push(DirectiveError::MissingInclude {
                name: name.to_string(),
                path,
            });
            String::new()
        }
    }
}

/// `{\bf x}` → `\textbf{x}`, likewise `\tt` → `\texttt`, `\em` → `\textit`.
/// The whitespace after the switch is consumed; the closing brace is reused.
pub fn normalise_font_switches(text: &str) -> String {
    RE_FONT_SWITCH
        .replace_all(text, |caps: &Captures<'_>| {
            let command = match &caps[1] {
                "bf" => "textbf",
                "tt" => "texttt",
                _ => "textit",
            };
            format!("\\{command}{{")
        })
        .into_owned()
}
