//! Pipeline stages for inline-reference rewriting.
//!
//! Each submodule implements one step. The rewriting core only talks to the
//! network through [`resolve::ResourceResolver`] and only stores bytes
//! through [`sink::OutputSink`], so every stage can be tested without either.
//!
//! ## Data Flow
//!
//! ```text
//! line ──▶ scan ──▶ resolve ──▶ allocate ──▶ sink ──▶ rewrite
//!        (regex)    (HTTP GET)  (eqn_NN)    (zip/dir)  (splice)
//! ```
//!
//! 1. [`scan`]    : find the first occurrence of any reference pattern
//! 2. [`resolve`] : decode the payload and fetch the bytes it points at
//! 3. [`allocate`]: name the resource from the run-wide sequence counter
//! 4. [`sink`]    : store the bytes (archive entry, file, or memory)
//! 5. [`rewrite`] : splice the local reference in and scan again
//!
//! [`archive`] drives the loop over every document in a zip container;
//! [`preprocess`] is a separate, offline LaTeX clean-up pass.

pub mod allocate;
pub mod archive;
pub mod preprocess;
pub mod resolve;
pub mod rewrite;
pub mod scan;
pub mod sink;
