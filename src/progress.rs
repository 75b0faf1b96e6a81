//! Progress-callback trait for rewrite events.
//!
//! Inject an [`Arc<dyn RewriteProgressCallback>`] via
//! [`crate::config::RewriteConfigBuilder::progress_callback`] to receive
//! events as documents are rewritten and resources are saved. The CLI uses it
//! to drive a terminal progress display; library users can forward events to
//! whatever reporting they have.
//!
//! # Example
//!
//! ```rust
//! use bookpatch::{RewriteConfig, RewriteProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl RewriteProgressCallback for CountingCallback {
//!     fn on_resource_saved(&self, seq: u32, name: &str, locator: &str) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{seq} {name} {locator}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { saved: AtomicUsize::new(0) });
//!
//! let config = RewriteConfig::builder()
//!     .progress_callback(counter as Arc<dyn RewriteProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the rewriting pipeline as it works through its input.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RewriteProgressCallback: Send + Sync {
    /// Called once an archive has been opened.
    ///
    /// # Arguments
    /// * `total_entries`: number of entries in the source archive
    fn on_run_start(&self, total_entries: usize) {
        let _ = total_entries;
    }

    /// Called before a document entry is scanned.
    fn on_document_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after a fetched resource has been written to the sink.
    ///
    /// # Arguments
    /// * `seq`    : sequence number used in the filename
    /// * `name`   : local name the resource was stored under
    /// * `locator`: URL the resource was fetched from
    fn on_resource_saved(&self, seq: u32, name: &str, locator: &str) {
        let _ = (seq, name, locator);
    }

    /// Called after a document entry has been rewritten and stored.
    fn on_document_complete(&self, name: &str, resources: usize) {
        let _ = (name, resources);
    }

    /// Called after a non-document entry was copied verbatim.
    fn on_entry_copied(&self, name: &str) {
        let _ = name;
    }

    /// Called once after the output has been finalised.
    fn on_run_complete(&self, documents: usize, resources: usize) {
        let _ = (documents, resources);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RewriteProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RewriteConfig`].
pub type ProgressCallback = Arc<dyn RewriteProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        documents: AtomicUsize,
        resources: AtomicUsize,
        copied: AtomicUsize,
    }

    impl RewriteProgressCallback for TrackingCallback {
        fn on_document_start(&self, _name: &str) {
            self.documents.fetch_add(1, Ordering::SeqCst);
        }

        fn on_resource_saved(&self, _seq: u32, _name: &str, _locator: &str) {
            self.resources.fetch_add(1, Ordering::SeqCst);
        }

        fn on_entry_copied(&self, _name: &str) {
            self.copied.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_document_start("OEBPS/ch01.xhtml");
        cb.on_resource_saved(0, "images/eqn_00.png", "http://example.org/x");
        cb.on_document_complete("OEBPS/ch01.xhtml", 1);
        cb.on_entry_copied("mimetype");
        cb.on_run_complete(1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let cb: &dyn RewriteProgressCallback = &tracker;
        cb.on_document_start("a.xhtml");
        cb.on_resource_saved(0, "images/eqn_00.png", "u");
        cb.on_resource_saved(1, "images/eqn_01.png", "u");
        cb.on_entry_copied("cover.jpg");
        assert_eq!(tracker.documents.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.resources.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.copied.load(Ordering::SeqCst), 1);
    }
}
