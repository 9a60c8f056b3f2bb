//! Progress-callback trait for per-file generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] to be told
//! when each source file starts and finishes. The CLI uses this to drive an
//! `indicatif` progress bar; library callers can forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_code2pdf::{GenerationProgressCallback, GeneratorConfig, OutcomeKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for FailureCounter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, file_name: &str, outcome: OutcomeKind) {
//!         if outcome != OutcomeKind::Success {
//!             self.failed.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("{file_name} did not run cleanly");
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(FailureCounter { failed: AtomicUsize::new(0) });
//! let config = GeneratorConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::OutcomeKind;
use std::sync::Arc;

/// Called by the generator as it processes each source file.
///
/// Files are processed one at a time, so calls never overlap within a run,
/// but implementations must still be `Send + Sync` to live in the config.
/// Every method has a no-op default.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once after the cover is loaded and files are collected.
    ///
    /// # Arguments
    /// * `total_files`: number of recognised source files
    fn on_generation_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is read and executed.
    ///
    /// # Arguments
    /// * `index`    : 1-indexed position in the sorted file list
    /// * `total`    : number of files
    /// * `file_name`: bare file name, e.g. `main.py`
    fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called after a file's code and output pages have been added.
    fn on_file_complete(&self, index: usize, total: usize, file_name: &str, outcome: OutcomeKind) {
        let _ = (index, total, file_name, outcome);
    }

    /// Called once after the document has been written to disk.
    ///
    /// # Arguments
    /// * `total_files`: number of files processed
    /// * `succeeded`  : files whose program exited cleanly
    fn on_generation_complete(&self, total_files: usize, succeeded: usize) {
        let _ = (total_files, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
