//! Error types for the edgequake-code2pdf library.
//!
//! Only one class of failure aborts a run:
//!
//! * [`Code2PdfError`] is **fatal**: the document cannot be produced at all
//!   (folder missing, cover page missing or corrupt, output not writable,
//!   invalid configuration). Returned as `Err(Code2PdfError)` from the
//!   top-level `generate*` and `inspect` functions.
//!
//! Everything that goes wrong with a *single source file* (unreadable
//! source, unsupported language, compiler diagnostics, non-zero exit,
//! timeout) is printed into the PDF instead. Execution problems are absorbed
//! into [`crate::pipeline::execute::ExecutionResult`] and become that file's
//! program output. Process-level failures surface first as
//! [`crate::executor::ExecError`] and are converted there.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-code2pdf library.
#[derive(Debug, Error)]
pub enum Code2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The submission folder does not exist.
    #[error("Submission folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// The path exists but is a file.
    #[error("'{path}' is not a directory\nPass the submission folder, not a file inside it.")]
    NotADirectory { path: PathBuf },

    /// `<folder>/<folderName>.pdf` is missing.
    #[error("Cover page PDF ({file_name}) not found in '{folder}'")]
    CoverNotFound { folder: PathBuf, file_name: String },

    /// Process does not have read permission on the file or folder.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The cover file exists and was read, but is not a PDF.
    #[error("Cover page is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The cover PDF could not be parsed, or its page tree is malformed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or layout validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (PDF object model, task join).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<lopdf::Error> for Code2PdfError {
    fn from(e: lopdf::Error) -> Self {
        Code2PdfError::Internal(format!("PDF object model: {e}"))
    }
}
