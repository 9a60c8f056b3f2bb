//! Input resolution: validate the submission folder and find its cover page.
//!
//! A submission folder `lab3/` must contain `lab3/lab3.pdf`. The cover is
//! checked here (existence, read permission, `%PDF` magic bytes) so that a
//! bad submission fails before any program is run and before any output
//! file is created.

use crate::error::Code2PdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A submission folder whose cover page has been located and sniffed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubmission {
    pub folder: PathBuf,
    pub cover_path: PathBuf,
}

/// Resolve `folder` and its `<folderName>.pdf` cover page.
pub fn resolve_submission(folder: &Path) -> Result<ResolvedSubmission, Code2PdfError> {
    let folder = resolve_folder(folder)?;
    let cover_path = resolve_cover(&folder)?;
    Ok(ResolvedSubmission { folder, cover_path })
}

/// Check that `folder` exists and is a directory.
///
/// The path is canonicalised so that `.` or a trailing slash still yields a
/// usable folder name for the cover lookup.
pub fn resolve_folder(folder: &Path) -> Result<PathBuf, Code2PdfError> {
    let meta = match std::fs::metadata(folder) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Code2PdfError::PermissionDenied {
                path: folder.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(Code2PdfError::FolderNotFound {
                path: folder.to_path_buf(),
            })
        }
    };
    if !meta.is_dir() {
        return Err(Code2PdfError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }
    let canonical = std::fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
    debug!("Resolved submission folder: {}", canonical.display());
    Ok(canonical)
}

/// File name of the cover page for `folder`: its last component plus `.pdf`.
pub fn cover_file_name(folder: &Path) -> Result<String, Code2PdfError> {
    folder
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("{n}.pdf"))
        .ok_or_else(|| {
            Code2PdfError::Internal(format!(
                "cannot derive a cover page name from '{}'",
                folder.display()
            ))
        })
}

/// Locate and sniff `<folder>/<folderName>.pdf`.
pub fn resolve_cover(folder: &Path) -> Result<PathBuf, Code2PdfError> {
    let file_name = cover_file_name(folder)?;
    let path = folder.join(&file_name);

    if !path.is_file() {
        return Err(Code2PdfError::CoverNotFound {
            folder: folder.to_path_buf(),
            file_name,
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => return Err(Code2PdfError::NotAPdf { path, magic }),
                Err(_) => {
                    return Err(Code2PdfError::CorruptPdf {
                        path,
                        detail: "file is shorter than a PDF header".into(),
                    })
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Code2PdfError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Code2PdfError::CoverNotFound {
                folder: folder.to_path_buf(),
                file_name,
            })
        }
    }

    debug!("Resolved cover page: {}", path.display());
    Ok(path)
}
