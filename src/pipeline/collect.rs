//! File discovery: list the submission folder and keep recognised sources.
//!
//! Directory iteration order is filesystem-dependent, so the result is
//! sorted by file name. Subdirectories are not descended into; a submission
//! is a flat folder.

use crate::error::Code2PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Languages with an entry in the dispatcher's command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Cpp,
    C,
    Java,
    CSharp,
}

impl Language {
    /// Every supported language, in table order.
    pub const ALL: [Language; 7] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Cpp,
        Language::C,
        Language::Java,
        Language::CSharp,
    ];

    /// Look up an extension (without the dot), ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "js" => Some(Language::JavaScript),
            "ts" => Some(Language::TypeScript),
            "cpp" => Some(Language::Cpp),
            "c" => Some(Language::C),
            "java" => Some(Language::Java),
            "cs" => Some(Language::CSharp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::from_path(Path::new(name))
    }

    /// Canonical lowercase extension.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Java => "java",
            Language::CSharp => "cs",
        }
    }

    /// Whether the file is compiled into a temporary directory before running.
    pub fn is_compiled(self) -> bool {
        matches!(
            self,
            Language::Cpp | Language::C | Language::Java | Language::CSharp
        )
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Cpp => "C++",
            Language::C => "C",
            Language::Java => "Java",
            Language::CSharp => "C#",
        };
        f.write_str(name)
    }
}

/// A recognised source file and the language its extension maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
}

impl SourceFile {
    /// Bare file name, e.g. `main.py`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// List recognised source files directly inside `folder`, sorted by file name.
///
/// Entries that are not regular files, or whose names are not valid UTF-8,
/// are skipped.
pub async fn collect_source_files(folder: &Path) -> Result<Vec<SourceFile>, Code2PdfError> {
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| map_dir_error(folder, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| map_dir_error(folder, e))?
    {
        let path = entry.path();
        let Some(language) = Language::from_path(&path) else {
            continue;
        };
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            Ok(_) => {
                debug!("Skipping non-file entry {}", path.display());
                continue;
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        }
        if path.file_name().and_then(|n| n.to_str()).is_none() {
            warn!("Skipping non-UTF-8 file name {}", path.display());
            continue;
        }
        files.push(SourceFile { path, language });
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    debug!("Collected {} source files in {}", files.len(), folder.display());
    Ok(files)
}

fn map_dir_error(folder: &Path, e: std::io::Error) -> Code2PdfError {
    match e.kind() {
        std::io::ErrorKind::NotFound => Code2PdfError::FolderNotFound {
            path: folder.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Code2PdfError::PermissionDenied {
            path: folder.to_path_buf(),
        },
        _ => Code2PdfError::Internal(format!("reading {}: {e}", folder.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("Cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("rb"), None);
        assert_eq!(Language::from_extension(""), None);
    }

    #[test]
    fn from_file_name_uses_last_extension() {
        assert_eq!(Language::from_file_name("main.test.js"), Some(Language::JavaScript));
        assert_eq!(Language::from_file_name("Makefile"), None);
        assert_eq!(Language::from_file_name("notes.txt"), None);
    }

    #[test]
    fn extension_round_trips_through_table() {
        for lang in Language::ALL {
            assert_eq!(Language::from_extension(lang.extension()), Some(lang));
        }
    }

    #[test]
    fn compiled_languages() {
        assert!(Language::Cpp.is_compiled());
        assert!(Language::Java.is_compiled());
        assert!(!Language::Python.is_compiled());
        assert!(!Language::TypeScript.is_compiled());
    }

    #[tokio::test]
    async fn collects_sorted_recognised_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.py", "A.JAVA", "a.cpp", "notes.txt", "lab.pdf", "z.rb"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("pkg.py")).unwrap();

        let files = collect_source_files(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(SourceFile::file_name).collect();
        assert_eq!(names, vec!["A.JAVA", "a.cpp", "b.py"]);
        let languages: Vec<_> = files.iter().map(|f| f.language).collect();
        assert_eq!(languages, vec![Language::Java, Language::Cpp, Language::Python]);
    }

    #[tokio::test]
    async fn missing_folder_is_folder_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_source_files(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, Code2PdfError::FolderNotFound { .. }));
    }
}
