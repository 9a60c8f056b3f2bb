//! Result types returned by [`crate::generate()`] and [`crate::inspect()`].
//!
//! All of them derive `Serialize` so the CLI can emit them with `--json`.

use crate::pipeline::collect::Language;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a file's execution ended, without the captured text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
    TimedOut,
    Unsupported,
}

/// What happened to one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    pub language: Language,
    /// Set when the source could not be read; its code page then shows this
    /// message instead of the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
    pub outcome: OutcomeKind,
    pub code_pages: usize,
    pub output_pages: usize,
    /// Wall-clock time spent executing the file (compile + run).
    pub duration_ms: u64,
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Files whose source could not be read.
    pub unreadable: usize,
    pub cover_pages: usize,
    /// Pages in the written document, cover included.
    pub total_pages: usize,
    pub total_duration_ms: u64,
}

impl GenerationStats {
    pub(crate) fn from_reports(
        files: &[FileReport],
        cover_pages: usize,
        total_duration_ms: u64,
    ) -> Self {
        let count = |kind: OutcomeKind| files.iter().filter(|f| f.outcome == kind).count();
        Self {
            total_files: files.len(),
            succeeded: count(OutcomeKind::Success),
            failed: count(OutcomeKind::Failure),
            timed_out: count(OutcomeKind::TimedOut),
            unreadable: files.iter().filter(|f| f.source_error.is_some()).count(),
            cover_pages,
            total_pages: cover_pages
                + files
                    .iter()
                    .map(|f| f.code_pages + f.output_pages)
                    .sum::<usize>(),
            total_duration_ms,
        }
    }
}

/// Result of a successful generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Where the PDF was written.
    pub output_path: PathBuf,
    /// One entry per recognised file, in processing order.
    pub files: Vec<FileReport>,
    pub stats: GenerationStats,
}

/// A recognised source file, as listed by [`crate::inspect()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub file_name: String,
    pub language: Language,
}

/// What a run over a folder would do, without running anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub folder: PathBuf,
    pub cover_path: PathBuf,
    pub cover_pages: usize,
    pub files: Vec<SourceEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: OutcomeKind, code: usize, out: usize) -> FileReport {
        FileReport {
            file_name: name.into(),
            language: Language::from_file_name(name).unwrap(),
            source_error: None,
            outcome,
            code_pages: code,
            output_pages: out,
            duration_ms: 0,
        }
    }

    #[test]
    fn stats_count_outcomes_and_pages() {
        let files = vec![
            report("a.py", OutcomeKind::Success, 2, 1),
            report("b.cpp", OutcomeKind::Failure, 1, 1),
            report("c.js", OutcomeKind::TimedOut, 1, 1),
        ];
        let stats = GenerationStats::from_reports(&files, 1, 42);
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.unreadable, 0);
        assert_eq!(stats.total_pages, 1 + 3 + 2 + 2);
        assert_eq!(stats.total_duration_ms, 42);
    }

    #[test]
    fn unreadable_sources_are_counted_separately() {
        let mut broken = report("b.py", OutcomeKind::Failure, 1, 1);
        broken.source_error = Some("permission denied".into());
        let files = vec![report("a.py", OutcomeKind::Success, 1, 1), broken];
        let stats = GenerationStats::from_reports(&files, 0, 0);
        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn report_language_is_always_present_in_json() {
        let json = serde_json::to_value(report("a.cpp", OutcomeKind::Success, 1, 1)).unwrap();
        assert_eq!(json["language"], "cpp");
        assert!(json.get("source_error").is_none());
    }

    #[test]
    fn outcome_serialises_snake_case() {
        let json = serde_json::to_string(&OutcomeKind::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
    }
}
