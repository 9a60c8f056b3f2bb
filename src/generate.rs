//! Top-level entry points: build `submission.pdf` for a folder.
//!
//! Files are handled strictly one after another. Each file contributes its
//! code pages, then its program-output pages, so the reader sees a program
//! next to what it printed. Only problems with the folder, the cover or the
//! output file abort a run; anything that goes wrong while running a
//! student's program is printed into the document instead.

use crate::config::GeneratorConfig;
use crate::error::Code2PdfError;
use crate::executor::{Executor, ProcessExecutor};
use crate::output::{FileReport, GenerationOutput, GenerationStats, SourceEntry, SubmissionSummary};
use crate::pipeline::collect::{self, SourceFile};
use crate::pipeline::render::{self, PageWriter, CODE_LABEL, OUTPUT_LABEL};
use crate::pipeline::{execute, input, paginate, postprocess};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate the submission PDF for `folder`.
///
/// The output is `<folder>/<config.output_name>` (default `submission.pdf`)
/// and is replaced atomically, so a failed run never leaves a partial file.
///
/// # Errors
/// Returns `Err(Code2PdfError)` only for fatal errors:
/// - folder missing or not a directory
/// - cover page `<folderName>.pdf` missing, not a PDF, or unparseable
/// - the output could not be written
///
/// A source file that cannot be read is not fatal: its code page carries an
/// error line and the program is still run.
///
/// # Example
/// ```rust,no_run
/// use edgequake_code2pdf::{generate, GeneratorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = generate("submissions/lab3", &GeneratorConfig::default()).await?;
/// println!("{} pages → {}", output.stats.total_pages, output.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    folder: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Code2PdfError> {
    let total_start = Instant::now();
    let folder = folder.as_ref();
    info!("Generating submission for {}", folder.display());

    // ── Step 1: Resolve folder and cover ─────────────────────────────────
    let resolved = input::resolve_submission(folder)?;
    let mut doc = render::load_cover(&resolved.cover_path).await?;
    let cover_pages = render::page_count(&doc);
    info!("Cover has {} page(s)", cover_pages);

    // ── Step 2: Collect sources ──────────────────────────────────────────
    let files = collect::collect_source_files(&resolved.folder).await?;
    let total = files.len();
    info!("Found {} source file(s)", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(total);
    }

    let executor: Arc<dyn Executor> = match config.executor {
        Some(ref e) => Arc::clone(e),
        None => Arc::new(ProcessExecutor::with_output_limit(config.max_output_bytes)),
    };
    let layout = config.geometry.layout_params();

    // ── Step 3: Code + output pages per file ─────────────────────────────
    let mut reports = Vec::with_capacity(total);
    {
        let mut writer = PageWriter::attach(&mut doc, &config.geometry)?;

        for (i, file) in files.iter().enumerate() {
            let SourceFile { path, language } = file;
            let file_name = file.file_name();
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(i + 1, total, &file_name);
            }

            let (source, source_error) = match read_source(path).await {
                Ok(text) => (text, None),
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    let message = unreadable_source_text(&file_name, &e);
                    (message.clone(), Some(message))
                }
            };
            let code_blocks = paginate::paginate(&postprocess::clean_text(&source), &layout)?;
            let code_pages = writer.write_section(CODE_LABEL, &file_name, &code_blocks)?;

            let exec_start = Instant::now();
            let result = execute::execute_file(
                executor.as_ref(),
                path,
                &config.toolchain,
                config.exec_timeout(),
            )
            .await;
            let duration_ms = exec_start.elapsed().as_millis() as u64;

            let output_text = postprocess::clean_text(&result.display_text());
            let output_blocks = paginate::paginate(&output_text, &layout)?;
            let output_pages = writer.write_section(OUTPUT_LABEL, &file_name, &output_blocks)?;

            info!(
                "{} → {:?} ({} code page(s), {} output page(s), {}ms)",
                file_name,
                result.kind(),
                code_pages,
                output_pages,
                duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(i + 1, total, &file_name, result.kind());
            }

            reports.push(FileReport {
                language: *language,
                source_error,
                file_name,
                outcome: result.kind(),
                code_pages,
                output_pages,
                duration_ms,
            });
        }
    }

    // ── Step 4: Serialise and write ──────────────────────────────────────
    let bytes = render::serialize_document(doc).await?;
    let output_path = resolved.folder.join(&config.output_name);
    write_atomic(&output_path, &bytes).await?;

    let stats = GenerationStats::from_reports(
        &reports,
        cover_pages,
        total_start.elapsed().as_millis() as u64,
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(stats.total_files, stats.succeeded);
    }

    info!(
        "Wrote {} ({} pages, {}/{} programs ran cleanly, {}ms)",
        output_path.display(),
        stats.total_pages,
        stats.succeeded,
        stats.total_files,
        stats.total_duration_ms
    );

    Ok(GenerationOutput {
        output_path,
        files: reports,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    folder: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<GenerationOutput, Code2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Code2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(folder, config))
}

/// Describe what [`generate`] would do for `folder` without running any
/// program or writing any file.
pub async fn inspect(folder: impl AsRef<Path>) -> Result<SubmissionSummary, Code2PdfError> {
    let resolved = input::resolve_submission(folder.as_ref())?;
    let cover = render::load_cover(&resolved.cover_path).await?;
    let files = collect::collect_source_files(&resolved.folder)
        .await?
        .iter()
        .map(|file| SourceEntry {
            file_name: file.file_name(),
            language: file.language,
        })
        .collect();

    Ok(SubmissionSummary {
        cover_pages: render::page_count(&cover),
        folder: resolved.folder,
        cover_path: resolved.cover_path,
        files,
    })
}

/// Read a source file, replacing invalid UTF-8 rather than failing.
async fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!("{} is not valid UTF-8; decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Code-page text for a source that could not be read.
fn unreadable_source_text(file_name: &str, err: &std::io::Error) -> String {
    format!("Error: could not read {file_name}: {err}")
}

/// Atomic write: write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Code2PdfError> {
    let tmp_path = tmp_sibling(path);
    let write_err = |e| Code2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
