//! End-to-end tests for edgequake-code2pdf.
//!
//! Each test builds a submission folder in a temp dir (cover PDF plus
//! source files), runs the full pipeline and reads the written PDF back with
//! `lopdf`. Program execution goes through a scripted [`Executor`] so the
//! tests do not need any toolchain installed; the one test that runs a real
//! interpreter skips itself when `python3` is missing.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use edgequake_code2pdf::pipeline::execute::execute_file;
use edgequake_code2pdf::pipeline::render::{self, PageWriter};
use edgequake_code2pdf::{
    generate, generate_sync, inspect, Code2PdfError, CommandSpec, ExecError, Executor,
    GenerationProgressCallback, GeneratorConfig, Language, OutcomeKind, PageGeometry,
    ProcessOutput, ToolchainConfig,
};
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies to each command with whatever the closure returns and records
/// the command lines it saw.
struct FakeExecutor {
    reply: Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, ExecError> + Send + Sync>,
    seen: Mutex<Vec<String>>,
}

impl FakeExecutor {
    fn new(
        reply: impl Fn(&CommandSpec) -> Result<ProcessOutput, ExecError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Every program prints the name of the file it was given.
    fn echo_file_name() -> Arc<Self> {
        Self::new(|cmd| {
            let file = cmd
                .args
                .last()
                .and_then(|a| Path::new(a).file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(stdout(&format!("ran {file}\n")))
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn run(
        &self,
        command: &CommandSpec,
        _working_dir: &Path,
        _timeout: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        self.seen.lock().unwrap().push(command.to_string());
        (self.reply)(command)
    }
}

fn stdout(text: &str) -> ProcessOutput {
    ProcessOutput {
        stdout: text.into(),
        stderr: String::new(),
        exit_code: Some(0),
    }
}

/// Create `<tmp>/<name>/` with a cover `<name>.pdf` of `cover_pages` pages.
async fn submission(name: &str, cover_pages: usize) -> (tempfile::TempDir, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join(name);
    std::fs::create_dir(&folder).unwrap();

    let mut cover = render::new_document();
    {
        let mut writer = PageWriter::attach(&mut cover, &PageGeometry::default()).unwrap();
        for i in 1..=cover_pages {
            writer
                .write_page(&format!("Cover {i}"), "Student: Jane Doe")
                .unwrap();
        }
    }
    let bytes = render::serialize_document(cover).await.unwrap();
    std::fs::write(folder.join(format!("{name}.pdf")), bytes).unwrap();
    (root, folder)
}

fn config_with(executor: Arc<dyn Executor>) -> GeneratorConfig {
    GeneratorConfig::builder()
        .executor(executor)
        .build()
        .unwrap()
}

/// First `Tj` string of every page, in page order.
fn page_headers(pdf: &Path) -> Vec<String> {
    page_texts(pdf)
        .into_iter()
        .map(|texts| texts.into_iter().next().unwrap_or_default())
        .collect()
}

/// All `Tj` strings of every page, in page order.
fn page_texts(pdf: &Path) -> Vec<Vec<String>> {
    let doc = Document::load(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| match op.operands.first() {
                    Some(Object::String(bytes, _)) => {
                        Some(bytes.iter().map(|&b| b as char).collect())
                    }
                    _ => None,
                })
                .collect()
        })
        .collect()
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_cover_fails_without_output() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("lab1");
    std::fs::create_dir(&folder).unwrap();
    std::fs::write(folder.join("main.py"), "print('hi')\n").unwrap();

    let exec = FakeExecutor::echo_file_name();
    let err = generate(&folder, &config_with(exec.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, Code2PdfError::CoverNotFound { .. }), "got {err:?}");
    assert!(err.to_string().contains("lab1.pdf"), "got: {err}");
    assert!(!folder.join("submission.pdf").exists());
    assert!(exec.seen().is_empty(), "nothing may run before the cover is found");
}

#[tokio::test]
async fn test_missing_folder_fails() {
    let root = tempfile::tempdir().unwrap();
    let err = generate(root.path().join("nope"), &GeneratorConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Code2PdfError::FolderNotFound { .. }));
}

#[tokio::test]
async fn test_unparseable_cover_is_corrupt() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("lab2");
    std::fs::create_dir(&folder).unwrap();
    std::fs::write(folder.join("lab2.pdf"), b"%PDF-1.4\ngarbage without xref").unwrap();

    let err = generate(&folder, &config_with(FakeExecutor::echo_file_name()))
        .await
        .unwrap_err();
    assert!(matches!(err, Code2PdfError::CorruptPdf { .. }), "got {err:?}");
    assert!(!folder.join("submission.pdf").exists());
}

// ── Document structure ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_cover_then_code_then_output_per_file() {
    let (_root, folder) = submission("lab3", 2).await;
    std::fs::write(folder.join("b.js"), "console.log('b')\n").unwrap();
    std::fs::write(folder.join("a.py"), "print('a')\n").unwrap();
    std::fs::write(folder.join("notes.txt"), "not code").unwrap();

    let output = generate(&folder, &config_with(FakeExecutor::echo_file_name()))
        .await
        .unwrap();

    assert_eq!(output.output_path, folder.canonicalize().unwrap().join("submission.pdf"));
    assert_eq!(
        page_headers(&output.output_path),
        vec![
            "Cover 1",
            "Cover 2",
            "File: a.py (page 1 of 1)",
            "Program Output: a.py (page 1 of 1)",
            "File: b.js (page 1 of 1)",
            "Program Output: b.js (page 1 of 1)",
        ]
    );

    let texts = page_texts(&output.output_path);
    assert_eq!(texts[2][1..], ["print('a')".to_string()]);
    assert_eq!(texts[3][1..], ["ran a.py".to_string()]);

    assert_eq!(output.stats.cover_pages, 2);
    assert_eq!(output.stats.total_pages, 6);
    assert_eq!(output.stats.succeeded, 2);
    let names: Vec<_> = output.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.py", "b.js"]);
}

#[tokio::test]
async fn test_long_source_continues_across_pages() {
    let (_root, folder) = submission("hw1", 1).await;
    let source: String = (1..=120).map(|i| format!("x{i} = {i}\n")).collect();
    std::fs::write(folder.join("long.py"), &source).unwrap();

    let output = generate(&folder, &config_with(FakeExecutor::echo_file_name()))
        .await
        .unwrap();

    // 56 body lines per default page: 120 lines → 3 pages.
    assert_eq!(output.files[0].code_pages, 3);
    let headers = page_headers(&output.output_path);
    assert_eq!(headers[1], "File: long.py (page 1 of 3)");
    assert_eq!(headers[2], "File: long.py (page 2 of 3) (continued)");
    assert_eq!(headers[3], "File: long.py (page 3 of 3) (continued)");

    let texts = page_texts(&output.output_path);
    let body: Vec<String> = texts[1..=3]
        .iter()
        .flat_map(|page| page[1..].to_vec())
        .collect();
    let expected: Vec<String> = source.lines().map(String::from).collect();
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_empty_source_gets_header_only_page() {
    let (_root, folder) = submission("hw2", 1).await;
    std::fs::write(folder.join("empty.c"), "").unwrap();

    let output = generate(
        &folder,
        &config_with(FakeExecutor::new(|_| Ok(stdout("")))),
    )
    .await
    .unwrap();

    let texts = page_texts(&output.output_path);
    assert_eq!(texts[1], vec!["File: empty.c (page 1 of 1)"]);
    assert_eq!(texts[2], vec!["Program Output: empty.c (page 1 of 1)", "No output"]);
}

// ── Per-file failures are embedded, not fatal ────────────────────────────────

#[tokio::test]
async fn test_failing_python_embeds_stderr() {
    let (_root, folder) = submission("hw3", 1).await;
    std::fs::write(folder.join("crash.py"), "print(1/0)\n").unwrap();

    let exec = FakeExecutor::new(|_| {
        Ok(ProcessOutput {
            stdout: String::new(),
            stderr: "Traceback (most recent call last):\n  File \"crash.py\", line 1\nZeroDivisionError: division by zero\n".into(),
            exit_code: Some(1),
        })
    });
    let output = generate(&folder, &config_with(exec)).await.unwrap();

    assert_eq!(output.files[0].outcome, OutcomeKind::Failure);
    assert_eq!(output.stats.failed, 1);
    let texts = page_texts(&output.output_path);
    let output_page = &texts[2];
    assert_eq!(output_page[0], "Program Output: crash.py (page 1 of 1)");
    assert_eq!(output_page[1], "Error: Traceback (most recent call last):");
    assert_eq!(output_page.last().unwrap(), "ZeroDivisionError: division by zero");
}

#[tokio::test]
async fn test_timeout_is_reported_in_document() {
    let (_root, folder) = submission("hw4", 1).await;
    std::fs::write(folder.join("spin.js"), "while (true) {}\n").unwrap();

    let exec = FakeExecutor::new(|cmd| {
        Err(ExecError::Timeout {
            program: cmd.program.clone(),
            secs: 30,
        })
    });
    let output = generate(&folder, &config_with(exec)).await.unwrap();

    assert_eq!(output.files[0].outcome, OutcomeKind::TimedOut);
    let texts = page_texts(&output.output_path);
    assert_eq!(texts[2][1], "Error: execution timed out after 30s");
}

#[tokio::test]
async fn test_unsupported_extension_is_skipped_and_labelled() {
    let (_root, folder) = submission("hw5", 1).await;
    std::fs::write(folder.join("script.rb"), "puts 1\n").unwrap();
    std::fs::write(folder.join("main.py"), "print(1)\n").unwrap();

    let exec = FakeExecutor::echo_file_name();
    let output = generate(&folder, &config_with(exec.clone())).await.unwrap();
    assert_eq!(output.stats.total_files, 1);
    assert_eq!(output.files[0].file_name, "main.py");

    let rb = execute_file(
        exec.as_ref(),
        &folder.join("script.rb"),
        &ToolchainConfig::default(),
        Duration::from_secs(1),
    )
    .await;
    assert_eq!(rb.display_text(), "Unsupported language.");
    assert_eq!(exec.seen().len(), 1, "only main.py was executed");
}

#[tokio::test]
async fn test_unreadable_source_is_reported_not_fatal() {
    let (_root, folder) = submission("hw5b", 1).await;
    std::fs::write(folder.join("a.py"), "print(1)\n").unwrap();
    std::fs::write(folder.join("b.py"), "print(2)\n").unwrap();

    // Running a.py removes b.py after collection, so reading b.py fails.
    let doomed = folder.join("b.py");
    let exec = FakeExecutor::new(move |cmd| {
        if cmd.args.iter().any(|a| a.ends_with("a.py")) {
            std::fs::remove_file(&doomed).unwrap();
        }
        Ok(stdout("ok\n"))
    });
    let output = generate(&folder, &config_with(exec.clone())).await.unwrap();

    assert_eq!(output.files.len(), 2);
    assert!(output.files[0].source_error.is_none());
    let err = output.files[1].source_error.as_deref().unwrap();
    assert!(err.starts_with("Error: could not read b.py: "), "{err}");
    assert_eq!(output.stats.unreadable, 1);
    assert_eq!(exec.seen().len(), 2, "b.py is still handed to the executor");

    let texts = page_texts(&output.output_path);
    assert_eq!(texts.len(), 5);
    assert_eq!(texts[3][0], "File: b.py (page 1 of 1)");
    assert!(texts[3][1].starts_with("Error: could not read b.py: "), "{:?}", texts[3]);
    assert_eq!(texts[4][0], "Program Output: b.py (page 1 of 1)");
}

#[tokio::test]
async fn test_blank_program_output_is_not_replaced() {
    let (_root, folder) = submission("hw5c", 1).await;
    std::fs::write(folder.join("main.py"), "print()\n").unwrap();

    let output = generate(&folder, &config_with(FakeExecutor::new(|_| Ok(stdout("\n\n")))))
        .await
        .unwrap();
    let texts = page_texts(&output.output_path);
    assert_eq!(texts[2], vec!["Program Output: main.py (page 1 of 1)"]);
}

// ── Configuration and entry points ───────────────────────────────────────────

#[tokio::test]
async fn test_output_name_and_toolchain_are_configurable() {
    let (_root, folder) = submission("hw6", 1).await;
    std::fs::write(folder.join("main.py"), "print(1)\n").unwrap();

    let exec = FakeExecutor::echo_file_name();
    let config = GeneratorConfig::builder()
        .executor(exec.clone())
        .output_name("final.pdf")
        .toolchain(ToolchainConfig {
            python: "pypy3".into(),
            ..ToolchainConfig::default()
        })
        .build()
        .unwrap();
    let output = generate(&folder, &config).await.unwrap();

    assert!(output.output_path.ends_with("final.pdf"));
    assert!(!folder.join("submission.pdf").exists());
    assert!(exec.seen()[0].starts_with("pypy3 "), "got {:?}", exec.seen());
}

#[tokio::test]
async fn test_existing_output_is_replaced_and_not_collected() {
    let (_root, folder) = submission("hw7", 1).await;
    std::fs::write(folder.join("main.py"), "print(1)\n").unwrap();
    let config = config_with(FakeExecutor::echo_file_name());

    let first = generate(&folder, &config).await.unwrap();
    let second = generate(&folder, &config).await.unwrap();
    assert_eq!(first.stats.total_pages, second.stats.total_pages);
    assert_eq!(page_headers(&second.output_path).len(), 3);
}

#[tokio::test]
async fn test_inspect_runs_nothing_and_writes_nothing() {
    let (_root, folder) = submission("hw8", 3).await;
    std::fs::write(folder.join("Main.java"), "class Main {}\n").unwrap();
    std::fs::write(folder.join("util.cpp"), "int main() {}\n").unwrap();

    let summary = inspect(&folder).await.unwrap();
    assert_eq!(summary.cover_pages, 3);
    let files: Vec<_> = summary
        .files
        .iter()
        .map(|e| (e.file_name.as_str(), e.language))
        .collect();
    assert_eq!(files, vec![("Main.java", Language::Java), ("util.cpp", Language::Cpp)]);
    assert!(!folder.join("submission.pdf").exists());
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for RecordingCallback {
    fn on_generation_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }
    fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("file {index}/{total} {file_name}"));
    }
    fn on_file_complete(&self, index: usize, _total: usize, _file_name: &str, outcome: OutcomeKind) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {index} {outcome:?}"));
    }
    fn on_generation_complete(&self, total_files: usize, succeeded: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {succeeded}/{total_files}"));
    }
}

#[tokio::test]
async fn test_progress_callback_sees_every_file() {
    let (_root, folder) = submission("hw9", 1).await;
    std::fs::write(folder.join("a.py"), "print(1)\n").unwrap();
    std::fs::write(folder.join("b.py"), "raise SystemExit(3)\n").unwrap();

    let exec = FakeExecutor::new(|cmd| {
        if cmd.args.iter().any(|a| a.ends_with("b.py")) {
            Ok(ProcessOutput {
                exit_code: Some(3),
                ..ProcessOutput::default()
            })
        } else {
            Ok(stdout("1\n"))
        }
    });
    let recorder = Arc::new(RecordingCallback::default());
    let config = GeneratorConfig::builder()
        .executor(exec)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    generate(&folder, &config).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start 2",
            "file 1/2 a.py",
            "done 1 Success",
            "file 2/2 b.py",
            "done 2 Failure",
            "complete 1/2",
        ]
    );
}

/// Records whether the output file exists when the run reports completion.
struct OutputWatcher {
    path: PathBuf,
    existed: Mutex<Option<bool>>,
}

impl GenerationProgressCallback for OutputWatcher {
    fn on_generation_complete(&self, _total_files: usize, _succeeded: usize) {
        *self.existed.lock().unwrap() = Some(self.path.exists());
    }
}

#[tokio::test]
async fn test_completion_is_reported_after_output_is_written() {
    let (_root, folder) = submission("hw9b", 1).await;
    std::fs::write(folder.join("a.py"), "print(1)\n").unwrap();

    let watcher = Arc::new(OutputWatcher {
        path: folder.join("submission.pdf"),
        existed: Mutex::new(None),
    });
    let config = GeneratorConfig::builder()
        .executor(FakeExecutor::echo_file_name())
        .progress_callback(watcher.clone())
        .build()
        .unwrap();
    generate(&folder, &config).await.unwrap();

    assert_eq!(*watcher.existed.lock().unwrap(), Some(true));
}

#[test]
fn test_generate_sync() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (_root, folder) = rt.block_on(submission("hw10", 1));
    drop(rt);
    std::fs::write(folder.join("main.ts"), "console.log(1)\n").unwrap();

    let output = generate_sync(&folder, &config_with(FakeExecutor::echo_file_name())).unwrap();
    assert_eq!(output.stats.total_pages, 3);
}

// ── Real toolchain ───────────────────────────────────────────────────────────

fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_real_python_run() {
    if !python3_available() {
        println!("SKIP: python3 not on PATH");
        return;
    }
    let (_root, folder) = submission("py1", 1).await;
    std::fs::write(folder.join("ok.py"), "print('hello from python')\n").unwrap();
    std::fs::write(
        folder.join("bad.py"),
        "import sys\nsys.stderr.write('boom\\n')\nsys.exit(2)\n",
    )
    .unwrap();

    let output = generate(&folder, &GeneratorConfig::default()).await.unwrap();
    let texts = page_texts(&output.output_path);

    // bad.py sorts first: cover, bad code, bad output, ok code, ok output.
    assert_eq!(texts[2][1], "Error: boom");
    assert_eq!(texts[4][1], "hello from python");
    assert_eq!(output.stats.succeeded, 1);
    assert_eq!(output.stats.failed, 1);
}
