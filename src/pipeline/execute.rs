//! Command dispatch: run one source file and capture what it printed.
//!
//! ## Language table
//!
//! | Extension | Steps |
//! |-----------|-------|
//! | `.py`   | `python3 <file>` |
//! | `.js`   | `node <file>` |
//! | `.ts`   | `ts-node <file>` |
//! | `.cpp`  | `g++ <file> -o <tmp>/program`, then `<tmp>/program` |
//! | `.c`    | `gcc <file> -o <tmp>/program`, then `<tmp>/program` |
//! | `.java` | `javac -d <tmp> -sourcepath <dir> <file>`, then `java -cp <tmp> <Class>` |
//! | `.cs`   | `mcs -out:<tmp>/program.exe <file>`, then `mono <tmp>/program.exe` |
//!
//! Program names come from [`ToolchainConfig`]. Every step runs with the
//! source file's folder as working directory. Compiled artefacts go to a
//! fresh [`TempDir`] so the submission folder is never written to; the
//! directory is removed whether the steps succeed, fail or time out.
//!
//! Nothing in here returns an error: every way a file can fail to run ends
//! up as an [`ExecutionResult`] that is printed into the PDF.

use crate::config::ToolchainConfig;
use crate::executor::{CommandSpec, ExecError, Executor, ProcessOutput};
use crate::output::OutcomeKind;
use crate::pipeline::collect::Language;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Text printed for a file whose extension has no command.
pub const UNSUPPORTED_TEXT: &str = "Unsupported language.";

/// Text printed when a program succeeds without writing to stdout.
pub const NO_OUTPUT_TEXT: &str = "No output";

/// Outcome of running one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Every step exited with status 0.
    Success { stdout: String },
    /// A step could not start, or exited non-zero. `message` is the
    /// diagnostic shown to the reader (usually the step's stderr).
    Failure { message: String },
    /// A step exceeded the timeout and was killed.
    TimedOut { secs: u64 },
    /// The extension is not in the language table.
    Unsupported,
}

impl ExecutionResult {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ExecutionResult::Success { .. } => OutcomeKind::Success,
            ExecutionResult::Failure { .. } => OutcomeKind::Failure,
            ExecutionResult::TimedOut { .. } => OutcomeKind::TimedOut,
            ExecutionResult::Unsupported => OutcomeKind::Unsupported,
        }
    }

    /// The text rendered on the file's "Program Output" pages.
    pub fn display_text(&self) -> String {
        match self {
            ExecutionResult::Success { stdout } if stdout.is_empty() => {
                NO_OUTPUT_TEXT.to_string()
            }
            ExecutionResult::Success { stdout } => stdout.clone(),
            ExecutionResult::Failure { message } => format!("Error: {message}"),
            ExecutionResult::TimedOut { secs } => {
                format!("Error: execution timed out after {secs}s")
            }
            ExecutionResult::Unsupported => UNSUPPORTED_TEXT.to_string(),
        }
    }
}

/// The commands needed to run one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Run before `run`; a non-zero exit skips `run`.
    pub compile: Option<CommandSpec>,
    pub run: CommandSpec,
}

/// Build the plan for `file`. `build_dir` receives compiled artefacts and
/// is only used by compiled languages.
pub fn plan_for(
    language: Language,
    file: &Path,
    build_dir: &Path,
    toolchain: &ToolchainConfig,
) -> ExecutionPlan {
    let source = file.to_string_lossy().into_owned();
    let dir = file
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());
    let build = build_dir.to_string_lossy().into_owned();
    let native_binary = build_dir
        .join(format!("program{}", std::env::consts::EXE_SUFFIX))
        .to_string_lossy()
        .into_owned();

    match language {
        Language::Python => ExecutionPlan {
            compile: None,
            run: CommandSpec::new(&toolchain.python).arg(source),
        },
        Language::JavaScript => ExecutionPlan {
            compile: None,
            run: CommandSpec::new(&toolchain.node).arg(source),
        },
        Language::TypeScript => ExecutionPlan {
            compile: None,
            run: CommandSpec::new(&toolchain.ts_node).arg(source),
        },
        Language::Cpp => ExecutionPlan {
            compile: Some(CommandSpec::new(&toolchain.cxx).args([
                source,
                "-o".to_string(),
                native_binary.clone(),
            ])),
            run: CommandSpec::new(native_binary),
        },
        Language::C => ExecutionPlan {
            compile: Some(CommandSpec::new(&toolchain.cc).args([
                source,
                "-o".to_string(),
                native_binary.clone(),
            ])),
            run: CommandSpec::new(native_binary),
        },
        Language::Java => {
            let class_name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            ExecutionPlan {
                compile: Some(CommandSpec::new(&toolchain.javac).args([
                    "-d".to_string(),
                    build.clone(),
                    "-sourcepath".to_string(),
                    dir,
                    source,
                ])),
                run: CommandSpec::new(&toolchain.java).args(["-cp".to_string(), build, class_name]),
            }
        }
        Language::CSharp => {
            let assembly = build_dir.join("program.exe").to_string_lossy().into_owned();
            ExecutionPlan {
                compile: Some(
                    CommandSpec::new(&toolchain.mcs).args([format!("-out:{assembly}"), source]),
                ),
                run: CommandSpec::new(&toolchain.mono).arg(assembly),
            }
        }
    }
}

/// Run `file` through its toolchain and classify the result.
///
/// Unsupported extensions return [`ExecutionResult::Unsupported`] without
/// touching the executor.
pub async fn execute_file(
    executor: &dyn Executor,
    file: &Path,
    toolchain: &ToolchainConfig,
    timeout: Duration,
) -> ExecutionResult {
    let Some(language) = Language::from_path(file) else {
        debug!("No command for {}", file.display());
        return ExecutionResult::Unsupported;
    };
    let working_dir = working_dir_of(file);

    if !language.is_compiled() {
        let plan = plan_for(language, file, &working_dir, toolchain);
        return run_plan(executor, &plan, &working_dir, timeout).await;
    }

    let build_dir = match tempfile::Builder::new().prefix("code2pdf-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            return ExecutionResult::Failure {
                message: format!("could not create a build directory: {e}"),
            }
        }
    };

    let plan = plan_for(language, file, build_dir.path(), toolchain);
    let result = run_plan(executor, &plan, &working_dir, timeout).await;
    release_build_dir(build_dir);
    result
}

/// Remove the build directory, logging instead of failing.
fn release_build_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => debug!("Removed build directory {}", path.display()),
        Err(e) => warn!("Failed to remove build directory {}: {}", path.display(), e),
    }
}

fn working_dir_of(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn run_plan(
    executor: &dyn Executor,
    plan: &ExecutionPlan,
    working_dir: &Path,
    timeout: Duration,
) -> ExecutionResult {
    if let Some(ref compile) = plan.compile {
        match executor.run(compile, working_dir, timeout).await {
            Ok(out) if out.success() => {
                debug!("Compiled with `{}`", compile);
            }
            Ok(out) => {
                info!("Compilation failed: `{}` → {:?}", compile, out.exit_code);
                return failure_from_output(compile, &out);
            }
            Err(e) => return result_from_exec_error(e),
        }
    }

    match executor.run(&plan.run, working_dir, timeout).await {
        Ok(out) if out.success() => ExecutionResult::Success { stdout: out.stdout },
        Ok(out) => {
            info!("Program failed: `{}` → {:?}", plan.run, out.exit_code);
            failure_from_output(&plan.run, &out)
        }
        Err(e) => result_from_exec_error(e),
    }
}

fn failure_from_output(command: &CommandSpec, out: &ProcessOutput) -> ExecutionResult {
    let message = if !out.stderr.trim().is_empty() {
        out.stderr.trim_end().to_string()
    } else if !out.stdout.trim().is_empty() {
        out.stdout.trim_end().to_string()
    } else {
        match out.exit_code {
            Some(code) => format!("`{}` exited with status {}", command.program, code),
            None => format!("`{}` was terminated by a signal", command.program),
        }
    };
    ExecutionResult::Failure { message }
}

fn result_from_exec_error(e: ExecError) -> ExecutionResult {
    match e {
        ExecError::Timeout { secs, program } => {
            warn!("`{}` timed out after {}s", program, secs);
            ExecutionResult::TimedOut { secs }
        }
        other => ExecutionResult::Failure {
            message: other.to_string(),
        },
    }
}
