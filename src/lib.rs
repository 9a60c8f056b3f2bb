//! # edgequake-code2pdf
//!
//! Turn a folder of student source files into a single submission PDF.
//!
//! A submission folder `lab3/` holds a cover page `lab3/lab3.pdf` and any
//! number of programs in Python, JavaScript, TypeScript, C, C++, Java or C#.
//! The crate runs every program, then writes `lab3/submission.pdf`: the
//! cover pages first, followed by each file's source code and the output it
//! produced, all laid out as monospaced text pages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder/
//!  │
//!  ├─ 1. Input     check the folder, sniff <folderName>.pdf
//!  ├─ 2. Collect   list recognised sources, sorted by name
//!  ├─ 3. Execute   compile/run each file with a timeout (tokio::process)
//!  ├─ 4. Clean     normalise line endings, tabs, ANSI colour codes
//!  ├─ 5. Paginate  wrap long lines, cut into page-sized blocks
//!  └─ 6. Render    append header + body pages to the cover (lopdf)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_code2pdf::{generate, GeneratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeneratorConfig::builder().exec_timeout_secs(10).build()?;
//!     let output = generate("submissions/lab3", &config).await?;
//!     for file in &output.files {
//!         eprintln!("{}: {:?}", file.file_name, file.outcome);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `code2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-code2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Toolchains
//!
//! Programs are run with whatever is on `PATH`: `python3`, `node`,
//! `ts-node`, `g++`, `gcc`, `javac`/`java`, `mcs`/`mono`. Override any of
//! them through [`ToolchainConfig`]. A missing toolchain is not fatal; the
//! launch error is printed as that file's output.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod executor;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GeneratorConfig, GeneratorConfigBuilder, PageGeometry, ToolchainConfig};
pub use error::Code2PdfError;
pub use executor::{CommandSpec, ExecError, Executor, ProcessExecutor, ProcessOutput};
pub use generate::{generate, generate_sync, inspect};
pub use output::{
    FileReport, GenerationOutput, GenerationStats, OutcomeKind, SourceEntry, SubmissionSummary,
};
pub use pipeline::collect::Language;
pub use pipeline::execute::ExecutionResult;
pub use pipeline::paginate::{paginate, LayoutParams};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
