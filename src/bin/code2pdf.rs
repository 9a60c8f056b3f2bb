//! CLI binary for edgequake-code2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GeneratorConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_code2pdf::{
    generate, inspect, GenerationOutput, GenerationProgressCallback, GeneratorConfig,
    OutcomeKind, PageGeometry, ProgressCallback, ToolchainConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the file currently running.
    file_started: Mutex<Option<Instant>>,
    /// Files whose program did not run cleanly.
    problems: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_generation_start` tells us how many files there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading cover page…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_started: Mutex::new(None),
            problems: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Running");
    }

    fn take_elapsed(&self) -> f64 {
        self.file_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running {total_files} source file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file_name: &str) {
        if let Ok(mut started) = self.file_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(file_name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, file_name: &str, outcome: OutcomeKind) {
        let elapsed = self.take_elapsed();
        let (mark, label) = match outcome {
            OutcomeKind::Success => (green("✓"), dim("ok")),
            OutcomeKind::Failure => (red("✗"), red("error")),
            OutcomeKind::TimedOut => (red("✗"), red("timed out")),
            OutcomeKind::Unsupported => (yellow("?"), yellow("unsupported")),
        };
        if outcome != OutcomeKind::Success {
            self.problems.fetch_add(1, Ordering::SeqCst);
        }

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<28}  {:<12}  {}",
            mark,
            index,
            total,
            file_name,
            label,
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_files: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let problems = self.problems.load(Ordering::SeqCst);

        if problems == 0 {
            eprintln!(
                "{} {} program(s) ran cleanly",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} program(s) ran cleanly  ({} with errors, see their output pages)",
                cyan("⚠"),
                bold(&succeeded.to_string()),
                total_files,
                red(&problems.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build lab3/submission.pdf from lab3/lab3.pdf and the sources next to it
  code2pdf lab3

  # Give slow programs more time
  code2pdf --timeout 120 lab3

  # Smaller text, A4 page
  code2pdf --page-width 595 --page-height 842 --font-size 8 --line-height 10 lab3

  # Use a specific interpreter
  code2pdf --python /usr/local/bin/python3.12 lab3

  # Show what would be included, without running anything
  code2pdf --inspect-only lab3

  # Machine-readable report
  code2pdf --json lab3 > report.json

FOLDER LAYOUT:
  lab3/
  ├── lab3.pdf        cover page (required, named after the folder)
  ├── main.py         ┐
  ├── util.cpp        │ source files, processed in name order
  └── Main.java       ┘
  Output: lab3/submission.pdf (cover, then code and program output per file)

SUPPORTED LANGUAGES:
  Extension  Toolchain
  ─────────  ────────────────────────────
  .py        python3
  .js        node
  .ts        ts-node
  .cpp       g++, then the compiled binary
  .c         gcc, then the compiled binary
  .java      javac, then java
  .cs        mcs, then mono

ENVIRONMENT VARIABLES:
  Every flag can be set with a CODE2PDF_* variable, e.g. CODE2PDF_TIMEOUT=60.
  RUST_LOG overrides the log filter (e.g. RUST_LOG=edgequake_code2pdf=debug).
"#;

/// Bundle a folder of source files, their output and a cover page into one PDF.
#[derive(Parser, Debug)]
#[command(
    name = "code2pdf",
    version,
    about = "Bundle source files, their program output and a cover page into one PDF",
    long_about = "Run every Python, JavaScript, TypeScript, C, C++, Java and C# file in a \
submission folder and write <folder>/submission.pdf: the folder's cover page \
(<folder>/<folderName>.pdf) followed by each file's source code and the output it printed.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Submission folder containing <folderName>.pdf and the source files.
    folder: PathBuf,

    /// Per-command timeout in seconds (compile and run are timed separately).
    #[arg(long, env = "CODE2PDF_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Bytes of stdout and of stderr kept per program; the rest is dropped.
    #[arg(long, env = "CODE2PDF_MAX_OUTPUT_BYTES", default_value_t = 1024 * 1024,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_output_bytes: u64,

    /// Output file name, written inside the folder.
    #[arg(long, env = "CODE2PDF_OUTPUT_NAME", default_value = "submission.pdf")]
    output_name: String,

    /// Page width in points.
    #[arg(long, env = "CODE2PDF_PAGE_WIDTH", default_value_t = 600.0)]
    page_width: f32,

    /// Page height in points.
    #[arg(long, env = "CODE2PDF_PAGE_HEIGHT", default_value_t = 800.0)]
    page_height: f32,

    /// Margin on every side, in points.
    #[arg(long, env = "CODE2PDF_MARGIN", default_value_t = 50.0)]
    margin: f32,

    /// Font size for headers and body text.
    #[arg(long, env = "CODE2PDF_FONT_SIZE", default_value_t = 10.0)]
    font_size: f32,

    /// Distance between baselines, in points.
    #[arg(long, env = "CODE2PDF_LINE_HEIGHT", default_value_t = 12.0)]
    line_height: f32,

    /// Python interpreter.
    #[arg(long, env = "CODE2PDF_PYTHON")]
    python: Option<String>,

    /// Node.js binary.
    #[arg(long, env = "CODE2PDF_NODE")]
    node: Option<String>,

    /// ts-node binary.
    #[arg(long, env = "CODE2PDF_TS_NODE")]
    ts_node: Option<String>,

    /// C++ compiler.
    #[arg(long, env = "CODE2PDF_CXX")]
    cxx: Option<String>,

    /// C compiler.
    #[arg(long, env = "CODE2PDF_CC")]
    cc: Option<String>,

    /// Java compiler.
    #[arg(long, env = "CODE2PDF_JAVAC")]
    javac: Option<String>,

    /// Java launcher.
    #[arg(long, env = "CODE2PDF_JAVA")]
    java: Option<String>,

    /// C# compiler.
    #[arg(long, env = "CODE2PDF_MCS")]
    mcs: Option<String>,

    /// Mono runtime.
    #[arg(long, env = "CODE2PDF_MONO")]
    mono: Option<String>,

    /// Print a JSON report (GenerationOutput, or the inspection summary) to stdout.
    #[arg(long, env = "CODE2PDF_JSON")]
    json: bool,

    /// List cover pages and source files only; run nothing, write nothing.
    #[arg(long, env = "CODE2PDF_INSPECT_ONLY")]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "CODE2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CODE2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CODE2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.folder)
            .await
            .context("Failed to inspect submission folder")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("Folder:       {}", summary.folder.display());
            println!("Cover:        {}", summary.cover_path.display());
            println!("Cover pages:  {}", summary.cover_pages);
            println!("Files:        {}", summary.files.len());
            for entry in &summary.files {
                println!("  {:<28} {}", entry.file_name, entry.language);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate(&cli.folder, &config)
        .await
        .context("Failed to generate submission PDF")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        if !show_progress {
            print_file_table(&output);
        }
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `GeneratorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GeneratorConfig> {
    let geometry = PageGeometry {
        width: cli.page_width,
        height: cli.page_height,
        margin: cli.margin,
        font_size: cli.font_size,
        line_height: cli.line_height,
        header_font_size: cli.font_size,
    };

    let mut builder = GeneratorConfig::builder()
        .geometry(geometry)
        .toolchain(build_toolchain(cli))
        .exec_timeout_secs(cli.timeout)
        .max_output_bytes(usize::try_from(cli.max_output_bytes).unwrap_or(usize::MAX))
        .output_name(cli.output_name.clone());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Defaults, with any `--<tool>` override applied.
fn build_toolchain(cli: &Cli) -> ToolchainConfig {
    let mut toolchain = ToolchainConfig::default();
    let overrides = [
        (&cli.python, &mut toolchain.python),
        (&cli.node, &mut toolchain.node),
        (&cli.ts_node, &mut toolchain.ts_node),
        (&cli.cxx, &mut toolchain.cxx),
        (&cli.cc, &mut toolchain.cc),
        (&cli.javac, &mut toolchain.javac),
        (&cli.java, &mut toolchain.java),
        (&cli.mcs, &mut toolchain.mcs),
        (&cli.mono, &mut toolchain.mono),
    ];
    for (flag, slot) in overrides {
        if let Some(program) = flag {
            *slot = program.clone();
        }
    }
    toolchain
}

fn print_file_table(output: &GenerationOutput) {
    for file in &output.files {
        let label = match file.outcome {
            OutcomeKind::Success => green("ok"),
            OutcomeKind::Failure => red("error"),
            OutcomeKind::TimedOut => red("timed out"),
            OutcomeKind::Unsupported => yellow("unsupported"),
        };
        eprintln!(
            "  {:<28}  {:<12}  {} code / {} output page(s)",
            file.file_name, label, file.code_pages, file.output_pages
        );
        if let Some(ref err) = file.source_error {
            eprintln!("    {}", yellow(err));
        }
    }
}

fn print_summary(output: &GenerationOutput) {
    let stats = &output.stats;
    let clean = stats.failed + stats.timed_out + stats.unreadable == 0;
    eprintln!(
        "{}  {} pages ({} cover)  {}/{} programs ok  {}ms  →  {}",
        if clean { green("✔") } else { cyan("⚠") },
        stats.total_pages,
        stats.cover_pages,
        stats.succeeded,
        stats.total_files,
        stats.total_duration_ms,
        bold(&output.output_path.display().to_string()),
    );
}
