//! Configuration types for submission PDF generation.
//!
//! All generation behaviour is controlled through [`GeneratorConfig`], built
//! via its [`GeneratorConfigBuilder`]. Page geometry and toolchain program
//! names live in their own serialisable sub-structs so a run's settings can
//! be logged or diffed as a whole.

use crate::error::Code2PdfError;
use crate::executor::{Executor, DEFAULT_MAX_OUTPUT_BYTES};
use crate::pipeline::paginate::{LayoutParams, CHAR_WIDTH_RATIO};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default output file name, written inside the submission folder.
pub const DEFAULT_OUTPUT_NAME: &str = "submission.pdf";

/// Lines of every page taken up by the running header and the blank line
/// below it.
pub const HEADER_LINES: usize = 2;

/// Physical page layout, in PDF points.
///
/// Defaults reproduce the classic 600 × 800 submission page with a 50 pt
/// margin and 10 pt monospaced text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Body font size.
    pub font_size: f32,
    /// Baseline-to-baseline distance for body and header lines.
    pub line_height: f32,
    /// Header font size.
    pub header_font_size: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 800.0,
            margin: 50.0,
            font_size: 10.0,
            line_height: 12.0,
            header_font_size: 10.0,
        }
    }
}

impl PageGeometry {
    /// Page width minus both margins.
    pub fn effective_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Body lines that fit below the header. Zero means the geometry is
    /// unusable; [`GeneratorConfigBuilder::build`] rejects it.
    pub fn max_lines_per_page(&self) -> usize {
        if self.line_height <= 0.0 {
            return 0;
        }
        let usable = (self.height - 2.0 * self.margin).max(0.0);
        let total = (usable / self.line_height).floor() as usize;
        total.saturating_sub(HEADER_LINES)
    }

    /// Characters of body text that fit on one line.
    pub fn chars_per_line(&self) -> usize {
        self.layout_params().chars_per_line()
    }

    /// Characters of header text that fit on one line.
    pub fn header_chars_per_line(&self) -> usize {
        (self.effective_width() / (self.header_font_size * CHAR_WIDTH_RATIO) + 1e-4).floor() as usize
    }

    /// Inputs for the pagination engine.
    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            max_lines_per_page: self.max_lines_per_page(),
            page_width: self.width,
            font_size: self.font_size,
            margin: self.margin,
        }
    }

    fn validate(&self) -> Result<(), Code2PdfError> {
        let positive = [
            ("page width", self.width),
            ("page height", self.height),
            ("font size", self.font_size),
            ("line height", self.line_height),
            ("header font size", self.header_font_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Code2PdfError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(Code2PdfError::InvalidConfig(format!(
                "margin must be ≥ 0, got {}",
                self.margin
            )));
        }
        if self.effective_width() <= 0.0 {
            return Err(Code2PdfError::InvalidConfig(format!(
                "margins ({} pt each) leave no room on a {} pt wide page",
                self.margin, self.width
            )));
        }
        if self.chars_per_line() == 0 {
            return Err(Code2PdfError::InvalidConfig(format!(
                "font size {} is too large for a {} pt text column",
                self.font_size,
                self.effective_width()
            )));
        }
        if self.max_lines_per_page() == 0 {
            return Err(Code2PdfError::InvalidConfig(format!(
                "page height {} with margin {} and line height {} leaves no room for body text \
                 (max lines per page must be ≥ 1)",
                self.height, self.margin, self.line_height
            )));
        }
        Ok(())
    }
}

/// Names of the external toolchain binaries, resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    pub python: String,
    pub node: String,
    pub ts_node: String,
    pub cxx: String,
    pub cc: String,
    pub javac: String,
    pub java: String,
    pub mcs: String,
    pub mono: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        let python = if cfg!(windows) { "python" } else { "python3" };
        Self {
            python: python.into(),
            node: "node".into(),
            ts_node: "ts-node".into(),
            cxx: "g++".into(),
            cc: "gcc".into(),
            javac: "javac".into(),
            java: "java".into(),
            mcs: "mcs".into(),
            mono: "mono".into(),
        }
    }
}

/// Configuration for one generation run.
///
/// Built via [`GeneratorConfig::builder()`] or using
/// [`GeneratorConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_code2pdf::GeneratorConfig;
///
/// let config = GeneratorConfig::builder()
///     .font_size(9.0)
///     .exec_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert!(config.geometry.max_lines_per_page() > 50);
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Page layout shared by code and output pages.
    pub geometry: PageGeometry,

    /// Toolchain binaries used by the dispatcher.
    pub toolchain: ToolchainConfig,

    /// Per-command timeout in seconds. Default: 30.
    ///
    /// Applies to each step separately, so a compile-then-run language gets
    /// this budget for compiling and again for running.
    pub exec_timeout_secs: u64,

    /// File name of the generated PDF inside the submission folder.
    /// Default: `submission.pdf`.
    pub output_name: String,

    /// Cap on the bytes kept from each of a program's stdout and stderr.
    /// Anything past it is discarded and the page notes the truncation.
    /// Only used by the default executor. Default: 1 MiB.
    pub max_output_bytes: usize,

    /// Pre-constructed executor. `None` uses [`crate::executor::ProcessExecutor`].
    pub executor: Option<Arc<dyn Executor>>,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            toolchain: ToolchainConfig::default(),
            exec_timeout_secs: 30,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            executor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("geometry", &self.geometry)
            .field("toolchain", &self.toolchain)
            .field("exec_timeout_secs", &self.exec_timeout_secs)
            .field("output_name", &self.output_name)
            .field("max_output_bytes", &self.max_output_bytes)
            .field("executor", &self.executor.as_ref().map(|_| "<dyn Executor>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.config.geometry.width = width;
        self.config.geometry.height = height;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.config.geometry.margin = margin;
        self
    }

    /// Sets the body and header font size together.
    pub fn font_size(mut self, size: f32) -> Self {
        self.config.geometry.font_size = size;
        self.config.geometry.header_font_size = size;
        self
    }

    pub fn line_height(mut self, height: f32) -> Self {
        self.config.geometry.line_height = height;
        self
    }

    pub fn toolchain(mut self, toolchain: ToolchainConfig) -> Self {
        self.config.toolchain = toolchain;
        self
    }

    pub fn exec_timeout_secs(mut self, secs: u64) -> Self {
        self.config.exec_timeout_secs = secs;
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = name.into();
        self
    }

    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.config.max_output_bytes = bytes;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.config.executor = Some(executor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, Code2PdfError> {
        let c = &self.config;
        c.geometry.validate()?;
        if c.exec_timeout_secs == 0 {
            return Err(Code2PdfError::InvalidConfig(
                "Execution timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_output_bytes == 0 {
            return Err(Code2PdfError::InvalidConfig(
                "Output capture limit must be ≥ 1 byte".into(),
            ));
        }
        let name = c.output_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Code2PdfError::InvalidConfig(format!(
                "Output name must be a plain file name, got '{}'",
                c.output_name
            )));
        }
        Ok(self.config)
    }
}
