//! Snippet rendering through an external compile and rasterize toolchain.
//!
//! [`RenderPipeline`] writes the synthesized document to a temporary `.tex`
//! file, runs a [`Compiler`] to produce `<stem>.dvi` next to it, runs a
//! [`Rasterizer`] to turn the DVI into `<stem>.png`, and returns the PNG as
//! Base64. Intermediate files are removed when the render finishes; on failure
//! the compiler log is kept for inspection and its path is reported.

use std::fmt;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Instant;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use crate::preamble::Preamble;
use crate::scanner::Mode;

/// Toolchain stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// LaTeX source to DVI.
    Compile,
    /// DVI to PNG.
    Rasterize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Rasterize => "rasterize",
        })
    }
}

/// Outcome of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Exit code, if the tool exited normally.
    pub code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl Invocation {
    /// Successful invocation with no output.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            output: String::new(),
        }
    }

    /// Failed invocation with the given exit code and output.
    #[must_use]
    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }
}

impl From<Output> for Invocation {
    fn from(output: Output) -> Self {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Self {
            success: output.status.success(),
            code: output.status.code(),
            output: text,
        }
    }
}

/// Compiles a LaTeX source file.
///
/// On success the compiler must leave `tex.with_extension("dvi")` on disk.
/// A `tex.with_extension("log")` diagnostic log is optional.
pub trait Compiler {
    /// Compile `tex`. Blocks until the tool exits.
    fn compile(&self, tex: &Path) -> io::Result<Invocation>;
}

/// Converts a compiled DVI file to a PNG image.
pub trait Rasterizer {
    /// Rasterize `dvi` into `png`. Blocks until the tool exits.
    fn rasterize(&self, dvi: &Path, png: &Path) -> io::Result<Invocation>;
}

/// Snippet rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Temporary files could not be written or the image could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The external tool could not be started.
    #[error("{stage} step could not start: {source}")]
    Spawn {
        /// Failing stage.
        stage: Stage,
        /// Spawn error.
        #[source]
        source: io::Error,
    },
    /// The external tool exited unsuccessfully.
    #[error("{stage} step failed ({}){}", exit_label(.code.as_ref()), log_label(.log.as_deref()))]
    Failed {
        /// Failing stage.
        stage: Stage,
        /// Exit code, if any.
        code: Option<i32>,
        /// Retained diagnostic log.
        log: Option<PathBuf>,
        /// Captured tool output.
        output: String,
    },
}

impl RenderError {
    /// Stage that failed, if the error came from the toolchain.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Io(_) => None,
            Self::Spawn { stage, .. } | Self::Failed { stage, .. } => Some(*stage),
        }
    }
}

fn exit_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_owned(), |c| format!("exit {c}"))
}

fn log_label(log: Option<&Path>) -> String {
    log.map(|p| format!(", see {}", p.display()))
        .unwrap_or_default()
}

/// Renders snippets to Base64-encoded PNG images.
///
/// # Example
///
/// ```ignore
/// use mdtex_latex::{DvipngRasterizer, LatexCompiler, Mode, Preamble, RenderPipeline};
///
/// let pipeline = RenderPipeline::new(LatexCompiler::default(), DvipngRasterizer::default());
/// let png_base64 = pipeline.render("x^2", Mode::Math, &Preamble::default())?;
/// ```
pub struct RenderPipeline {
    compiler: Box<dyn Compiler>,
    rasterizer: Box<dyn Rasterizer>,
    work_dir: PathBuf,
}

impl RenderPipeline {
    /// Create a pipeline that renders in the system temporary directory.
    #[must_use]
    pub fn new(compiler: impl Compiler + 'static, rasterizer: impl Rasterizer + 'static) -> Self {
        Self {
            compiler: Box::new(compiler),
            rasterizer: Box::new(rasterizer),
            work_dir: std::env::temp_dir(),
        }
    }

    /// Set the directory for temporary render files and retained logs.
    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Render a snippet and return the PNG encoded as Base64.
    pub fn render(
        &self,
        content: &str,
        mode: Mode,
        preamble: &Preamble,
    ) -> Result<String, RenderError> {
        let started_at = Instant::now();
        let document = preamble.document(content, mode);

        let mut tex = tempfile::Builder::new()
            .prefix("mdtex-")
            .suffix(".tex")
            .tempfile_in(&self.work_dir)?;
        tex.write_all(document.as_bytes())?;
        tex.flush()?;

        let mut artifacts = Artifacts::for_source(tex.path());

        let compiled = self
            .compiler
            .compile(tex.path())
            .map_err(|source| artifacts.spawn_failure(Stage::Compile, source))?;
        if !compiled.success {
            return Err(artifacts.stage_failure(Stage::Compile, compiled));
        }

        let rasterized = self
            .rasterizer
            .rasterize(&artifacts.dvi, &artifacts.png)
            .map_err(|source| artifacts.spawn_failure(Stage::Rasterize, source))?;
        if !rasterized.success {
            return Err(artifacts.stage_failure(Stage::Rasterize, rasterized));
        }

        let png = fs::read(&artifacts.png)?;
        tracing::info!(
            %mode,
            png_bytes = png.len(),
            elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "rendered snippet"
        );
        Ok(BASE64_STANDARD.encode(png))
    }
}

/// Files derived from the temporary `.tex` source.
///
/// Removed on drop. The log survives when [`keep_log`](Self::keep_log) is set.
struct Artifacts {
    dvi: PathBuf,
    png: PathBuf,
    aux: PathBuf,
    log: PathBuf,
    keep_log: bool,
}

impl Artifacts {
    fn for_source(tex: &Path) -> Self {
        Self {
            dvi: tex.with_extension("dvi"),
            png: tex.with_extension("png"),
            aux: tex.with_extension("aux"),
            log: tex.with_extension("log"),
            keep_log: false,
        }
    }

    /// Keep the log (if one was written) and return its path.
    fn retain_log(&mut self) -> Option<PathBuf> {
        if self.log.exists() {
            self.keep_log = true;
            Some(self.log.clone())
        } else {
            None
        }
    }

    fn spawn_failure(&mut self, stage: Stage, source: io::Error) -> RenderError {
        tracing::warn!(%stage, "failed to start toolchain: {source}");
        self.retain_log();
        RenderError::Spawn { stage, source }
    }

    fn stage_failure(&mut self, stage: Stage, invocation: Invocation) -> RenderError {
        let log = self.retain_log();
        tracing::warn!(
            %stage,
            code = ?invocation.code,
            log = ?log,
            "toolchain step failed"
        );
        RenderError::Failed {
            stage,
            code: invocation.code,
            log,
            output: invocation.output,
        }
    }
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        let mut paths = vec![&self.dvi, &self.png, &self.aux];
        if !self.keep_log {
            paths.push(&self.log);
        }
        for path in paths {
            if let Err(e) = fs::remove_file(path)
                && e.kind() != ErrorKind::NotFound
            {
                tracing::warn!(path = %path.display(), "failed to remove render artifact: {e}");
            }
        }
    }
}
