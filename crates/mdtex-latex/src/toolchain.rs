//! Command-line toolchain: `latex` and `dvipng`.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::consts::DEFAULT_MAGNIFICATION;
use crate::render::{Compiler, Invocation, Rasterizer};

/// [`Compiler`] that runs a `latex`-compatible command producing DVI output.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
}

impl LatexCompiler {
    /// Create a compiler running `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, tex: &Path) -> Command {
        let out_dir = tex.parent().unwrap_or(Path::new("."));

        let mut cmd = Command::new(&self.program);
        cmd.arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(format!("-output-directory={}", out_dir.display()))
            .arg(tex)
            .current_dir(out_dir)
            .stdin(Stdio::null());
        cmd
    }
}

impl Default for LatexCompiler {
    fn default() -> Self {
        Self::new("latex")
    }
}

impl Compiler for LatexCompiler {
    fn compile(&self, tex: &Path) -> io::Result<Invocation> {
        tracing::debug!(program = %self.program, tex = %tex.display(), "compiling snippet");
        self.command(tex).output().map(Invocation::from)
    }
}

/// [`Rasterizer`] that runs `dvipng` with a tight bounding box and a
/// transparent background.
#[derive(Debug, Clone)]
pub struct DvipngRasterizer {
    program: String,
    magnification: u32,
}

impl DvipngRasterizer {
    /// Create a rasterizer running `program` at `magnification`.
    #[must_use]
    pub fn new(program: impl Into<String>, magnification: u32) -> Self {
        Self {
            program: program.into(),
            magnification,
        }
    }

    fn command(&self, dvi: &Path, png: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-q", "-T", "tight", "-z", "9", "-bg", "Transparent"])
            .arg("-x")
            .arg(self.magnification.to_string())
            .arg(dvi)
            .arg("-o")
            .arg(png)
            .stdin(Stdio::null());
        cmd
    }
}

impl Default for DvipngRasterizer {
    fn default() -> Self {
        Self::new("dvipng", DEFAULT_MAGNIFICATION)
    }
}

impl Rasterizer for DvipngRasterizer {
    fn rasterize(&self, dvi: &Path, png: &Path) -> io::Result<Invocation> {
        tracing::debug!(program = %self.program, dvi = %dvi.display(), "rasterizing snippet");
        self.command(dvi, png).output().map(Invocation::from)
    }
}
