//! Fake toolchain used by unit tests.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::render::{Compiler, Invocation, Rasterizer};

/// Bytes written by [`FakeRasterizer`].
pub(crate) const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image";

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    /// Succeed for the given number of calls, then fail.
    FailAfter(usize),
    Missing,
}

#[derive(Default)]
struct Calls {
    count: usize,
    sources: Vec<String>,
}

/// Compiler that writes placeholder DVI and log files.
#[derive(Clone)]
pub(crate) struct FakeCompiler {
    behavior: Behavior,
    calls: Arc<Mutex<Calls>>,
}

impl FakeCompiler {
    pub(crate) fn new() -> Self {
        Self::with(Behavior::Succeed)
    }

    /// Exits 1 after writing a log, like `latex` on an undefined command.
    pub(crate) fn failing() -> Self {
        Self::with(Behavior::Fail)
    }

    /// Compiles `successes` documents, then fails like [`failing`](Self::failing).
    pub(crate) fn failing_after(successes: usize) -> Self {
        Self::with(Behavior::FailAfter(successes))
    }

    /// Cannot be started.
    pub(crate) fn missing() -> Self {
        Self::with(Behavior::Missing)
    }

    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Arc::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().count
    }

    pub(crate) fn last_source(&self) -> Option<String> {
        self.calls.lock().unwrap().sources.last().cloned()
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, tex: &Path) -> io::Result<Invocation> {
        let source = fs::read_to_string(tex)?;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.count += 1;
            calls.sources.push(source);
            calls.count
        };

        let behavior = match self.behavior {
            Behavior::FailAfter(successes) if call <= successes => Behavior::Succeed,
            Behavior::FailAfter(_) => Behavior::Fail,
            behavior => behavior,
        };

        match behavior {
            Behavior::Succeed => {
                fs::write(tex.with_extension("log"), "This is fake TeX\n")?;
                fs::write(tex.with_extension("aux"), "\\relax\n")?;
                fs::write(tex.with_extension("dvi"), b"fake dvi")?;
                Ok(Invocation::ok())
            }
            Behavior::Fail | Behavior::FailAfter(_) => {
                fs::write(
                    tex.with_extension("log"),
                    "! Undefined control sequence.\n",
                )?;
                Ok(Invocation::failed(1, "! Undefined control sequence."))
            }
            Behavior::Missing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "latex: command not found",
            )),
        }
    }
}

/// Rasterizer that writes [`PNG_BYTES`].
#[derive(Clone)]
pub(crate) struct FakeRasterizer {
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

impl FakeRasterizer {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            calls: Arc::default(),
        }
    }

    /// Exits 2 without producing an image.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Rasterizer for FakeRasterizer {
    fn rasterize(&self, dvi: &Path, png: &Path) -> io::Result<Invocation> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Ok(Invocation::failed(2, "dvipng: DVI file corrupted"));
        }
        assert!(dvi.exists(), "rasterizer ran without a DVI file");
        fs::write(png, PNG_BYTES)?;
        Ok(Invocation::ok())
    }
}
