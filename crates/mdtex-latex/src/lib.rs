//! LaTeX snippet rendering for Markdown documents.
//!
//! This crate finds LaTeX snippets embedded in Markdown text and replaces
//! each one with an inline PNG image:
//! - `%...%` marks a text-mode snippet, `$...$` a math-mode snippet
//! - `%%...%%` marks a fragment appended to the document preamble
//! - Snippets are rendered through `latex` and `dvipng`
//! - Rendered images are cached by normalized snippet content
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - [`scanner`]: Snippet and preamble fragment extraction
//! - [`key`]: Cache key normalization
//! - [`preamble`]: Standalone document synthesis
//! - [`render`]: Compile and rasterize pipeline with pluggable tools
//! - [`toolchain`]: `latex` and `dvipng` command wrappers
//! - [`markup`]: Inline `<img>` markup
//! - [`processor`]: `TexPreprocessor` tying it all together
//!
//! # Example
//!
//! ```ignore
//! use mdtex_cache::{ContentCache, FileStore};
//! use mdtex_latex::{DvipngRasterizer, LatexCompiler, RenderPipeline, TexContext, TexPreprocessor};
//! use mdtex_renderer::MarkdownPipeline;
//!
//! let cache = ContentCache::load(Box::new(FileStore::new("latex.cache")));
//! let render = RenderPipeline::new(LatexCompiler::default(), DvipngRasterizer::default());
//! let mut pipeline = MarkdownPipeline::new()
//!     .with_preprocessor(TexPreprocessor::new(TexContext::new(cache), render));
//!
//! let html = pipeline.render_markdown("Euler: $e^{i\\pi} + 1 = 0$")?;
//! ```

mod consts;
pub mod key;
pub mod markup;
pub mod preamble;
pub mod processor;
pub mod render;
pub mod scanner;
#[cfg(test)]
mod testing;
pub mod toolchain;

pub use consts::{CORE_PACKAGES, DEFAULT_DOCUMENT_CLASS, DEFAULT_MAGNIFICATION, STAGE_NAME};
pub use key::CacheKey;
pub use markup::image_tag;
pub use preamble::Preamble;
pub use processor::{ProcessError, RunStats, TexContext, TexPreprocessor};
pub use render::{Compiler, Invocation, Rasterizer, RenderError, RenderPipeline, Stage};
pub use scanner::{Mode, Scanner, Snippet, extract_preamble, scan};
pub use toolchain::{DvipngRasterizer, LatexCompiler};
