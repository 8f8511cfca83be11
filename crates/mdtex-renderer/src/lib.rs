//! Markdown pipeline with pluggable line preprocessors.
//!
//! This crate provides a [`MarkdownPipeline`] that runs registered
//! [`Preprocessor`] stages over the raw document before block-level parsing
//! with pulldown-cmark.
//!
//! Preprocessing happens on whole lines so that constructs spanning block
//! boundaries (multi-line math, for instance) reach a stage intact.
//!
//! # Example
//!
//! ```
//! use mdtex_renderer::MarkdownPipeline;
//!
//! let mut pipeline = MarkdownPipeline::new().with_gfm(false);
//! let html = pipeline.render_markdown("*emphasis*").unwrap();
//! assert_eq!(html, "<p><em>emphasis</em></p>\n");
//! ```

mod pipeline;
mod preprocessor;

pub use pipeline::{MarkdownPipeline, PipelineError};
pub use preprocessor::{Preprocessor, StageError};
