//! Markdown pipeline: preprocessors followed by block-level parsing.

use pulldown_cmark::{Options, Parser, html};

use crate::preprocessor::{Preprocessor, StageError};

/// Error raised when a preprocessor stage fails.
#[derive(Debug, thiserror::Error)]
#[error("preprocessor '{stage}' failed: {source}")]
pub struct PipelineError {
    /// Name of the failing stage.
    pub stage: String,
    /// Error returned by the stage.
    #[source]
    pub source: StageError,
}

/// Markdown pipeline with registered line preprocessors.
///
/// Preprocessors run in registration order on the raw document before
/// pulldown-cmark sees it. The first failing stage aborts the pipeline.
///
/// # Example
///
/// ```
/// use mdtex_renderer::MarkdownPipeline;
///
/// let mut pipeline = MarkdownPipeline::new();
/// let html = pipeline.render_markdown("# Hello\n\n**Bold** text").unwrap();
/// assert!(html.contains("<h1>Hello</h1>"));
/// ```
pub struct MarkdownPipeline {
    preprocessors: Vec<Box<dyn Preprocessor>>,
    gfm: bool,
}

impl MarkdownPipeline {
    /// Create an empty pipeline with GFM enabled by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            gfm: true,
        }
    }

    /// Register a preprocessor after the ones already registered.
    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Enable or disable GitHub Flavored Markdown extensions.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Names of registered stages, in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.preprocessors.iter().map(|p| p.name())
    }

    /// Run all preprocessors over `markdown`.
    ///
    /// The document is split on `\n` and rejoined afterwards, so a trailing
    /// newline survives the round trip.
    pub fn preprocess(&mut self, markdown: &str) -> Result<String, PipelineError> {
        let mut lines: Vec<String> = markdown.split('\n').map(str::to_owned).collect();

        for stage in &mut self.preprocessors {
            tracing::debug!(stage = stage.name(), lines = lines.len(), "running preprocessor");
            lines = stage.run(lines).map_err(|source| PipelineError {
                stage: stage.name().to_owned(),
                source,
            })?;
        }

        Ok(lines.join("\n"))
    }

    /// Preprocess `markdown` and render it to HTML.
    pub fn render_markdown(&mut self, markdown: &str) -> Result<String, PipelineError> {
        let source = self.preprocess(markdown)?;
        let parser = Parser::new_ext(&source, self.options());

        let mut output = String::with_capacity(source.len());
        html::push_html(&mut output, parser);
        Ok(output)
    }

    fn options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }
}

impl Default for MarkdownPipeline {
    fn default() -> Self {
        Self::new()
    }
}
