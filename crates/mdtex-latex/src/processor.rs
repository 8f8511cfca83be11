//! Snippet substitution engine.
//!
//! This module provides [`TexPreprocessor`], which rewrites a document by
//! replacing every LaTeX snippet with an inline image, and implements the
//! [`Preprocessor`] trait so it can be registered with a
//! [`MarkdownPipeline`](mdtex_renderer::MarkdownPipeline).

use mdtex_cache::{CacheError, ContentCache};
use mdtex_renderer::{Preprocessor, StageError};

use crate::consts::STAGE_NAME;
use crate::key::CacheKey;
use crate::markup::image_tag;
use crate::preamble::Preamble;
use crate::render::{RenderError, RenderPipeline};
use crate::scanner::{Mode, extract_preamble, scan};

/// Substitution error.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A snippet could not be rendered; the run was aborted.
    #[error("failed to render {mode} snippet '{snippet}': {source}")]
    Render {
        /// Raw snippet content.
        snippet: String,
        /// Snippet mode.
        mode: Mode,
        /// Render failure.
        #[source]
        source: RenderError,
    },
    /// Newly rendered snippets could not be persisted.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// State shared by every run of a [`TexPreprocessor`].
///
/// Owns the snippet cache (including entries waiting to be flushed) and the
/// base preamble. Preamble fragments found in a document apply to that
/// document only; each run starts again from the base preamble.
pub struct TexContext {
    cache: ContentCache,
    preamble: Preamble,
    key_includes_mode: bool,
}

impl TexContext {
    /// Create a context with the default preamble.
    #[must_use]
    pub fn new(cache: ContentCache) -> Self {
        Self {
            cache,
            preamble: Preamble::default(),
            key_includes_mode: false,
        }
    }

    /// Set the base preamble.
    #[must_use]
    pub fn with_preamble(mut self, preamble: Preamble) -> Self {
        self.preamble = preamble;
        self
    }

    /// Distinguish math-mode from text-mode snippets in cache keys.
    ///
    /// Off by default so existing cache files keep hitting.
    #[must_use]
    pub fn key_includes_mode(mut self, enabled: bool) -> Self {
        self.key_includes_mode = enabled;
        self
    }

    /// The snippet cache.
    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// The base preamble.
    #[must_use]
    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }
}

/// Counters for the most recent run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Preamble fragments harvested.
    pub fragments: usize,
    /// Snippets substituted.
    pub snippets: usize,
    /// Snippets served from the cache.
    pub cache_hits: usize,
    /// Snippets rendered through the toolchain.
    pub rendered: usize,
    /// Cache entries persisted to the store (zero when caching is disabled).
    pub flushed: usize,
}

/// Rewrites LaTeX snippets into inline images.
///
/// A run goes through the following steps:
///
/// 1. Join the lines and strip `%%...%%` preamble fragments
/// 2. Scan the remaining text for `%...%` and `$...$` snippets
/// 3. Resolve each snippet from the cache, rendering on a miss
/// 4. Emit the text between snippets followed by the image markup
/// 5. Flush newly rendered entries to the cache store
/// 6. Split the result back into lines
///
/// The first render failure aborts the run and no document is returned.
///
/// # Example
///
/// ```ignore
/// use mdtex_cache::{ContentCache, FileStore};
/// use mdtex_latex::{DvipngRasterizer, LatexCompiler, RenderPipeline, TexContext, TexPreprocessor};
///
/// let cache = ContentCache::load(Box::new(FileStore::new("latex.cache")));
/// let pipeline = RenderPipeline::new(LatexCompiler::default(), DvipngRasterizer::default());
/// let mut preprocessor = TexPreprocessor::new(TexContext::new(cache), pipeline);
///
/// let lines = preprocessor.process(&["Euler: $e^{i\\pi} + 1 = 0$".to_owned()])?;
/// ```
pub struct TexPreprocessor {
    context: TexContext,
    pipeline: RenderPipeline,
    last_run: RunStats,
}

impl TexPreprocessor {
    /// Create a preprocessor from its context and render pipeline.
    #[must_use]
    pub fn new(context: TexContext, pipeline: RenderPipeline) -> Self {
        Self {
            context,
            pipeline,
            last_run: RunStats::default(),
        }
    }

    /// Shared context.
    #[must_use]
    pub fn context(&self) -> &TexContext {
        &self.context
    }

    /// Counters for the most recent run.
    #[must_use]
    pub fn last_run(&self) -> RunStats {
        self.last_run
    }

    /// Rewrite `lines`, replacing every snippet with an inline image.
    pub fn process(&mut self, lines: &[String]) -> Result<Vec<String>, ProcessError> {
        let mut stats = RunStats::default();
        let page = lines.join("\n");

        let (body, fragments) = extract_preamble(&page);
        let mut preamble = self.context.preamble.clone();
        stats.fragments = fragments.len();
        for fragment in fragments {
            preamble.push_fragment(fragment);
        }

        let mut output = String::with_capacity(body.len());
        let mut copied = 0;

        for snippet in scan(&body) {
            let key = CacheKey::new(snippet.content, snippet.mode, self.context.key_includes_mode);
            let payload = self.resolve(snippet.content, snippet.mode, &key, &preamble, &mut stats)?;

            output.push_str(&body[copied..snippet.span.start]);
            output.push_str(&image_tag(snippet.content, snippet.mode, &key, &payload));
            copied = snippet.span.end;
            stats.snippets += 1;
        }
        output.push_str(&body[copied..]);

        stats.flushed = self.context.cache.flush()?;
        self.last_run = stats;

        tracing::debug!(
            snippets = stats.snippets,
            cache_hits = stats.cache_hits,
            rendered = stats.rendered,
            fragments = stats.fragments,
            "substituted LaTeX snippets"
        );

        Ok(output.split('\n').map(str::to_owned).collect())
    }

    /// Return the cached payload for `key`, rendering and recording it on a miss.
    fn resolve(
        &mut self,
        content: &str,
        mode: Mode,
        key: &CacheKey,
        preamble: &Preamble,
        stats: &mut RunStats,
    ) -> Result<String, ProcessError> {
        if let Some(payload) = self.context.cache.lookup(key.as_str()) {
            tracing::debug!(key = key.short_id(), "snippet cache hit");
            stats.cache_hits += 1;
            return Ok(payload.to_owned());
        }

        let payload = self
            .pipeline
            .render(content, mode, preamble)
            .map_err(|source| ProcessError::Render {
                snippet: content.to_owned(),
                mode,
                source,
            })?;
        self.context.cache.record(key.as_str(), payload.as_str());
        stats.rendered += 1;
        Ok(payload)
    }
}

impl Preprocessor for TexPreprocessor {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    fn run(&mut self, lines: Vec<String>) -> Result<Vec<String>, StageError> {
        Ok(self.process(&lines)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Stage;
    use crate::testing::{FakeCompiler, FakeRasterizer, PNG_BYTES};
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use mdtex_cache::{FileStore, NullStore};
    use mdtex_renderer::MarkdownPipeline;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|l| (*l).to_owned()).collect()
    }

    fn payload() -> String {
        BASE64_STANDARD.encode(PNG_BYTES)
    }

    fn preprocessor(
        cache: ContentCache,
        compiler: &FakeCompiler,
        work_dir: &Path,
    ) -> TexPreprocessor {
        let pipeline =
            RenderPipeline::new(compiler.clone(), FakeRasterizer::new()).work_dir(work_dir);
        TexPreprocessor::new(TexContext::new(cache), pipeline)
    }

    fn file_cache(path: &Path) -> ContentCache {
        ContentCache::load(Box::new(FileStore::new(path)))
    }

    #[test]
    fn test_theorem_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("latex.cache");
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(file_cache(&cache_path), &compiler, tmp.path());

        let output = pre
            .process(&lines(&["Theorem:", "$a+b=c$", "is Pythagorean."]))
            .unwrap();

        let expected_tag = format!(
            "<img class='latex-inline math-true' alt='a+b=c' id='abc' src='data:image/png;base64,{}'>",
            payload()
        );
        assert_eq!(
            output,
            vec![
                "Theorem:".to_owned(),
                expected_tag,
                "is Pythagorean.".to_owned()
            ]
        );
        assert_eq!(compiler.calls(), 1);
        assert_eq!(
            fs::read_to_string(&cache_path).unwrap(),
            format!("abc {}\n", payload())
        );
        assert_eq!(
            pre.last_run(),
            RunStats {
                fragments: 0,
                snippets: 1,
                cache_hits: 0,
                rendered: 1,
                flushed: 1,
            }
        );
    }

    #[test]
    fn test_literal_text_preserved() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let input = lines(&["# Title", "", "Square: $x^2$ done.", "  indented  ", ""]);
        let output = pre.process(&input).unwrap();

        assert_eq!(output.len(), input.len());
        assert_eq!(output[0], "# Title");
        assert_eq!(output[1], "");
        assert!(output[2].starts_with("Square: <img class='latex-inline math-true' alt='x^2'"));
        assert!(output[2].ends_with("'> done."));
        assert_eq!(output[3], "  indented  ");
        assert_eq!(output[4], "");
    }

    #[test]
    fn test_no_snippets_is_identity() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let input = lines(&["plain text", "costs \\$5 or 50\\%", "price is $5"]);
        assert_eq!(pre.process(&input).unwrap(), input);
        assert_eq!(compiler.calls(), 0);
    }

    #[test]
    fn test_repeated_snippet_renders_once() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let output = pre
            .process(&lines(&["$x^2$ and $x^2$", "and $x ^ 2$"]))
            .unwrap();

        assert_eq!(compiler.calls(), 1);
        assert_eq!(output[0].matches("<img").count(), 2);
        assert_eq!(output[1].matches("<img").count(), 1);
        assert_eq!(pre.last_run().cache_hits, 2);
        assert_eq!(pre.last_run().rendered, 1);

        // Second run in the same process is served from memory
        pre.process(&lines(&["$x^2$"])).unwrap();
        assert_eq!(compiler.calls(), 1);
    }

    #[test]
    fn test_cache_persists_across_runs() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("latex.cache");

        let first = FakeCompiler::new();
        let mut pre = preprocessor(file_cache(&cache_path), &first, tmp.path());
        let run1 = pre.process(&lines(&["$E=mc^2$", "%Hello%"])).unwrap();
        assert_eq!(first.calls(), 2);

        // A fresh preprocessor loads the store written by the first one
        let second = FakeCompiler::new();
        let mut pre = preprocessor(file_cache(&cache_path), &second, tmp.path());
        let run2 = pre.process(&lines(&["$E=mc^2$", "%Hello%"])).unwrap();

        assert_eq!(second.calls(), 0);
        assert_eq!(run1, run2);
        assert_eq!(pre.last_run().flushed, 0);
        assert_eq!(fs::read_to_string(&cache_path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_compile_failure_aborts_run() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("latex.cache");
        let compiler = FakeCompiler::failing();
        let mut pre = preprocessor(file_cache(&cache_path), &compiler, tmp.path());

        let err = pre
            .process(&lines(&["ok", "$\\broken$", "$never$"]))
            .unwrap_err();

        let ProcessError::Render {
            snippet,
            mode,
            source,
        } = err
        else {
            panic!("expected render error, got {err:?}");
        };
        assert_eq!(snippet, "\\broken");
        assert_eq!(mode, Mode::Math);
        assert_eq!(source.stage(), Some(Stage::Compile));

        // Fail-fast: the second snippet was never attempted
        assert_eq!(compiler.calls(), 1);
        assert!(!cache_path.exists());
    }

    #[test]
    fn test_cache_write_failure_is_cache_error() {
        let tmp = TempDir::new().unwrap();
        // A directory cannot be opened for append
        let store_dir = tmp.path().join("store");
        fs::create_dir(&store_dir).unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(file_cache(&store_dir), &compiler, tmp.path());

        let err = pre.process(&lines(&["$x$"])).unwrap_err();

        assert!(matches!(err, ProcessError::Cache(CacheError::Flush { .. })));
        assert_eq!(compiler.calls(), 1);
        // Rendered entry stays pending for a later retry
        assert_eq!(pre.context().cache().pending(), 1);
    }

    #[test]
    fn test_entries_before_failure_flushed_by_next_run() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("latex.cache");
        let compiler = FakeCompiler::failing_after(1);
        let mut pre = preprocessor(file_cache(&cache_path), &compiler, tmp.path());

        let err = pre.process(&lines(&["$a+b$", "$\\broken$"])).unwrap_err();
        assert!(matches!(err, ProcessError::Render { .. }));
        assert_eq!(compiler.calls(), 2);
        assert!(!cache_path.exists());
        assert_eq!(pre.context().cache().pending(), 1);

        // Served from memory; the pending entry is written on this run
        let output = pre.process(&lines(&["$a+b$"])).unwrap();
        assert!(output[0].contains("id='ab'"));
        assert_eq!(compiler.calls(), 2);
        assert_eq!(pre.last_run().flushed, 1);
        assert_eq!(
            fs::read_to_string(&cache_path).unwrap(),
            format!("ab {}\n", payload())
        );
    }

    #[test]
    fn test_disabled_cache_reports_nothing_flushed() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        pre.process(&lines(&["$x$ and $y$"])).unwrap();

        assert_eq!(pre.last_run().rendered, 2);
        assert_eq!(pre.last_run().flushed, 0);
        assert_eq!(pre.context().cache().pending(), 0);
    }

    #[test]
    fn test_error_names_snippet() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::failing();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let err = pre.process(&lines(&["%\\oops%"])).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("failed to render text snippet '\\oops': compile step failed (exit 1)")
        );
    }

    #[test]
    fn test_empty_snippet_goes_through_render() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::failing();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let err = pre.process(&lines(&["empty $$ here"])).unwrap_err();
        assert!(matches!(err, ProcessError::Render { ref snippet, .. } if snippet.is_empty()));
        assert_eq!(compiler.calls(), 1);
    }

    #[test]
    fn test_multiline_snippet_collapses_lines() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let output = pre
            .process(&lines(&["before $a +", "b$ after", "tail"]))
            .unwrap();

        assert_eq!(output.len(), 2);
        assert!(output[0].starts_with("before <img"));
        assert!(output[0].contains("alt='a + b'"));
        assert!(output[0].ends_with(" after"));
        assert_eq!(output[1], "tail");
    }

    #[test]
    fn test_preamble_fragments_reach_renderer() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let output = pre
            .process(&lines(&["%%\\usepackage{tikz}%%", "$\\R$"]))
            .unwrap();

        assert_eq!(output[0], "");
        assert!(output[1].starts_with("<img"));
        let source = compiler.last_source().unwrap();
        let tikz = source.find("\\usepackage{tikz}").unwrap();
        let begin = source.find("\\begin{document}").unwrap();
        assert!(tikz < begin);
        assert_eq!(pre.last_run().fragments, 1);
    }

    #[test]
    fn test_preamble_fragments_do_not_leak_between_runs() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        pre.process(&lines(&["%%\\usepackage{tikz}%%$a$"])).unwrap();
        pre.process(&lines(&["$b$"])).unwrap();

        assert!(!compiler.last_source().unwrap().contains("tikz"));
        assert!(pre.context().preamble().fragments().is_empty());
    }

    #[test]
    fn test_mode_collision_with_legacy_keys() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let mut pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let output = pre.process(&lines(&["$abc$ %abc%"])).unwrap();

        // Legacy keys ignore the mode, so the text snippet reuses the math image
        assert_eq!(compiler.calls(), 1);
        assert!(output[0].contains("math-false"));
    }

    #[test]
    fn test_key_includes_mode_renders_both() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let pipeline =
            RenderPipeline::new(compiler.clone(), FakeRasterizer::new()).work_dir(tmp.path());
        let context = TexContext::new(ContentCache::load(Box::new(NullStore))).key_includes_mode(true);
        let mut pre = TexPreprocessor::new(context, pipeline);

        let output = pre.process(&lines(&["$abc$ %abc%"])).unwrap();

        assert_eq!(compiler.calls(), 2);
        assert!(output[0].contains("id='mabc'"));
        assert!(output[0].contains("id='tabc'"));
        assert_eq!(pre.context().cache().len(), 2);
    }

    #[test]
    fn test_registered_with_markdown_pipeline() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::new();
        let pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());
        assert_eq!(pre.name(), "latex");

        let mut pipeline = MarkdownPipeline::new().with_preprocessor(pre);
        let html = pipeline
            .render_markdown("- item $a$\n\n  continued $b\nc$\n")
            .unwrap();

        assert_eq!(html.matches("<img class='latex-inline math-true'").count(), 2);
        assert!(html.contains("alt='b c'"));
    }

    #[test]
    fn test_pipeline_reports_render_failure() {
        let tmp = TempDir::new().unwrap();
        let compiler = FakeCompiler::failing();
        let pre = preprocessor(ContentCache::load(Box::new(NullStore)), &compiler, tmp.path());

        let mut pipeline = MarkdownPipeline::new().with_preprocessor(pre);
        let err = pipeline.render_markdown("$x$").unwrap_err();

        assert_eq!(err.stage, "latex");
        assert!(err.source.downcast_ref::<ProcessError>().is_some());
    }
}
