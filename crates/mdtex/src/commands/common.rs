//! Arguments and helpers shared by all commands.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdtex_cache::{CacheStore, ContentCache, FileStore, NullStore};
use mdtex_config::{CliSettings, Config};
use mdtex_latex::{
    DvipngRasterizer, LatexCompiler, Preamble, RenderPipeline, TexContext, TexPreprocessor,
};

use crate::error::CliError;

/// Input path meaning "read from stdin".
const STDIN_PATH: &str = "-";

/// Arguments shared by `preprocess` and `html`.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Markdown input file (`-` reads stdin).
    pub(crate) input: PathBuf,

    /// Output file (default: stdout).
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdtex.toml).
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Snippet cache file (overrides config).
    #[arg(long)]
    pub(crate) cache_file: Option<PathBuf>,

    /// Disable the persistent snippet cache.
    #[arg(long)]
    pub(crate) no_cache: bool,

    /// LaTeX compiler command (overrides config).
    #[arg(long, env = "MDTEX_LATEX")]
    pub(crate) latex: Option<String>,

    /// dvipng command (overrides config).
    #[arg(long, env = "MDTEX_DVIPNG")]
    pub(crate) dvipng: Option<String>,

    /// Enable verbose output (render timings and cache activity).
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl CommonArgs {
    /// Translate flags into config overrides.
    pub(crate) fn cli_settings(&self) -> CliSettings {
        CliSettings {
            cache_enabled: self.no_cache.then_some(false),
            cache_path: self.cache_file.clone(),
            compiler: self.latex.clone(),
            rasterizer: self.dvipng.clone(),
        }
    }

    /// Load configuration with CLI overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config = ?config.config_path, "loaded configuration");
        Ok(config)
    }

    /// Read the input document.
    pub(crate) fn read_input(&self) -> Result<String, CliError> {
        let source = if self.input == Path::new(STDIN_PATH) {
            io::read_to_string(io::stdin())?
        } else {
            fs::read_to_string(&self.input)?
        };
        tracing::debug!(input = %self.input.display(), bytes = source.len(), "read input");
        Ok(source)
    }

    /// Write the result to the output file or stdout.
    pub(crate) fn write_output(&self, content: &str) -> Result<(), CliError> {
        if let Some(path) = &self.output {
            fs::write(path, content)?;
        } else {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
        Ok(())
    }
}

/// Build a snippet preprocessor from resolved configuration.
pub(crate) fn build_preprocessor(config: &Config) -> TexPreprocessor {
    let latex = &config.latex_resolved;
    let cache = &config.cache_resolved;

    tracing::info!(
        compiler = %latex.compiler,
        rasterizer = %latex.rasterizer,
        magnification = latex.magnification,
        cache = ?cache.enabled.then_some(&cache.path),
        "configured LaTeX toolchain"
    );

    let store: Box<dyn CacheStore> = if cache.enabled {
        Box::new(FileStore::new(&cache.path))
    } else {
        Box::new(NullStore)
    };
    let context = TexContext::new(ContentCache::load(store))
        .with_preamble(Preamble::new(&latex.document_class, &latex.packages))
        .key_includes_mode(cache.key_includes_mode);

    let pipeline = RenderPipeline::new(
        LatexCompiler::new(&latex.compiler),
        DvipngRasterizer::new(&latex.rasterizer, latex.magnification),
    )
    .work_dir(&latex.work_dir);

    TexPreprocessor::new(context, pipeline)
}

/// Split a document into lines, keeping a trailing empty line for a final newline.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}
