//! CLI error types.

use mdtex_config::ConfigError;
use mdtex_latex::ProcessError;
use mdtex_renderer::PipelineError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}
