//! `mdtex html` command implementation.

use clap::Args;
use mdtex_renderer::MarkdownPipeline;

use super::common::{CommonArgs, build_preprocessor};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the html command.
#[derive(Args)]
pub(crate) struct HtmlArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,

    /// Disable GitHub Flavored Markdown extensions.
    #[arg(long)]
    no_gfm: bool,
}

impl HtmlArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;

        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        let mut pipeline = MarkdownPipeline::new()
            .with_gfm(!self.no_gfm)
            .with_preprocessor(build_preprocessor(&config));

        let source = self.common.read_input()?;
        let html = pipeline.render_markdown(&source)?;
        self.common.write_output(&html)?;

        output.success("Rendered HTML");
        Ok(())
    }
}
