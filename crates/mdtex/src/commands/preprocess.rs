//! `mdtex preprocess` command implementation.

use clap::Args;

use super::common::{CommonArgs, build_preprocessor, split_lines};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the preprocess command.
#[derive(Args)]
pub(crate) struct PreprocessArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
}

impl PreprocessArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;

        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        let mut preprocessor = build_preprocessor(&config);
        let source = self.common.read_input()?;
        let lines = preprocessor.process(&split_lines(&source))?;
        self.common.write_output(&lines.join("\n"))?;

        let stats = preprocessor.last_run();
        output.success(&format!(
            "Substituted {} snippet(s): {} rendered, {} from cache",
            stats.snippets, stats.rendered, stats.cache_hits
        ));
        Ok(())
    }
}
