use std::path::PathBuf;

use domreplay_cli::Config;
use domreplay_scenario_store::ScenarioCatalog;

use super::output::OutputFormat;

pub struct CliContext {
    config: Config,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output(&self) -> &OutputFormat {
        &self.output
    }

    pub fn catalog(&self) -> ScenarioCatalog {
        tracing::debug!(
            config = %self.config_path.display(),
            store = %self.config.store_path().display(),
            "Opening scenario catalog"
        );
        self.config.catalog()
    }
}
