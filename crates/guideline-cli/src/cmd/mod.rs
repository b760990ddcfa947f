pub mod bootstrap;
pub mod config;
pub mod init;
pub mod load;
pub mod resolve;
pub mod status;

use anyhow::Context;
use guideline_core::{
    config::Config, loader::DocumentLoader, resolver::ConfigResolver, types::TaskType,
    GuidelineError,
};
use std::path::PathBuf;

/// Global flags shared by every subcommand.
pub struct Settings {
    pub root: PathBuf,
    pub json: bool,
    pub offline: bool,
    pub origin: Option<String>,
}

impl Settings {
    /// Project config with command-line overrides applied.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config =
            Config::load(&self.root).context("failed to load .guidelines/config.yaml")?;
        if let Some(origin) = &self.origin {
            config.origin.base_url = origin.clone();
        }
        Ok(config)
    }

    pub fn resolver(&self, config: &Config) -> anyhow::Result<ConfigResolver> {
        ConfigResolver::from_config(config).context("guideline mapping is invalid")
    }

    pub fn loader(&self, config: &Config) -> anyhow::Result<DocumentLoader> {
        DocumentLoader::from_config(&self.root, config, self.offline)
            .context("failed to set up document loader")
    }
}

/// Parse a task type from the command line. A key that could never appear in
/// a mapping is reported the same way as any other unmapped key.
pub fn parse_task_type(raw: &str) -> Result<TaskType, GuidelineError> {
    raw.parse::<TaskType>()
        .map_err(|_| GuidelineError::UnknownTaskType(raw.to_string()))
}
