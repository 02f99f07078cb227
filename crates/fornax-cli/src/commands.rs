use crate::config::{PartialConfig, PlaybackOverrides};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use fornax::engine::config::EngineConfig;
use std::path::Path;
use tracing::info;

pub mod play;
pub mod scene;
pub mod strip;

/// Global options every subcommand needs.
pub struct CommandContext<'a> {
    pub config: Option<&'a Path>,
    pub set_values: &'a [String],
    pub quiet: bool,
}

impl CommandContext<'_> {
    pub fn engine_config(&self, overrides: &PlaybackOverrides) -> Result<EngineConfig> {
        info!("Merging configuration from file and CLI arguments...");
        PartialConfig::load(self.config)?.merge_with_cli(self.set_values, overrides)
    }

    pub fn progress_handler(&self) -> CliProgressHandler {
        if self.quiet {
            CliProgressHandler::hidden()
        } else {
            CliProgressHandler::new()
        }
    }
}
