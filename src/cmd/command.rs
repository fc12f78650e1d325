use std::path::PathBuf;

use clap::Parser;
use log::warn;

use crate::config::ConfigLoadOption;

use super::SubCommand;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, disable_help_subcommand = true)]
pub struct Command {
    /// YAML file overriding the environment defaults
    #[arg(long, global = true, display_order = 1000)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: SubCommand,
}

impl Command {
    pub fn init() -> Self {
        Self::parse()
    }

    pub fn config_load_option(&self) -> ConfigLoadOption {
        let Some(path) = &self.config_file else {
            return ConfigLoadOption::Default;
        };

        match path.try_exists() {
            Ok(true) => ConfigLoadOption::Path(path.clone()),
            Ok(false) => {
                warn!("Config file not found: {}", path.display());

                ConfigLoadOption::Default
            }
            Err(err) => {
                warn!("Failed to check config file exists: {}", err);

                ConfigLoadOption::Default
            }
        }
    }
}
