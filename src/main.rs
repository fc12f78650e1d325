use log::error;
use winkube_init::{cmd::Command, config::EnvConfig, error::Result, logging::Logger};

fn main() -> Result<()> {
    Logger::init()?;

    let cmd = Command::init();

    let env = EnvConfig::load(cmd.config_load_option())?;

    cmd.subcommand.run(env).inspect_err(|err| {
        error!("{:#}", err);
    })
}
