use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::{json::JsonEncoder, pattern::PatternEncoder},
};
use std::env;
use std::str::FromStr;

const PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l:<5})} {m}{n}";

pub struct Logger;

impl Logger {
    /// Logs to stdout, and additionally as JSON lines to `LOG_PATH` when it is set.
    pub fn init() -> Result<(), anyhow::Error> {
        let level_filter =
            LevelFilter::from_str(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))?;

        let stdout = ConsoleAppender::builder()
            .target(Target::Stdout)
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();

        let mut config =
            Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));

        let mut root = Root::builder().appender("stdout");

        if let Ok(log_path) = env::var("LOG_PATH") {
            let logfile = FileAppender::builder()
                .append(true)
                .encoder(Box::new(JsonEncoder::new()))
                .build(log_path)?;

            config = config.appender(Appender::builder().build("logfile", Box::new(logfile)));
            root = root.appender("logfile");
        }

        let config = config.build(root.build(level_filter))?;

        log4rs::init_config(config)?;

        Ok(())
    }
}
