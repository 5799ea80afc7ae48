use std::path::PathBuf;

use crate::{
    LogLevel,
    config::ConfigStore,
    connection::ConnectionFactory,
    output::Output,
};

pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "-",
    env!("VERGEN_GIT_SHA"),
    " (",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

/// Central context passed to all commands
pub struct Ctx {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Output instance for consistent formatting
    pub output: Output,
}

impl Ctx {
    pub fn new(
        config_path: PathBuf,
        logs: Option<LogLevel>,
        json: bool,
        color: bool,
        width: usize,
    ) -> Self {
        let output = Output::new(color, width)
            .with_json(json)
            .with_logging(logs);
        Self {
            config_path,
            output,
        }
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path.clone())
    }

    pub fn connection_factory(&self) -> ConnectionFactory {
        ConnectionFactory::new(self.store())
    }
}
