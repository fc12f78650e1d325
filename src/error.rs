pub use anyhow::{anyhow, Result};

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    #[error("{0} environment variable is not set")]
    MissingEnv(&'static str),

    #[error("invalid boolean value for {name}: {value:?}")]
    InvalidBool { name: &'static str, value: String },

    #[error("unsupported flannel backend type: {0}")]
    UnsupportedBackend(String),

    #[error("no HNS networks found")]
    NoHnsNetworks,

    #[error("HNS network {0} not found")]
    HnsNetworkNotFound(String),

    #[error("multiple HNS networks found, please specify the network name via HNS_NETWORK_NAME environment variable")]
    MultipleHnsNetworks,

    #[error("HNS network {0} has no subnet")]
    NoSubnet(String),

    #[error("ipam plugin binary ({0}) does not exist")]
    IpamPluginNotFound(PathBuf),

    #[error("source vip descriptor has no address")]
    InvalidSourceVip,

    #[error("invalid CNI config template: {0}")]
    InvalidTemplate(&'static str),

    #[error("{program} exited with {status}")]
    ProcessFailed { program: String, status: ExitStatus },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
