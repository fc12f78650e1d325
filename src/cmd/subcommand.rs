use std::path::PathBuf;

use anyhow::Result;
use clap::{builder::NonEmptyStringValueParser, Parser, Subcommand};

use crate::{
    config::{EnvConfig, FlannelConfig, FlannelRunConfig, KubeProxyConfig, KubeProxyRunConfig},
    features::{exec_ps, flannel, kube_proxy},
    windows::WindowsNetwork,
};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub enum SubCommand {
    /// flannel helpers
    #[command(subcommand)]
    Flannel(FlannelCommand),

    /// kube-proxy helpers
    #[command(subcommand)]
    KubeProxy(KubeProxyCommand),

    /// Run a PowerShell script
    ExecPs {
        /// Path of the script
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        file: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FlannelCommand {
    /// Install the CNI binaries and create the flannel CNI config
    InstallCni,

    /// Run flanneld
    Run,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KubeProxyCommand {
    /// Create the Windows kube-proxy config
    Init,

    /// Run kube-proxy
    Run {
        /// Point the kubeconfig /var paths into the container sandbox
        #[arg(long)]
        fix_kubeconfig: bool,
    },
}

impl SubCommand {
    pub fn run(self, env: EnvConfig) -> Result<()> {
        match self {
            SubCommand::Flannel(FlannelCommand::InstallCni) => {
                let config = FlannelConfig::from_env(&env)?;

                flannel::install_cni(&config, &WindowsNetwork::default())?;
            }
            SubCommand::Flannel(FlannelCommand::Run) => {
                let config = FlannelRunConfig::from_env(&env)?;

                flannel::run(&config)?;
            }
            SubCommand::KubeProxy(KubeProxyCommand::Init) => {
                let config = KubeProxyConfig::from_env(&env)?;

                kube_proxy::init(&config, &WindowsNetwork::default())?;
            }
            SubCommand::KubeProxy(KubeProxyCommand::Run { fix_kubeconfig }) => {
                let config = KubeProxyRunConfig::from_env(&env)?;

                kube_proxy::run(&config, fix_kubeconfig)?;
            }
            SubCommand::ExecPs { file } => {
                exec_ps::run(&PathBuf::from(file))?;
            }
        }

        Ok(())
    }
}
