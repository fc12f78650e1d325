use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{non_empty, parse_bool, required, EnvConfig};

const DEFAULT_WINDOWS_CONF: &str = "/k/kube-proxy/config.conf";
const DEFAULT_CNI_CONF: &str = "/etc/cni/net.d/10-flannel.conf";
const DEFAULT_CNI_VERSION: &str = "0.2.0";
const DEFAULT_SYSTEM_DRIVE: &str = "C:";
const DEFAULT_BUILD_DIR: &str = "/build";
const DEFAULT_VERBOSITY: &str = "4";
const KUBECONFIG: &str = "/var/lib/kube-proxy/kubeconfig.conf";

/// Settings of `kube-proxy init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeProxyConfig {
    pub conf: PathBuf,
    pub windows_conf: PathBuf,
    pub windows_kubeconfig: PathBuf,
    pub source_vip_file: PathBuf,
    pub cni_bin_dir: PathBuf,
    pub cni_conf: PathBuf,
    pub hns_network_name: Option<String>,
    pub cni_version: String,
    pub enable_dsr: bool,
    pub system_drive: String,
}

impl KubeProxyConfig {
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let sandbox = env.sandbox();

        let windows_conf = windows_conf(env);
        let windows_dir = windows_conf.parent().unwrap_or(Path::new("")).to_path_buf();

        Ok(Self {
            conf: env.path_or(&env.kube_proxy_conf, || {
                sandbox.join("var/lib/kube-proxy/config.conf")
            }),
            windows_kubeconfig: windows_dir.join("kubeconfig.conf"),
            source_vip_file: windows_dir.join("sourceVip.json"),
            windows_conf,
            cni_bin_dir: env.path_or(&env.cni_bin_dir, || sandbox.join("cni/bin")),
            cni_conf: env.path_or(&env.flannel_cni_conf, || PathBuf::from(DEFAULT_CNI_CONF)),
            hns_network_name: non_empty(&env.hns_network_name).map(ToString::to_string),
            cni_version: non_empty(&env.cni_version)
                .unwrap_or(DEFAULT_CNI_VERSION)
                .to_string(),
            enable_dsr: enable_dsr(env)?,
            system_drive: non_empty(&env.system_drive)
                .unwrap_or(DEFAULT_SYSTEM_DRIVE)
                .to_string(),
        })
    }
}

/// Settings of `kube-proxy run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeProxyRunConfig {
    pub kube_proxy_bin: PathBuf,
    pub build_binary: PathBuf,
    pub windows_conf: PathBuf,
    pub node_name: String,
    pub enable_dsr: bool,
    pub verbosity: String,
    pub sandbox_kubeconfig: PathBuf,
    pub kubeconfig: PathBuf,
    pub sandbox_var_dir: String,
}

impl KubeProxyRunConfig {
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let sandbox = env.sandbox();

        let build_dir = env.path_or(&env.build_dir, || PathBuf::from(DEFAULT_BUILD_DIR));

        Ok(Self {
            kube_proxy_bin: env.path_or(&env.kube_proxy_bin, || {
                sandbox.join("kube-proxy/kube-proxy.exe")
            }),
            build_binary: build_dir.join("kube-proxy.exe"),
            windows_conf: windows_conf(env),
            node_name: required(&env.node_name, "NODE_NAME")?,
            enable_dsr: enable_dsr(env)?,
            verbosity: non_empty(&env.kube_proxy_verbosity)
                .unwrap_or(DEFAULT_VERBOSITY)
                .to_string(),
            sandbox_kubeconfig: sandbox.join(KUBECONFIG),
            kubeconfig: PathBuf::from(KUBECONFIG),
            sandbox_var_dir: sandbox.join("var").to_string_lossy().into_owned(),
        })
    }
}

fn windows_conf(env: &EnvConfig) -> PathBuf {
    env.path_or(&env.kube_proxy_windows_conf, || {
        PathBuf::from(DEFAULT_WINDOWS_CONF)
    })
}

fn enable_dsr(env: &EnvConfig) -> Result<bool> {
    let value = required(&env.enable_win_dsr, "ENABLE_WIN_DSR")?;

    Ok(parse_bool("ENABLE_WIN_DSR", &value)?)
}
