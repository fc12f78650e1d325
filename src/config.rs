mod de;
mod flannel;
mod kube_proxy;

use std::{
    collections::BTreeMap,
    env,
    path::{Path, PathBuf},
};

use anyhow::Result;
use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;

use crate::error::Error;

pub use flannel::{FlannelConfig, FlannelRunConfig};
pub use kube_proxy::{KubeProxyConfig, KubeProxyRunConfig};

#[derive(Debug, Default)]
pub enum ConfigLoadOption {
    #[default]
    Default,

    Path(PathBuf),
}

const ENV_KEYS: &[&str] = &[
    "CONTAINER_SANDBOX_MOUNT_POINT",
    "SystemDrive",
    "BUILD_DIR",
    "FLANNEL_NET_CONF",
    "FLANNEL_NET_CONF_DEST",
    "FLANNEL_CNI_CONF",
    "FLANNEL_CNI_TEMPLATE",
    "CONTAINERD_CNI_BIN_DIR",
    "CNI_BIN_DIR",
    "KUBEADM_CONFIG",
    "POD_SUBNET",
    "SERVICE_SUBNET",
    "CONTROL_PLANE_CIDR",
    "NODE_CIDR",
    "FLANNELD_BIN",
    "POD_NAME",
    "POD_NAMESPACE",
    "HOST_IP",
    "KUBE_PROXY_CONF",
    "KUBE_PROXY_WINDOWS_CONF",
    "KUBE_PROXY_BIN",
    "KUBE_PROXY_VERBOSITY",
    "HNS_NETWORK_NAME",
    "CNI_VERSION",
    "ENABLE_WIN_DSR",
    "NODE_NAME",
];

/// Raw values taken from the environment (or the YAML overlay file).
///
/// Keys are the lower-cased environment variable names.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    #[serde(deserialize_with = "de::opt_string")]
    pub container_sandbox_mount_point: Option<String>,
    #[serde(rename = "systemdrive", deserialize_with = "de::opt_string")]
    pub system_drive: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub build_dir: Option<String>,

    #[serde(deserialize_with = "de::opt_string")]
    pub flannel_net_conf: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub flannel_net_conf_dest: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub flannel_cni_conf: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub flannel_cni_template: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub containerd_cni_bin_dir: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub cni_bin_dir: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub kubeadm_config: Option<String>,

    #[serde(deserialize_with = "de::opt_string")]
    pub pod_subnet: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub service_subnet: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub control_plane_cidr: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub node_cidr: Option<String>,

    #[serde(deserialize_with = "de::opt_string")]
    pub flanneld_bin: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub pod_name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub pod_namespace: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub host_ip: Option<String>,

    #[serde(deserialize_with = "de::opt_string")]
    pub kube_proxy_conf: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub kube_proxy_windows_conf: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub kube_proxy_bin: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub kube_proxy_verbosity: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub hns_network_name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub cni_version: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub enable_win_dsr: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub node_name: Option<String>,
}

/// The known variables that are set, verbatim, under their lower-cased names.
fn environment() -> BTreeMap<String, String> {
    ENV_KEYS
        .iter()
        .filter_map(|key| env::var(key).ok().map(|value| (key.to_lowercase(), value)))
        .collect()
}

impl EnvConfig {
    pub fn load(option: ConfigLoadOption) -> Result<Self> {
        let figment = Figment::new();

        let config = match option {
            ConfigLoadOption::Default => figment,
            ConfigLoadOption::Path(path) => figment.merge(Yaml::file(path)),
        }
        .merge(Serialized::defaults(environment()))
        .extract()?;

        Ok(config)
    }

    pub fn sandbox(&self) -> Sandbox {
        Sandbox::new(self.container_sandbox_mount_point.as_deref().unwrap_or_default())
    }

    fn path_or(&self, value: &Option<String>, default: impl FnOnce() -> PathBuf) -> PathBuf {
        non_empty(value).map(PathBuf::from).unwrap_or_else(default)
    }
}

/// Root of the container image inside a host-process container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();

        let root = if root.as_os_str().is_empty() {
            PathBuf::from("/")
        } else {
            root.to_path_buf()
        };

        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `path` below the sandbox root even when `path` is absolute.
    pub fn join(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches(['/', '\\']))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, Error> {
    non_empty(value)
        .map(ToString::to_string)
        .ok_or(Error::MissingEnv(name))
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
pub fn parse_bool(name: &'static str, value: &str) -> Result<bool, Error> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(Error::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}
