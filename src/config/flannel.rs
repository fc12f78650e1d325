use std::path::PathBuf;

use anyhow::Result;

use super::{non_empty, required, EnvConfig};

const DEFAULT_BUILD_DIR: &str = "/build";
const DEFAULT_CNI_CONF: &str = "/etc/cni/net.d/10-flannel.conf";
const DEFAULT_CONTAINERD_CNI_BIN_DIR: &str = "/opt/cni/bin";
const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Settings of `flannel install-cni`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlannelConfig {
    pub net_conf: PathBuf,
    pub net_conf_dest: Option<PathBuf>,
    pub cni_conf: PathBuf,
    pub cni_template: Option<PathBuf>,
    pub cni_bin_dir: PathBuf,
    pub build_cni_bin_dir: PathBuf,
    pub containerd_cni_bin_dir: PathBuf,
    pub kubeadm_config: PathBuf,
    pub pod_subnet: Option<String>,
    pub service_subnet: Option<String>,
    pub control_plane_cidr: Option<String>,
    pub node_cidr: Option<String>,
}

impl FlannelConfig {
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let sandbox = env.sandbox();

        let build_dir = env.path_or(&env.build_dir, || PathBuf::from(DEFAULT_BUILD_DIR));

        Ok(Self {
            net_conf: net_conf(env),
            net_conf_dest: non_empty(&env.flannel_net_conf_dest).map(PathBuf::from),
            cni_conf: env.path_or(&env.flannel_cni_conf, || PathBuf::from(DEFAULT_CNI_CONF)),
            cni_template: non_empty(&env.flannel_cni_template).map(PathBuf::from),
            cni_bin_dir: sandbox.join("cni/bin"),
            build_cni_bin_dir: build_dir.join("cni").join("bin"),
            containerd_cni_bin_dir: env.path_or(&env.containerd_cni_bin_dir, || {
                PathBuf::from(DEFAULT_CONTAINERD_CNI_BIN_DIR)
            }),
            kubeadm_config: env.path_or(&env.kubeadm_config, || {
                sandbox.join("etc/kubeadm-config/ClusterConfiguration")
            }),
            pod_subnet: non_empty(&env.pod_subnet).map(ToString::to_string),
            service_subnet: non_empty(&env.service_subnet).map(ToString::to_string),
            control_plane_cidr: non_empty(&env.control_plane_cidr).map(ToString::to_string),
            node_cidr: non_empty(&env.node_cidr).map(ToString::to_string),
        })
    }
}

/// Settings of `flannel run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlannelRunConfig {
    pub flanneld_bin: PathBuf,
    pub net_conf: PathBuf,
    pub iface: String,
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,
    pub service_account_dir: PathBuf,
    pub sandbox_service_account_dir: PathBuf,
}

impl FlannelRunConfig {
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let sandbox = env.sandbox();

        // flanneld reads the copied net-conf when install-cni placed one on the host
        let net_conf = non_empty(&env.flannel_net_conf_dest)
            .map(PathBuf::from)
            .unwrap_or_else(|| net_conf(env));

        Ok(Self {
            flanneld_bin: env.path_or(&env.flanneld_bin, || sandbox.join("flannel/flanneld.exe")),
            net_conf,
            iface: required(&env.host_ip, "HOST_IP")?,
            pod_name: non_empty(&env.pod_name).map(ToString::to_string),
            pod_namespace: non_empty(&env.pod_namespace).map(ToString::to_string),
            service_account_dir: PathBuf::from(SERVICE_ACCOUNT_DIR),
            sandbox_service_account_dir: sandbox.join(SERVICE_ACCOUNT_DIR),
        })
    }
}

fn net_conf(env: &EnvConfig) -> PathBuf {
    env.path_or(&env.flannel_net_conf, || {
        env.sandbox().join("etc/kube-flannel/net-conf.json")
    })
}
