use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::files;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeadmNetworking {
    pub pod_subnet: Option<String>,
    pub service_subnet: Option<String>,
}

/// The parts of kubeadm's `ClusterConfiguration` used here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KubeadmConfig {
    #[serde(default)]
    pub networking: KubeadmNetworking,
}

impl KubeadmConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = files::read_file(path)?;

        serde_yaml::from_slice(&bytes)
            .with_context(|| format!("failed to parse kubeadm config {}", path.display()))
    }
}
