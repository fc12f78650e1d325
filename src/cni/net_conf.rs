use std::{path::Path, str::FromStr};

use anyhow::{Context as _, Result};
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::{error::Error, files};

pub const DEFAULT_VNI: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Backend {
    #[strum(serialize = "host-gw")]
    HostGw,
    #[strum(serialize = "vxlan")]
    Vxlan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendConf {
    #[serde(rename = "Type", default)]
    pub backend_type: String,
    #[serde(rename = "VNI")]
    pub vni: Option<u32>,
}

/// flannel's `net-conf.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlannelNetConf {
    pub network: Option<String>,
    #[serde(default)]
    pub backend: BackendConf,
}

impl FlannelNetConf {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = files::read_file(path)?;

        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse flannel net config {}", path.display()))
    }

    pub fn backend(&self) -> Result<Backend, Error> {
        Backend::from_str(&self.backend.backend_type)
            .map_err(|_| Error::UnsupportedBackend(self.backend.backend_type.clone()))
    }

    pub fn vni(&self) -> u32 {
        self.backend.vni.unwrap_or(DEFAULT_VNI)
    }
}
