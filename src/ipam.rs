use std::{
    io::Write as _,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context as _, Result};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;

use crate::{error::Error, files, hns::HnsNetwork};

const IPAM_PLUGIN: &str = "host-local.exe";
const IPAM_DATA_DIR: &str = "/var/lib/cni/networks";
const SOURCE_VIP_CONTAINER: &str = "SourceVip";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Ipv4Config {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub gateway: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IpConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gateway: String,
}

/// Result of a CNI `ADD` issued to the `host-local` IPAM plugin.
///
/// CNI 0.2.0 reports `ip4`, later versions report `ips`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceVip {
    pub ip4: Option<Ipv4Config>,
    #[serde(default)]
    pub ips: Vec<IpConfig>,
}

impl SourceVip {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to parse source vip descriptor")
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = files::read_file(path)?;

        Self::parse(&bytes).with_context(|| format!("invalid source vip file {}", path.display()))
    }

    /// The allocated address without its prefix length.
    pub fn address(&self) -> Result<String, Error> {
        let cidr = self
            .ips
            .first()
            .map(|ip| ip.address.as_str())
            .or_else(|| self.ip4.as_ref().map(|ip4| ip4.ip.as_str()))
            .filter(|cidr| !cidr.is_empty())
            .ok_or(Error::InvalidSourceVip)?;

        Ok(cidr.split('/').next().unwrap_or(cidr).to_string())
    }
}

pub struct SourceVipRequest<'a> {
    pub source_vip_file: &'a Path,
    pub cni_bin_dir: &'a Path,
    pub cni_version: &'a str,
}

/// Returns the kube-proxy source VIP, allocating one through `host-local` on first use.
pub fn source_vip(request: &SourceVipRequest, network: &HnsNetwork) -> Result<String> {
    if request.source_vip_file.exists() {
        info!(
            "using existing source vip file {}",
            request.source_vip_file.display()
        );

        return Ok(SourceVip::read(request.source_vip_file)?.address()?);
    }

    let plugin = request.cni_bin_dir.join(IPAM_PLUGIN);

    if !plugin.is_file() {
        return Err(Error::IpamPluginNotFound(plugin).into());
    }

    let subnet = network
        .first_subnet()
        .ok_or_else(|| Error::NoSubnet(network.name.clone()))?;

    let ipam_config = json!({
        "cniVersion": request.cni_version,
        "name": network.name,
        "ipam": {
            "type": "host-local",
            "ranges": [[{ "subnet": subnet }]],
            "dataDir": IPAM_DATA_DIR,
        }
    });

    info!("allocating kube-proxy source VIP");

    let out = run_ipam_plugin(&plugin, request.cni_bin_dir, &ipam_config.to_string())?;

    files::write_file(request.source_vip_file, &out)?;

    Ok(SourceVip::parse(&out)?.address()?)
}

fn run_ipam_plugin(plugin: &Path, cni_bin_dir: &Path, config: &str) -> Result<Vec<u8>> {
    let mut child = Command::new(plugin)
        .env("CNI_COMMAND", "ADD")
        .env("CNI_CONTAINERID", SOURCE_VIP_CONTAINER)
        .env("CNI_NETNS", SOURCE_VIP_CONTAINER)
        .env("CNI_IFNAME", SOURCE_VIP_CONTAINER)
        .env("CNI_PATH", cni_bin_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {}", plugin.display()))?;

    // A plugin that exits early closes its stdin; its exit status is the real error
    let written = child
        .stdin
        .take()
        .map(|mut stdin| stdin.write_all(config.as_bytes()))
        .transpose();

    let output = child.wait_with_output()?;

    if !output.status.success() {
        error!(
            "command output: {}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        return Err(Error::ProcessFailed {
            program: plugin.display().to_string(),
            status: output.status,
        })
        .context("error running host-local.exe ipam plugin");
    }

    written.context("failed to write ipam config to host-local.exe")?;

    Ok(output.stdout)
}
