use std::net::Ipv4Addr;

use anyhow::{anyhow, Context as _, Result};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    hns::{HnsClient, HnsNetwork},
    host::{HostNetwork, Ipv4Net},
    process::PowerShell,
};

const LIST_HNS_NETWORKS: &str = "Get-HnsNetwork | ConvertTo-Json -Depth 10";

const DEFAULT_IPV4_ADDRESS: &str = "$route = Get-NetRoute -DestinationPrefix 0.0.0.0/0 -ErrorAction Stop | Sort-Object -Property RouteMetric | Select-Object -First 1; Get-NetIPAddress -InterfaceIndex $route.ifIndex -AddressFamily IPv4 | Select-Object IPAddress,PrefixLength | ConvertTo-Json";

/// `ConvertTo-Json` emits a bare object for a single pipeline item.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn parse_list<T: DeserializeOwned>(json: &str) -> Result<Vec<T>> {
    let json = json.trim();

    if json.is_empty() {
        return Ok(Vec::new());
    }

    let value: OneOrMany<T> = serde_json::from_str(json)?;

    Ok(value.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetIpAddress {
    #[serde(rename = "IPAddress")]
    ip_address: Ipv4Addr,
    prefix_length: u8,
}

/// HNS and host interface queries answered by PowerShell cmdlets.
pub struct WindowsNetwork {
    powershell: PowerShell,
}

impl WindowsNetwork {
    pub fn new(powershell: PowerShell) -> Self {
        Self { powershell }
    }
}

impl Default for WindowsNetwork {
    fn default() -> Self {
        Self::new(PowerShell::detect())
    }
}

impl HnsClient for WindowsNetwork {
    fn list_networks(&self) -> Result<Vec<HnsNetwork>> {
        let out = self.powershell.output(LIST_HNS_NETWORKS)?;

        parse_list(&out).context("failed to parse Get-HnsNetwork output")
    }
}

impl HostNetwork for WindowsNetwork {
    fn default_ipv4_net(&self) -> Result<Ipv4Net> {
        let out = self.powershell.output(DEFAULT_IPV4_ADDRESS)?;

        let addresses: Vec<NetIpAddress> =
            parse_list(&out).context("failed to parse Get-NetIPAddress output")?;

        addresses
            .into_iter()
            .next()
            .map(|addr| Ipv4Net::new(addr.ip_address, addr.prefix_length))
            .ok_or_else(|| anyhow!("no IPv4 address found for default interface"))
    }
}
