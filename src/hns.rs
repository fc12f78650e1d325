use anyhow::Result;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HnsSubnet {
    #[serde(alias = "IpAddressPrefix")]
    pub address_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HnsIpam {
    #[serde(default)]
    pub subnets: Vec<HnsSubnet>,
}

/// A host network as reported by HNS (v1 `Subnets`) or HCN (v2 `Ipams`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HnsNetwork {
    pub name: String,
    #[serde(rename = "Type", default)]
    pub network_type: String,
    #[serde(default)]
    pub subnets: Vec<HnsSubnet>,
    #[serde(default)]
    pub ipams: Vec<HnsIpam>,
}

impl HnsNetwork {
    pub fn is_overlay(&self) -> bool {
        self.network_type.eq_ignore_ascii_case("overlay")
    }

    pub fn first_subnet(&self) -> Option<&str> {
        self.ipams
            .iter()
            .flat_map(|ipam| ipam.subnets.iter())
            .chain(self.subnets.iter())
            .map(|subnet| subnet.address_prefix.as_str())
            .next()
    }
}

pub trait HnsClient {
    fn list_networks(&self) -> Result<Vec<HnsNetwork>>;
}

/// Picks the network kube-proxy should attach to.
///
/// A `wanted` name must match exactly. Without one, the only network is used.
pub fn select_network(client: &impl HnsClient, wanted: Option<&str>) -> Result<HnsNetwork> {
    let networks = client.list_networks()?;

    if networks.is_empty() {
        return Err(Error::NoHnsNetworks.into());
    }

    if let Some(wanted) = wanted {
        return networks
            .into_iter()
            .find(|network| network.name == wanted)
            .ok_or_else(|| Error::HnsNetworkNotFound(wanted.to_string()).into());
    }

    match <[HnsNetwork; 1]>::try_from(networks) {
        Ok([network]) => Ok(network),
        Err(_) => Err(Error::MultipleHnsNetworks.into()),
    }
}
