use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::{error::Error, host::HostNetwork};

use super::{
    net_conf::Backend,
    policy::{EndpointPolicy, Kvp},
};

const CNI_VERSION: &str = "0.3.0";

/// Cluster ranges excluded from outbound NAT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSubnets {
    pub pod_subnet: String,
    pub service_subnet: String,
    pub control_plane_cidr: Option<String>,
    pub node_cidr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delegate {
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(rename = "optionalFlags", skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_flags: BTreeMap<String, bool>,
    #[serde(rename = "AdditionalArgs")]
    pub additional_args: Vec<Kvp>,
}

/// flannel CNI config delegating to the Windows `sdnbridge`/`sdnoverlay` plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetConf {
    pub cni_version: String,
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub capabilities: BTreeMap<String, bool>,
    pub delegate: Delegate,
}

impl NetConf {
    pub fn new(backend: Backend, vni: u32, additional_args: Vec<Kvp>) -> Self {
        let (name, plugin_type, optional_flags) = match backend {
            Backend::HostGw => (
                "cbr0".to_string(),
                "sdnbridge",
                BTreeMap::from([("forceBridgeGateway".to_string(), true)]),
            ),
            Backend::Vxlan => (format!("flannel.{vni}"), "sdnoverlay", BTreeMap::new()),
        };

        Self {
            cni_version: CNI_VERSION.to_string(),
            name,
            plugin_type: "flannel".to_string(),
            capabilities: BTreeMap::from([
                ("portMappings".to_string(), true),
                ("dns".to_string(), true),
            ]),
            delegate: Delegate {
                plugin_type: plugin_type.to_string(),
                optional_flags,
                additional_args,
            },
        }
    }
}

/// Endpoint policies handed to the delegate plugin.
///
/// host-gw routes the node subnet through SDNRoute, vxlan announces the node
/// address as the provider address.
pub fn additional_args(
    backend: Backend,
    subnets: &ClusterSubnets,
    host: &impl HostNetwork,
) -> Result<Vec<Kvp>> {
    let mut exceptions = vec![subnets.service_subnet.clone(), subnets.pod_subnet.clone()];

    if backend == Backend::HostGw {
        exceptions.push(
            subnets
                .control_plane_cidr
                .clone()
                .ok_or(Error::MissingEnv("CONTROL_PLANE_CIDR"))?,
        );
        exceptions.push(
            subnets
                .node_cidr
                .clone()
                .ok_or(Error::MissingEnv("NODE_CIDR"))?,
        );
    }

    let mut args: Vec<Kvp> = vec![
        EndpointPolicy::outbound_nat(exceptions).into(),
        EndpointPolicy::sdn_route(&subnets.service_subnet).into(),
    ];

    let node = host.default_ipv4_net()?;

    let node_policy = match backend {
        Backend::HostGw => EndpointPolicy::sdn_route(node.to_string()),
        Backend::Vxlan => EndpointPolicy::provider_address(node.addr.to_string()),
    };

    args.push(node_policy.into());

    Ok(args)
}

/// Replaces `delegate.AdditionalArgs` of a template, keeping everything else.
pub fn merge_template(mut template: Value, additional_args: Vec<Kvp>) -> Result<Value> {
    let delegate = template
        .get_mut("delegate")
        .ok_or(Error::InvalidTemplate("missing delegate"))?
        .as_object_mut()
        .ok_or(Error::InvalidTemplate("delegate is not an object"))?;

    delegate.insert(
        "AdditionalArgs".to_string(),
        serde_json::to_value(additional_args)?,
    );

    Ok(template)
}
