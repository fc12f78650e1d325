use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutboundNatSettings {
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SdnRouteSettings {
    pub destination_prefix: String,
    pub need_encap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderAddressSettings {
    pub provider_address: String,
}

/// HNS endpoint policy, serialized as `{"Type": .., "Settings": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Type", content = "Settings")]
pub enum EndpointPolicy {
    #[serde(rename = "OutBoundNAT")]
    OutboundNat(OutboundNatSettings),
    #[serde(rename = "SDNRoute")]
    SdnRoute(SdnRouteSettings),
    #[serde(rename = "ProviderAddress")]
    ProviderAddress(ProviderAddressSettings),
}

impl EndpointPolicy {
    pub fn outbound_nat(exceptions: Vec<String>) -> Self {
        Self::OutboundNat(OutboundNatSettings { exceptions })
    }

    pub fn sdn_route(destination_prefix: impl Into<String>) -> Self {
        Self::SdnRoute(SdnRouteSettings {
            destination_prefix: destination_prefix.into(),
            need_encap: true,
        })
    }

    pub fn provider_address(provider_address: impl Into<String>) -> Self {
        Self::ProviderAddress(ProviderAddressSettings {
            provider_address: provider_address.into(),
        })
    }
}

/// One entry of the delegate's `AdditionalArgs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kvp {
    pub name: String,
    pub value: EndpointPolicy,
}

impl From<EndpointPolicy> for Kvp {
    fn from(value: EndpointPolicy) -> Self {
        Self {
            name: "EndpointPolicy".to_string(),
            value,
        }
    }
}
