use std::{fmt, net::Ipv4Addr};

use anyhow::Result;

/// An interface address together with its prefix length, e.g. `10.1.0.4/16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Net {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl Ipv4Net {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }
}

impl fmt::Display for Ipv4Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

pub trait HostNetwork {
    /// IPv4 address of the interface holding the default route.
    fn default_ipv4_net(&self) -> Result<Ipv4Net>;
}
