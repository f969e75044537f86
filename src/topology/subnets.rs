// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Subnet CIDR planning.
//!
//! Subnets are carved out of the network block group by group, one per
//! availability zone, each aligned to its own size:
//!
//! ```
//! use stackwood::topology::subnets::{plan_subnets, Ipv4Network, SubnetGroup, SubnetType};
//!
//! let vpc: Ipv4Network = "10.0.0.0/16".parse().unwrap();
//! let groups = [
//!     SubnetGroup::new("public", SubnetType::Public, 24),
//!     SubnetGroup::new("private", SubnetType::PrivateWithEgress, 24),
//! ];
//!
//! let subnets = plan_subnets(vpc, &groups, 2).unwrap();
//! let cidrs: Vec<String> = subnets.iter().map(|s| s.cidr.to_string()).collect();
//! assert_eq!(cidrs, ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
//! assert_eq!(subnets[2].node_id(), "PrivateSubnet1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::SubnetError;

/// IPv4 network in CIDR notation, normalized to its network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Network {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl Ipv4Network {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, SubnetError> {
        if prefix_len > 32 {
            return Err(SubnetError::InvalidCidr(format!("{}/{}", address, prefix_len)));
        }
        let masked = u32::from(address) & netmask(prefix_len);
        Ok(Self {
            address: Ipv4Addr::from(masked),
            prefix_len,
        })
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    fn start(&self) -> u64 {
        u64::from(u32::from(self.address))
    }

    fn end(&self) -> u64 {
        self.start() + self.size()
    }

    pub fn contains(&self, other: &Ipv4Network) -> bool {
        other.prefix_len >= self.prefix_len
            && other.start() >= self.start()
            && other.end() <= self.end()
    }
}

fn netmask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Network {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SubnetError::InvalidCidr(s.to_string());
        let (address, prefix_len) = s.split_once('/').ok_or_else(invalid)?;
        let address = address.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        let prefix_len = prefix_len.parse::<u8>().map_err(|_| invalid())?;
        Self::new(address, prefix_len).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    /// Routed through the internet gateway.
    Public,
    /// Private, with outbound traffic through a NAT gateway.
    PrivateWithEgress,
    /// Private, no route out.
    Isolated,
}

impl SubnetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetType::Public => "public",
            SubnetType::PrivateWithEgress => "private_with_egress",
            SubnetType::Isolated => "isolated",
        }
    }
}

/// One subnet per availability zone, all of the same size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub subnet_type: SubnetType,
    pub cidr_mask: u8,
}

impl SubnetGroup {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType, cidr_mask: u8) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            cidr_mask,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSubnet {
    pub group: String,
    pub subnet_type: SubnetType,
    /// Zero-based availability zone index.
    pub zone: usize,
    pub cidr: Ipv4Network,
}

impl PlannedSubnet {
    /// Node id for this subnet, e.g. `PublicSubnet1` for the first public zone.
    pub fn node_id(&self) -> String {
        let mut chars = self.group.chars();
        let group = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{}Subnet{}", group, self.zone + 1)
    }
}

/// Allocate one subnet per group and zone, in group order, from the start of
/// `network`.
pub fn plan_subnets(
    network: Ipv4Network,
    groups: &[SubnetGroup],
    zones: usize,
) -> Result<Vec<PlannedSubnet>, SubnetError> {
    if zones == 0 {
        return Err(SubnetError::NoZones);
    }

    let mut cursor = network.start();
    let mut planned = Vec::with_capacity(groups.len() * zones);

    for group in groups {
        if group.cidr_mask < network.prefix_len || group.cidr_mask > 32 {
            return Err(SubnetError::InvalidMask {
                group: group.name.clone(),
                mask: group.cidr_mask,
                network_prefix: network.prefix_len,
            });
        }
        let size = 1u64 << (32 - u32::from(group.cidr_mask));

        for zone in 0..zones {
            let start = cursor.div_ceil(size) * size;
            if start + size > network.end() {
                return Err(SubnetError::Exhausted {
                    network: network.to_string(),
                    group: group.name.clone(),
                    zone,
                });
            }
            // start < 2^32 because it lies inside the network
            let address = Ipv4Addr::from(start as u32);
            planned.push(PlannedSubnet {
                group: group.name.clone(),
                subnet_type: group.subnet_type,
                zone,
                cidr: Ipv4Network::new(address, group.cidr_mask)?,
            });
            cursor = start + size;
        }
    }

    Ok(planned)
}
