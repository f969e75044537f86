// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while carving subnets out of a network block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnetError {
    #[error("Invalid CIDR '{0}': expected '<address>/<prefix>' with a prefix of at most 32")]
    InvalidCidr(String),

    #[error("Subnet group '{group}' uses /{mask}, which does not fit inside a /{network_prefix} network")]
    InvalidMask {
        group: String,
        mask: u8,
        network_prefix: u8,
    },

    #[error("Network {network} has no room left for subnet group '{group}' in zone {zone}")]
    Exhausted {
        network: String,
        group: String,
        zone: usize,
    },

    #[error("At least one availability zone is required")]
    NoZones,
}
