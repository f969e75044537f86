// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod declaration;
mod provider;
mod provisioning;
mod subnet;

pub use config::ConfigError;
pub use declaration::{DeclarationError, SelectorSide, UnresolvedReason};
pub use provider::ProviderError;
pub use provisioning::ProvisioningError;
pub use subnet::SubnetError;
