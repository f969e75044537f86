// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use thiserror::Error;

use super::ProviderError;

/// Errors that stop a single stack during a provisioning run.
///
/// These never abort the run as a whole: unrelated stacks keep going and every
/// error is collected into `RunResult::failures`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error("Provisioning node '{node}' in stack '{stack}' failed: {source}")]
    ProvisioningFailed {
        stack: String,
        node: String,
        #[source]
        source: ProviderError,
    },

    #[error("Provider call for node '{node}' in stack '{stack}' timed out after {timeout:?}")]
    Timeout {
        stack: String,
        node: String,
        timeout: Duration,
    },

    #[error("Stack '{stack}' was cancelled before it completed")]
    Cancelled { stack: String },

    #[error("Stack '{stack}' was not provisioned because its dependency '{dependency}' failed")]
    DependencyFailed { stack: String, dependency: String },

    #[error("Node '{node}' in stack '{stack}' references '{reference}' but no such value was recorded")]
    MissingAttribute {
        stack: String,
        node: String,
        reference: String,
    },

    #[error("Output '{key}' of stack '{stack}' was already recorded in this run")]
    OutputConflict { stack: String, key: String },
}

impl ProvisioningError {
    pub fn stack(&self) -> &str {
        match self {
            ProvisioningError::ProvisioningFailed { stack, .. }
            | ProvisioningError::Timeout { stack, .. }
            | ProvisioningError::Cancelled { stack }
            | ProvisioningError::DependencyFailed { stack, .. }
            | ProvisioningError::MissingAttribute { stack, .. }
            | ProvisioningError::OutputConflict { stack, .. } => stack,
        }
    }

    /// The node being provisioned when the error happened, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            ProvisioningError::ProvisioningFailed { node, .. }
            | ProvisioningError::Timeout { node, .. }
            | ProvisioningError::MissingAttribute { node, .. } => Some(node),
            _ => None,
        }
    }
}
