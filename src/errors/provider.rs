// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::model::ResourceKind;
use thiserror::Error;

/// Errors reported by a resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The control plane refused the request (bad properties, quota, permissions).
    #[error("{kind} request rejected: {message}")]
    Rejected { kind: ResourceKind, message: String },

    #[error("{kind} '{identifier}' not found")]
    NotFound {
        kind: ResourceKind,
        identifier: String,
    },

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Throttling and availability errors may succeed when re-issued.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Throttled(_) | ProviderError::Unavailable(_))
    }
}
