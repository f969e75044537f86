// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::InMemoryProvider;
use crate::config::{DeclarationFile, ProviderConfig};
use crate::engine::{EngineFactory, ProvisioningEngine};
use crate::traits::ResourceProvider;

/// Provisioning runtime builder - wires the provider and engine from a declaration file.
///
/// # Examples
///
/// ```
/// use stackwood::config::{DeclarationFile, RuntimeBuilder};
///
/// let mut file = DeclarationFile::default();
/// file.engine.max_concurrency = Some(2);
/// file.provider.region = Some("us-east-1".to_string());
///
/// let (engine, provider) = RuntimeBuilder::from_config(&file);
/// assert_eq!(engine.options().max_concurrency, 2);
/// assert_eq!(provider.region(), "us-east-1");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build an engine backed by the in-memory provider.
    ///
    /// The provider is returned as well so callers can inspect what was created.
    pub fn from_config(file: &DeclarationFile) -> (ProvisioningEngine, Arc<InMemoryProvider>) {
        let provider = Arc::new(Self::provider_from_config(&file.provider));
        let engine = Self::with_provider(file, provider.clone());
        (engine, provider)
    }

    /// Build an engine for an externally supplied provider.
    pub fn with_provider(
        file: &DeclarationFile,
        provider: Arc<dyn ResourceProvider>,
    ) -> ProvisioningEngine {
        EngineFactory::from_config(&file.engine, provider)
    }

    pub fn provider_from_config(cfg: &ProviderConfig) -> InMemoryProvider {
        let mut provider = InMemoryProvider::new();
        if let Some(account_id) = &cfg.account_id {
            provider = provider.with_account(account_id.clone());
        }
        if let Some(region) = &cfg.region {
            provider = provider.with_region(region.clone());
        }
        provider
    }
}
