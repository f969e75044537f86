// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::ProviderError;
use crate::model::{ResourceKind, ID_ATTRIBUTE};

/// Properties with every reference replaced by its recorded value.
pub type ResolvedProperties = BTreeMap<String, serde_json::Value>;

/// Everything a provider needs to create or converge one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRequest {
    pub stack: String,
    pub node_id: String,
    pub kind: ResourceKind,
    pub properties: ResolvedProperties,
    pub tags: BTreeMap<String, String>,
}

/// Identifier and attributes of a live resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedResource {
    pub identifier: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ProvisionedResource {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Value of `attribute`, where `id` always means the identifier.
    pub fn attribute(&self, attribute: &str) -> Option<serde_json::Value> {
        if attribute == ID_ATTRIBUTE {
            return Some(serde_json::Value::String(self.identifier.clone()));
        }
        self.attributes.get(attribute).cloned()
    }
}

/// Cloud-specific adapter that creates and manages typed resources.
///
/// Creation is expected to converge: calling `create` again with the same
/// stack/node pair must not produce a second resource.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn create(&self, request: &ResourceRequest) -> Result<ProvisionedResource, ProviderError>;

    async fn describe(
        &self,
        kind: ResourceKind,
        identifier: &str,
    ) -> Result<ProvisionedResource, ProviderError>;

    async fn update(
        &self,
        identifier: &str,
        request: &ResourceRequest,
    ) -> Result<ProvisionedResource, ProviderError>;

    async fn delete(&self, kind: ResourceKind, identifier: &str) -> Result<(), ProviderError>;

    fn name(&self) -> &'static str;
}
