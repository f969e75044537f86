// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run-scoped record of everything provisioned so far.
//!
//! The table is the only mutable state shared between concurrently running
//! stacks. It holds two kinds of entries, both write-once per run:
//!
//! * **node records**: identifier and attributes of each created node, keyed
//!   by `(stack, node)`; same-stack references resolve against these
//! * **stack exports**: the named outputs of a provisioned stack, published
//!   all at once; cross-stack references resolve against these
//!
//! Each write happens under a single write lock, so readers never observe a
//! partially recorded node or a partially published stack.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::ProvisioningError;
use crate::traits::ProvisionedResource;

pub type StackOutputs = BTreeMap<String, Value>;

#[derive(Debug, Default)]
struct Tables {
    nodes: BTreeMap<String, BTreeMap<String, ProvisionedResource>>,
    exports: BTreeMap<String, StackOutputs>,
}

/// Cheaply cloneable handle to the output table of one run.
#[derive(Debug, Clone, Default)]
pub struct OutputTable {
    inner: Arc<RwLock<Tables>>,
}

impl OutputTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created node. Fails if the node was already recorded.
    pub async fn record_node(
        &self,
        stack: &str,
        node: &str,
        resource: ProvisionedResource,
    ) -> Result<(), ProvisioningError> {
        let mut tables = self.inner.write().await;
        let nodes = tables.nodes.entry(stack.to_string()).or_default();
        if nodes.contains_key(node) {
            return Err(ProvisioningError::OutputConflict {
                stack: stack.to_string(),
                key: node.to_string(),
            });
        }
        nodes.insert(node.to_string(), resource);
        Ok(())
    }

    /// Publish all exports of a stack at once. Fails if the stack already
    /// published.
    pub async fn publish_stack(
        &self,
        stack: &str,
        outputs: StackOutputs,
    ) -> Result<(), ProvisioningError> {
        let mut tables = self.inner.write().await;
        if let Some(existing) = tables.exports.get(stack) {
            let key = existing
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| stack.to_string());
            return Err(ProvisioningError::OutputConflict {
                stack: stack.to_string(),
                key,
            });
        }
        tables.exports.insert(stack.to_string(), outputs);
        Ok(())
    }

    /// Attribute of a recorded node; `id` is the identifier.
    pub async fn node_attribute(&self, stack: &str, node: &str, attribute: &str) -> Option<Value> {
        let tables = self.inner.read().await;
        tables
            .nodes
            .get(stack)
            .and_then(|nodes| nodes.get(node))
            .and_then(|resource| resource.attribute(attribute))
    }

    /// A published export of another stack.
    pub async fn export(&self, stack: &str, output: &str) -> Option<Value> {
        let tables = self.inner.read().await;
        tables
            .exports
            .get(stack)
            .and_then(|outputs| outputs.get(output))
            .cloned()
    }

    pub async fn is_published(&self, stack: &str) -> bool {
        self.inner.read().await.exports.contains_key(stack)
    }

    /// Consistent copy of every published export: stack -> output -> value.
    pub async fn exports(&self) -> BTreeMap<String, StackOutputs> {
        self.inner.read().await.exports.clone()
    }

    /// Consistent copy of every node record: stack -> node -> resource.
    pub async fn resources(&self) -> BTreeMap<String, BTreeMap<String, ProvisionedResource>> {
        self.inner.read().await.nodes.clone()
    }
}
