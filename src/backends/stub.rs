// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::backends::InMemoryProvider;
use crate::errors::ProviderError;
use crate::model::ResourceKind;
use crate::traits::{ProvisionedResource, ResourceProvider, ResourceRequest};

/// What the stub does when asked to create a particular node.
#[derive(Debug, Clone)]
enum Behaviour {
    /// Always reject the request.
    Fail,
    /// Sleep before delegating.
    Delay(Duration),
    /// Answer `Throttled` this many times, then delegate.
    Throttle(u32),
}

/// Test provider backed by [`InMemoryProvider`] that records every create call
/// and can be told to fail, stall or throttle specific nodes.
#[derive(Debug, Default)]
pub struct StubProvider {
    inner: InMemoryProvider,
    behaviours: Mutex<BTreeMap<(String, String), Behaviour>>,
    calls: Mutex<Vec<ResourceRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, stack: &str, node: &str, behaviour: Behaviour) -> Self {
        self.behaviours
            .try_lock()
            .expect("stub configured before use")
            .insert((stack.to_string(), node.to_string()), behaviour);
        self
    }

    pub fn failing(self, stack: &str, node: &str) -> Self {
        self.with(stack, node, Behaviour::Fail)
    }

    pub fn slow(self, stack: &str, node: &str, delay: Duration) -> Self {
        self.with(stack, node, Behaviour::Delay(delay))
    }

    pub fn throttled(self, stack: &str, node: &str, times: u32) -> Self {
        self.with(stack, node, Behaviour::Throttle(times))
    }

    /// Every create request received, in arrival order.
    pub async fn calls(&self) -> Vec<ResourceRequest> {
        self.calls.lock().await.clone()
    }

    /// `(stack, node)` of every create call, in arrival order.
    pub async fn call_order(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|r| (r.stack.clone(), r.node_id.clone()))
            .collect()
    }

    /// Stacks in the order their first node was requested.
    pub async fn stack_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for (stack, _) in self.call_order().await {
            if !order.contains(&stack) {
                order.push(stack);
            }
        }
        order
    }

    /// Highest number of create calls that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryProvider {
        &self.inner
    }

    async fn behaviour_for(&self, request: &ResourceRequest) -> Option<Behaviour> {
        let mut behaviours = self.behaviours.lock().await;
        let key = (request.stack.clone(), request.node_id.clone());
        match behaviours.get_mut(&key) {
            Some(Behaviour::Throttle(0)) => None,
            Some(Behaviour::Throttle(remaining)) => {
                *remaining -= 1;
                Some(Behaviour::Throttle(*remaining + 1))
            }
            other => other.cloned(),
        }
    }

    async fn create_tracked(&self, request: &ResourceRequest) -> Result<ProvisionedResource, ProviderError> {
        match self.behaviour_for(request).await {
            Some(Behaviour::Fail) => Err(ProviderError::Rejected {
                kind: request.kind,
                message: format!("simulated failure for '{}'", request.node_id),
            }),
            Some(Behaviour::Throttle(_)) => Err(ProviderError::Throttled(format!(
                "rate exceeded for '{}'",
                request.node_id
            ))),
            Some(Behaviour::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                self.inner.create(request).await
            }
            None => self.inner.create(request).await,
        }
    }
}

#[async_trait]
impl ResourceProvider for StubProvider {
    async fn create(&self, request: &ResourceRequest) -> Result<ProvisionedResource, ProviderError> {
        self.calls.lock().await.push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.create_tracked(request).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        identifier: &str,
    ) -> Result<ProvisionedResource, ProviderError> {
        self.inner.describe(kind, identifier).await
    }

    async fn update(
        &self,
        identifier: &str,
        request: &ResourceRequest,
    ) -> Result<ProvisionedResource, ProviderError> {
        self.inner.update(identifier, request).await
    }

    async fn delete(&self, kind: ResourceKind, identifier: &str) -> Result<(), ProviderError> {
        self.inner.delete(kind, identifier).await
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
