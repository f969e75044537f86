// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Provisioning engine: walks a [`ProvisioningPlan`] and creates its resources.
//!
//! # Scheduling
//!
//! The engine uses dependency counting over the stack graph. A stack becomes
//! ready when every stack it depends on is `Provisioned`; ready stacks are
//! launched on a [`JoinSet`] in lexical order, never more than
//! `max_concurrency` at a time. With `max_concurrency = 1` the execution order
//! is exactly the plan order.
//!
//! Inside a stack the nodes are created one after another in declaration
//! order. Before each node is created its properties are resolved:
//!
//! * a same-stack reference reads the attribute recorded for the earlier node
//! * a cross-stack reference reads the export the other stack published
//!
//! # Failure handling
//!
//! A failed node halts its stack. Every stack that transitively depends on it
//! is marked `Failed` with [`ProvisioningError::DependencyFailed`] without
//! being attempted, while unrelated stacks carry on. Nothing is rolled back.
//!
//! # Cancellation
//!
//! Once the [`CancellationToken`] fires no new stack is launched and running
//! stacks stop before their next node with [`ProvisioningError::Cancelled`].
//! Their dependents stay `Pending` and are reported as not attempted. Provider
//! calls already in flight are allowed to finish.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS,
    FALLBACK_MAX_CONCURRENCY,
};
use crate::errors::{DeclarationError, ProvisioningError};
use crate::graph::{DependencyGraphBuilder, ProvisioningPlan};
use crate::model::{Declarations, OutputSource, PropertyValue, Reference, ResourceNode, Stack};
use crate::observability::messages::engine::{
    RunCancelled, RunCompleted, RunStarted, StackFailed, StackProvisioned, StackSkipped,
    StackStarted,
};
use crate::observability::messages::provider::{
    NodeCreateFailed, NodeCreateRetrying, NodeCreateStarted, NodeCreated,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ProvisionedResource, ResolvedProperties, ResourceProvider, ResourceRequest};

use super::output_table::{OutputTable, StackOutputs};
use super::run_result::RunResult;
use super::state::{StackState, StackStates};

/// Tuning knobs for a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on stacks provisioning at the same time.
    pub max_concurrency: usize,
    /// Applied to every provider call.
    pub call_timeout: Duration,
    /// How many times a retryable provider error is re-issued.
    pub retry_attempts: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_MAX_CONCURRENCY),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Provisions declarations through a [`ResourceProvider`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use stackwood::backends::InMemoryProvider;
/// use stackwood::engine::{EngineOptions, ProvisioningEngine};
/// use stackwood::model::{Declarations, Reference, ResourceKind, ResourceNode, Stack};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let network = Stack::new("Network")
///     .with_node(ResourceNode::new("Vpc", ResourceKind::Network).with_property("cidr", "10.0.0.0/16"))
///     .with_output("VpcId", Reference::id_of("Network", "Vpc"), "ID of the VPC");
///
/// let engine = ProvisioningEngine::new(Arc::new(InMemoryProvider::new()), EngineOptions::default());
/// let result = engine
///     .run(&Declarations::new().with_stack(network), CancellationToken::new())
///     .await
///     .unwrap();
///
/// assert!(result.is_success());
/// assert!(result.output("Network", "VpcId").is_some());
/// # }
/// ```
pub struct ProvisioningEngine {
    provider: Arc<dyn ResourceProvider>,
    options: EngineOptions,
}

impl ProvisioningEngine {
    pub fn new(provider: Arc<dyn ResourceProvider>, options: EngineOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Plan and provision `declarations`.
    ///
    /// Structural problems are returned as errors before any provider call is
    /// made; provisioning problems are reported inside the [`RunResult`].
    /// Every provider call is bounded by [`EngineOptions::call_timeout`]; use
    /// [`run_with_timeout`](Self::run_with_timeout) to override it for one run.
    pub async fn run(
        &self,
        declarations: &Declarations,
        cancel: CancellationToken,
    ) -> Result<RunResult, Vec<DeclarationError>> {
        let plan = DependencyGraphBuilder::build(declarations)?;
        Ok(self.execute(plan, cancel).await)
    }

    /// Like [`run`](Self::run) with a per-call timeout for this run only.
    pub async fn run_with_timeout(
        &self,
        declarations: &Declarations,
        call_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<RunResult, Vec<DeclarationError>> {
        let engine = ProvisioningEngine {
            provider: Arc::clone(&self.provider),
            options: EngineOptions {
                call_timeout,
                ..self.options.clone()
            },
        };
        engine.run(declarations, cancel).await
    }

    /// Provision an already built plan.
    pub async fn execute(&self, plan: ProvisioningPlan, cancel: CancellationToken) -> RunResult {
        let started = Instant::now();
        let plan = Arc::new(plan);
        let table = OutputTable::new();
        let states = StackStates::new(&plan.order);
        let max_concurrency = self.options.max_concurrency.max(1);

        RunStarted {
            stack_count: plan.order.len(),
            max_concurrency,
            call_timeout: self.options.call_timeout,
        }
        .log();

        let mut waiting_on: BTreeMap<&str, usize> = plan
            .order
            .iter()
            .map(|s| (s.as_str(), plan.dependencies_of(s).count()))
            .collect();
        let mut ready: BTreeSet<String> = waiting_on
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(stack, _)| stack.to_string())
            .collect();

        let mut failures = Vec::new();
        let mut tasks: JoinSet<(String, Result<Completed, ProvisioningError>)> = JoinSet::new();
        let mut cancellation_logged = false;

        loop {
            if cancel.is_cancelled() {
                if !cancellation_logged {
                    RunCancelled {
                        pending: pending_count(&states).await,
                    }
                    .log();
                    cancellation_logged = true;
                }
            } else {
                while tasks.len() < max_concurrency {
                    let Some(stack) = ready.pop_first() else {
                        break;
                    };
                    let Some(declared) = plan.stack(&stack).cloned() else {
                        continue;
                    };
                    if !states.transition(&stack, StackState::Resolving).await {
                        continue;
                    }
                    let span = StackStarted {
                        stack: &stack,
                        node_count: declared.nodes.len(),
                    }
                    .span("stack_provisioning");
                    let job = StackJob {
                        stack: declared,
                        plan: Arc::clone(&plan),
                        provider: Arc::clone(&self.provider),
                        table: table.clone(),
                        states: states.clone(),
                        options: self.options.clone(),
                        cancel: cancel.clone(),
                    };
                    tasks.spawn(
                        async move {
                            let outcome = job.provision().await;
                            (stack, outcome)
                        }
                        .instrument(span),
                    );
                }
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let (stack, outcome) = match joined {
                Ok(completed) => completed,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => continue,
            };

            match outcome {
                Ok(completed) => {
                    states.transition(&stack, StackState::Provisioned).await;
                    StackProvisioned {
                        stack: &stack,
                        output_count: completed.output_count,
                        duration: completed.duration,
                    }
                    .log();
                    for dependent in plan.graph.dependents(&stack) {
                        if let Some(count) = waiting_on.get_mut(dependent) {
                            *count = count.saturating_sub(1);
                            if *count == 0
                                && states.get(dependent).await == Some(StackState::Pending)
                            {
                                ready.insert(dependent.to_string());
                            }
                        }
                    }
                }
                Err(error) => {
                    states.transition(&stack, StackState::Failed).await;
                    StackFailed {
                        stack: &stack,
                        error: &error,
                    }
                    .log();
                    let cancelled = matches!(error, ProvisioningError::Cancelled { .. });
                    failures.push(error);

                    // Dependents of a cancelled stack were never attempted
                    if cancelled {
                        continue;
                    }
                    for dependent in plan.graph.transitive_dependents(&stack) {
                        if states.transition(&dependent, StackState::Failed).await {
                            StackSkipped {
                                stack: &dependent,
                                failed_dependency: &stack,
                            }
                            .log();
                            ready.remove(&dependent);
                            failures.push(ProvisioningError::DependencyFailed {
                                stack: dependent,
                                dependency: stack.clone(),
                            });
                        }
                    }
                }
            }
        }

        let result = RunResult {
            order: plan.order.clone(),
            outputs: table.exports().await,
            failures,
            states: states.snapshot().await,
            resources: table.resources().await,
        };

        RunCompleted {
            provisioned: result.provisioned().len(),
            failed: result.failed().len(),
            not_attempted: result.not_attempted().len(),
            duration: started.elapsed(),
        }
        .log();

        result
    }
}

async fn pending_count(states: &StackStates) -> usize {
    states
        .snapshot()
        .await
        .values()
        .filter(|s| **s == StackState::Pending)
        .count()
}

/// Summary of a stack that reached `Provisioned`.
struct Completed {
    output_count: usize,
    duration: Duration,
}

/// One stack's worth of work, owned by its task.
struct StackJob {
    stack: Stack,
    plan: Arc<ProvisioningPlan>,
    provider: Arc<dyn ResourceProvider>,
    table: OutputTable,
    states: StackStates,
    options: EngineOptions,
    cancel: CancellationToken,
}

impl StackJob {
    async fn provision(&self) -> Result<Completed, ProvisioningError> {
        let started = Instant::now();
        let stack = &self.stack;

        StackStarted {
            stack: &stack.name,
            node_count: stack.nodes.len(),
        }
        .log();

        self.check_cross_stack_references().await?;
        self.states
            .transition(&stack.name, StackState::Provisioning)
            .await;

        for node in &stack.nodes {
            if self.cancel.is_cancelled() {
                return Err(ProvisioningError::Cancelled {
                    stack: stack.name.clone(),
                });
            }
            let request = ResourceRequest {
                stack: stack.name.clone(),
                node_id: node.id.clone(),
                kind: node.kind,
                properties: self.resolve_properties(node).await?,
                tags: self.plan.tags.clone(),
            };
            let resource = self.create(&request).await?;
            self.table
                .record_node(&stack.name, &node.id, resource)
                .await?;
        }

        let outputs = self.collect_outputs().await?;
        let output_count = outputs.len();
        self.table.publish_stack(&stack.name, outputs).await?;

        Ok(Completed {
            output_count,
            duration: started.elapsed(),
        })
    }

    /// Every cross-stack reference must already be published before any node
    /// of this stack is created.
    async fn check_cross_stack_references(&self) -> Result<(), ProvisioningError> {
        let stack = &self.stack;
        for node in &stack.nodes {
            for reference in self.plan.references_of(&stack.name, &node.id) {
                if reference.is_cross_stack(&stack.name) && self.lookup(reference).await.is_none() {
                    return Err(missing(stack, node, reference));
                }
            }
        }
        Ok(())
    }

    /// Look up every reference of `node`, then substitute the values into
    /// its property tree.
    async fn resolve_properties(
        &self,
        node: &ResourceNode,
    ) -> Result<ResolvedProperties, ProvisioningError> {
        let mut values = BTreeMap::new();
        for reference in node.references() {
            let value = self
                .lookup(reference)
                .await
                .ok_or_else(|| missing(&self.stack, node, reference))?;
            values.insert(reference.clone(), value);
        }

        Ok(node
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), substitute(value, &values)))
            .collect())
    }

    /// Same-stack references read node records, cross-stack ones read exports.
    async fn lookup(&self, reference: &Reference) -> Option<Value> {
        if !reference.is_cross_stack(&self.stack.name) {
            return self
                .table
                .node_attribute(&reference.stack, &reference.node, &reference.attribute)
                .await;
        }
        let output = self
            .plan
            .stack(&reference.stack)?
            .export_for(&reference.node, &reference.attribute)?;
        self.table.export(&reference.stack, output).await
    }

    async fn create(&self, request: &ResourceRequest) -> Result<ProvisionedResource, ProvisioningError> {
        NodeCreateStarted {
            stack: &request.stack,
            node: &request.node_id,
            kind: request.kind,
            provider: self.provider.name(),
        }
        .log();

        let max_attempts = self.options.retry_attempts + 1;
        let mut attempt: u32 = 1;
        loop {
            let call = tokio::time::timeout(self.options.call_timeout, self.provider.create(request));
            let error = match call.await {
                Ok(Ok(resource)) => {
                    NodeCreated {
                        stack: &request.stack,
                        node: &request.node_id,
                        kind: request.kind,
                        identifier: &resource.identifier,
                    }
                    .log();
                    return Ok(resource);
                }
                Ok(Err(source)) if source.is_retryable() && attempt < max_attempts => {
                    NodeCreateRetrying {
                        stack: &request.stack,
                        node: &request.node_id,
                        attempt,
                        max_attempts,
                        error: &source,
                    }
                    .log();
                    tokio::time::sleep(self.options.retry_backoff * attempt).await;
                    attempt += 1;
                    continue;
                }
                Ok(Err(source)) => ProvisioningError::ProvisioningFailed {
                    stack: request.stack.clone(),
                    node: request.node_id.clone(),
                    source,
                },
                // A timed out create may still complete remotely, so it is not retried.
                Err(_) => ProvisioningError::Timeout {
                    stack: request.stack.clone(),
                    node: request.node_id.clone(),
                    timeout: self.options.call_timeout,
                },
            };

            NodeCreateFailed {
                stack: &request.stack,
                node: &request.node_id,
                error: &error,
            }
            .log();
            return Err(error);
        }
    }

    async fn collect_outputs(&self) -> Result<StackOutputs, ProvisioningError> {
        let stack = &self.stack;
        let mut outputs = StackOutputs::new();
        for (name, declaration) in &stack.outputs {
            let value = match &declaration.source {
                OutputSource::Reference { reference } => self.output_value(stack, name, reference).await?,
                OutputSource::Join { join, separator } => {
                    let mut parts = Vec::with_capacity(join.len());
                    for reference in join {
                        parts.push(as_text(self.output_value(stack, name, reference).await?));
                    }
                    Value::String(parts.join(separator))
                }
            };
            outputs.insert(name.clone(), value);
        }
        Ok(outputs)
    }

    async fn output_value(
        &self,
        stack: &Stack,
        output: &str,
        reference: &Reference,
    ) -> Result<Value, ProvisioningError> {
        self.table
            .node_attribute(&stack.name, &reference.node, &reference.attribute)
            .await
            .ok_or_else(|| ProvisioningError::MissingAttribute {
                stack: stack.name.clone(),
                node: output.to_string(),
                reference: reference.to_string(),
            })
    }
}

fn missing(stack: &Stack, node: &ResourceNode, reference: &Reference) -> ProvisioningError {
    ProvisioningError::MissingAttribute {
        stack: stack.name.clone(),
        node: node.id.clone(),
        reference: reference.to_string(),
    }
}

fn substitute(value: &PropertyValue, values: &BTreeMap<Reference, Value>) -> Value {
    match value {
        PropertyValue::Literal(literal) => literal.clone(),
        PropertyValue::Reference(reference) => values.get(reference).cloned().unwrap_or(Value::Null),
        PropertyValue::List(items) => Value::Array(items.iter().map(|i| substitute(i, values)).collect()),
        PropertyValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, values)))
                .collect(),
        ),
    }
}

fn as_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
