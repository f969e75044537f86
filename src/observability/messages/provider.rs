// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for resource provider calls.

use crate::model::ResourceKind;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// About to ask the provider to create a node.
///
/// # Log Level
/// `debug!`
pub struct NodeCreateStarted<'a> {
    pub stack: &'a str,
    pub node: &'a str,
    pub kind: ResourceKind,
    pub provider: &'a str,
}

impl Display for NodeCreateStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Creating {} '{}' in stack '{}' via {}",
            self.kind, self.node, self.stack, self.provider
        )
    }
}

impl StructuredLog for NodeCreateStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            stack = self.stack,
            node = self.node,
            kind = %self.kind,
            provider = self.provider,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node",
            span_name = name,
            stack = self.stack,
            node = self.node,
            kind = %self.kind,
        )
    }
}

/// The provider created (or converged) a node.
///
/// # Log Level
/// `info!`
pub struct NodeCreated<'a> {
    pub stack: &'a str,
    pub node: &'a str,
    pub kind: ResourceKind,
    pub identifier: &'a str,
}

impl Display for NodeCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created {} '{}' in stack '{}': {}",
            self.kind, self.node, self.stack, self.identifier
        )
    }
}

impl StructuredLog for NodeCreated<'_> {
    fn log(&self) {
        tracing::info!(
            stack = self.stack,
            node = self.node,
            kind = %self.kind,
            identifier = self.identifier,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "node_created",
            span_name = name,
            stack = self.stack,
            node = self.node,
            identifier = self.identifier,
        )
    }
}

/// A retryable provider error; the call will be re-issued.
///
/// # Log Level
/// `warn!`
pub struct NodeCreateRetrying<'a> {
    pub stack: &'a str,
    pub node: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: &'a dyn std::error::Error,
}

impl Display for NodeCreateRetrying<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retrying node '{}' in stack '{}' (attempt {}/{}): {}",
            self.node, self.stack, self.attempt, self.max_attempts, self.error
        )
    }
}

impl StructuredLog for NodeCreateRetrying<'_> {
    fn log(&self) {
        tracing::warn!(
            stack = self.stack,
            node = self.node,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "node_retry",
            span_name = name,
            stack = self.stack,
            node = self.node,
            attempt = self.attempt,
        )
    }
}

/// The provider call for a node failed or timed out.
///
/// # Log Level
/// `error!`
pub struct NodeCreateFailed<'a> {
    pub stack: &'a str,
    pub node: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for NodeCreateFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to create node '{}' in stack '{}': {}",
            self.node, self.stack, self.error
        )
    }
}

impl StructuredLog for NodeCreateFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stack = self.stack,
            node = self.node,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "node_failed",
            span_name = name,
            stack = self.stack,
            node = self.node,
        )
    }
}
