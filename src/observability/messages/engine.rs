// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for provisioning run and stack lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Run start, completion and cancellation
//! * Stack state transitions
//! * Stacks skipped because a dependency failed

use crate::engine::StackState;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Provisioning run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use stackwood::observability::messages::engine::RunStarted;
/// use std::time::Duration;
///
/// let msg = RunStarted {
///     stack_count: 2,
///     max_concurrency: 4,
///     call_timeout: Duration::from_secs(300),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted {
    pub stack_count: usize,
    pub max_concurrency: usize,
    pub call_timeout: Duration,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting provisioning run: {} stacks, max_concurrency={}, call_timeout={:?}",
            self.stack_count, self.max_concurrency, self.call_timeout
        )
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(
            stack_count = self.stack_count,
            max_concurrency = self.max_concurrency,
            call_timeout_ms = self.call_timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "provisioning_run",
            span_name = name,
            stack_count = self.stack_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Provisioning run finished, successfully or not.
///
/// # Log Level
/// `info!` when every stack was provisioned, `warn!` otherwise
pub struct RunCompleted {
    pub provisioned: usize,
    pub failed: usize,
    pub not_attempted: usize,
    pub duration: Duration,
}

impl Display for RunCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Provisioning run finished in {:?}: {} provisioned, {} failed, {} not attempted",
            self.duration, self.provisioned, self.failed, self.not_attempted
        )
    }
}

impl StructuredLog for RunCompleted {
    fn log(&self) {
        if self.failed == 0 && self.not_attempted == 0 {
            tracing::info!(
                provisioned = self.provisioned,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                provisioned = self.provisioned,
                failed = self.failed,
                not_attempted = self.not_attempted,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "provisioning_run_completed",
            span_name = name,
            provisioned = self.provisioned,
            failed = self.failed,
            not_attempted = self.not_attempted,
        )
    }
}

/// Cancellation requested; stacks that have not started will not be scheduled.
///
/// # Log Level
/// `warn!`
pub struct RunCancelled {
    pub pending: usize,
}

impl Display for RunCancelled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Provisioning run cancelled: {} pending stacks will not be scheduled",
            self.pending
        )
    }
}

impl StructuredLog for RunCancelled {
    fn log(&self) {
        tracing::warn!(pending = self.pending, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("provisioning_run_cancelled", span_name = name, pending = self.pending)
    }
}

/// A stack left `Pending` and began resolving its references.
///
/// # Log Level
/// `info!`
pub struct StackStarted<'a> {
    pub stack: &'a str,
    pub node_count: usize,
}

impl Display for StackStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Provisioning stack '{}' ({} nodes)", self.stack, self.node_count)
    }
}

impl StructuredLog for StackStarted<'_> {
    fn log(&self) {
        tracing::info!(stack = self.stack, node_count = self.node_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stack",
            span_name = name,
            stack = self.stack,
            node_count = self.node_count,
        )
    }
}

/// A stack reached `Provisioned` and published its outputs.
///
/// # Log Level
/// `info!`
pub struct StackProvisioned<'a> {
    pub stack: &'a str,
    pub output_count: usize,
    pub duration: Duration,
}

impl Display for StackProvisioned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stack '{}' provisioned in {:?} with {} outputs",
            self.stack, self.duration, self.output_count
        )
    }
}

impl StructuredLog for StackProvisioned<'_> {
    fn log(&self) {
        tracing::info!(
            stack = self.stack,
            output_count = self.output_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stack_provisioned",
            span_name = name,
            stack = self.stack,
            output_count = self.output_count,
        )
    }
}

/// A stack transitioned to `Failed`.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stackwood::observability::messages::engine::StackFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded");
/// let msg = StackFailed {
///     stack: "RealWorldServerless-Infrastructure",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct StackFailed<'a> {
    pub stack: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for StackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stack '{}' failed: {}", self.stack, self.error)
    }
}

impl StructuredLog for StackFailed<'_> {
    fn log(&self) {
        tracing::error!(stack = self.stack, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stack_failed",
            span_name = name,
            stack = self.stack,
            error = %self.error,
        )
    }
}

/// A stack was marked `Failed` without being attempted because a dependency failed.
///
/// # Log Level
/// `warn!`
pub struct StackSkipped<'a> {
    pub stack: &'a str,
    pub failed_dependency: &'a str,
}

impl Display for StackSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping stack '{}': dependency '{}' failed",
            self.stack, self.failed_dependency
        )
    }
}

impl StructuredLog for StackSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            stack = self.stack,
            failed_dependency = self.failed_dependency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stack_skipped",
            span_name = name,
            stack = self.stack,
            failed_dependency = self.failed_dependency,
        )
    }
}

/// A stack moved between lifecycle states.
///
/// # Log Level
/// `debug!`
pub struct StackStateChanged<'a> {
    pub stack: &'a str,
    pub from: StackState,
    pub to: StackState,
}

impl Display for StackStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stack '{}': {} -> {}", self.stack, self.from, self.to)
    }
}

impl StructuredLog for StackStateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            stack = self.stack,
            from = %self.from,
            to = %self.to,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stack_state",
            span_name = name,
            stack = self.stack,
            to = %self.to,
        )
    }
}
