// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for plan construction and validation.
//!
//! This module contains message types for logging events related to:
//! * Security rule composition and deduplication
//! * Declaration validation failures
//! * Provisioning order computation

use crate::errors::DeclarationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Security intents were expanded into rule nodes.
///
/// # Log Level
/// `info!`
pub struct SecurityRulesComposed {
    pub intent_count: usize,
    pub rule_count: usize,
    pub collapsed: usize,
}

impl Display for SecurityRulesComposed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Composed {} security rules from {} intents ({} duplicates collapsed)",
            self.rule_count, self.intent_count, self.collapsed
        )
    }
}

impl StructuredLog for SecurityRulesComposed {
    fn log(&self) {
        tracing::info!(
            intent_count = self.intent_count,
            rule_count = self.rule_count,
            collapsed = self.collapsed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "security_rules",
            span_name = name,
            intent_count = self.intent_count,
            rule_count = self.rule_count,
        )
    }
}

/// An expanded rule was identical to one already emitted and was dropped.
///
/// # Log Level
/// `debug!`
pub struct DuplicateRuleCollapsed<'a> {
    pub rule_id: &'a str,
    pub stack: &'a str,
}

impl Display for DuplicateRuleCollapsed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Collapsed duplicate security rule '{}' in stack '{}'",
            self.rule_id, self.stack
        )
    }
}

impl StructuredLog for DuplicateRuleCollapsed<'_> {
    fn log(&self) {
        tracing::debug!(rule_id = self.rule_id, stack = self.stack, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "duplicate_rule",
            span_name = name,
            rule_id = self.rule_id,
            stack = self.stack,
        )
    }
}

/// A structural problem in the declarations.
///
/// # Log Level
/// `error!` - the run is aborted before any provider call
///
/// # Example
/// ```
/// use stackwood::errors::DeclarationError;
/// use stackwood::observability::messages::graph::DeclarationRejected;
///
/// let error = DeclarationError::DuplicateStack { stack: "IAM".to_string() };
/// let msg = DeclarationRejected { error: &error };
///
/// tracing::error!("{}", msg);
/// ```
pub struct DeclarationRejected<'a> {
    pub error: &'a DeclarationError,
}

impl Display for DeclarationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Declaration rejected: {}", self.error)
    }
}

impl StructuredLog for DeclarationRejected<'_> {
    fn log(&self) {
        tracing::error!(
            stack = self.error.stack().unwrap_or("-"),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("declaration_rejected", span_name = name, error = %self.error)
    }
}

/// Provisioning order computed.
///
/// # Log Level
/// `info!`
pub struct ProvisioningOrderComputed<'a> {
    pub order: &'a [String],
    pub node_count: usize,
}

impl Display for ProvisioningOrderComputed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Computed provisioning order for {} stacks ({} nodes): {}",
            self.order.len(),
            self.node_count,
            self.order.join(" -> ")
        )
    }
}

impl StructuredLog for ProvisioningOrderComputed<'_> {
    fn log(&self) {
        tracing::info!(
            stack_count = self.order.len(),
            node_count = self.node_count,
            order = self.order.join(" -> "),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "provisioning_order",
            span_name = name,
            stack_count = self.order.len(),
            node_count = self.node_count,
        )
    }
}
