// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural errors found while building the provisioning plan.
//!
//! All of these are detected before any provider call is made, so a run that
//! fails with one of them has no side effects.

use std::fmt;
use thiserror::Error;

/// Why a reference could not be resolved at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The referenced stack is not declared.
    MissingStack,
    /// The referenced stack exists but has no such node.
    MissingNode,
    /// The node lives in another stack that does not export the attribute.
    NotExported,
    /// A stack output points at a node outside its own stack.
    ForeignOutput,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            UnresolvedReason::MissingStack => "stack does not exist",
            UnresolvedReason::MissingNode => "node does not exist",
            UnresolvedReason::NotExported => "attribute is not exported by its stack",
            UnresolvedReason::ForeignOutput => "outputs may only reference nodes of their own stack",
        };
        f.write_str(reason)
    }
}

/// Which side of a security intent a selector belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorSide {
    Source,
    Destination,
}

impl fmt::Display for SelectorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorSide::Source => f.write_str("source"),
            SelectorSide::Destination => f.write_str("destination"),
        }
    }
}

/// Errors that can occur while validating declarations and ordering stacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The stacks listed form a dependency cycle.
    #[error("Cyclic dependency detected between stacks: {}", stacks.join(", "))]
    CyclicDependency { stacks: Vec<String> },

    /// `node` is the offending node id, or the output name for an output.
    #[error("'{node}' in stack '{stack}' references '{reference}' which cannot be resolved: {reason}")]
    UnresolvedReference {
        stack: String,
        node: String,
        reference: String,
        reason: UnresolvedReason,
    },

    #[error("Node '{node}' in stack '{stack}' references '{target}' which is not declared before it")]
    ForwardReference {
        stack: String,
        node: String,
        target: String,
    },

    #[error("Security intent #{intent}: {side} selector {selector} matches no security group")]
    EmptySelector {
        intent: usize,
        side: SelectorSide,
        selector: String,
    },

    #[error("Duplicate stack name: '{stack}'")]
    DuplicateStack { stack: String },

    #[error("Duplicate node id '{node}' in stack '{stack}'")]
    DuplicateNode { stack: String, node: String },

    #[error("Stack '{stack}' depends on '{dependency}' which does not exist")]
    UnknownDependency { stack: String, dependency: String },
}

impl DeclarationError {
    /// Stack the error is reported against, when there is exactly one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            DeclarationError::UnresolvedReference { stack, .. }
            | DeclarationError::ForwardReference { stack, .. }
            | DeclarationError::DuplicateStack { stack }
            | DeclarationError::DuplicateNode { stack, .. }
            | DeclarationError::UnknownDependency { stack, .. } => Some(stack),
            DeclarationError::CyclicDependency { .. } | DeclarationError::EmptySelector { .. } => None,
        }
    }
}
