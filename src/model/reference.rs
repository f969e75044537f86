// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Attribute name that always resolves to a resource's primary identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// A pointer from a node property to another node's output attribute.
///
/// References are lookup keys resolved at provisioning time, never ownership.
/// The textual form is `<stack>.<node>.<attribute>`:
///
/// ```
/// use stackwood::model::Reference;
///
/// let reference: Reference = "RealWorldServerless-IAM.LambdaExecutionRole.arn".parse().unwrap();
/// assert_eq!(reference.stack, "RealWorldServerless-IAM");
/// assert_eq!(reference.node, "LambdaExecutionRole");
/// assert_eq!(reference.attribute, "arn");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub stack: String,
    pub node: String,
    pub attribute: String,
}

impl Reference {
    pub fn new(
        stack: impl Into<String>,
        node: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            node: node.into(),
            attribute: attribute.into(),
        }
    }

    /// Reference to the primary identifier of a node.
    pub fn id_of(stack: impl Into<String>, node: impl Into<String>) -> Self {
        Self::new(stack, node, ID_ATTRIBUTE)
    }

    /// True when the reference points outside `stack`.
    pub fn is_cross_stack(&self, stack: &str) -> bool {
        self.stack != stack
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.stack, self.node, self.attribute)
    }
}

/// Raised when a reference string is not of the form `stack.node.attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid reference '{input}': expected '<stack>.<node>.<attribute>'")]
pub struct ReferenceParseError {
    pub input: String,
}

impl FromStr for Reference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [stack, node, attribute]
                if !stack.is_empty() && !node.is_empty() && !attribute.is_empty() =>
            {
                Ok(Reference::new(*stack, *node, *attribute))
            }
            _ => Err(ReferenceParseError {
                input: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        value.to_string()
    }
}
