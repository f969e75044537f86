// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of declarations.
//!
//! Validation runs before any ordering or provisioning and accumulates every
//! problem it finds, so a single pass reports all of them:
//!
//! 1. **Uniqueness**: stack names are unique; node ids are unique per stack
//! 2. **Explicit dependencies**: every `depends_on` entry names a declared stack
//! 3. **Node references**: each reference resolves to an earlier node of the
//!    same stack, or to an attribute another stack exports
//! 4. **Outputs**: each output points at a node of its own stack
//!
//! Cycle detection is not done here; it needs a graph whose edges all point at
//! real stacks, so the builder only attempts it after this pass succeeds.
//!
//! # Example
//! ```
//! use stackwood::errors::{DeclarationError, UnresolvedReason};
//! use stackwood::graph::validate_declarations;
//! use stackwood::model::{Declarations, Reference, ResourceKind, ResourceNode, Stack};
//!
//! let network = Stack::new("Network").with_node(
//!     ResourceNode::new("LambdaSecurityGroup", ResourceKind::SecurityGroup)
//!         .with_property("vpc_id", Reference::id_of("Shared", "Vpc")),
//! );
//! let declarations = Declarations::new().with_stack(network);
//!
//! let errors = validate_declarations(&declarations).unwrap_err();
//! assert!(matches!(
//!     errors[0],
//!     DeclarationError::UnresolvedReference { reason: UnresolvedReason::MissingStack, .. }
//! ));
//! ```

use std::collections::HashSet;

use crate::errors::{DeclarationError, UnresolvedReason};
use crate::model::{Declarations, Reference, ResourceNode, Stack};

/// Validate every structural rule, returning all violations found.
pub fn validate_declarations(declarations: &Declarations) -> Result<(), Vec<DeclarationError>> {
    let mut errors = Vec::new();

    errors.extend(duplicate_names(declarations));
    errors.extend(unknown_dependencies(declarations));

    for stack in &declarations.stacks {
        for (index, node) in stack.nodes.iter().enumerate() {
            errors.extend(
                node.references()
                    .into_iter()
                    .filter_map(|r| check_node_reference(declarations, stack, index, node, r)),
            );
        }
        errors.extend(invalid_outputs(stack));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn duplicate_names(declarations: &Declarations) -> Vec<DeclarationError> {
    let mut errors = Vec::new();
    let mut stacks = HashSet::new();

    for stack in &declarations.stacks {
        if !stacks.insert(stack.name.as_str()) {
            errors.push(DeclarationError::DuplicateStack {
                stack: stack.name.clone(),
            });
        }

        let mut nodes = HashSet::new();
        for node in &stack.nodes {
            if !nodes.insert(node.id.as_str()) {
                errors.push(DeclarationError::DuplicateNode {
                    stack: stack.name.clone(),
                    node: node.id.clone(),
                });
            }
        }
    }

    errors
}

fn unknown_dependencies(declarations: &Declarations) -> Vec<DeclarationError> {
    let known: HashSet<&str> = declarations.stacks.iter().map(|s| s.name.as_str()).collect();

    declarations
        .stacks
        .iter()
        .flat_map(|stack| {
            stack
                .depends_on
                .iter()
                .filter(|d| !known.contains(d.as_str()))
                .map(|d| DeclarationError::UnknownDependency {
                    stack: stack.name.clone(),
                    dependency: d.clone(),
                })
        })
        .collect()
}

fn check_node_reference(
    declarations: &Declarations,
    stack: &Stack,
    index: usize,
    node: &ResourceNode,
    reference: &Reference,
) -> Option<DeclarationError> {
    let unresolved = |reason| DeclarationError::UnresolvedReference {
        stack: stack.name.clone(),
        node: node.id.clone(),
        reference: reference.to_string(),
        reason,
    };

    if !reference.is_cross_stack(&stack.name) {
        return match stack.node_index(&reference.node) {
            None => Some(unresolved(UnresolvedReason::MissingNode)),
            Some(target) if target >= index => Some(DeclarationError::ForwardReference {
                stack: stack.name.clone(),
                node: node.id.clone(),
                target: reference.node.clone(),
            }),
            Some(_) => None,
        };
    }

    let Some(target) = declarations.stack(&reference.stack) else {
        return Some(unresolved(UnresolvedReason::MissingStack));
    };
    if target.node(&reference.node).is_none() {
        return Some(unresolved(UnresolvedReason::MissingNode));
    }
    if target
        .export_for(&reference.node, &reference.attribute)
        .is_none()
    {
        return Some(unresolved(UnresolvedReason::NotExported));
    }
    None
}

fn invalid_outputs(stack: &Stack) -> Vec<DeclarationError> {
    let mut errors = Vec::new();
    for (name, output) in &stack.outputs {
        for reference in output.source.references() {
            let reason = if reference.is_cross_stack(&stack.name) {
                UnresolvedReason::ForeignOutput
            } else if stack.node(&reference.node).is_none() {
                UnresolvedReason::MissingNode
            } else {
                continue;
            };
            errors.push(DeclarationError::UnresolvedReference {
                stack: stack.name.clone(),
                node: name.clone(),
                reference: reference.to_string(),
                reason,
            });
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutputSource, ResourceKind};

    fn iam() -> Stack {
        Stack::new("IAM")
            .with_node(ResourceNode::new("LambdaExecutionRole", ResourceKind::IamRole))
            .with_output(
                "roleArn",
                Reference::new("IAM", "LambdaExecutionRole", "arn"),
                "Lambda execution role ARN",
            )
    }

    fn network_referencing(reference: Reference) -> Stack {
        Stack::new("Network")
            .with_node(ResourceNode::new("Vpc", ResourceKind::Network))
            .with_node(
                ResourceNode::new("LambdaSecurityGroup", ResourceKind::SecurityGroup)
                    .with_property("vpc_id", Reference::id_of("Network", "Vpc"))
                    .with_property("role", reference),
            )
    }

    #[test]
    fn test_valid_cross_stack_reference() {
        let declarations = Declarations::new()
            .with_stack(iam())
            .with_stack(network_referencing(Reference::new("IAM", "LambdaExecutionRole", "arn")));
        assert!(validate_declarations(&declarations).is_ok());
    }

    #[test]
    fn test_unexported_attribute_is_unresolved() {
        let declarations = Declarations::new()
            .with_stack(iam())
            .with_stack(network_referencing(Reference::id_of("IAM", "LambdaExecutionRole")));
        let errors = validate_declarations(&declarations).unwrap_err();
        assert_eq!(
            errors,
            vec![DeclarationError::UnresolvedReference {
                stack: "Network".into(),
                node: "LambdaSecurityGroup".into(),
                reference: "IAM.LambdaExecutionRole.id".into(),
                reason: UnresolvedReason::NotExported,
            }]
        );
    }

    #[test]
    fn test_missing_stack_and_node() {
        let declarations = Declarations::new()
            .with_stack(iam())
            .with_stack(network_referencing(Reference::new("IAM", "NoSuchRole", "arn")))
            .with_stack(
                Stack::new("App").with_node(
                    ResourceNode::new("Role", ResourceKind::IamRole)
                        .with_property("boundary", Reference::new("Ghost", "Policy", "arn")),
                ),
            );
        let reasons: Vec<UnresolvedReason> = validate_declarations(&declarations)
            .unwrap_err()
            .into_iter()
            .filter_map(|e| match e {
                DeclarationError::UnresolvedReference { reason, .. } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![UnresolvedReason::MissingNode, UnresolvedReason::MissingStack]
        );
    }

    #[test]
    fn test_forward_and_self_references() {
        let stack = Stack::new("Network")
            .with_node(
                ResourceNode::new("Subnet", ResourceKind::Subnet)
                    .with_property("vpc_id", Reference::id_of("Network", "Vpc")),
            )
            .with_node(
                ResourceNode::new("Vpc", ResourceKind::Network)
                    .with_property("self", Reference::id_of("Network", "Vpc")),
            );
        let errors = validate_declarations(&Declarations::new().with_stack(stack)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, DeclarationError::ForwardReference { target, .. } if target == "Vpc")));
    }

    #[test]
    fn test_duplicates_and_unknown_dependencies_accumulate() {
        let declarations = Declarations::new()
            .with_stack(
                Stack::new("IAM")
                    .with_node(ResourceNode::new("Role", ResourceKind::IamRole))
                    .with_node(ResourceNode::new("Role", ResourceKind::IamRole)),
            )
            .with_stack(Stack::new("IAM"))
            .with_stack(Stack::new("Network").depends_on("Missing"));

        let errors = validate_declarations(&declarations).unwrap_err();
        assert!(errors.contains(&DeclarationError::DuplicateStack { stack: "IAM".into() }));
        assert!(errors.contains(&DeclarationError::DuplicateNode {
            stack: "IAM".into(),
            node: "Role".into()
        }));
        assert!(errors.contains(&DeclarationError::UnknownDependency {
            stack: "Network".into(),
            dependency: "Missing".into()
        }));
    }

    #[test]
    fn test_outputs_must_reference_own_nodes() {
        let stack = Stack::new("Network")
            .with_node(ResourceNode::new("Vpc", ResourceKind::Network))
            .with_output("VpcId", Reference::id_of("Network", "Vpc"), "VPC")
            .with_output("Foreign", Reference::id_of("IAM", "Role"), "not ours")
            .with_output(
                "Subnets",
                OutputSource::join(vec![Reference::id_of("Network", "Missing")], ","),
                "subnets",
            );
        let errors = validate_declarations(&Declarations::new().with_stack(stack)).unwrap_err();
        let reasons: Vec<(String, UnresolvedReason)> = errors
            .into_iter()
            .filter_map(|e| match e {
                DeclarationError::UnresolvedReference { node, reason, .. } => Some((node, reason)),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("Foreign".to_string(), UnresolvedReason::ForeignOutput),
                ("Subnets".to_string(), UnresolvedReason::MissingNode),
            ]
        );
    }
}
