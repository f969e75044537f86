// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::errors::{DeclarationError, SelectorSide};
use crate::model::{
    Declarations, Protocol, Reference, ResourceKind, ResourceNode, SecurityIntent, Selector,
};
use crate::observability::messages::graph::{DuplicateRuleCollapsed, SecurityRulesComposed};
use crate::observability::messages::StructuredLog;

/// Rule nodes produced from a set of intents.
#[derive(Debug, Clone, Default)]
pub struct ComposedRules {
    /// SecurityRule nodes, each owned by its destination group's stack.
    pub rules: Vec<ResourceNode>,
    /// Number of expanded rules dropped as exact duplicates.
    pub collapsed: usize,
}

/// Identity of a rule for deduplication. The description is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    destination_stack: String,
    destination: String,
    protocol: Protocol,
    from_port: u16,
    to_port: u16,
    source_stack: String,
    source: String,
}

/// Expands declarative security intents into concrete ingress rules.
///
/// Every intent yields one rule per (source match, destination match) pair,
/// attached to the destination group. A selector matching nothing is an
/// error; a selector matching several groups fans out.
pub struct SecurityRuleComposer;

impl SecurityRuleComposer {
    /// Compose rule nodes for every intent in `declarations`.
    ///
    /// All empty selectors are reported together.
    pub fn compose(declarations: &Declarations) -> Result<ComposedRules, Vec<DeclarationError>> {
        let groups: Vec<&ResourceNode> = declarations
            .stacks
            .iter()
            .flat_map(|s| s.nodes.iter())
            .filter(|n| n.kind == ResourceKind::SecurityGroup)
            .collect();

        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut composed = ComposedRules::default();

        for (index, intent) in declarations.intents.iter().enumerate() {
            let sources = select(&groups, &intent.source);
            let destinations = select(&groups, &intent.destination);

            if sources.is_empty() {
                errors.push(empty_selector(index, SelectorSide::Source, &intent.source));
            }
            if destinations.is_empty() {
                errors.push(empty_selector(index, SelectorSide::Destination, &intent.destination));
            }

            for destination in &destinations {
                for source in &sources {
                    let (from_port, to_port) = intent.port_range();
                    let key = RuleKey {
                        destination_stack: destination.owner_stack.clone(),
                        destination: destination.id.clone(),
                        protocol: intent.protocol,
                        from_port,
                        to_port,
                        source_stack: source.owner_stack.clone(),
                        source: source.id.clone(),
                    };

                    let rule = build_rule(intent, source, destination);
                    if !seen.insert(key) {
                        DuplicateRuleCollapsed {
                            rule_id: &rule.id,
                            stack: &destination.owner_stack,
                        }
                        .log();
                        composed.collapsed += 1;
                        continue;
                    }
                    composed.rules.push(rule);
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        SecurityRulesComposed {
            intent_count: declarations.intents.len(),
            rule_count: composed.rules.len(),
            collapsed: composed.collapsed,
        }
        .log();

        Ok(composed)
    }

    /// Copy of `declarations` with the composed rules appended to their
    /// destination stacks. Intents are kept for reference.
    pub fn expand(declarations: &Declarations) -> Result<Declarations, Vec<DeclarationError>> {
        let composed = Self::compose(declarations)?;
        let mut expanded = declarations.clone();

        for rule in composed.rules {
            if let Some(stack) = expanded
                .stacks
                .iter_mut()
                .find(|s| s.name == rule.owner_stack)
            {
                stack.push_node(rule);
            }
        }

        Ok(expanded)
    }
}

fn select<'a>(groups: &[&'a ResourceNode], selector: &Selector) -> Vec<&'a ResourceNode> {
    groups
        .iter()
        .copied()
        .filter(|n| selector.matches(n))
        .collect()
}

fn empty_selector(intent: usize, side: SelectorSide, selector: &Selector) -> DeclarationError {
    DeclarationError::EmptySelector {
        intent,
        side,
        selector: selector.to_string(),
    }
}

fn rule_id(intent: &SecurityIntent, source: &ResourceNode, destination: &ResourceNode) -> String {
    let (from_port, to_port) = intent.port_range();
    let ports = if from_port == to_port {
        from_port.to_string()
    } else {
        format!("{}-{}", from_port, to_port)
    };
    let source_name = if source.owner_stack == destination.owner_stack {
        source.id.clone()
    } else {
        format!("{}-{}", source.owner_stack, source.id)
    };
    format!(
        "{}-ingress-{}-{}-from-{}",
        destination.id, intent.protocol, ports, source_name
    )
}

fn build_rule(intent: &SecurityIntent, source: &ResourceNode, destination: &ResourceNode) -> ResourceNode {
    let (from_port, to_port) = intent.port_range();
    let mut rule = ResourceNode::new(rule_id(intent, source, destination), ResourceKind::SecurityRule)
        .with_property("direction", "ingress")
        .with_property("protocol", intent.protocol.to_string())
        .with_property("from_port", i64::from(from_port))
        .with_property("to_port", i64::from(to_port))
        .with_property(
            "group_id",
            Reference::id_of(&destination.owner_stack, &destination.id),
        )
        .with_property(
            "source_group_id",
            Reference::id_of(&source.owner_stack, &source.id),
        );
    if let Some(description) = &intent.description {
        rule = rule.with_property("description", description.as_str());
    }
    rule.owner_stack = destination.owner_stack.clone();
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyValue, Stack};

    fn network() -> Stack {
        Stack::new("Network")
            .with_node(ResourceNode::new("vpc", ResourceKind::Network))
            .with_node(
                ResourceNode::new("lambda-sg", ResourceKind::SecurityGroup)
                    .with_label("role", "lambda"),
            )
            .with_node(
                ResourceNode::new("worker-sg", ResourceKind::SecurityGroup)
                    .with_label("role", "lambda"),
            )
            .with_node(ResourceNode::new("db-sg", ResourceKind::SecurityGroup))
    }

    fn postgres(source: Selector) -> SecurityIntent {
        SecurityIntent::allow(source, Selector::id("db-sg"), 5432)
            .described("Allow access from Lambda functions to PostgreSQL")
    }

    #[test]
    fn test_single_intent_expands_to_one_ingress_rule() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(postgres(Selector::id("lambda-sg")));

        let composed = SecurityRuleComposer::compose(&declarations).unwrap();
        assert_eq!(composed.rules.len(), 1);

        let rule = &composed.rules[0];
        assert_eq!(rule.kind, ResourceKind::SecurityRule);
        assert_eq!(rule.owner_stack, "Network");
        assert_eq!(rule.properties["direction"], PropertyValue::literal("ingress"));
        assert_eq!(rule.properties["protocol"], PropertyValue::literal("tcp"));
        assert_eq!(rule.properties["from_port"], PropertyValue::literal(5432));
        assert_eq!(rule.properties["to_port"], PropertyValue::literal(5432));
        assert_eq!(
            rule.properties["group_id"],
            PropertyValue::Reference(Reference::id_of("Network", "db-sg"))
        );
        assert_eq!(
            rule.properties["source_group_id"],
            PropertyValue::Reference(Reference::id_of("Network", "lambda-sg"))
        );
    }

    #[test]
    fn test_duplicate_intent_collapses() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(postgres(Selector::id("lambda-sg")))
            .with_intent(
                SecurityIntent::allow(Selector::id("lambda-sg"), Selector::id("db-sg"), 5432)
                    .described("same rule, different words"),
            );

        let composed = SecurityRuleComposer::compose(&declarations).unwrap();
        assert_eq!(composed.rules.len(), 1);
        assert_eq!(composed.collapsed, 1);
        assert_eq!(
            composed.rules[0].properties["description"],
            PropertyValue::literal("Allow access from Lambda functions to PostgreSQL")
        );
    }

    #[test]
    fn test_different_ports_are_distinct_rules() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(postgres(Selector::id("lambda-sg")))
            .with_intent(SecurityIntent::allow(
                Selector::id("lambda-sg"),
                Selector::id("db-sg"),
                27017,
            ));

        let composed = SecurityRuleComposer::compose(&declarations).unwrap();
        assert_eq!(composed.rules.len(), 2);
        assert_ne!(composed.rules[0].id, composed.rules[1].id);
    }

    #[test]
    fn test_label_selector_fans_out() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(postgres(Selector::label("role", "lambda")));

        let composed = SecurityRuleComposer::compose(&declarations).unwrap();
        let sources: Vec<&PropertyValue> = composed
            .rules
            .iter()
            .map(|r| &r.properties["source_group_id"])
            .collect();
        assert_eq!(
            sources,
            vec![
                &PropertyValue::Reference(Reference::id_of("Network", "lambda-sg")),
                &PropertyValue::Reference(Reference::id_of("Network", "worker-sg")),
            ]
        );
    }

    #[test]
    fn test_empty_selectors_are_errors() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(SecurityIntent::allow(
                Selector::id("missing-sg"),
                Selector::id("vpc"),
                80,
            ));

        let errors = SecurityRuleComposer::compose(&declarations).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[0],
            DeclarationError::EmptySelector { intent: 0, side: SelectorSide::Source, .. }
        ));
        assert!(matches!(
            errors[1],
            DeclarationError::EmptySelector { side: SelectorSide::Destination, .. }
        ));
    }

    #[test]
    fn test_expand_appends_rules_to_destination_stack() {
        let declarations = Declarations::new()
            .with_stack(network())
            .with_intent(postgres(Selector::id("lambda-sg")));

        let expanded = SecurityRuleComposer::expand(&declarations).unwrap();
        let stack = expanded.stack("Network").unwrap();
        assert_eq!(stack.nodes.len(), 5);
        assert_eq!(
            stack.nodes.last().unwrap().id,
            "db-sg-ingress-tcp-5432-from-lambda-sg"
        );
    }

    #[test]
    fn test_cross_stack_source_gets_qualified_id() {
        let shared = Stack::new("Shared")
            .with_node(ResourceNode::new("lambda-sg", ResourceKind::SecurityGroup));
        let data = Stack::new("Data").with_node(ResourceNode::new("db-sg", ResourceKind::SecurityGroup));
        let declarations = Declarations::new()
            .with_stack(shared)
            .with_stack(data)
            .with_intent(SecurityIntent::allow(
                Selector::id("lambda-sg"),
                Selector::id("db-sg"),
                5432,
            ));

        let composed = SecurityRuleComposer::compose(&declarations).unwrap();
        assert_eq!(composed.rules[0].id, "db-sg-ingress-tcp-5432-from-Shared-lambda-sg");
        assert_eq!(composed.rules[0].owner_stack, "Data");
    }
}
