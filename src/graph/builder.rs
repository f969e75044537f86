// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::composer::SecurityRuleComposer;
use crate::errors::DeclarationError;
use crate::model::{Declarations, Reference, Stack};
use crate::observability::messages::graph::{DeclarationRejected, ProvisioningOrderComputed};
use crate::observability::messages::StructuredLog;

use super::dependency_graph::DependencyGraph;
use super::validation::validate_declarations;

/// A validated, ordered view of the declarations, ready to provision.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningPlan {
    /// Stack names, every dependency before its dependents.
    pub order: Vec<String>,
    /// Stacks by name, including composed security rules.
    pub stacks: BTreeMap<String, Stack>,
    pub graph: DependencyGraph,
    /// Effective dependencies: explicit `depends_on` plus referenced stacks.
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
    /// stack -> node -> references held by that node.
    pub references: BTreeMap<String, BTreeMap<String, Vec<Reference>>>,
    /// Tags passed through to every provider request.
    pub tags: BTreeMap<String, String>,
}

impl ProvisioningPlan {
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(name)
    }

    pub fn node_count(&self) -> usize {
        self.stacks.values().map(|s| s.nodes.len()).sum()
    }

    pub fn references_of(&self, stack: &str, node: &str) -> &[Reference] {
        self.references
            .get(stack)
            .and_then(|nodes| nodes.get(node))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct dependencies of a stack.
    pub fn dependencies_of(&self, stack: &str) -> impl Iterator<Item = &String> {
        self.dependencies.get(stack).into_iter().flatten()
    }
}

/// Turns declarations into a [`ProvisioningPlan`].
///
/// The builder composes security rules, validates the result, derives the
/// stack dependency graph and orders it. Any failure is structural: the errors
/// are returned together and nothing is provisioned.
///
/// ```
/// use stackwood::graph::DependencyGraphBuilder;
/// use stackwood::model::{Declarations, Stack};
///
/// let declarations = Declarations::new()
///     .with_stack(Stack::new("Network").depends_on("IAM"))
///     .with_stack(Stack::new("IAM"));
///
/// let plan = DependencyGraphBuilder::build(&declarations).unwrap();
/// assert_eq!(plan.order, vec!["IAM", "Network"]);
/// ```
pub struct DependencyGraphBuilder;

impl DependencyGraphBuilder {
    pub fn build(declarations: &Declarations) -> Result<ProvisioningPlan, Vec<DeclarationError>> {
        Self::plan(declarations).map_err(|errors| {
            for error in &errors {
                DeclarationRejected { error }.log();
            }
            errors
        })
    }

    fn plan(declarations: &Declarations) -> Result<ProvisioningPlan, Vec<DeclarationError>> {
        let expanded = match SecurityRuleComposer::expand(declarations) {
            Ok(expanded) => expanded,
            Err(mut errors) => {
                // Report problems in the hand-written declarations alongside
                // the selectors that failed.
                if let Err(more) = validate_declarations(declarations) {
                    errors.extend(more);
                }
                return Err(errors);
            }
        };

        validate_declarations(&expanded)?;

        let dependencies = effective_dependencies(&expanded);
        let graph = dependency_graph(&dependencies);
        let order = graph.topological_order().map_err(|cycles| {
            cycles
                .into_iter()
                .map(|stacks| DeclarationError::CyclicDependency { stacks })
                .collect::<Vec<_>>()
        })?;

        let references: BTreeMap<String, BTreeMap<String, Vec<Reference>>> = expanded
            .stacks
            .iter()
            .map(|stack| {
                let nodes: BTreeMap<String, Vec<Reference>> = stack
                    .nodes
                    .iter()
                    .map(|n| (n.id.clone(), n.references().into_iter().cloned().collect()))
                    .collect();
                (stack.name.clone(), nodes)
            })
            .collect();

        let plan = ProvisioningPlan {
            order,
            stacks: expanded
                .stacks
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            graph,
            dependencies,
            references,
            tags: expanded.tags,
        };

        ProvisioningOrderComputed {
            order: &plan.order,
            node_count: plan.node_count(),
        }
        .log();

        Ok(plan)
    }
}

/// Explicit dependencies plus every stack a node reference points into.
fn effective_dependencies(declarations: &Declarations) -> BTreeMap<String, BTreeSet<String>> {
    declarations
        .stacks
        .iter()
        .map(|stack| {
            let mut dependencies = stack.depends_on.clone();
            dependencies.extend(stack.referenced_stacks());
            (stack.name.clone(), dependencies)
        })
        .collect()
}

fn dependency_graph(dependencies: &BTreeMap<String, BTreeSet<String>>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (stack, stack_dependencies) in dependencies {
        graph.add_stack(stack.clone());
        for dependency in stack_dependencies {
            graph.add_edge(dependency.clone(), stack.clone());
        }
    }
    graph
}
