// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::intent::SecurityIntent;
use super::node::ResourceNode;
use super::reference::Reference;

/// Where a stack output takes its value from.
///
/// `Join` concatenates several attribute values with a separator, e.g. a
/// comma-separated list of subnet identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputSource {
    Reference {
        #[serde(rename = "ref")]
        reference: Reference,
    },
    Join {
        join: Vec<Reference>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    ",".to_string()
}

impl OutputSource {
    pub fn join(references: Vec<Reference>, separator: impl Into<String>) -> Self {
        OutputSource::Join {
            join: references,
            separator: separator.into(),
        }
    }

    pub fn references(&self) -> Vec<&Reference> {
        match self {
            OutputSource::Reference { reference } => vec![reference],
            OutputSource::Join { join, .. } => join.iter().collect(),
        }
    }
}

impl From<Reference> for OutputSource {
    fn from(reference: Reference) -> Self {
        OutputSource::Reference { reference }
    }
}

/// A stack output as declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDeclaration {
    #[serde(flatten)]
    pub source: OutputSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named, ordered collection of resource nodes provisioned as one unit.
///
/// `depends_on` holds only the explicitly declared dependencies. The effective
/// dependency set also includes every stack that a node reference points into;
/// see [`Stack::referenced_stacks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<ResourceNode>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputDeclaration>,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            outputs: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a node, taking ownership of it for this stack.
    pub fn with_node(mut self, node: ResourceNode) -> Self {
        self.push_node(node);
        self
    }

    pub fn push_node(&mut self, mut node: ResourceNode) {
        node.owner_stack = self.name.clone();
        self.nodes.push(node);
    }

    pub fn with_output(
        mut self,
        name: impl Into<String>,
        source: impl Into<OutputSource>,
        description: impl Into<String>,
    ) -> Self {
        self.outputs.insert(
            name.into(),
            OutputDeclaration {
                source: source.into(),
                description: Some(description.into()),
            },
        );
        self
    }

    pub fn depends_on(mut self, stack: impl Into<String>) -> Self {
        self.depends_on.insert(stack.into());
        self
    }

    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position of a node in declaration order.
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Stacks other than this one that any node property references.
    pub fn referenced_stacks(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .flat_map(|n| n.references())
            .filter(|r| r.is_cross_stack(&self.name))
            .map(|r| r.stack.clone())
            .collect()
    }

    /// Name of the output that exports `(node, attribute)`, if any.
    ///
    /// Only single-reference outputs count as exports for cross-stack lookups.
    pub fn export_for(&self, node: &str, attribute: &str) -> Option<&str> {
        self.outputs.iter().find_map(|(name, output)| match &output.source {
            OutputSource::Reference { reference: r } if r.node == node && r.attribute == attribute => {
                Some(name.as_str())
            }
            _ => None,
        })
    }

    /// Restore `owner_stack` on every node after deserialization.
    pub(crate) fn adopt_nodes(&mut self) {
        for node in &mut self.nodes {
            node.owner_stack = self.name.clone();
        }
    }
}

/// The complete static input to a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub stacks: Vec<Stack>,
    #[serde(default)]
    pub intents: Vec<SecurityIntent>,
    /// Passed through to the provider with every request.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(mut self, stack: Stack) -> Self {
        self.stacks.push(stack);
        self
    }

    pub fn with_intent(mut self, intent: SecurityIntent) -> Self {
        self.intents.push(intent);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub(crate) fn adopt_nodes(&mut self) {
        self.stacks.iter_mut().for_each(Stack::adopt_nodes);
    }
}
