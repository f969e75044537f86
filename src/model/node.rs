// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::reference::Reference;

/// The closed set of resource kinds a stack may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnet,
    SecurityGroup,
    SecurityRule,
    IamRole,
    IamPolicy,
    IamGroup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::SecurityRule => "security_rule",
            ResourceKind::IamRole => "iam_role",
            ResourceKind::IamPolicy => "iam_policy",
            ResourceKind::IamGroup => "iam_group",
        };
        f.write_str(name)
    }
}

/// A declared property value.
///
/// In YAML a reference is written as `{ ref: "<stack>.<node>.<attribute>" }`
/// and may appear at any depth inside lists and maps:
///
/// ```yaml
/// statements:
///   - effect: Allow
///     actions: ["sts:AssumeRole"]
///     resources:
///       - { ref: "RealWorldServerless-IAM.LambdaExecutionRole.arn" }
/// ```
///
/// A map whose only key is `ref` is always a reference; a malformed target is
/// a parse error rather than a literal map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Reference(#[serde(serialize_with = "serialize_reference")] Reference),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Literal(serde_json::Value),
}

const REFERENCE_KEY: &str = "ref";

fn serialize_reference<S: Serializer>(reference: &Reference, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(REFERENCE_KEY, reference)?;
    map.end()
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        PropertyValue::from_raw(raw).map_err(de::Error::custom)
    }
}

impl PropertyValue {
    fn from_raw(raw: serde_json::Value) -> Result<Self, String> {
        match raw {
            serde_json::Value::Object(entries)
                if entries.len() == 1 && entries.contains_key(REFERENCE_KEY) =>
            {
                match entries.get(REFERENCE_KEY) {
                    Some(serde_json::Value::String(target)) => target
                        .parse::<Reference>()
                        .map(PropertyValue::Reference)
                        .map_err(|e| e.to_string()),
                    other => Err(format!(
                        "invalid reference {}: expected '<stack>.<node>.<attribute>'",
                        other.map(ToString::to_string).unwrap_or_default()
                    )),
                }
            }
            serde_json::Value::Object(entries) => entries
                .into_iter()
                .map(|(key, value)| PropertyValue::from_raw(value).map(|v| (key, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(PropertyValue::Map),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(PropertyValue::from_raw)
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::List),
            scalar => Ok(PropertyValue::Literal(scalar)),
        }
    }

    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        PropertyValue::Literal(value.into())
    }

    /// Every reference contained in this value, depth first.
    pub fn references(&self) -> Vec<&Reference> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a Reference>) {
        match self {
            PropertyValue::Reference(reference) => found.push(reference),
            PropertyValue::List(items) => items.iter().for_each(|i| i.collect_references(found)),
            PropertyValue::Map(entries) => entries.values().for_each(|v| v.collect_references(found)),
            PropertyValue::Literal(_) => {}
        }
    }
}

impl From<Reference> for PropertyValue {
    fn from(reference: Reference) -> Self {
        PropertyValue::Reference(reference)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::literal(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::literal(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::literal(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::literal(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::List(items)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyValue {
    fn from(entries: BTreeMap<String, PropertyValue>) -> Self {
        PropertyValue::Map(entries)
    }
}

/// A single declared infrastructure resource.
///
/// `owner_stack` is filled in when the node is added to a [`Stack`](super::Stack);
/// it is not part of the declaration format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip)]
    pub owner_stack: String,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: BTreeMap::new(),
            labels: BTreeMap::new(),
            owner_stack: String::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// All references held by this node's properties, in property-name order.
    pub fn references(&self) -> Vec<&Reference> {
        self.properties
            .values()
            .flat_map(PropertyValue::references)
            .collect()
    }
}
