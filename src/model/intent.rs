// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::node::{ResourceKind, ResourceNode};

/// IP protocol of an ingress rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
    All,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "all",
        };
        f.write_str(name)
    }
}

/// Picks security group nodes by stack, id and labels.
///
/// Every criterion that is set must hold. In declaration files a bare string
/// is shorthand for an id selector:
///
/// ```yaml
/// source: LambdaSecurityGroup
/// destination:
///   stack: RealWorldServerless-Infrastructure
///   labels: { tier: data }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectorForm")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorForm {
    Id(String),
    Full {
        #[serde(default)]
        stack: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
}

impl From<SelectorForm> for Selector {
    fn from(form: SelectorForm) -> Self {
        match form {
            SelectorForm::Id(id) => Selector::id(id),
            SelectorForm::Full { stack, id, labels } => Selector { stack, id, labels },
        }
    }
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Selector {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Selector::default().with_label(key, value)
    }

    pub fn in_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether `node` is a security group satisfying every criterion.
    pub fn matches(&self, node: &ResourceNode) -> bool {
        node.kind == ResourceKind::SecurityGroup
            && self.stack.as_deref().map_or(true, |s| s == node.owner_stack)
            && self.id.as_deref().map_or(true, |id| id == node.id)
            && self
                .labels
                .iter()
                .all(|(k, v)| node.labels.get(k) == Some(v))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(stack) = &self.stack {
            parts.push(format!("stack={}", stack));
        }
        if let Some(id) = &self.id {
            parts.push(format!("id={}", id));
        }
        for (k, v) in &self.labels {
            parts.push(format!("{}={}", k, v));
        }
        if parts.is_empty() {
            write!(f, "[any security group]")
        } else {
            write!(f, "[{}]", parts.join(", "))
        }
    }
}

/// Declarative "allow source to reach destination on port" statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIntent {
    pub source: Selector,
    pub destination: Selector,
    pub port: u16,
    /// Upper end of a port range; defaults to `port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<u16>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityIntent {
    pub fn allow(source: Selector, destination: Selector, port: u16) -> Self {
        Self {
            source,
            destination,
            port,
            to_port: None,
            protocol: Protocol::Tcp,
            description: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn through_port(mut self, to_port: u16) -> Self {
        self.to_port = Some(to_port);
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn port_range(&self) -> (u16, u16) {
        (self.port, self.to_port.unwrap_or(self.port))
    }
}
