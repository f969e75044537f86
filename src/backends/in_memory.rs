// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::config::consts::{DEFAULT_ACCOUNT_ID, DEFAULT_REGION};
use crate::errors::ProviderError;
use crate::model::ResourceKind;
use crate::traits::{ProvisionedResource, ResourceProvider, ResourceRequest};

#[derive(Debug, Clone)]
struct StoredResource {
    kind: ResourceKind,
    owner: (String, String),
    resource: ProvisionedResource,
}

#[derive(Debug, Default)]
struct Inventory {
    resources: BTreeMap<String, StoredResource>,
    by_node: BTreeMap<(String, String), String>,
    counters: BTreeMap<ResourceKind, u64>,
}

/// A provider that keeps resources in memory and mints identifiers shaped like
/// the real cloud's.
///
/// Identifiers are deterministic: the n-th network is always `vpc-…0n`, IAM
/// resources are identified by name and get an ARN in the configured account.
/// Creating the same `(stack, node)` again converges the existing resource to
/// the new properties instead of creating a second one.
///
/// ```
/// use std::collections::BTreeMap;
/// use stackwood::backends::InMemoryProvider;
/// use stackwood::model::ResourceKind;
/// use stackwood::traits::{ResourceProvider, ResourceRequest};
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = InMemoryProvider::new().with_account("123456789012");
/// let request = ResourceRequest {
///     stack: "IAM".to_string(),
///     node_id: "LambdaExecutionRole".to_string(),
///     kind: ResourceKind::IamRole,
///     properties: BTreeMap::new(),
///     tags: BTreeMap::new(),
/// };
///
/// let role = provider.create(&request).await.unwrap();
/// assert_eq!(
///     role.attribute("arn").unwrap(),
///     "arn:aws:iam::123456789012:role/LambdaExecutionRole"
/// );
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryProvider {
    account_id: String,
    region: String,
    inventory: Mutex<Inventory>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            inventory: Mutex::new(Inventory::default()),
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Number of live resources.
    pub async fn len(&self) -> usize {
        self.inventory.lock().await.resources.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Identifier of the resource created for a declared node, if any.
    pub async fn identifier_of(&self, stack: &str, node: &str) -> Option<String> {
        self.inventory
            .lock()
            .await
            .by_node
            .get(&(stack.to_string(), node.to_string()))
            .cloned()
    }

    fn mint_identifier(&self, inventory: &mut Inventory, request: &ResourceRequest) -> String {
        let serial = inventory.counters.entry(request.kind).or_insert(0);
        *serial += 1;
        let prefix = match request.kind {
            ResourceKind::Network => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "sg",
            ResourceKind::SecurityRule => "sgr",
            ResourceKind::IamRole | ResourceKind::IamPolicy | ResourceKind::IamGroup => {
                return iam_name(request);
            }
        };
        format!("{}-{:017x}", prefix, serial)
    }

    /// Resolved properties plus the attributes the cloud would compute.
    fn describe_resource(&self, identifier: &str, request: &ResourceRequest) -> ProvisionedResource {
        let mut resource = ProvisionedResource {
            identifier: identifier.to_string(),
            attributes: request.properties.clone(),
        };

        let iam_path = match request.kind {
            ResourceKind::IamRole => Some("role"),
            ResourceKind::IamPolicy => Some("policy"),
            ResourceKind::IamGroup => Some("group"),
            _ => None,
        };
        if let Some(path) = iam_path {
            resource = resource
                .with_attribute("name", identifier)
                .with_attribute(
                    "arn",
                    format!("arn:aws:iam::{}:{}/{}", self.account_id, path, identifier),
                );
        } else {
            resource = resource.with_attribute(
                "arn",
                format!(
                    "arn:aws:ec2:{}:{}:{}/{}",
                    self.region,
                    self.account_id,
                    ec2_path(request.kind),
                    identifier
                ),
            );
        }
        resource.with_attribute("region", self.region.clone())
    }
}

/// IAM resources are named by their `name` property, else by node id.
fn iam_name(request: &ResourceRequest) -> String {
    request
        .properties
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| request.node_id.clone())
}

fn ec2_path(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Network => "vpc",
        ResourceKind::Subnet => "subnet",
        ResourceKind::SecurityGroup => "security-group",
        ResourceKind::SecurityRule => "security-group-rule",
        _ => "resource",
    }
}

#[async_trait]
impl ResourceProvider for InMemoryProvider {
    async fn create(&self, request: &ResourceRequest) -> Result<ProvisionedResource, ProviderError> {
        let mut inventory = self.inventory.lock().await;
        let owner = (request.stack.clone(), request.node_id.clone());

        let existing = inventory.by_node.get(&owner).cloned();
        let identifier = match existing {
            Some(existing) => existing,
            None => {
                let identifier = self.mint_identifier(&mut inventory, request);
                if inventory.resources.contains_key(&identifier) {
                    return Err(ProviderError::Rejected {
                        kind: request.kind,
                        message: format!("'{}' already exists", identifier),
                    });
                }
                inventory.by_node.insert(owner.clone(), identifier.clone());
                identifier
            }
        };

        let resource = self.describe_resource(&identifier, request);
        inventory.resources.insert(
            identifier,
            StoredResource {
                kind: request.kind,
                owner,
                resource: resource.clone(),
            },
        );
        Ok(resource)
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        identifier: &str,
    ) -> Result<ProvisionedResource, ProviderError> {
        let inventory = self.inventory.lock().await;
        inventory
            .resources
            .get(identifier)
            .filter(|stored| stored.kind == kind)
            .map(|stored| stored.resource.clone())
            .ok_or_else(|| ProviderError::NotFound {
                kind,
                identifier: identifier.to_string(),
            })
    }

    async fn update(
        &self,
        identifier: &str,
        request: &ResourceRequest,
    ) -> Result<ProvisionedResource, ProviderError> {
        let mut inventory = self.inventory.lock().await;
        let resource = self.describe_resource(identifier, request);
        match inventory.resources.get_mut(identifier) {
            Some(stored) if stored.kind == request.kind => {
                stored.resource = resource.clone();
                Ok(resource)
            }
            _ => Err(ProviderError::NotFound {
                kind: request.kind,
                identifier: identifier.to_string(),
            }),
        }
    }

    async fn delete(&self, kind: ResourceKind, identifier: &str) -> Result<(), ProviderError> {
        let mut inventory = self.inventory.lock().await;
        match inventory.resources.get(identifier) {
            Some(stored) if stored.kind == kind => {
                let owner = stored.owner.clone();
                inventory.resources.remove(identifier);
                inventory.by_node.remove(&owner);
                Ok(())
            }
            _ => Err(ProviderError::NotFound {
                kind,
                identifier: identifier.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
