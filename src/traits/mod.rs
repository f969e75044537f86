pub mod provider;

pub use provider::{ProvisionedResource, ResolvedProperties, ResourceProvider, ResourceRequest};
