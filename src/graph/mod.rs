// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stack dependency graph construction, validation and ordering.

mod builder;
mod dependency_graph;
mod validation;

pub use builder::{DependencyGraphBuilder, ProvisioningPlan};
pub use dependency_graph::DependencyGraph;
pub use validation::validate_declarations;
