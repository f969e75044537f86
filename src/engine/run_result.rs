// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::errors::ProvisioningError;
use crate::traits::ProvisionedResource;

use super::output_table::StackOutputs;
use super::state::StackState;

/// Everything a provisioning run produced.
///
/// A run always returns a result, even when stacks failed: `states` tells
/// which stacks were provisioned, which failed and which were never attempted,
/// and `failures` carries one error per failed stack.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// The planned provisioning order.
    pub order: Vec<String>,
    /// Published exports: stack -> output -> value.
    pub outputs: BTreeMap<String, StackOutputs>,
    #[serde(serialize_with = "as_messages")]
    pub failures: Vec<ProvisioningError>,
    pub states: BTreeMap<String, StackState>,
    /// Every node created in this run: stack -> node -> resource.
    pub resources: BTreeMap<String, BTreeMap<String, ProvisionedResource>>,
}

fn as_messages<S: Serializer>(failures: &[ProvisioningError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(|f| f.to_string()))
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.states.values().all(|s| *s == StackState::Provisioned)
    }

    pub fn provisioned(&self) -> Vec<&str> {
        self.stacks_in(StackState::Provisioned)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.stacks_in(StackState::Failed)
    }

    /// Stacks that were never started, e.g. because the run was cancelled.
    pub fn not_attempted(&self) -> Vec<&str> {
        self.stacks_in(StackState::Pending)
    }

    pub fn state_of(&self, stack: &str) -> Option<StackState> {
        self.states.get(stack).copied()
    }

    /// The error recorded against `stack`, if it failed.
    pub fn failure_for(&self, stack: &str) -> Option<&ProvisioningError> {
        self.failures.iter().find(|f| f.stack() == stack)
    }

    pub fn output(&self, stack: &str, output: &str) -> Option<&serde_json::Value> {
        self.outputs.get(stack).and_then(|outputs| outputs.get(output))
    }

    /// Stacks in `state`, listed in provisioning order.
    fn stacks_in(&self, state: StackState) -> Vec<&str> {
        self.order
            .iter()
            .filter(|s| self.states.get(s.as_str()) == Some(&state))
            .map(String::as_str)
            .collect()
    }
}
