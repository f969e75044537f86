// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod factory;
pub mod output_table;
pub mod provisioning;
pub mod run_result;
pub mod state;
#[cfg(test)]
mod integration_tests;

pub use factory::EngineFactory;
pub use output_table::{OutputTable, StackOutputs};
pub use provisioning::{EngineOptions, ProvisioningEngine};
pub use run_result::RunResult;
pub use state::{StackState, StackStates};
