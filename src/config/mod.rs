// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declaration files and run settings.
//!
//! A declaration file holds the stacks, security intents and tags to
//! provision, plus optional `engine` and `provider` sections. YAML and TOML
//! are both accepted.

mod loader;
mod runtime;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_declarations, load_declarations, parse_declarations, DeclarationFile,
    DeclarationFormat, EngineConfig, ProviderConfig,
};
pub use runtime::RuntimeBuilder;
