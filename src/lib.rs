// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // resource providers
pub mod composer;   // security intents -> rules
pub mod config;     // declaration files + runtime
pub mod engine;     // provisioning engine
pub mod errors;     // error handling
pub mod graph;      // validation + stack ordering
pub mod model;      // declaration data model
pub mod observability;
pub mod topology;   // built-in topologies
pub mod traits;     // provider abstraction
