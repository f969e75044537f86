// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Expansion of security intents into security rule nodes.
//!
//! Composition runs before the dependency graph is built, so generated rules
//! take part in reference validation like any hand-declared node.

mod security_rules;

pub use security_rules::{ComposedRules, SecurityRuleComposer};
