// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declaration data model: resource nodes, references, stacks and security intents.
//!
//! Everything in this module is built once from static declarations (Rust
//! builders or a declaration file) before provisioning starts and is never
//! mutated during a run.

mod intent;
mod node;
mod reference;
mod stack;

pub use intent::{Protocol, SecurityIntent, Selector};
pub use node::{PropertyValue, ResourceKind, ResourceNode};
pub use reference::{Reference, ReferenceParseError, ID_ATTRIBUTE};
pub use stack::{Declarations, OutputDeclaration, OutputSource, Stack};
