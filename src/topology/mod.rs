// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in topologies declared in Rust.

pub mod realworld;
pub mod subnets;

pub use realworld::RealWorldTopology;
