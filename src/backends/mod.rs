// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resource provider implementations.
//!
//! # Available Backends
//!
//! ## In-Memory Backend
//! Keeps resources in process and mints identifiers and ARNs shaped like the
//! real cloud's. Used by the CLI and for dry runs of a declaration set:
//! - **Deterministic**: the same declarations always get the same identifiers
//! - **Converging**: re-creating a `(stack, node)` updates it in place
//!
//! ## Stub Backend (Test-Only)
//! Wraps the in-memory backend and records every call. Individual nodes can be
//! made to fail, stall or throttle to exercise the engine's failure handling,
//! timeouts and retries. Only compiled for tests.
//!
//! Cloud-specific adapters implement [`ResourceProvider`](crate::traits::ResourceProvider)
//! outside this crate.

pub mod in_memory;
#[cfg(test)]
pub mod stub;

pub use in_memory::InMemoryProvider;
