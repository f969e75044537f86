// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Messages are organized by subsystem:
//!
//! * `engine` - provisioning run and stack lifecycle events
//! * `graph` - plan construction, validation and security rule composition
//! * `provider` - individual resource provider calls

use tracing::Span;

pub mod engine;
pub mod graph;
pub mod provider;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Create a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
