// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational logging goes through message types defined
//! here. Each message is a small struct implementing `Display` plus
//! [`messages::StructuredLog`], which:
//!
//! * keeps log text out of the engine and graph code
//! * attaches the same fields to every event and span for a given message
//! * makes log output consistent across subsystems
//!
//! # Usage
//!
//! ```rust
//! use stackwood::observability::messages::engine::StackStarted;
//! use stackwood::observability::messages::StructuredLog;
//!
//! StackStarted {
//!     stack: "RealWorldServerless-IAM",
//!     node_count: 5,
//! }
//! .log();
//! ```

pub mod messages;
