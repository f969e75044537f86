// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::observability::messages::engine::StackStateChanged;
use crate::observability::messages::StructuredLog;

/// Lifecycle of a stack within one provisioning run.
///
/// ```text
/// Pending -> Resolving -> Provisioning -> Provisioned
///    |           |             |
///    +-----------+-------------+--------> Failed
/// ```
///
/// `Provisioned` and `Failed` are terminal. A stack that is never started
/// because the run was cancelled stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    Pending,
    Resolving,
    Provisioning,
    Provisioned,
    Failed,
}

impl StackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, StackState::Provisioned | StackState::Failed)
    }

    pub fn can_transition_to(self, next: StackState) -> bool {
        use StackState::*;
        matches!(
            (self, next),
            (Pending, Resolving)
                | (Resolving, Provisioning)
                | (Provisioning, Provisioned)
                | (Pending | Resolving | Provisioning, Failed)
        )
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackState::Pending => "pending",
            StackState::Resolving => "resolving",
            StackState::Provisioning => "provisioning",
            StackState::Provisioned => "provisioned",
            StackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current state of every stack in a run, shared between the scheduler and
/// the stack tasks.
#[derive(Debug, Clone, Default)]
pub struct StackStates(Arc<Mutex<BTreeMap<String, StackState>>>);

impl StackStates {
    /// Every stack starts `Pending`.
    pub fn new<'a>(stacks: impl IntoIterator<Item = &'a String>) -> Self {
        let states = stacks
            .into_iter()
            .map(|s| (s.clone(), StackState::Pending))
            .collect();
        Self(Arc::new(Mutex::new(states)))
    }

    /// Move `stack` to `next`. Returns false, leaving the state untouched,
    /// when the transition is not allowed.
    pub async fn transition(&self, stack: &str, next: StackState) -> bool {
        let mut states = self.0.lock().await;
        let Some(current) = states.get_mut(stack) else {
            return false;
        };
        if !current.can_transition_to(next) {
            return false;
        }
        StackStateChanged {
            stack,
            from: *current,
            to: next,
        }
        .log();
        *current = next;
        true
    }

    pub async fn get(&self, stack: &str) -> Option<StackState> {
        self.0.lock().await.get(stack).copied()
    }

    pub async fn snapshot(&self) -> BTreeMap<String, StackState> {
        self.0.lock().await.clone()
    }
}
