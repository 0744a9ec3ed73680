//! App-shielding collaborators.
//!
//! Enforcement itself belongs to the platform. The core only issues
//! fire-and-forget commands: shield this block group, or lift every shield.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Platform authority that restricts access to a block group.
///
/// Implementations are called while the orchestrator holds its state lock
/// and must not call back into the orchestrator.
pub trait ShieldController: Send + Sync {
    fn apply_shield(&self, group_id: &str);
    fn clear_shield(&self);
}

/// Observed shield state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ShieldStatus {
    #[default]
    Clear,
    Applied {
        group_id: String,
    },
}

/// A command issued to a shield controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ShieldCommand {
    Apply { group_id: String },
    Clear,
}

/// Keeps the current status and every command it received.
#[derive(Debug, Default)]
pub struct RecordingShield {
    inner: Mutex<RecordingInner>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    status: ShieldStatus,
    commands: Vec<ShieldCommand>,
}

impl RecordingShield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously persisted status.
    pub fn with_status(status: ShieldStatus) -> Self {
        Self {
            inner: Mutex::new(RecordingInner {
                status,
                commands: Vec::new(),
            }),
        }
    }

    pub fn status(&self) -> ShieldStatus {
        self.lock().status.clone()
    }

    pub fn commands(&self) -> Vec<ShieldCommand> {
        self.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<ShieldCommand> {
        self.lock().commands.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ShieldController for RecordingShield {
    fn apply_shield(&self, group_id: &str) {
        let mut inner = self.lock();
        inner.status = ShieldStatus::Applied {
            group_id: group_id.to_string(),
        };
        inner.commands.push(ShieldCommand::Apply {
            group_id: group_id.to_string(),
        });
    }

    fn clear_shield(&self) {
        let mut inner = self.lock();
        inner.status = ShieldStatus::Clear;
        inner.commands.push(ShieldCommand::Clear);
    }
}

/// Only logs the commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingShield;

impl ShieldController for TracingShield {
    fn apply_shield(&self, group_id: &str) {
        tracing::info!(group_id, "shield applied");
    }

    fn clear_shield(&self) {
        tracing::info!("shield cleared");
    }
}
