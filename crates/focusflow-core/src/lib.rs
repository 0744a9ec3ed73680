//! # FocusFlow Core Library
//!
//! Trades physical activity for screen time: today's step count earns a
//! bounded number of bonus minutes, which can be spent to temporarily lift
//! the shield over a blocked group of apps.
//!
//! ## Architecture
//!
//! - **Bonus Engine**: a pure policy that turns a step count into newly
//!   earned minutes, with a once-per-day base bonus, per-block extras and a
//!   hard daily cap
//! - **Bonus Orchestrator**: owns the spendable balance and the unlock
//!   window, and drives the shield at window boundaries with a cancelable
//!   reshield timer
//! - **Collaborators**: [`StepSource`] and [`ShieldController`] are injected,
//!   so any platform health store or shielding authority can plug in
//! - **Storage**: SQLite step log and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`BonusEngine`]: step-to-minutes policy
//! - [`BonusOrchestrator`]: unlock/reshield state machine
//! - [`Database`]: step log and state persistence
//! - [`Config`]: application configuration management

pub mod bonus;
pub mod clock;
pub mod error;
pub mod events;
pub mod fitness;
pub mod reward;
pub mod shield;
pub mod storage;

pub use bonus::{
    BonusCalculator, BonusConfiguration, BonusEngine, BonusGrant, BonusOrchestrator, BonusPhase,
    BonusSnapshot, BonusState, Calendar, RefreshOutcome,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, StepSourceError};
pub use events::BonusEvent;
pub use fitness::{AuthorizedStepSource, FixedStepSource, SharedStepCounter, StepSource};
pub use reward::ScreenTimeReward;
pub use shield::{RecordingShield, ShieldCommand, ShieldController, ShieldStatus, TracingShield};
pub use storage::{Config, Database, StepLogEntry};
