mod calendar;
mod config;
mod engine;
mod orchestrator;
mod reshield;

pub use calendar::Calendar;
pub use config::BonusConfiguration;
pub use engine::{BonusCalculator, BonusEngine, BonusGrant, BonusState};
pub use orchestrator::{
    BonusOrchestrator, BonusOrchestratorBuilder, BonusPhase, BonusSnapshot, RefreshOutcome,
};
pub use reshield::ReshieldHandle;
