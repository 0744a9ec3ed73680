use std::sync::Arc;

use clap::Subcommand;
use focusflow_core::{
    BonusEvent, BonusOrchestrator, BonusSnapshot, Config, Database, FixedStepSource,
    RecordingShield, RefreshOutcome, ShieldStatus,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

const SNAPSHOT_KEY: &str = "bonus_orchestrator";
const SHIELD_KEY: &str = "shield_status";

#[derive(Subcommand)]
pub enum BonusAction {
    /// Show bonus balance, block and unlock window (applies a new day's reset)
    Status,
    /// Re-read today's steps and award earned bonus minutes
    Refresh,
    /// Mark the usage limit as reached and shield the group
    Limit {
        /// Block group to shield (defaults to limits.blocked_group)
        #[arg(long)]
        group: Option<String>,
    },
    /// Lift the block entirely
    Clear,
    /// Spend bonus minutes to unlock the shielded group
    Start {
        /// Minutes to spend (defaults to the whole balance)
        #[arg(long)]
        minutes: Option<u32>,
        /// Stay running until the unlock window closes
        #[arg(long)]
        wait: bool,
    },
}

struct Session {
    db: Database,
    shield: Arc<RecordingShield>,
    orchestrator: BonusOrchestrator,
}

impl Session {
    fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?;
        let steps = db.steps_for_day(super::today(config))?;
        let status: ShieldStatus = db.kv_get_json(SHIELD_KEY)?.unwrap_or_default();
        let shield = Arc::new(RecordingShield::with_status(status));

        let orchestrator = BonusOrchestrator::builder(
            config.bonus_configuration(),
            Arc::new(FixedStepSource(steps)),
            shield.clone(),
        )
        .calendar(config.calendar())
        .build();

        if let Some(snapshot) = db.kv_get_json::<BonusSnapshot>(SNAPSHOT_KEY)? {
            orchestrator.restore(snapshot);
        }

        Ok(Self {
            db,
            shield,
            orchestrator,
        })
    }

    fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.db.kv_set_json(SNAPSHOT_KEY, &self.orchestrator.snapshot())?;
        self.db.kv_set_json(SHIELD_KEY, &self.shield.status())?;
        Ok(())
    }

    fn print_status(
        &self,
        refresh: Option<RefreshOutcome>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let out = json!({
            "refresh": refresh,
            "snapshot": self.orchestrator.snapshot(),
            "shield": self.shield.status(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        Ok(())
    }
}

pub async fn run(action: BonusAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let session = Session::open(&config)?;
    let orchestrator = &session.orchestrator;
    let mut refresh = None;

    match action {
        BonusAction::Status => {
            orchestrator.roll_over_day();
        }
        BonusAction::Refresh => {
            refresh = Some(orchestrator.refresh_steps_and_bonus().await);
        }
        BonusAction::Limit { group } => {
            let group = group.unwrap_or_else(|| config.limits.blocked_group.clone());
            orchestrator.mark_limit_reached(group);
        }
        BonusAction::Clear => orchestrator.clear_limit(),
        BonusAction::Start { minutes, wait } => {
            refresh = Some(orchestrator.refresh_steps_and_bonus().await);
            let mut events = orchestrator.subscribe();

            let Some(until) = orchestrator.start_bonus_session(minutes) else {
                session.save()?;
                return Err(format!(
                    "no bonus session started ({} minutes available, phase {:?})",
                    orchestrator.available_bonus_minutes(),
                    orchestrator.phase()
                )
                .into());
            };
            eprintln!("unlocked until {}", until.to_rfc3339());
            session.save()?;

            if wait {
                loop {
                    match events.recv().await {
                        Ok(BonusEvent::SessionEnded { reshielded, .. }) => {
                            eprintln!("session ended (reshielded: {reshielded})");
                            break;
                        }
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    session.save()?;
    session.print_status(refresh)
}
