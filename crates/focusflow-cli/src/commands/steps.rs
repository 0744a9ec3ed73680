use clap::Subcommand;
use focusflow_core::{Config, Database};
use serde_json::json;

#[derive(Subcommand)]
pub enum StepsAction {
    /// Record today's step count
    Log {
        /// Step count
        count: u64,
        /// Add to today's count instead of replacing it
        #[arg(long)]
        add: bool,
    },
    /// Show logged step counts
    Show {
        /// Number of days to show
        #[arg(long, default_value = "7")]
        days: usize,
    },
}

pub fn run(action: StepsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let today = super::today(&config);

    match action {
        StepsAction::Log { count, add } => {
            let total = if add {
                db.add_steps(today, count)?
            } else {
                db.record_steps(today, count)?;
                count
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "day": today, "steps": total }))?
            );
        }
        StepsAction::Show { days } => {
            let entries = db.recent_steps(days)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
