use focusflow_core::{Config, Database};
use serde_json::json;

pub fn run(steps: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let steps = match steps {
        Some(steps) => steps,
        None => Database::open()?.steps_for_day(super::today(&config))?,
    };

    let reward = &config.reward;
    let out = json!({
        "steps": steps,
        "progress": reward.progress(steps),
        "bonus_minutes": reward.bonus_minutes(steps),
        "allowed_minutes": reward.allowed_minutes(steps),
        "daily_limit": config.formatted_daily_limit(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
