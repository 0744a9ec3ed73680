pub mod bonus;
pub mod config;
pub mod reward;
pub mod steps;

use chrono::{NaiveDate, Utc};
use focusflow_core::Config;

/// Today in the configured calendar.
pub(crate) fn today(config: &Config) -> NaiveDate {
    config.calendar().day_of(Utc::now())
}
