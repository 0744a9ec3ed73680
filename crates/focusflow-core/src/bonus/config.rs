//! Bonus configuration.
//!
//! Every field is clamped to its minimum when the configuration is built,
//! including when it is deserialized, so the engine never sees an invalid
//! value and has no error path for bad configuration.

use serde::{Deserialize, Serialize};

/// Immutable parameters of the step-to-minutes policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBonusConfiguration")]
pub struct BonusConfiguration {
    daily_step_goal: u64,
    base_bonus_minutes: u32,
    bonus_steps_per_block: u64,
    bonus_minutes_per_block: u32,
    max_daily_bonus_minutes: u32,
}

/// Unvalidated shape accepted from config files.
#[derive(Debug, Clone, Copy, Deserialize)]
struct RawBonusConfiguration {
    #[serde(default = "default_daily_step_goal")]
    daily_step_goal: i64,
    #[serde(default = "default_base_bonus_minutes")]
    base_bonus_minutes: i64,
    #[serde(default = "default_bonus_steps_per_block")]
    bonus_steps_per_block: i64,
    #[serde(default = "default_bonus_minutes_per_block")]
    bonus_minutes_per_block: i64,
    #[serde(default = "default_max_daily_bonus_minutes")]
    max_daily_bonus_minutes: i64,
}

fn default_daily_step_goal() -> i64 {
    10_000
}
fn default_base_bonus_minutes() -> i64 {
    15
}
fn default_bonus_steps_per_block() -> i64 {
    2_000
}
fn default_bonus_minutes_per_block() -> i64 {
    5
}
fn default_max_daily_bonus_minutes() -> i64 {
    45
}

impl From<RawBonusConfiguration> for BonusConfiguration {
    fn from(raw: RawBonusConfiguration) -> Self {
        Self::new(
            raw.daily_step_goal,
            raw.base_bonus_minutes,
            raw.bonus_steps_per_block,
            raw.bonus_minutes_per_block,
            raw.max_daily_bonus_minutes,
        )
    }
}

impl BonusConfiguration {
    /// Build a configuration, clamping each value into range.
    ///
    /// `bonus_steps_per_block` is clamped to at least 1; everything else to
    /// at least 0. Minute values above `u32::MAX` saturate.
    pub fn new(
        daily_step_goal: i64,
        base_bonus_minutes: i64,
        bonus_steps_per_block: i64,
        bonus_minutes_per_block: i64,
        max_daily_bonus_minutes: i64,
    ) -> Self {
        Self {
            daily_step_goal: clamp_steps(daily_step_goal, 0),
            base_bonus_minutes: clamp_minutes(base_bonus_minutes),
            bonus_steps_per_block: clamp_steps(bonus_steps_per_block, 1),
            bonus_minutes_per_block: clamp_minutes(bonus_minutes_per_block),
            max_daily_bonus_minutes: clamp_minutes(max_daily_bonus_minutes),
        }
    }

    pub fn daily_step_goal(&self) -> u64 {
        self.daily_step_goal
    }

    pub fn base_bonus_minutes(&self) -> u32 {
        self.base_bonus_minutes
    }

    pub fn bonus_steps_per_block(&self) -> u64 {
        self.bonus_steps_per_block
    }

    pub fn bonus_minutes_per_block(&self) -> u32 {
        self.bonus_minutes_per_block
    }

    pub fn max_daily_bonus_minutes(&self) -> u32 {
        self.max_daily_bonus_minutes
    }
}

impl Default for BonusConfiguration {
    fn default() -> Self {
        Self::new(
            default_daily_step_goal(),
            default_base_bonus_minutes(),
            default_bonus_steps_per_block(),
            default_bonus_minutes_per_block(),
            default_max_daily_bonus_minutes(),
        )
    }
}

fn clamp_steps(value: i64, min: u64) -> u64 {
    u64::try_from(value).unwrap_or(0).max(min)
}

fn clamp_minutes(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
