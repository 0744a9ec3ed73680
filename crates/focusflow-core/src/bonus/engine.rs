//! Step bonus engine.
//!
//! Converts today's step count into newly earned unlock minutes. The engine
//! is a pure function over its arguments: the caller owns the [`BonusState`]
//! and replaces it with the returned one after every evaluation.
//!
//! ## Policy
//!
//! ```text
//! steps >= goal            -> base bonus, once per day
//! every full block > goal  -> block bonus, each block paid at most once
//! everything               -> capped at max_daily_bonus_minutes per day
//! ```
//!
//! When the cap cuts a block payout short, only whole blocks are recorded
//! as awarded and the leftover minutes are forfeited for that day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::Calendar;
use super::config::BonusConfiguration;

/// Per-day grant bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusState {
    pub total_granted_minutes: u32,
    pub base_bonus_granted: bool,
    pub awarded_extra_blocks: u64,
    pub last_evaluated_day: NaiveDate,
}

impl BonusState {
    /// Nothing granted yet on `day`.
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            total_granted_minutes: 0,
            base_bonus_granted: false,
            awarded_extra_blocks: 0,
            last_evaluated_day: day,
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusGrant {
    pub newly_earned_minutes: u32,
    pub updated_state: BonusState,
}

/// Anything that can turn a step count into a bonus grant.
pub trait BonusCalculator: Send + Sync {
    fn evaluate(&self, steps: i64, day: DateTime<Utc>, state: &BonusState) -> BonusGrant;
}

/// Default step-to-minutes policy.
#[derive(Debug, Clone, Copy)]
pub struct BonusEngine {
    configuration: BonusConfiguration,
    calendar: Calendar,
}

impl BonusEngine {
    pub fn new(configuration: BonusConfiguration, calendar: Calendar) -> Self {
        Self {
            configuration,
            calendar,
        }
    }

    pub fn configuration(&self) -> &BonusConfiguration {
        &self.configuration
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    fn remaining_minutes(&self, state: &BonusState) -> u32 {
        self.configuration
            .max_daily_bonus_minutes()
            .saturating_sub(state.total_granted_minutes)
    }
}

impl BonusCalculator for BonusEngine {
    fn evaluate(&self, steps: i64, day: DateTime<Utc>, state: &BonusState) -> BonusGrant {
        let cfg = &self.configuration;
        let steps = u64::try_from(steps).unwrap_or(0);
        let today = self.calendar.day_of(day);

        let mut working = if state.last_evaluated_day == today {
            *state
        } else {
            BonusState::fresh(today)
        };
        let mut newly_earned: u32 = 0;

        // Base bonus, first time the goal is reached today.
        if steps >= cfg.daily_step_goal() && !working.base_bonus_granted {
            let grant = cfg.base_bonus_minutes().min(self.remaining_minutes(&working));
            working.base_bonus_granted = true;
            working.total_granted_minutes += grant;
            newly_earned += grant;
        }

        // Whole blocks beyond the goal that have not been paid yet.
        if steps > cfg.daily_step_goal() && cfg.bonus_minutes_per_block() > 0 {
            let extra_steps = steps - cfg.daily_step_goal();
            let blocks = extra_steps / cfg.bonus_steps_per_block();
            let new_blocks = blocks.saturating_sub(working.awarded_extra_blocks);

            if new_blocks > 0 {
                let per_block = cfg.bonus_minutes_per_block();
                let raw_minutes = new_blocks.saturating_mul(u64::from(per_block));
                let remaining = self.remaining_minutes(&working);
                // Bounded by `remaining`, so the narrowing cannot truncate.
                let granted = raw_minutes.min(u64::from(remaining)) as u32;
                let granted_blocks = granted / per_block;

                working.awarded_extra_blocks += u64::from(granted_blocks);
                working.total_granted_minutes += granted;
                newly_earned += granted;
            }
        }

        working.last_evaluated_day = today;

        BonusGrant {
            newly_earned_minutes: newly_earned,
            updated_state: working,
        }
    }
}
