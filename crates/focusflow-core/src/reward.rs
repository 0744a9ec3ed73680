//! Continuous screen-time reward.
//!
//! Separate from the block-based activity bonus: the daily allowance grows
//! linearly with progress towards a step goal, on top of a fixed base.
//!
//! ```text
//! allowed = base_limit + floor(min(steps / goal, 1) * max_bonus)
//! ```

use serde::{Deserialize, Serialize};

/// Reward parameters, all in minutes except `step_goal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenTimeReward {
    #[serde(default = "default_base_limit")]
    pub base_limit_minutes: u32,
    #[serde(default = "default_step_goal")]
    pub step_goal: u64,
    #[serde(default = "default_max_bonus")]
    pub max_bonus_minutes: u32,
}

fn default_base_limit() -> u32 {
    30
}
fn default_step_goal() -> u64 {
    10_000
}
fn default_max_bonus() -> u32 {
    30
}

impl Default for ScreenTimeReward {
    fn default() -> Self {
        Self {
            base_limit_minutes: default_base_limit(),
            step_goal: default_step_goal(),
            max_bonus_minutes: default_max_bonus(),
        }
    }
}

impl ScreenTimeReward {
    /// 0.0 .. 1.0 progress towards the step goal. A zero goal is always met.
    pub fn progress(&self, steps: u64) -> f64 {
        if self.step_goal == 0 {
            return 1.0;
        }
        (steps as f64 / self.step_goal as f64).min(1.0)
    }

    /// Bonus minutes earned by `steps`, rounded down.
    pub fn bonus_minutes(&self, steps: u64) -> u32 {
        if self.step_goal == 0 {
            return self.max_bonus_minutes;
        }
        let capped = u128::from(steps.min(self.step_goal));
        // Bounded by max_bonus_minutes.
        (capped * u128::from(self.max_bonus_minutes) / u128::from(self.step_goal)) as u32
    }

    /// Total minutes allowed today.
    pub fn allowed_minutes(&self, steps: u64) -> u32 {
        self.base_limit_minutes
            .saturating_add(self.bonus_minutes(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_scales_with_progress() {
        let reward = ScreenTimeReward::default();
        assert_eq!(reward.allowed_minutes(0), 30);
        assert_eq!(reward.allowed_minutes(5_000), 45);
        assert_eq!(reward.allowed_minutes(10_000), 60);
        assert_eq!(reward.allowed_minutes(25_000), 60);
    }

    #[test]
    fn bonus_rounds_down() {
        let reward = ScreenTimeReward::default();
        // 3333 / 10000 * 30 = 9.999
        assert_eq!(reward.bonus_minutes(3_333), 9);
        assert_eq!(reward.bonus_minutes(3_334), 10);
    }

    #[test]
    fn zero_goal_counts_as_reached() {
        let reward = ScreenTimeReward {
            base_limit_minutes: 10,
            step_goal: 0,
            max_bonus_minutes: 20,
        };
        assert_eq!(reward.progress(0), 1.0);
        assert_eq!(reward.allowed_minutes(0), 30);
    }

    #[test]
    fn progress_is_clamped() {
        let reward = ScreenTimeReward::default();
        assert_eq!(reward.progress(2_500), 0.25);
        assert_eq!(reward.progress(40_000), 1.0);
    }
}
