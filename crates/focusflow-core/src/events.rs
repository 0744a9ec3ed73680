use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Every state change of the bonus orchestrator produces an Event.
/// UIs subscribe to them instead of observing fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BonusEvent {
    /// Usage limit hit; the group is now shielded.
    LimitReached {
        group_id: String,
        at: DateTime<Utc>,
    },
    LimitCleared {
        at: DateTime<Utc>,
    },
    StepsRefreshed {
        steps: u64,
        at: DateTime<Utc>,
    },
    BonusEarned {
        minutes: u32,
        available_minutes: u32,
        at: DateTime<Utc>,
    },
    /// A new calendar day started; yesterday's balance is gone.
    DayRolledOver {
        day: NaiveDate,
        at: DateTime<Utc>,
    },
    SessionStarted {
        minutes: u32,
        unlock_until: DateTime<Utc>,
        remaining_minutes: u32,
        at: DateTime<Utc>,
    },
    /// Unlock window closed. `reshielded` is false if the limit was gone.
    SessionEnded {
        reshielded: bool,
        at: DateTime<Utc>,
    },
}
