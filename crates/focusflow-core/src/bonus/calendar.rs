//! Day boundaries.
//!
//! Bonus allowances reset at the start of each calendar day. Which instant
//! that is depends on the user's UTC offset, so the calendar is an explicit
//! value rather than an ambient setting.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A calendar with a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    offset_minutes: i32,
}

impl Calendar {
    /// The UTC calendar.
    pub fn utc() -> Self {
        Self { offset_minutes: 0 }
    }

    /// Calendar using the host's current local offset.
    ///
    /// The offset is captured at construction. A long-lived calendar keeps it
    /// across DST changes; build a new one to pick up the new offset.
    pub fn local() -> Self {
        Self {
            offset_minutes: Local::now().offset().local_minus_utc() / 60,
        }
    }

    /// Calendar `minutes` east of UTC. Offsets of a day or more fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(_) => Self {
                offset_minutes: minutes,
            },
            None => Self::utc(),
        }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset_minutes
    }

    fn offset(&self) -> FixedOffset {
        self.offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// The calendar day containing `at`.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }

    /// The UTC instant at which `day` begins in this calendar.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        // Fixed offsets have no gaps, so the local midnight always exists.
        self.offset()
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::local()
    }
}
