//! Activity bonus orchestrator.
//!
//! Owns the spendable bonus balance, the unlock window and the blocked group,
//! and drives the shield collaborator at window boundaries.
//!
//! ## State Transitions
//!
//! ```text
//! Unblocked --mark_limit_reached--> BlockedWaiting --start_bonus_session--> BlockedUnlocked
//!     ^                                   ^                                       |
//!     |                                   +-------------- reshield timer ---------+
//!     +------------------- clear_limit (from any phase) --------------------------+
//! ```
//!
//! All methods take `&self`. State sits behind a mutex that is never held
//! across an await, so the orchestrator can be shared between a UI and the
//! reshield task. At most one reshield task is pending at any time.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::calendar::Calendar;
use super::config::BonusConfiguration;
use super::engine::{BonusCalculator, BonusEngine, BonusState};
use super::reshield::ReshieldHandle;
use crate::clock::{Clock, SystemClock};
use crate::events::BonusEvent;
use crate::fitness::StepSource;
use crate::shield::ShieldController;

const EVENT_CAPACITY: usize = 64;

/// Where the orchestrator sits on the blocked / unlocked axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusPhase {
    Unblocked,
    /// Blocked, shield applied, no unlock window.
    BlockedWaiting,
    /// Blocked, shield lifted until the unlock window ends.
    BlockedUnlocked,
}

/// Point-in-time copy of everything the orchestrator exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusSnapshot {
    pub phase: BonusPhase,
    pub blocked_group_identifier: Option<String>,
    pub available_bonus_minutes: u32,
    pub active_unlock_until: Option<DateTime<Utc>>,
    pub last_known_steps: u64,
    pub bonus_state: BonusState,
    pub last_bonus_day: NaiveDate,
}

/// What a call to [`BonusOrchestrator::refresh_steps_and_bonus`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed {
        steps: u64,
        newly_earned_minutes: u32,
        available_minutes: u32,
    },
    /// Another refresh was still waiting on the step source.
    Skipped,
}

#[derive(Debug)]
struct RuntimeState {
    blocked_group: Option<String>,
    available_bonus_minutes: u32,
    active_unlock_until: Option<DateTime<Utc>>,
    last_known_steps: u64,
    bonus_state: BonusState,
    last_bonus_day: NaiveDate,
    reshield: Option<ReshieldHandle>,
    /// Bumped on every cancel; a timer only acts if its generation is current.
    session_generation: u64,
}

impl RuntimeState {
    fn new(today: NaiveDate) -> Self {
        Self {
            blocked_group: None,
            available_bonus_minutes: 0,
            active_unlock_until: None,
            last_known_steps: 0,
            bonus_state: BonusState::fresh(today),
            last_bonus_day: today,
            reshield: None,
            session_generation: 0,
        }
    }

    fn cancel_reshield(&mut self) {
        self.session_generation = self.session_generation.wrapping_add(1);
        if let Some(handle) = self.reshield.take() {
            handle.cancel();
        }
    }

    fn phase(&self) -> BonusPhase {
        match (&self.blocked_group, self.active_unlock_until) {
            (None, _) => BonusPhase::Unblocked,
            (Some(_), None) => BonusPhase::BlockedWaiting,
            (Some(_), Some(_)) => BonusPhase::BlockedUnlocked,
        }
    }
}

struct Shared {
    configuration: BonusConfiguration,
    calendar: Calendar,
    calculator: Arc<dyn BonusCalculator>,
    steps: Arc<dyn StepSource>,
    shield: Arc<dyn ShieldController>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BonusEvent>,
    state: Mutex<RuntimeState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: BonusEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Start a new bonus day if `today` differs from the cached one.
    ///
    /// Zeroes the balance and closes any unlock window. Returns whether the
    /// day changed.
    fn roll_over(&self, state: &mut RuntimeState, today: NaiveDate, now: DateTime<Utc>) -> bool {
        if today == state.last_bonus_day {
            return false;
        }
        let window_was_open = state.active_unlock_until.take().is_some();
        state.available_bonus_minutes = 0;
        state.cancel_reshield();
        state.last_bonus_day = today;
        state.bonus_state = BonusState::fresh(today);
        // Keep "blocked without a window" meaning "shielded".
        if window_was_open {
            if let Some(group_id) = state.blocked_group.as_deref() {
                self.shield.apply_shield(group_id);
            }
        }
        info!(day = %today, "new bonus day");
        self.emit(BonusEvent::DayRolledOver { day: today, at: now });
        true
    }

    /// Reshield timer body.
    fn finish_session(&self, generation: u64) {
        let now = self.clock.now();
        let mut state = self.lock();
        if state.session_generation != generation {
            debug!(generation, "superseded reshield timer ignored");
            return;
        }
        state.reshield = None;
        state.active_unlock_until = None;
        let reshielded = match state.blocked_group.as_deref() {
            Some(group_id) => {
                self.shield.apply_shield(group_id);
                true
            }
            None => false,
        };
        info!(reshielded, "unlock window closed");
        self.emit(BonusEvent::SessionEnded { reshielded, at: now });
    }
}

fn schedule_reshield(
    shared: &Arc<Shared>,
    generation: u64,
    delay: std::time::Duration,
) -> ReshieldHandle {
    let weak = Arc::downgrade(shared);
    ReshieldHandle::schedule(delay, async move {
        if let Some(shared) = weak.upgrade() {
            shared.finish_session(generation);
        }
    })
}

/// Builder for [`BonusOrchestrator`].
pub struct BonusOrchestratorBuilder {
    configuration: BonusConfiguration,
    steps: Arc<dyn StepSource>,
    shield: Arc<dyn ShieldController>,
    calendar: Option<Calendar>,
    clock: Option<Arc<dyn Clock>>,
    calculator: Option<Arc<dyn BonusCalculator>>,
}

impl BonusOrchestratorBuilder {
    pub fn calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the default [`BonusEngine`].
    pub fn calculator(mut self, calculator: Arc<dyn BonusCalculator>) -> Self {
        self.calculator = Some(calculator);
        self
    }

    pub fn build(self) -> BonusOrchestrator {
        let calendar = self.calendar.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let calculator = self
            .calculator
            .unwrap_or_else(|| Arc::new(BonusEngine::new(self.configuration, calendar)));
        let today = calendar.day_of(clock.now());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        BonusOrchestrator {
            shared: Arc::new(Shared {
                configuration: self.configuration,
                calendar,
                calculator,
                steps: self.steps,
                shield: self.shield,
                clock,
                events,
                state: Mutex::new(RuntimeState::new(today)),
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }
}

/// Stateful coordinator between step counts, the bonus engine and the shield.
pub struct BonusOrchestrator {
    shared: Arc<Shared>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl BonusOrchestrator {
    pub fn builder(
        configuration: BonusConfiguration,
        steps: Arc<dyn StepSource>,
        shield: Arc<dyn ShieldController>,
    ) -> BonusOrchestratorBuilder {
        BonusOrchestratorBuilder {
            configuration,
            steps,
            shield,
            calendar: None,
            clock: None,
            calculator: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn configuration(&self) -> &BonusConfiguration {
        &self.shared.configuration
    }

    pub fn blocked_group_identifier(&self) -> Option<String> {
        self.shared.lock().blocked_group.clone()
    }

    pub fn available_bonus_minutes(&self) -> u32 {
        self.shared.lock().available_bonus_minutes
    }

    pub fn active_unlock_until(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().active_unlock_until
    }

    pub fn last_known_steps(&self) -> u64 {
        self.shared.lock().last_known_steps
    }

    pub fn bonus_state(&self) -> BonusState {
        self.shared.lock().bonus_state
    }

    pub fn phase(&self) -> BonusPhase {
        self.shared.lock().phase()
    }

    /// True while a reshield timer is scheduled and has not fired.
    pub fn has_pending_reshield(&self) -> bool {
        self.shared
            .lock()
            .reshield
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn snapshot(&self) -> BonusSnapshot {
        let state = self.shared.lock();
        BonusSnapshot {
            phase: state.phase(),
            blocked_group_identifier: state.blocked_group.clone(),
            available_bonus_minutes: state.available_bonus_minutes,
            active_unlock_until: state.active_unlock_until,
            last_known_steps: state.last_known_steps,
            bonus_state: state.bonus_state,
            last_bonus_day: state.last_bonus_day,
        }
    }

    /// Receive every subsequent [`BonusEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<BonusEvent> {
        self.shared.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Usage limit for `group_id` was hit: shield it.
    ///
    /// Any open unlock window is closed and its reshield timer cancelled.
    pub fn mark_limit_reached(&self, group_id: impl Into<String>) {
        let group_id = group_id.into();
        let now = self.shared.clock.now();
        let mut state = self.shared.lock();
        state.cancel_reshield();
        state.active_unlock_until = None;
        state.blocked_group = Some(group_id.clone());
        self.shared.shield.apply_shield(&group_id);
        info!(group_id = %group_id, "usage limit reached");
        self.shared
            .emit(BonusEvent::LimitReached { group_id, at: now });
    }

    /// Lift the block entirely.
    pub fn clear_limit(&self) {
        let now = self.shared.clock.now();
        let mut state = self.shared.lock();
        state.cancel_reshield();
        state.blocked_group = None;
        state.active_unlock_until = None;
        self.shared.shield.clear_shield();
        info!("usage limit cleared");
        self.shared.emit(BonusEvent::LimitCleared { at: now });
    }

    /// Pull today's steps and credit any newly earned minutes.
    ///
    /// A failing step source counts as zero steps. A call made while another
    /// refresh is still awaiting the step source is dropped.
    pub async fn refresh_steps_and_bonus(&self) -> RefreshOutcome {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            debug!("refresh already in flight, dropping");
            return RefreshOutcome::Skipped;
        };

        let steps = match self.shared.steps.fetch_today_steps().await {
            Ok(steps) => steps,
            Err(e) => {
                warn!(error = %e, "step fetch failed, counting as zero");
                0
            }
        };

        let shared = &self.shared;
        let now = shared.clock.now();
        let today = shared.calendar.day_of(now);
        let mut state = shared.lock();

        state.last_known_steps = steps;
        shared.emit(BonusEvent::StepsRefreshed { steps, at: now });

        shared.roll_over(&mut state, today, now);

        let grant = shared.calculator.evaluate(
            i64::try_from(steps).unwrap_or(i64::MAX),
            shared.calendar.start_of_day(today),
            &state.bonus_state,
        );
        state.bonus_state = grant.updated_state;

        if grant.newly_earned_minutes > 0 {
            state.available_bonus_minutes = state
                .available_bonus_minutes
                .saturating_add(grant.newly_earned_minutes)
                .min(shared.configuration.max_daily_bonus_minutes());
            info!(
                earned = grant.newly_earned_minutes,
                available = state.available_bonus_minutes,
                "bonus minutes earned"
            );
            shared.emit(BonusEvent::BonusEarned {
                minutes: grant.newly_earned_minutes,
                available_minutes: state.available_bonus_minutes,
                at: now,
            });
        }

        RefreshOutcome::Completed {
            steps,
            newly_earned_minutes: grant.newly_earned_minutes,
            available_minutes: state.available_bonus_minutes,
        }
    }

    /// Apply a pending day rollover without touching the step source.
    ///
    /// Lets a caller that only reads state (a status view after a restore)
    /// see today's balance rather than yesterday's. Returns whether the day
    /// changed.
    pub fn roll_over_day(&self) -> bool {
        let now = self.shared.clock.now();
        let today = self.shared.calendar.day_of(now);
        let mut state = self.shared.lock();
        self.shared.roll_over(&mut state, today, now)
    }

    /// Spend bonus minutes to lift the shield for a while.
    ///
    /// Spends `minutes` (or the whole balance when `None`), capped at the
    /// balance. Only effective while blocked with no unlock window open and a
    /// positive balance; otherwise nothing happens and `None` is returned.
    /// Returns the end of the unlock window.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn start_bonus_session(&self, minutes: Option<u32>) -> Option<DateTime<Utc>> {
        let now = self.shared.clock.now();
        let mut state = self.shared.lock();

        if state.phase() != BonusPhase::BlockedWaiting {
            debug!(phase = ?state.phase(), "bonus session ignored, not waiting on a block");
            return None;
        }
        let available = state.available_bonus_minutes;
        let minutes_to_use = available.min(minutes.unwrap_or(available));
        if minutes_to_use == 0 {
            debug!(available, "bonus session ignored, nothing to spend");
            return None;
        }

        state.available_bonus_minutes -= minutes_to_use;
        let unlock_until = now + Duration::minutes(i64::from(minutes_to_use));
        state.active_unlock_until = Some(unlock_until);

        state.cancel_reshield();
        self.shared.shield.clear_shield();

        let generation = state.session_generation;
        let delay = std::time::Duration::from_secs(u64::from(minutes_to_use) * 60);
        state.reshield = Some(schedule_reshield(&self.shared, generation, delay));

        info!(
            minutes = minutes_to_use,
            remaining = state.available_bonus_minutes,
            until = %unlock_until,
            "bonus session started"
        );
        self.shared.emit(BonusEvent::SessionStarted {
            minutes: minutes_to_use,
            unlock_until,
            remaining_minutes: state.available_bonus_minutes,
            at: now,
        });
        Some(unlock_until)
    }

    /// Reload state persisted by [`BonusOrchestrator::snapshot`].
    ///
    /// An unlock window that is still open gets a fresh reshield timer for
    /// its remaining time; one that ended meanwhile is closed now and the
    /// shield re-applied.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime with an open window.
    pub fn restore(&self, snapshot: BonusSnapshot) {
        let now = self.shared.clock.now();
        let mut state = self.shared.lock();

        state.cancel_reshield();
        state.blocked_group = snapshot.blocked_group_identifier;
        state.available_bonus_minutes = snapshot
            .available_bonus_minutes
            .min(self.shared.configuration.max_daily_bonus_minutes());
        state.last_known_steps = snapshot.last_known_steps;
        state.bonus_state = snapshot.bonus_state;
        state.last_bonus_day = snapshot.last_bonus_day;
        state.active_unlock_until = None;

        let Some(until) = snapshot.active_unlock_until else {
            return;
        };
        let Some(group_id) = state.blocked_group.clone() else {
            return;
        };

        match (until - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => {
                state.active_unlock_until = Some(until);
                let generation = state.session_generation;
                state.reshield = Some(schedule_reshield(&self.shared, generation, remaining));
                debug!(until = %until, "unlock window resumed");
            }
            _ => {
                self.shared.shield.apply_shield(&group_id);
                info!("unlock window expired while away, shield re-applied");
                self.shared.emit(BonusEvent::SessionEnded {
                    reshielded: true,
                    at: now,
                });
            }
        }
    }
}

impl Drop for BonusOrchestrator {
    fn drop(&mut self) {
        self.shared.lock().cancel_reshield();
    }
}
