//! Integration tests for the activity bonus flow.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use focusflow_core::{
    BonusCalculator, BonusConfiguration, BonusEngine, BonusEvent, BonusOrchestrator, BonusPhase,
    BonusState, Calendar, Database, FixedStepSource, ManualClock, RecordingShield,
    RefreshOutcome, SharedStepCounter, ShieldStatus,
};

fn policy() -> BonusConfiguration {
    BonusConfiguration::new(10_000, 15, 2_000, 5, 45)
}

#[test]
fn test_worked_example_through_public_api() {
    let engine = BonusEngine::new(policy(), Calendar::utc());
    let day = Utc.with_ymd_and_hms(2025, 11, 11, 18, 30, 0).unwrap();
    let state = BonusState::fresh(day.date_naive());

    let mut total = 0;
    let mut state = state;
    for (steps, expected) in [(10_000, 15), (14_000, 10), (50_000, 20), (60_000, 0)] {
        let grant = engine.evaluate(steps, day, &state);
        assert_eq!(grant.newly_earned_minutes, expected, "steps = {steps}");
        total += grant.newly_earned_minutes;
        state = grant.updated_state;
    }
    assert_eq!(total, 45);
    assert_eq!(state.total_granted_minutes, 45);
}

#[tokio::test(start_paused = true)]
async fn test_full_day_with_logged_steps() {
    let db = Database::open_memory().unwrap();
    let morning = Utc.with_ymd_and_hms(2025, 11, 11, 8, 0, 0).unwrap();
    let today = morning.date_naive();

    let counter = SharedStepCounter::new(0);
    let shield = Arc::new(RecordingShield::new());
    let clock = Arc::new(ManualClock::new(morning));
    let orchestrator = BonusOrchestrator::builder(policy(), Arc::new(counter.clone()), shield.clone())
        .calendar(Calendar::utc())
        .clock(clock.clone())
        .build();
    let mut events = orchestrator.subscribe();

    // Morning walk.
    counter.set(db.add_steps(today, 10_500).unwrap());
    orchestrator.refresh_steps_and_bonus().await;
    assert_eq!(orchestrator.available_bonus_minutes(), 15);

    // Limit hit at lunch, spend ten minutes.
    orchestrator.mark_limit_reached("social");
    orchestrator.start_bonus_session(Some(10)).unwrap();
    assert_eq!(shield.status(), ShieldStatus::Clear);

    // Afternoon walk while unlocked.
    counter.set(db.add_steps(today, 4_000).unwrap());
    orchestrator.refresh_steps_and_bonus().await;
    assert_eq!(orchestrator.available_bonus_minutes(), 5 + 10);
    assert_eq!(orchestrator.phase(), BonusPhase::BlockedUnlocked);

    tokio::time::sleep(StdDuration::from_secs(11 * 60)).await;
    tokio::task::yield_now().await;
    assert_eq!(orchestrator.phase(), BonusPhase::BlockedWaiting);
    assert_eq!(
        shield.status(),
        ShieldStatus::Applied {
            group_id: "social".into()
        }
    );

    // Evening: limit lifted by the platform at the end of the schedule.
    orchestrator.clear_limit();
    assert_eq!(orchestrator.phase(), BonusPhase::Unblocked);

    let mut saw_session_end = false;
    while let Ok(event) = events.try_recv() {
        if let BonusEvent::SessionEnded { reshielded, .. } = event {
            assert!(reshielded);
            saw_session_end = true;
        }
    }
    assert!(saw_session_end);
}

#[tokio::test]
async fn test_snapshot_survives_serialization() {
    let now = Utc.with_ymd_and_hms(2025, 11, 11, 8, 0, 0).unwrap();
    let build = || {
        BonusOrchestrator::builder(
            policy(),
            Arc::new(FixedStepSource(12_000)),
            Arc::new(RecordingShield::new()),
        )
        .calendar(Calendar::utc())
        .clock(Arc::new(ManualClock::new(now)))
        .build()
    };

    let first = build();
    first.refresh_steps_and_bonus().await;
    first.mark_limit_reached("games");
    let json = serde_json::to_string(&first.snapshot()).unwrap();

    let second = build();
    second.restore(serde_json::from_str(&json).unwrap());
    assert_eq!(second.snapshot(), first.snapshot());

    // Nothing new earned from the same count after a restore.
    assert_eq!(
        second.refresh_steps_and_bonus().await,
        RefreshOutcome::Completed {
            steps: 12_000,
            newly_earned_minutes: 0,
            available_minutes: 20,
        }
    );
}

#[tokio::test]
async fn test_local_midnight_rolls_the_day() {
    // UTC+2: 22:30 UTC is already tomorrow locally.
    let evening = Utc.with_ymd_and_hms(2025, 11, 11, 21, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(evening));
    let orchestrator = BonusOrchestrator::builder(
        policy(),
        Arc::new(FixedStepSource(10_000)),
        Arc::new(RecordingShield::new()),
    )
    .calendar(Calendar::with_offset_minutes(120))
    .clock(clock.clone())
    .build();

    orchestrator.refresh_steps_and_bonus().await;
    assert_eq!(orchestrator.available_bonus_minutes(), 15);

    clock.advance(Duration::minutes(90));
    orchestrator.refresh_steps_and_bonus().await;
    // Balance zeroed at local midnight, then the new day's base bonus.
    assert_eq!(orchestrator.available_bonus_minutes(), 15);
    assert_eq!(
        orchestrator.bonus_state().last_evaluated_day,
        chrono::NaiveDate::from_ymd_opt(2025, 11, 12).unwrap()
    );
}
