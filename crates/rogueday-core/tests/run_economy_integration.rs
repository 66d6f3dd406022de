//! End-to-end run economy tests against both stores.

use std::sync::Arc;

use chrono::NaiveDate;
use rogueday_core::{
    DurationRange, EconomyError, ManualClock, MemoryStore, PenaltyPolicy, RunManager, RunStatus,
    RunStore, SqliteStore, TaskDraft, TierCatalog, TierLevel, TierSpec, TimerMode,
};

/// Small catalog: T2 costs 2, T3 costs 5 and unlocks at 100 minutes.
fn catalog() -> TierCatalog {
    TierCatalog::new([
        TierSpec {
            level: TierLevel::One,
            name: "Quick".into(),
            duration: DurationRange { min: 5, max: 15 },
            base_xp: 10,
            energy_cost: 0,
            unlock_requirement_minutes: 0,
            timer: TimerMode::None,
        },
        TierSpec {
            level: TierLevel::Two,
            name: "Focus".into(),
            duration: DurationRange { min: 15, max: 30 },
            base_xp: 20,
            energy_cost: 2,
            unlock_requirement_minutes: 0,
            timer: TimerMode::Optional {
                no_timer_multiplier: 0.8,
            },
        },
        TierSpec {
            level: TierLevel::Three,
            name: "Deep".into(),
            duration: DurationRange { min: 25, max: 60 },
            base_xp: 50,
            energy_cost: 5,
            unlock_requirement_minutes: 100,
            timer: TimerMode::Required,
        },
    ])
    .unwrap()
}

/// Same catalog with Deep open from the start.
fn open_catalog() -> TierCatalog {
    let base = catalog();
    TierCatalog::new([
        base.get(TierLevel::One).clone(),
        base.get(TierLevel::Two).clone(),
        TierSpec {
            unlock_requirement_minutes: 0,
            ..base.get(TierLevel::Three).clone()
        },
    ])
    .unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
}

fn manager<S: RunStore>(store: S, max_energy: u32) -> (RunManager<S>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_date(day(1)));
    let manager = RunManager::new(store, "player")
        .with_catalog(catalog())
        .with_max_energy(max_energy)
        .with_clock(clock.clone());
    (manager, clock)
}

fn economy(err: rogueday_core::CoreError) -> EconomyError {
    err.as_economy().cloned().expect("economy error")
}

fn energy_budget_scenario<S: RunStore>(store: S) {
    let (m, _) = manager(store, 10);
    let mut m = m.with_catalog(open_catalog());
    m.start_new_run().unwrap();

    let focus = TaskDraft::new("Focus block", TierLevel::Two, 15, true);
    let first = m.add_task(&focus).unwrap();
    m.add_task(&focus).unwrap();
    m.add_task(&focus).unwrap();
    assert_eq!(m.current_run().unwrap().unwrap().energy.current, 4);

    let deep = TaskDraft::new("Deep block", TierLevel::Three, 30, true);
    let err = m.add_task(&deep).unwrap_err();
    assert_eq!(
        economy(err),
        EconomyError::InsufficientEnergy {
            required: 5,
            available: 4
        }
    );
    assert_eq!(m.current_run().unwrap().unwrap().tasks.len(), 3);

    m.delete_task(&first.id).unwrap();
    assert_eq!(m.current_run().unwrap().unwrap().energy.current, 6);

    m.add_task(&deep).unwrap();
    assert_eq!(m.current_run().unwrap().unwrap().energy.current, 1);
}

#[test]
fn energy_budget_scenario_memory() {
    energy_budget_scenario(MemoryStore::new());
}

#[test]
fn energy_budget_scenario_sqlite() {
    energy_budget_scenario(SqliteStore::open_memory().unwrap());
}

fn xp_scenario<S: RunStore>(store: S) {
    let (mut m, _) = manager(store, 10);
    m.start_new_run().unwrap();

    assert_eq!(m.preview_xp(TierLevel::One, 10, false).unwrap(), 20);
    assert_eq!(m.preview_xp(TierLevel::Two, 15, false).unwrap(), 16);
    assert_eq!(m.preview_xp(TierLevel::Two, 15, true).unwrap(), 20);

    let quick = m
        .add_task(&TaskDraft::new("Inbox", TierLevel::One, 10, false))
        .unwrap();
    assert_eq!(m.complete_task(&quick.id).unwrap().xp_earned, 20);

    let untimed = m
        .add_task(&TaskDraft::new("Read", TierLevel::Two, 15, false))
        .unwrap();
    m.start_task(&untimed.id).unwrap();
    assert_eq!(m.complete_task(&untimed.id).unwrap().xp_earned, 16);

    let run = m.current_run().unwrap().unwrap();
    assert_eq!(run.daily_xp, 36);
    assert_eq!(run.total_focus_minutes, 25);
}

#[test]
fn xp_scenario_memory() {
    xp_scenario(MemoryStore::new());
}

#[test]
fn xp_scenario_sqlite() {
    xp_scenario(SqliteStore::open_memory().unwrap());
}

fn extraction_is_idempotent<S: RunStore>(store: S) {
    let (mut m, _) = manager(store, 10);
    m.start_new_run().unwrap();
    let task = m
        .add_task(&TaskDraft::new("Inbox", TierLevel::One, 10, false))
        .unwrap();
    m.complete_task(&task.id).unwrap();

    let extraction = m.extract().unwrap();
    assert_eq!(extraction.final_xp, 20);
    assert_eq!(extraction.tasks_completed, 1);

    assert_eq!(economy(m.extract().unwrap_err()), EconomyError::NoActiveRun);
    assert_eq!(m.journal().unwrap().len(), 1);

    let user = m.user().unwrap();
    assert_eq!(user.stats.total_xp, 20);
    assert_eq!(user.stats.total_extractions, 1);
    assert_eq!(user.stats.total_focus_minutes, 10);

    let runs = m.store().list_runs("player").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Extracted);
}

#[test]
fn extraction_is_idempotent_memory() {
    extraction_is_idempotent(MemoryStore::new());
}

#[test]
fn extraction_is_idempotent_sqlite() {
    extraction_is_idempotent(SqliteStore::open_memory().unwrap());
}

fn streak_continuity<S: RunStore>(store: S) {
    let (mut m, clock) = manager(store, 10);

    m.start_new_run().unwrap();
    m.extract().unwrap();
    assert_eq!(m.user().unwrap().stats.current_streak, 1);

    clock.advance_days(1);
    m.start_new_run().unwrap();
    m.extract().unwrap();
    assert_eq!(m.user().unwrap().stats.current_streak, 2);

    clock.advance_days(2);
    m.start_new_run().unwrap();
    m.extract().unwrap();
    let stats = m.user().unwrap().stats;
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.best_streak, 2);
    assert_eq!(stats.total_extractions, 3);
}

#[test]
fn streak_continuity_memory() {
    streak_continuity(MemoryStore::new());
}

#[test]
fn streak_continuity_sqlite() {
    streak_continuity(SqliteStore::open_memory().unwrap());
}

fn tier_gating<S: RunStore>(store: S) {
    let (mut m, clock) = manager(store, 10);
    let deep = TaskDraft::new("Deep work", TierLevel::Three, 30, true);

    m.start_new_run().unwrap();
    assert!(matches!(
        economy(m.add_task(&deep).unwrap_err()),
        EconomyError::TierLocked {
            required_minutes: 100,
            lifetime_minutes: 0,
            ..
        }
    ));

    for i in 0..7 {
        let task = m
            .add_task(&TaskDraft::new(format!("Sprint {i}"), TierLevel::One, 15, false))
            .unwrap();
        m.complete_task(&task.id).unwrap();
    }
    // Focus minutes only count once banked by extraction.
    assert!(m.add_task(&deep).is_err());
    m.extract().unwrap();
    assert_eq!(m.user().unwrap().stats.total_focus_minutes, 105);

    clock.advance_days(1);
    m.start_new_run().unwrap();
    let task = m.add_task(&deep).unwrap();
    assert_eq!(task.energy_cost, 5);
    assert_eq!(m.unlocked_tiers().unwrap().len(), 3);
}

#[test]
fn tier_gating_memory() {
    tier_gating(MemoryStore::new());
}

#[test]
fn tier_gating_sqlite() {
    tier_gating(SqliteStore::open_memory().unwrap());
}

#[test]
fn active_tasks_are_failed_at_extraction() {
    let (mut m, _) = manager(SqliteStore::open_memory().unwrap(), 10);
    m.start_new_run().unwrap();
    let timed = m
        .add_task(&TaskDraft::new("Write", TierLevel::Two, 20, true))
        .unwrap();
    m.start_task(&timed.id).unwrap();
    m.add_task(&TaskDraft::new("Later", TierLevel::One, 5, false))
        .unwrap();

    let extraction = m.extract().unwrap();
    assert_eq!(extraction.tasks_failed, 1);
    assert_eq!(extraction.failed_by_tier.t2, 1);
    assert_eq!(extraction.tasks_total, 2);
    assert_eq!(extraction.final_xp, 0);
}

fn penalty_applies_to_auto_failed_tasks<S: RunStore>(store: S) {
    let (m, _) = manager(store, 10);
    let mut m = m.with_catalog(open_catalog()).with_penalty(PenaltyPolicy {
        fail_penalty_percent: 10,
        ..PenaltyPolicy::default()
    });
    m.start_new_run().unwrap();
    let quick = m
        .add_task(&TaskDraft::new("Inbox", TierLevel::One, 15, false))
        .unwrap();
    m.complete_task(&quick.id).unwrap();
    let deep = m
        .add_task(&TaskDraft::new("Design", TierLevel::Three, 30, true))
        .unwrap();
    m.start_task(&deep.id).unwrap();

    let extraction = m.extract().unwrap();
    assert_eq!(extraction.failed_by_tier.t3, 1);
    assert_eq!(extraction.penalty_xp, 3);
    assert_eq!(extraction.final_xp, 27);
    assert_eq!(extraction.xp_before_penalties, 30);
    assert_eq!(m.user().unwrap().stats.total_xp, 27);
}

#[test]
fn penalty_applies_to_auto_failed_tasks_memory() {
    penalty_applies_to_auto_failed_tasks(MemoryStore::new());
}

#[test]
fn penalty_applies_to_auto_failed_tasks_sqlite() {
    penalty_applies_to_auto_failed_tasks(SqliteStore::open_memory().unwrap());
}

#[test]
fn failed_extraction_can_be_retried() {
    let (mut m, _) = manager(SqliteStore::open_memory().unwrap(), 10);
    let run = m.start_new_run().unwrap();
    let task = m
        .add_task(&TaskDraft::new("Inbox", TierLevel::One, 10, false))
        .unwrap();
    m.complete_task(&task.id).unwrap();

    // Occupy the run's extraction slot so the settlement write fails.
    m.store()
        .conn()
        .execute(
            "INSERT INTO extractions (id, user_id, run_id, run_date, final_xp, xp_before_penalties,
                                      penalty_xp, tasks_completed, tasks_failed, tasks_total,
                                      total_focus_minutes, created_at)
             VALUES ('blocker', 'player', ?1, '2026-07-01', 0, 0, 0, 0, 0, 0, 0,
                     '2026-07-01T00:00:00+00:00')",
            [&run.id],
        )
        .unwrap();
    assert!(m.extract().is_err());
    assert_eq!(m.current_run().unwrap().unwrap().id, run.id);
    assert_eq!(m.user().unwrap().stats.total_xp, 0);

    m.store()
        .conn()
        .execute("DELETE FROM extractions WHERE id = 'blocker'", [])
        .unwrap();
    let extraction = m.extract().unwrap();
    assert_eq!(extraction.final_xp, 20);
    let user = m.user().unwrap();
    assert_eq!(user.stats.total_xp, 20);
    assert_eq!(user.stats.total_extractions, 1);
    assert_eq!(user.stats.total_focus_minutes, 10);
    assert_eq!(m.journal().unwrap().len(), 1);
}

#[test]
fn sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rogueday.db");

    let task_id = {
        let (mut m, _) = manager(SqliteStore::open_at(&path).unwrap(), 10);
        m.start_new_run().unwrap();
        m.add_task(&TaskDraft::new("Plan", TierLevel::Two, 20, true))
            .unwrap()
            .id
    };

    let (mut m, _) = manager(SqliteStore::open_at(&path).unwrap(), 10);
    let run = m.current_run().unwrap().unwrap();
    assert_eq!(run.energy.current, 8);
    m.start_task(&task_id).unwrap();
    m.complete_task(&task_id).unwrap();
    assert_eq!(m.extract().unwrap().final_xp, 27);
}

#[test]
fn preset_creation_reports_unreadable_templates() {
    let (mut m, _) = manager(SqliteStore::open_memory().unwrap(), 10);
    let good = m
        .create_template(TaskDraft::new("Stretch", TierLevel::One, 5, false), None)
        .unwrap();
    m.store()
        .conn()
        .execute(
            "INSERT INTO task_templates (id, user_id, title, tier, duration, created_at)
             VALUES ('tpl-bad', 'player', 'Broken', 9, 5, '2026-07-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

    let err = m
        .create_preset("Morning", None, vec![good.id.clone(), "tpl-bad".into()])
        .unwrap_err();
    assert!(matches!(
        err,
        rogueday_core::CoreError::Store(rogueday_core::StoreError::Corrupt { .. })
    ));
    assert!(m.list_presets().unwrap().is_empty());

    let preset = m
        .create_preset("Morning", None, vec![good.id.clone(), "tpl-missing".into()])
        .unwrap();
    assert_eq!(preset.template_ids, vec![good.id]);
}

#[test]
fn preset_batch_skips_what_does_not_fit() {
    let (mut m, _) = manager(SqliteStore::open_memory().unwrap(), 5);
    let focus = m
        .create_template(TaskDraft::new("Focus", TierLevel::Two, 15, true), None)
        .unwrap();
    let deep = m
        .create_template(TaskDraft::new("Deep", TierLevel::Three, 30, true), None)
        .unwrap();
    let quick = m
        .create_template(TaskDraft::new("Quick", TierLevel::One, 5, false), None)
        .unwrap();
    let preset = m
        .create_preset(
            "Full day",
            None,
            vec![focus.id.clone(), focus.id.clone(), focus.id.clone(), deep.id.clone(), quick.id.clone()],
        )
        .unwrap();

    m.start_new_run().unwrap();
    let report = m.apply_preset(&preset.id).unwrap();
    assert_eq!(report.tasks_created, 3);
    assert_eq!(report.tasks_skipped, 2);
    assert_eq!(report.total_energy_cost, 4);
    assert_eq!(
        report.message,
        "Added 3 tasks. 2 skipped (not enough energy, tier locked)."
    );
    assert_eq!(m.current_run().unwrap().unwrap().energy.current, 1);

    let templates = m.list_templates(None).unwrap();
    assert_eq!(templates[0].id, focus.id);
    assert_eq!(templates[0].times_used, 2);
}
