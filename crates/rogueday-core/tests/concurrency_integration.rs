//! A shared manager serializes check-then-debit across threads.

use std::sync::{Arc, Mutex};
use std::thread;

use rogueday_core::{
    MemoryStore, RunManager, SqliteStore, TaskDraft, TierCatalog, TierLevel, TierSpec,
};

#[test]
fn concurrent_adds_never_overdraw() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_at(dir.path().join("rogueday.db")).unwrap();
    let cheap_t2 = TierCatalog::new([
        TierCatalog::default_tier(TierLevel::One),
        TierSpec {
            unlock_requirement_minutes: 0,
            ..TierCatalog::default_tier(TierLevel::Two)
        },
        TierCatalog::default_tier(TierLevel::Three),
    ])
    .unwrap();
    let mut manager = RunManager::new(store, "player")
        .with_max_energy(23)
        .with_catalog(cheap_t2);
    manager.start_new_run().unwrap();
    let manager = Arc::new(Mutex::new(manager));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let draft = TaskDraft::new(format!("Focus {i}"), TierLevel::Two, 20, true);
                manager.lock().unwrap().add_task(&draft).is_ok()
            })
        })
        .collect();
    let added = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // 23 energy buys four 5-cost tasks.
    assert_eq!(added, 4);
    let run = manager.lock().unwrap().current_run().unwrap().unwrap();
    assert_eq!(run.tasks.len(), 4);
    assert_eq!(run.energy.current, 3);
}

#[test]
fn manager_is_shareable_across_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<RunManager<MemoryStore>>();
    assert_send::<RunManager<SqliteStore>>();
}
