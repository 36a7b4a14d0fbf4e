//! Property tests over titles, toggling and delta accumulation.

use aura_core::{
    CoreError, NewSession, SessionType, Store, TaskRegistry, TimerEngine, ValidationError,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn blank_titles_never_reach_the_store(title in "[ \t\r\n]{0,12}") {
        let store = Store::open_memory().unwrap();
        let registry = TaskRegistry::new(&store);

        let err = registry.create(&title).unwrap_err();
        prop_assert!(matches!(err, CoreError::Validation(ValidationError::EmptyTitle)));
        prop_assert!(registry.list_today().unwrap().is_empty());
    }

    #[test]
    fn toggle_is_an_involution(title in "[a-zA-Z][a-zA-Z0-9 ]{0,20}", flips in 0usize..6) {
        let store = Store::open_memory().unwrap();
        let registry = TaskRegistry::new(&store);
        let task = registry.create(&title).unwrap();
        for _ in 0..flips {
            registry.toggle(task.id).unwrap();
        }
        let before = store.get_task(task.id).unwrap().unwrap().status;

        registry.toggle(task.id).unwrap();
        registry.toggle(task.id).unwrap();

        prop_assert_eq!(store.get_task(task.id).unwrap().unwrap().status, before);
    }

    #[test]
    fn flushed_duration_is_floor_of_summed_deltas(
        deltas in prop::collection::vec(0u64..5_000, 1..60),
    ) {
        let store = Store::open_memory().unwrap().with_min_session_secs(0);
        let mut engine = TimerEngine::default();
        let mut now = 1_700_000_000_000u64;

        engine.start(now);
        for delta in &deltas {
            now += delta;
            engine.tick(now);
        }
        engine.stop(now, &store).unwrap();

        let total: u64 = deltas.iter().sum();
        let history = store.export_all_sessions().unwrap();
        prop_assert_eq!(history.len(), 1);
        prop_assert_eq!(history[0].duration_secs, total / 1000);
    }

    #[test]
    fn threshold_decides_persistence(duration in 0u64..20, threshold in 0u64..20) {
        let store = Store::open_memory().unwrap().with_min_session_secs(threshold);
        let outcome = store
            .append_session(&NewSession::new(None, duration, SessionType::Work))
            .unwrap();
        prop_assert_eq!(outcome.is_recorded(), duration >= threshold);
        prop_assert_eq!(store.count_sessions().unwrap(), u64::from(duration >= threshold));
    }
}
