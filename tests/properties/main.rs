use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use tsm::core::{ActorId, DeletionState, FixedClock, MappingKey, NewMapping, TestSampleMapping};
use tsm::lifecycle::MappingLifecycleService;
use tsm::storage::{Database, Scope};

const ACTOR: ActorId = ActorId(5);

/// One planned draw: test index, sample number, whether it gets rejected.
#[derive(Debug, Clone)]
struct Draw {
    test: u8,
    sample_number: u32,
    rejected: bool,
}

fn arb_draws() -> impl Strategy<Value = Vec<Draw>> {
    prop::collection::btree_map((0_u8..6, 1_u32..4), any::<bool>(), 1..12).prop_map(|slots| {
        slots
            .into_iter()
            .map(|((test, sample_number), rejected)| Draw {
                test,
                sample_number,
                rejected,
            })
            .collect()
    })
}

fn service() -> MappingLifecycleService {
    let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 2, 1, 6, 0, 0).unwrap(),
    ));
    MappingLifecycleService::new(db, clock)
}

fn new_mapping(draw: &Draw) -> NewMapping {
    NewMapping {
        oms_order_id: "O1".to_string(),
        oms_test_id: format!("T{}", draw.test),
        sample_id: 1_000 + i64::from(draw.sample_number),
        sample_number: draw.sample_number,
        vial_type_id: 1,
        oms_city_code: "DEL".to_string(),
    }
}

fn setup(draws: &[Draw]) -> (MappingLifecycleService, Vec<TestSampleMapping>) {
    let service = service();
    let news: Vec<NewMapping> = draws.iter().map(new_mapping).collect();
    let created = service
        .in_transaction(|uow| {
            service.create_bulk(uow, &news, ACTOR)?;
            for draw in draws.iter().filter(|draw| draw.rejected) {
                service.reject_draw(uow, &new_mapping(draw).key(), "clotted", ACTOR)?;
            }
            service.list_for_order(uow, "O1")
        })
        .expect("seed");
    (service, created)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn soft_delete_hides_from_scoped_reads_only(draws in arb_draws(), pick in any::<prop::sample::Index>()) {
        let (service, rows) = setup(&draws);
        let target = rows[pick.index(rows.len())].clone();

        service
            .in_transaction(|uow| service.delete_by_ids(uow, &[target.id], ACTOR))
            .unwrap();

        let scoped = service.in_transaction(|uow| service.mapping_by_id(uow, target.id, Scope::Active));
        prop_assert!(scoped.unwrap_err().is_not_found());

        let unscoped = service
            .in_transaction(|uow| service.mapping_by_id(uow, target.id, Scope::All))
            .unwrap();
        let withdrawn_by_actor =
            matches!(unscoped.deletion, DeletionState::Deleted { by, .. } if by == ACTOR);
        prop_assert!(withdrawn_by_actor);
        let mut restored = unscoped;
        restored.deletion = DeletionState::Active;
        prop_assert_eq!(restored, target);
    }

    #[test]
    fn resolve_is_idempotent_and_spares_unrejected(draws in arb_draws(), pick in any::<prop::sample::Index>()) {
        let (service, before) = setup(&draws);
        let test_id = before[pick.index(before.len())].oms_test_id.clone();

        service
            .in_transaction(|uow| service.resolve_recollection(uow, "O1", &test_id, ACTOR))
            .unwrap();
        let once = service.in_transaction(|uow| service.list_for_order(uow, "O1")).unwrap();
        service
            .in_transaction(|uow| service.resolve_recollection(uow, "O1", &test_id, ACTOR))
            .unwrap();
        let twice = service.in_transaction(|uow| service.list_for_order(uow, "O1")).unwrap();
        prop_assert_eq!(&once, &twice);

        for (old, new) in before.iter().zip(&once) {
            if old.oms_test_id != test_id || !old.is_rejected {
                prop_assert_eq!(old, new);
            } else {
                prop_assert!(new.is_rejected);
                prop_assert!(!new.recollection_pending);
            }
        }
    }

    #[test]
    fn resolve_of_unknown_test_is_not_found(draws in arb_draws()) {
        let (service, _) = setup(&draws);
        let err = service
            .in_transaction(|uow| service.resolve_recollection(uow, "O1", "T99", ACTOR))
            .unwrap_err();
        prop_assert!(err.is_not_found());
    }

    #[test]
    fn pending_check_matches_rows(draws in arb_draws()) {
        let (service, rows) = setup(&draws);
        let expected = rows.iter().any(|row| row.recollection_pending);
        let actual = service
            .in_transaction(|uow| service.any_recollection_pending_for_order(uow, "O1"))
            .unwrap();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn quorum_matches_other_tests_on_sample_number(draws in arb_draws(), pick in any::<prop::sample::Index>()) {
        let (service, rows) = setup(&draws);
        let target = &rows[pick.index(rows.len())];
        let key = MappingKey::new("O1", target.oms_test_id.clone(), target.sample_number);

        let expected = rows
            .iter()
            .filter(|row| row.sample_number == target.sample_number && row.oms_test_id != target.oms_test_id)
            .all(|row| row.is_rejected);
        let actual = service
            .in_transaction(|uow| service.all_other_tests_rejected(uow, &key))
            .unwrap();
        prop_assert_eq!(actual, expected);
    }
}
