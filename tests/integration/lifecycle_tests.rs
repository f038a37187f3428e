use tsm::core::{ActorId, MappingKey, to_infos};
use tsm::lifecycle::MappingState;
use tsm::storage::{MutationOutcome, Scope};
use tsm::test_utils::{TestDb, draw, ids};
use tsm::TsmError;

const PHLEBOTOMIST: ActorId = ActorId(7);
const SYSTEM: ActorId = ActorId(0);

#[test]
fn reject_check_resolve_walkthrough() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(&[draw("O1", "T1", 100, 1)], PHLEBOTOMIST);
    let key = MappingKey::new("O1", "T1", 1);

    let rejected = service
        .in_transaction(|uow| service.reject_draw(uow, &key, "clotted", PHLEBOTOMIST))
        .unwrap();
    assert!(rejected.is_rejected);
    assert!(rejected.recollection_pending);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("clotted"));

    let quorum = service
        .in_transaction(|uow| service.all_other_tests_rejected(uow, &key))
        .unwrap();
    assert!(quorum, "no other test shares the draw");

    let report = service
        .in_transaction(|uow| service.resolve_recollection(uow, "O1", "T1", SYSTEM))
        .unwrap();
    assert_eq!(report.cleared, vec![rejected.id]);

    let after = service
        .in_transaction(|uow| service.mapping_by_key(uow, &key))
        .unwrap();
    assert!(after.is_rejected);
    assert!(!after.recollection_pending);
    assert_eq!(after.updated_by, SYSTEM);
    assert!(matches!(MappingState::of(&after), MappingState::Resolved { .. }));
}

#[test]
fn empty_bulk_delete_is_a_noop() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(&[draw("O1", "T1", 100, 1)], PHLEBOTOMIST);

    let outcome = service
        .in_transaction(|uow| service.delete_by_ids(uow, &[], PHLEBOTOMIST))
        .unwrap();
    assert_eq!(outcome, MutationOutcome::NoOp);

    let remaining = service
        .in_transaction(|uow| service.list_for_order(uow, "O1"))
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn failing_second_row_rolls_back_whole_bulk_update() {
    let env = TestDb::new();
    let service = env.service();
    let seeded = env.seed(
        &[
            draw("O1", "T1", 100, 1),
            draw("O1", "T2", 100, 1),
            draw("O1", "T3", 100, 1),
        ],
        PHLEBOTOMIST,
    );

    let mut batch = seeded.clone();
    batch[0].vial_type_id = 40;
    // reason without rejection breaks a column rule
    batch[1].rejection_reason = Some("hemolyzed".to_string());
    batch[2].vial_type_id = 42;

    let err = service
        .in_transaction(|uow| service.update_bulk(uow, &batch, PHLEBOTOMIST))
        .unwrap_err();
    assert!(matches!(err, TsmError::ConstraintViolation(_)));

    let rows = service
        .in_transaction(|uow| service.mappings_for_order(uow, "O1"))
        .unwrap();
    assert_eq!(rows, seeded);
}

#[test]
fn second_rejection_overwrites_reason() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(&[draw("O1", "T1", 100, 1)], PHLEBOTOMIST);
    let key = MappingKey::new("O1", "T1", 1);

    service
        .in_transaction(|uow| service.reject_draw(uow, &key, "clotted", PHLEBOTOMIST))
        .unwrap();
    let again = service
        .in_transaction(|uow| service.reject_draw(uow, &key, "insufficient volume", PHLEBOTOMIST))
        .unwrap();
    assert_eq!(again.rejection_reason.as_deref(), Some("insufficient volume"));
    assert!(again.recollection_pending);
}

#[test]
fn quorum_is_false_while_another_test_is_unrejected() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(
        &[draw("O1", "T1", 100, 1), draw("O1", "T2", 100, 1)],
        PHLEBOTOMIST,
    );
    let key = MappingKey::new("O1", "T1", 1);

    let before = service
        .in_transaction(|uow| service.all_other_tests_rejected(uow, &key))
        .unwrap();
    assert!(!before);

    service
        .in_transaction(|uow| {
            service.reject_draw(uow, &MappingKey::new("O1", "T2", 1), "lipemic", PHLEBOTOMIST)
        })
        .unwrap();
    let after = service
        .in_transaction(|uow| service.all_other_tests_rejected(uow, &key))
        .unwrap();
    assert!(after);
}

#[test]
fn resolve_twice_matches_resolve_once() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(
        &[draw("O1", "T1", 100, 1), draw("O1", "T1", 101, 2)],
        PHLEBOTOMIST,
    );
    service
        .in_transaction(|uow| {
            service.reject_draw(uow, &MappingKey::new("O1", "T1", 1), "clotted", PHLEBOTOMIST)
        })
        .unwrap();

    service
        .in_transaction(|uow| service.resolve_recollection(uow, "O1", "T1", SYSTEM))
        .unwrap();
    let once = service
        .in_transaction(|uow| service.mappings_for_order(uow, "O1"))
        .unwrap();

    env.clock.advance(chrono::Duration::hours(1));
    let second = service
        .in_transaction(|uow| service.resolve_recollection(uow, "O1", "T1", SYSTEM))
        .unwrap();
    assert!(second.is_noop());
    assert_eq!(second.already_resolved.len(), 1);
    assert_eq!(second.skipped_unrejected.len(), 1);

    let twice = service
        .in_transaction(|uow| service.mappings_for_order(uow, "O1"))
        .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn reject_sample_hits_every_test_on_the_tube() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(
        &[
            draw("O1", "T1", 100, 1),
            draw("O1", "T2", 100, 1),
            draw("O1", "T3", 200, 1),
        ],
        PHLEBOTOMIST,
    );

    let outcome = service
        .in_transaction(|uow| service.reject_sample(uow, 100, Some("broken tube"), PHLEBOTOMIST))
        .unwrap();
    assert_eq!(outcome.rows(), 2);

    let pending = service
        .in_transaction(|uow| {
            service.any_recollection_pending(uow, &ids(&["O1"]), &ids(&["T3"]))
        })
        .unwrap();
    assert!(!pending);
    let pending = service
        .in_transaction(|uow| service.any_recollection_pending_for_order(uow, "O1"))
        .unwrap();
    assert!(pending);
}

#[test]
fn clear_recollection_for_tests_ends_pending_state() {
    let env = TestDb::new();
    let service = env.service();
    env.seed(&[draw("O1", "T1", 100, 1), draw("O2", "T1", 300, 1)], PHLEBOTOMIST);
    service
        .in_transaction(|uow| service.reject_sample(uow, 100, Some("clotted"), PHLEBOTOMIST))
        .unwrap();
    service
        .in_transaction(|uow| service.reject_sample(uow, 300, Some("clotted"), PHLEBOTOMIST))
        .unwrap();

    let outcome = service
        .in_transaction(|uow| service.clear_recollection_for_tests(uow, &ids(&["T1"]), SYSTEM))
        .unwrap();
    assert_eq!(outcome.rows(), 2);

    let pending = service
        .in_transaction(|uow| {
            service.any_recollection_pending(uow, &ids(&["O1", "O2"]), &ids(&["T1"]))
        })
        .unwrap();
    assert!(!pending);
}

#[test]
fn withdrawn_test_keeps_history_visible_to_resolve() {
    let env = TestDb::new();
    let service = env.service();
    let seeded = env.seed(&[draw("O1", "T1", 100, 1)], PHLEBOTOMIST);

    service
        .in_transaction(|uow| service.delete_by_test_ids(uow, &ids(&["T1"]), PHLEBOTOMIST))
        .unwrap();

    let report = service
        .in_transaction(|uow| service.resolve_recollection(uow, "O1", "T1", SYSTEM))
        .unwrap();
    assert_eq!(report.skipped_deleted, vec![seeded[0].id]);

    let history = service
        .in_transaction(|uow| {
            service.mappings_for_order_and_tests(uow, "O1", &ids(&["T1"]), Scope::All)
        })
        .unwrap();
    let infos = to_infos(&history);
    assert_eq!(infos.len(), 1);
    assert!(infos[0].deleted_at.is_some());
    assert_eq!(infos[0].deleted_by, Some(PHLEBOTOMIST));
}

#[test]
fn order_and_test_set_reads_skip_withdrawn_rows() {
    let env = TestDb::new();
    let service = env.service();
    let seeded = env.seed(
        &[
            draw("O1", "T1", 100, 1),
            draw("O1", "T2", 100, 1),
            draw("O2", "T1", 200, 1),
            draw("O3", "T3", 300, 1),
        ],
        PHLEBOTOMIST,
    );

    service
        .in_transaction(|uow| service.delete_by_ids(uow, &[seeded[1].id, seeded[3].id], SYSTEM))
        .unwrap();

    let by_orders = service
        .in_transaction(|uow| service.mappings_for_orders(uow, &ids(&["O1", "O2", "O3"])))
        .unwrap();
    let mut order_rows: Vec<i64> = by_orders.iter().map(|m| m.id).collect();
    order_rows.sort_unstable();
    assert_eq!(order_rows, vec![seeded[0].id, seeded[2].id]);

    let by_tests = service
        .in_transaction(|uow| service.mappings_for_tests(uow, &ids(&["T1", "T2"])))
        .unwrap();
    let mut test_rows: Vec<i64> = by_tests.iter().map(|m| m.id).collect();
    test_rows.sort_unstable();
    assert_eq!(test_rows, vec![seeded[0].id, seeded[2].id]);

    let withdrawn_only = service
        .in_transaction(|uow| service.mappings_for_tests(uow, &ids(&["T3"])))
        .unwrap_err();
    assert!(withdrawn_only.is_not_found());
}
