
use cumulus_core::{has_no_async_op_or_exists, has_no_parent_execution_or_exists, ConfigurationError, EngineConfig,
                   GateDecision, RelationalStore, SkipReason, VersionGate};
use test_support::*;

#[test]
fn pre_cutover_message_is_not_written() {
    let (_kv, rel, collection_id) = seeded_stores();
    let gate = VersionGate::with_cutover(CUTOVER);
    let msg = message(event("e", PRE_CUTOVER));
    assert!(!gate.should_write_to_relational_store(&rel, &msg, Some(collection_id)).expect("gate"));
}

#[test]
fn post_cutover_message_with_existing_references_is_written() {
    let (_kv, rel, collection_id) = seeded_stores();
    let parent_id = rel.transaction(|tx| {
                           let record = cumulus_core::translate::build_execution_record(&message(event("parent",
                                                                                                         POST_CUTOVER)),
                                                                                        &execution_arn("parent"),
                                                                                        Default::default(),
                                                                                        chrono::Utc::now());
                           tx.upsert_execution(&record)
                       })
                       .expect("seed parent");
    assert!(parent_id > 0);
    rel.insert_async_operation(ASYNC_OPERATION_ID).expect("seed async op");

    let msg = message(with_async_operation(with_parent(event("child", POST_CUTOVER), &execution_arn("parent")),
                                           ASYNC_OPERATION_ID));
    assert!(has_no_parent_execution_or_exists(&rel, &msg));
    assert!(has_no_async_op_or_exists(&rel, &msg));
    let gate = VersionGate::with_cutover(CUTOVER);
    assert_eq!(gate.evaluate(&rel, &msg, Some(collection_id)).expect("gate"), GateDecision::Write);
}

#[test]
fn reference_check_failure_returns_false() {
    let (_kv, inner, collection_id) = seeded_stores();
    let rel = FaultyRelationalStore::new(inner, FailPoint::ReferenceLookups);
    let msg = message(with_parent(event("e", POST_CUTOVER), &execution_arn("parent")));
    let gate = VersionGate::with_cutover(CUTOVER);
    assert!(!gate.should_write_to_relational_store(&rel, &msg, Some(collection_id)).expect("no error"));
    assert!(!has_no_parent_execution_or_exists(&rel, &msg));
}

#[test]
fn undefined_collection_id_returns_false() {
    let (_kv, rel, _) = seeded_stores();
    let gate = VersionGate::with_cutover(CUTOVER);
    let decision = gate.evaluate(&rel, &message(event("e", POST_CUTOVER)), None).expect("gate");
    assert_eq!(decision, GateDecision::Skip(SkipReason::MissingCollection));
}

#[test]
fn missing_referenced_object_returns_false() {
    let (_kv, rel, collection_id) = seeded_stores();
    let msg = message(with_async_operation(event("e", POST_CUTOVER), "9d0c6a52-1f7e-4b3a-8c25-e4f6a1b2c3d4"));
    let gate = VersionGate::with_cutover(CUTOVER);
    assert!(!gate.should_write_to_relational_store(&rel, &msg, Some(collection_id)).expect("gate"));
    assert!(has_no_parent_execution_or_exists(&rel, &msg));
    assert!(!has_no_async_op_or_exists(&rel, &msg));
}

#[test]
fn missing_cutover_configuration_is_an_error() {
    let (_kv, rel, collection_id) = seeded_stores();
    let gate = VersionGate::new(&EngineConfig { relational_cutover_version: None });
    let err = gate.should_write_to_relational_store(&rel, &message(event("e", POST_CUTOVER)), Some(collection_id))
                  .expect_err("configuration error");
    assert_eq!(err, ConfigurationError::MissingCutoverVersion);
}

#[test]
fn non_uuid_async_operation_is_never_satisfied() {
    let (_kv, rel, collection_id) = seeded_stores();
    assert!(rel.insert_async_operation("op-1").is_err());
    let msg = message(with_async_operation(event("e", POST_CUTOVER), "op-1"));
    let gate = VersionGate::with_cutover(CUTOVER);
    assert!(!has_no_async_op_or_exists(&rel, &msg));
    assert!(!gate.should_write_to_relational_store(&rel, &msg, Some(collection_id)).expect("gate"));
}
