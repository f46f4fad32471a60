
use cumulus_core::translate::build_execution_record;
use cumulus_core::{GranuleExecution, GranuleExecutionQuery, GranulesExecutions, InMemoryRelationalStore,
                   RelationalError, RelationalStore};
use test_support::*;

/// Siembra dos ejecuciones y tres gránulos; devuelve sus ids.
fn seed(rel: &InMemoryRelationalStore) -> (i64, i64, Vec<i64>) {
    let granules: Vec<i64> =
        ["g-1", "g-2", "g-3"].iter().map(|g| rel.insert_granule(g).expect("seed granule")).collect();
    let (e1, e2) = rel.transaction(|tx| {
                          let now = chrono::Utc::now();
                          let a = build_execution_record(&message(event("a", POST_CUTOVER)),
                                                         &execution_arn("a"),
                                                         Default::default(),
                                                         now);
                          let b = build_execution_record(&message(event("b", POST_CUTOVER)),
                                                         &execution_arn("b"),
                                                         Default::default(),
                                                         now);
                          Ok((tx.upsert_execution(&a)?, tx.upsert_execution(&b)?))
                      })
                      .expect("seed executions");
    (e1, e2, granules)
}

fn pair(execution_cumulus_id: i64, granule_cumulus_id: i64) -> GranuleExecution {
    GranuleExecution { execution_cumulus_id, granule_cumulus_id }
}

#[test]
fn create_then_exists() {
    let rel = InMemoryRelationalStore::new();
    let (e1, _, g) = seed(&rel);
    let model = GranulesExecutions;
    let found = rel.transaction(|tx| {
                       model.create(tx, pair(e1, g[0]))?;
                       model.exists(tx, pair(e1, g[0]))
                   })
                   .expect("create");
    assert!(found);
    assert!(!rel.transaction(|tx| model.exists(tx, pair(e1, g[1]))).expect("exists"));
}

#[test]
fn create_duplicate_is_constraint_error() {
    let rel = InMemoryRelationalStore::new();
    let (e1, _, g) = seed(&rel);
    let model = GranulesExecutions;
    rel.transaction(|tx| model.create(tx, pair(e1, g[0]))).expect("first create");
    let err = rel.transaction(|tx| model.create(tx, pair(e1, g[0]))).expect_err("duplicate");
    assert!(matches!(err, RelationalError::UniqueViolation(_)));
    assert!(err.is_constraint_violation());
}

#[test]
fn upsert_existing_pair_keeps_one_row() {
    let rel = InMemoryRelationalStore::new();
    let (e1, _, g) = seed(&rel);
    let model = GranulesExecutions;
    rel.transaction(|tx| {
           model.upsert(tx, pair(e1, g[0]))?;
           model.upsert(tx, pair(e1, g[0]))
       })
       .expect("upsert");
    rel.transaction(|tx| model.upsert(tx, pair(e1, g[0]))).expect("upsert again");
    assert_eq!(rel.granule_execution_count().expect("count"), 1);
}

#[test]
fn create_with_unknown_execution_is_foreign_key_error() {
    let rel = InMemoryRelationalStore::new();
    let (_, _, g) = seed(&rel);
    let err = rel.transaction(|tx| GranulesExecutions.create(tx, pair(999, g[0]))).expect_err("fk");
    assert!(matches!(err, RelationalError::ForeignKeyViolation(_)));
}

#[test]
fn search_by_partial_key_returns_matching_pairs_in_insertion_order() {
    let rel = InMemoryRelationalStore::new();
    let (e1, e2, g) = seed(&rel);
    let model = GranulesExecutions;
    rel.transaction(|tx| {
           model.create(tx, pair(e1, g[2]))?;
           model.create(tx, pair(e2, g[0]))?;
           model.create(tx, pair(e1, g[0]))
       })
       .expect("create");

    let by_execution = rel.transaction(|tx| model.search(tx, GranuleExecutionQuery::by_execution(e1)))
                          .expect("search");
    assert_eq!(by_execution, vec![pair(e1, g[2]), pair(e1, g[0])]);

    let by_granule = rel.transaction(|tx| model.search(tx, GranuleExecutionQuery::by_granule(g[0]))).expect("search");
    assert_eq!(by_granule, vec![pair(e2, g[0]), pair(e1, g[0])]);

    let all = rel.transaction(|tx| model.search(tx, GranuleExecutionQuery::default())).expect("search");
    assert_eq!(all.len(), 3);
}

#[test]
fn search_by_granule_cumulus_ids_with_and_without_transaction() {
    let rel = InMemoryRelationalStore::new();
    let (e1, e2, g) = seed(&rel);
    let model = GranulesExecutions;
    rel.transaction(|tx| {
           model.create(tx, pair(e1, g[0]))?;
           model.create(tx, pair(e2, g[1]))?;
           model.create(tx, pair(e1, g[1]))
       })
       .expect("create");

    let mut outside = model.search_by_granule_cumulus_ids(&rel, None, &[g[0], g[1]]).expect("own read");
    outside.sort_unstable();
    assert_eq!(outside, vec![e1, e2]);

    let inside = rel.transaction(|tx| model.search_by_granule_cumulus_ids(&rel, Some(tx), &[g[0]])).expect("joined");
    assert_eq!(inside, vec![e1]);

    assert!(model.search_by_granule_cumulus_ids(&rel, None, &[g[2]]).expect("none").is_empty());
    assert!(model.search_by_granule_cumulus_ids(&rel, None, &[]).expect("empty").is_empty());
}

#[test]
fn uncommitted_links_are_visible_inside_the_transaction_only() {
    let rel = InMemoryRelationalStore::new();
    let (e1, _, g) = seed(&rel);
    let model = GranulesExecutions;
    let res: Result<(), RelationalError> = rel.transaction(|tx| {
                                                  model.create(tx, pair(e1, g[2]))?;
                                                  let seen =
                                                      model.search_by_granule_cumulus_ids(&rel, Some(tx), &[g[2]])?;
                                                  assert_eq!(seen, vec![e1]);
                                                  Err(RelationalError::Backend("abort".into()))
                                              });
    assert!(res.is_err());
    assert!(model.search_by_granule_cumulus_ids(&rel, None, &[g[2]]).expect("read").is_empty());
}

#[test]
fn delete_is_idempotent_and_search_is_empty_afterwards() {
    let rel = InMemoryRelationalStore::new();
    let (e1, _, g) = seed(&rel);
    let model = GranulesExecutions;
    rel.transaction(|tx| model.create(tx, pair(e1, g[0]))).expect("create");

    assert_eq!(rel.transaction(|tx| model.delete(tx, pair(e1, g[0]))).expect("delete"), 1);
    assert_eq!(rel.transaction(|tx| model.delete(tx, pair(e1, g[0]))).expect("delete again"), 0);
    let found = rel.transaction(|tx| model.search(tx, GranuleExecutionQuery::by_execution(e1))).expect("search");
    assert!(found.is_empty());
}
