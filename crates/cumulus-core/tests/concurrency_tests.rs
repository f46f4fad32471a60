
use std::collections::HashSet;

use cumulus_core::{ExecutionStatusStore, GranulesExecutions, WriteOutcome};
use rayon::prelude::*;
use test_support::*;

#[test]
fn concurrent_distinct_events_get_distinct_ids() {
    let (kv, rel, _) = seeded_stores();
    let writer = writer(&kv, &rel);

    let ids: Vec<i64> = (0..200).into_par_iter()
                                .map(|i| {
                                    writer.write_execution(&message(event(&format!("exec-{i}"), POST_CUTOVER)))
                                          .expect("write")
                                          .relational_id()
                                          .expect("id")
                                })
                                .collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 200);
    assert_eq!(kv.len(), 200);
    assert_eq!(rel.execution_count().expect("count"), 200);
}

#[test]
fn concurrent_redeliveries_of_one_event_converge_to_one_row() {
    let (kv, rel, _) = seeded_stores();
    let writer = writer(&kv, &rel);
    let msg = message(event("same", POST_CUTOVER));

    let outcomes: Vec<WriteOutcome> = (0..64).into_par_iter().map(|_| writer.write_execution(&msg).expect("write")).collect();
    let ids: HashSet<Option<i64>> = outcomes.iter().map(WriteOutcome::relational_id).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(rel.execution_count().expect("count"), 1);
    assert_eq!(kv.len(), 1);
    assert!(kv.exists(&execution_arn("same")).expect("kv"));
}

#[test]
fn concurrent_events_sharing_a_granule_link_independently() {
    let (kv, rel, _) = seeded_stores();
    let granule_id = rel.insert_granule("shared").expect("seed");
    let writer = writer(&kv, &rel);

    let ids: Vec<i64> = (0..32).into_par_iter()
                               .map(|i| {
                                   let value = with_granules(event(&format!("g-exec-{i}"), POST_CUTOVER), &["shared"]);
                                   writer.write_execution(&message(value)).expect("write").relational_id().expect("id")
                               })
                               .collect();

    let mut linked = GranulesExecutions.search_by_granule_cumulus_ids(&rel, None, &[granule_id]).expect("search");
    linked.sort_unstable();
    let mut expected = ids;
    expected.sort_unstable();
    assert_eq!(linked, expected);
}
