use ingesta::{
    DataType, DeadLetterEntry, DeadLetterFilter, DeadLetterQueue, IngestError,
    IngestionRequirement, Payload, RefreshMode, RefreshStatus, Stage,
};
use ingesta_mock::DynamicMockProvider;

use crate::helpers::{AAPL, MSFT, client, harness, harness_with, now, prices, test_config};

#[tokio::test]
async fn fatal_zero_row_gate_dead_letters_and_the_batch_continues() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, Payload::Prices(vec![]))
        .await;
    ctl.returns(DataType::PriceHistorical, MSFT, prices(MSFT, 4))
        .await;
    let h = harness(vec![client(raw, 0)]);

    let batch = h
        .manager
        .refresh_batch([AAPL, MSFT], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let failed = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(failed.status, RefreshStatus::Failed);
    assert!(matches!(
        failed.error,
        Some(IngestError::GateFailure { ref gate, retryable: false, .. }) if gate == "ingestion"
    ));
    assert_eq!(
        ctl.call_count(DataType::PriceHistorical, AAPL).await,
        1,
        "fatal gate failures are not retried"
    );
    assert_eq!(
        batch.result(MSFT, DataType::PriceHistorical).unwrap().status,
        RefreshStatus::Success
    );

    assert_eq!(batch.dead_lettered, 1);
    let entries = h.manager.dead_letters().list(&DeadLetterFilter::default());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].symbol, AAPL);
    assert_eq!(entries[0].stage, Stage::Ingestion);
    assert_eq!(entries[0].attempt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn short_history_is_retried_then_dead_lettered() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let mut cfg = test_config();
    cfg.gates.ingestion.insert(
        DataType::PriceHistorical,
        IngestionRequirement {
            min_rows: 10,
            mandatory: true,
            fatal_floor: 0,
        },
    );
    let h = harness_with(vec![client(raw, 0)], cfg, None);

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    let Some(IngestError::RetriesExhausted { attempts }) = &r.error else {
        panic!("unexpected error: {:?}", r.error);
    };
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|e| matches!(
        e,
        IngestError::GateFailure { retryable: true, .. }
    )));
    assert_eq!(ctl.call_count(DataType::PriceHistorical, AAPL).await, 3);
    // Rows written on the first attempt stay; later attempts are no-ops.
    assert_eq!(h.store.table_len(DataType::PriceHistorical).await, 3);
    assert_eq!(h.manager.dead_letters().len(), 1);
}

#[tokio::test]
async fn repeated_terminal_failures_merge_into_one_entry() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, Payload::Prices(vec![]))
        .await;
    let h = harness(vec![client(raw, 0)]);

    for _ in 0..2 {
        h.manager
            .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
            .await;
        h.clock.advance(chrono::Duration::minutes(10));
    }

    let entries = h.manager.dead_letters().list(&DeadLetterFilter::default());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attempt_count, 2);
    assert_eq!(entries[0].first_seen, now());
    assert_eq!(entries[0].last_seen, now() + chrono::Duration::minutes(10));
}

#[tokio::test]
async fn auth_only_failures_are_not_dead_lettered() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.fails(DataType::News, AAPL, IngestError::auth("sdk", "revoked"))
        .await;
    let h = harness(vec![client(raw, 0)]);

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::News], RefreshMode::OnDemand, false)
        .await;
    assert_eq!(
        batch.result(AAPL, DataType::News).unwrap().status,
        RefreshStatus::Failed
    );
    assert_eq!(ctl.call_count(DataType::News, AAPL).await, 1);
    assert!(h.manager.dead_letters().is_empty());
    assert_eq!(batch.dead_lettered, 0);
}

#[tokio::test]
async fn replay_runs_a_forced_refresh_and_keeps_the_entry() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, Payload::Prices(vec![]))
        .await;
    let h = harness(vec![client(raw, 0)]);
    h.manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;
    let id = h.manager.dead_letters().list(&DeadLetterFilter::default())[0].id;

    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 5))
        .await;
    let replayed = h.manager.replay_dead_letter(id).await.unwrap();
    assert_eq!(
        replayed.status(DataType::PriceHistorical),
        Some(RefreshStatus::Success)
    );
    assert_eq!(replayed.results.len(), 1);

    let entry = h.manager.dead_letters().get(id).unwrap();
    assert_eq!(entry.requeue_count, 1);
    assert_eq!(entry.attempt_count, 1);

    let missing = h.manager.replay_dead_letter(id + 100).await.unwrap_err();
    assert!(matches!(missing, IngestError::NotFound { .. }));
}

#[test]
fn queue_merges_on_symbol_type_and_stage() {
    let q = DeadLetterQueue::new();
    let err = IngestError::gate("ingestion", "0 rows", false);
    let first = q.enqueue(DeadLetterEntry::new(
        AAPL,
        DataType::PriceHistorical,
        Stage::Ingestion,
        err.clone(),
        now(),
    ));
    let later = now() + chrono::Duration::hours(1);
    let again = q.enqueue(DeadLetterEntry::new(
        AAPL,
        DataType::PriceHistorical,
        Stage::Ingestion,
        IngestError::RetriesExhausted { attempts: vec![] },
        later,
    ));
    assert_eq!(first, again);
    assert_eq!(q.len(), 1);

    let merged = q.get(first).unwrap();
    assert_eq!(merged.attempt_count, 2);
    assert_eq!(merged.first_seen, now());
    assert_eq!(merged.last_seen, later);
    assert!(matches!(merged.last_error, IngestError::RetriesExhausted { .. }));

    let other_stage = q.enqueue(DeadLetterEntry::new(
        AAPL,
        DataType::PriceHistorical,
        Stage::Indicators,
        err,
        now(),
    ));
    assert_ne!(other_stage, first);
    assert_eq!(q.len(), 2);
    assert_eq!(q.list(&DeadLetterFilter::default().min_attempts(2)).len(), 1);
    assert_eq!(
        q.list(&DeadLetterFilter::default().stage(Stage::Indicators))[0].id,
        other_stage
    );
}

#[test]
fn requeue_builds_a_forced_on_demand_request() {
    let q = DeadLetterQueue::new();
    let id = q.enqueue(DeadLetterEntry::new(
        MSFT,
        DataType::News,
        Stage::Ingestion,
        IngestError::RetriesExhausted { attempts: vec![] },
        now(),
    ));

    let req = q.requeue(id).unwrap();
    assert_eq!(req.symbol, MSFT);
    assert_eq!(req.data_types.iter().copied().collect::<Vec<_>>(), vec![DataType::News]);
    assert_eq!(req.mode, RefreshMode::OnDemand);
    assert!(req.force);
    q.requeue(id).unwrap();
    assert_eq!(q.get(id).unwrap().requeue_count, 2);

    let removed = q.remove(id).unwrap();
    assert_eq!(removed.id, id);
    assert!(q.is_empty());
    assert!(q.requeue(id).is_err());
}

#[tokio::test(start_paused = true)]
async fn store_outage_is_retried_then_dead_lettered() {
    let (raw, ctl) = DynamicMockProvider::new_with_controller("alpha");
    ctl.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(raw, 0)]);
    h.store.fail_table(DataType::PriceHistorical).await;

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert!(matches!(
        r.error,
        Some(IngestError::RetriesExhausted { ref attempts })
            if attempts.iter().all(|e| matches!(e, IngestError::Storage(_)))
    ));
    assert_eq!(ctl.call_count(DataType::PriceHistorical, AAPL).await, 3);
    assert_eq!(h.manager.dead_letters().len(), 1);
}
