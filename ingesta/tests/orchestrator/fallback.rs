use std::time::Duration;

use ingesta::{
    DataType, FetchParams, HealthConfig, IngestError, ProviderClientBuilder, ProviderHealth,
    ProviderRegistry, RefreshMode, RefreshStatus, RetryConfig,
};
use ingesta_mock::DynamicMockProvider;

use crate::helpers::{AAPL, client, harness, prices};

#[tokio::test]
async fn auth_failure_falls_back_and_keeps_the_primary_error() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.fails(DataType::PriceHistorical, AAPL, IngestError::auth("sdk", "bad key"))
        .await;
    b.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;

    let registry = ProviderRegistry::builder()
        .with_client(client(alpha, 0))
        .with_client(client(beta, 1))
        .build()
        .unwrap();
    let got = registry
        .fetch_with_fallback(DataType::PriceHistorical, AAPL, &FetchParams::default())
        .await
        .unwrap();

    assert_eq!(got.provider, "beta");
    assert_eq!(got.payload, prices(AAPL, 3));
    assert_eq!(got.diagnostics, vec![IngestError::auth("alpha", "bad key")]);
    assert_eq!(a.call_count(DataType::PriceHistorical, AAPL).await, 1);
}

#[tokio::test]
async fn manager_reports_the_serving_provider() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.fails(DataType::PriceHistorical, AAPL, IngestError::auth("sdk", "bad key"))
        .await;
    b.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;
    let h = harness(vec![client(alpha, 0), client(beta, 1)]);

    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;
    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Success);
    assert_eq!(r.provider.as_deref(), Some("beta"));
    assert!(r.message.contains("after 1 provider failure"), "{}", r.message);
}

#[tokio::test]
async fn priority_not_registration_order_decides() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 2))
        .await;
    b.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 3))
        .await;

    let registry = ProviderRegistry::builder()
        .with_client(client(alpha, 5))
        .with_client(client(beta, 1))
        .build()
        .unwrap();
    let names: Vec<String> = registry.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["beta", "alpha"]);

    let got = registry
        .fetch_with_fallback(DataType::PriceHistorical, AAPL, &FetchParams::default())
        .await
        .unwrap();
    assert_eq!(got.provider, "beta");
    assert!(got.diagnostics.is_empty());
    assert_eq!(a.total_calls().await, 0);
}

#[tokio::test]
async fn every_failure_is_collected_in_order() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.fails(DataType::News, AAPL, IngestError::request("x", "503"))
        .await;
    b.fails(DataType::News, AAPL, IngestError::auth("y", "expired"))
        .await;

    let registry = ProviderRegistry::builder()
        .with_client(client(alpha, 0))
        .with_client(client(beta, 1))
        .build()
        .unwrap();
    let err = registry
        .fetch_with_fallback(DataType::News, AAPL, &FetchParams::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        IngestError::AllProvidersFailed(vec![
            IngestError::request("alpha", "503"),
            IngestError::auth("beta", "expired"),
        ])
    );
    // One transient failure underneath keeps the aggregate retryable.
    assert!(err.is_retryable());
}

#[tokio::test]
async fn no_capable_provider_is_unsupported() {
    let (alpha, _a) = DynamicMockProvider::with_types("alpha", [DataType::News]);
    let registry = ProviderRegistry::builder()
        .with_client(client(alpha, 0))
        .build()
        .unwrap();

    assert!(registry.supports(DataType::News));
    assert!(!registry.supports(DataType::Earnings));
    let err = registry
        .fetch_with_fallback(DataType::Earnings, AAPL, &FetchParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Unsupported { .. }));
}

#[tokio::test(start_paused = true)]
async fn unavailable_providers_are_skipped_until_cooldown() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.fails(DataType::PriceHistorical, AAPL, IngestError::request("x", "down"))
        .await;
    b.returns(DataType::PriceHistorical, AAPL, prices(AAPL, 2))
        .await;
    let flaky = ProviderClientBuilder::new(alpha)
        .priority(0)
        .health(HealthConfig {
            degrade_after: 1,
            unavailable_after: 2,
            recover_after: 1,
            cooldown: Duration::from_secs(60),
        })
        .no_retry()
        .build();
    let registry = ProviderRegistry::builder()
        .with_client(flaky.clone())
        .with_client(client(beta, 1))
        .build()
        .unwrap();

    let params = FetchParams::default();
    for _ in 0..2 {
        registry
            .fetch_with_fallback(DataType::PriceHistorical, AAPL, &params)
            .await
            .unwrap();
    }
    assert_eq!(flaky.health(), ProviderHealth::Unavailable);
    assert_eq!(a.total_calls().await, 2);

    let got = registry
        .fetch_with_fallback(DataType::PriceHistorical, AAPL, &params)
        .await
        .unwrap();
    assert_eq!(got.provider, "beta");
    assert_eq!(
        got.diagnostics,
        vec![IngestError::ProviderUnavailable {
            provider: "alpha".to_string()
        }]
    );
    assert_eq!(a.total_calls().await, 2);

    tokio::time::advance(Duration::from_secs(61)).await;
    registry
        .fetch_with_fallback(DataType::PriceHistorical, AAPL, &params)
        .await
        .unwrap();
    assert_eq!(a.total_calls().await, 3, "probe after cooldown");
}

#[tokio::test(start_paused = true)]
async fn cooldown_skip_does_not_multiply_fallback_retries() {
    let (alpha, a) = DynamicMockProvider::new_with_controller("alpha");
    let (beta, b) = DynamicMockProvider::new_with_controller("beta");
    a.fails(DataType::PriceHistorical, AAPL, IngestError::request("x", "down"))
        .await;
    b.fails(DataType::PriceHistorical, AAPL, IngestError::request("y", "502"))
        .await;
    let cooling = ProviderClientBuilder::new(alpha)
        .priority(0)
        .health(HealthConfig {
            degrade_after: 1,
            unavailable_after: 1,
            recover_after: 1,
            cooldown: Duration::from_secs(600),
        })
        .no_retry()
        .build();
    let retrying = ProviderClientBuilder::new(beta)
        .priority(1)
        .health(HealthConfig {
            degrade_after: 50,
            unavailable_after: 100,
            recover_after: 1,
            cooldown: Duration::from_secs(60),
        })
        .retry(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter_fraction: 0.0,
        })
        .build();
    cooling
        .fetch(DataType::PriceHistorical, AAPL, &FetchParams::default())
        .await
        .unwrap_err();
    assert_eq!(cooling.health(), ProviderHealth::Unavailable);

    let h = harness(vec![cooling, retrying]);
    let batch = h
        .manager
        .refresh_batch([AAPL], &[DataType::PriceHistorical], RefreshMode::OnDemand, false)
        .await;

    let r = batch.result(AAPL, DataType::PriceHistorical).unwrap();
    assert_eq!(r.status, RefreshStatus::Failed);
    let Some(IngestError::AllProvidersFailed(inner)) = &r.error else {
        panic!("unexpected error: {:?}", r.error);
    };
    assert!(matches!(
        inner.as_slice(),
        [IngestError::ProviderUnavailable { .. }, IngestError::RetriesExhausted { .. }]
    ));
    assert_eq!(a.total_calls().await, 1);
    assert_eq!(b.call_count(DataType::PriceHistorical, AAPL).await, 3);
    assert_eq!(h.manager.dead_letters().len(), 1);
}

#[test]
fn registry_rejects_empty_and_duplicate_providers() {
    let Err(empty) = ProviderRegistry::builder().build() else {
        panic!("empty registry accepted");
    };
    assert!(matches!(empty, IngestError::InvalidArg(_)));

    let (one, _c1) = DynamicMockProvider::new_with_controller("alpha");
    let (two, _c2) = DynamicMockProvider::new_with_controller("alpha");
    let Err(dup) = ProviderRegistry::builder()
        .with_client(client(one, 0))
        .with_client(client(two, 1))
        .build()
    else {
        panic!("duplicate names accepted");
    };
    assert!(matches!(dup, IngestError::InvalidArg(ref m) if m.contains("alpha")));
}
