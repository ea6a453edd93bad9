//! Transport chaos scenarios (T-LOSS-*, T-LAT-*, T-CONN-*).
//!
//! Faults are injected in front of the simulated server, so a failed poll
//! never reaches it and the retried poll sees the same batch.

use std::sync::Arc;
use std::time::Duration;
use sync_client::{
    CancellationToken, ExponentialBackoffPolicy, IterationOutcome, MemoryStore, SyncClient,
    SyncError,
};
use tokio::time::{timeout, Instant};

use super::fixture::{config, init_tracing, setup};
use crate::assertions::{
    assert_all_delivered, assert_first_delivery_ordered, assert_no_duplicates,
    assert_only_delivered,
};
use crate::harness::{sync_until_success, ChaosConfig, Recorder};

const DEADLINE: Duration = Duration::from_secs(3600);

// ============================================================================
// T-LOSS-* Poll Loss
// ============================================================================

/// T-LOSS-01: Half of all polls fail, every message arrives exactly once.
#[tokio::test(start_paused = true)]
async fn t_loss_01_half_of_polls_fail() {
    init_tracing();
    let chaos = ChaosConfig::default().with_failure_rate(0.5).with_seed(1);
    let (server, transport) = setup(5, 5, chaos);

    let client = Arc::new(SyncClient::new(config(), transport.clone(), MemoryStore::new()));
    let recorder = Recorder::new();
    recorder.attach(client.dispatcher());

    let cancel = CancellationToken::new();
    sync_until_success(&*client, &cancel).await.unwrap();
    let first = server.post_messages(40);

    let task = client.spawn();
    timeout(DEADLINE, recorder.wait_for(40))
        .await
        .expect("all messages should arrive");
    task.stop().await.unwrap();

    let seqs = recorder.seqs();
    assert_all_delivered(&seqs, first..first + 40).expect_pass();
    assert_only_delivered(&seqs, first..first + 40).expect_pass();
    assert_no_duplicates(&seqs).expect_pass();
    assert_first_delivery_ordered(&seqs).expect_pass();
    assert!(transport.stats().injected_failures > 0);
}

/// T-LOSS-02: Every poll but one fails in a row; the default policy never gives up.
#[tokio::test(start_paused = true)]
async fn t_loss_02_default_policy_is_never_fatal() {
    let chaos = ChaosConfig::default().with_outage(25);
    let (server, transport) = setup(5, 0, chaos);
    server.post_messages(1);

    let client = SyncClient::new(config(), transport.clone(), MemoryStore::new());
    let cancel = CancellationToken::new();
    let outcome = sync_until_success(&client, &cancel).await.unwrap();

    assert!(matches!(outcome, IterationOutcome::InitialSync { .. }));
    assert_eq!(transport.stats().injected_failures, 25);
}

// ============================================================================
// T-LAT-* Latency
// ============================================================================

/// T-LAT-01: Random latency up to 3s, messages posted in bursts while syncing.
#[tokio::test(start_paused = true)]
async fn t_lat_01_random_latency_bursts() {
    let chaos = ChaosConfig::default()
        .with_latency(Duration::from_millis(100), Duration::from_secs(3))
        .with_seed(9);
    let (server, transport) = setup(4, 3, chaos);

    let client = Arc::new(SyncClient::new(config(), transport, MemoryStore::new()));
    let recorder = Recorder::new();
    recorder.attach(client.dispatcher());
    sync_until_success(&*client, &CancellationToken::new())
        .await
        .unwrap();

    let task = client.spawn();
    let first = server.post_messages(10);
    timeout(DEADLINE, recorder.wait_for(10)).await.unwrap();
    server.post_messages(7);
    timeout(DEADLINE, recorder.wait_for(17)).await.unwrap();
    server.post_messages(13);
    timeout(DEADLINE, recorder.wait_for(30)).await.unwrap();
    task.stop().await.unwrap();

    let seqs = recorder.seqs();
    assert_all_delivered(&seqs, first..first + 30).expect_pass();
    assert_only_delivered(&seqs, first..first + 30).expect_pass();
    assert_no_duplicates(&seqs).expect_pass();
    assert_first_delivery_ordered(&seqs).expect_pass();
}

// ============================================================================
// T-CONN-* Outages
// ============================================================================

/// T-CONN-01: Six failed polls cost six fixed retry delays.
#[tokio::test(start_paused = true)]
async fn t_conn_01_outage_uses_fixed_delay() {
    let chaos = ChaosConfig::default().with_outage(6);
    let (_server, transport) = setup(5, 2, chaos);

    let client = SyncClient::new(config(), transport.clone(), MemoryStore::new());
    let start = Instant::now();
    sync_until_success(&client, &CancellationToken::new())
        .await
        .unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed < Duration::from_secs(61));
    assert_eq!(transport.stats().polls, 7);
}

/// T-CONN-02: A bounded policy gives up during a sustained outage.
#[tokio::test(start_paused = true)]
async fn t_conn_02_bounded_policy_gives_up() {
    let chaos = ChaosConfig::default().with_outage(usize::MAX);
    let (_server, transport) = setup(5, 0, chaos);

    let policy =
        ExponentialBackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30))
            .with_max_attempts(5);
    let client = SyncClient::new(config(), transport.clone(), MemoryStore::new())
        .with_failure_policy(policy);

    let err = client.sync(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, SyncError::Fatal { .. }));
    assert_eq!(transport.stats().polls, 5);
}
