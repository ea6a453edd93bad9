//! Sync loop chaos scenarios (S-CRASH-*, S-CANCEL-*, S-QUEUE-*, S-HIST-*).
//!
//! These check the delivery guarantees of the loop: at-least-once across
//! crashes and cancellation, ordering, suppression of history and of the
//! backlog of freshly joined rooms.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use sync_client::{
    CancellationToken, CursorStore, DispatchError, FileStore, MemoryStore, SyncClient,
    SyncError,
};
use sync_types::{Cursor, EventType, RoomId};
use tempfile::TempDir;
use tokio::time::timeout;

use super::fixture::{account, config, init_tracing, setup};
use crate::assertions::{
    assert_all_delivered, assert_first_delivery_ordered, assert_no_duplicates,
    assert_only_delivered,
};
use crate::harness::{message_seq, sync_until_success, ChaosConfig, Recorder};

const DEADLINE: Duration = Duration::from_secs(3600);

// ============================================================================
// S-CRASH-* Listener crash and restart
// ============================================================================

/// S-CRASH-01: A listener crash mid-batch replays the whole batch after restart.
#[tokio::test(start_paused = true)]
async fn s_crash_01_replay_after_listener_crash() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let (server, transport) = setup(4, 2, ChaosConfig::default());
    let recorder = Recorder::new();

    // First process: crashes on message 7, in the batch [6, 10)
    let store = FileStore::open(dir.path()).await.unwrap();
    let client = SyncClient::new(config(), transport.clone(), store);
    recorder.attach(client.dispatcher());
    client.on(EventType::ROOM_MESSAGE, |event| {
        if message_seq(event) == Some(7) {
            panic!("simulated listener crash");
        }
    });
    sync_until_success(&client, &CancellationToken::new())
        .await
        .unwrap();
    let first = server.post_messages(12);
    assert_eq!(first, 2);

    let err = client.sync(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SyncError::Dispatch(_)));
    drop(client);

    let store = FileStore::open(dir.path()).await.unwrap();
    assert_eq!(store.load_cursor(&account()).await.unwrap(), Cursor::new("s6"));

    // Second process: resumes from the persisted cursor
    let client = Arc::new(SyncClient::new(config(), transport, store));
    recorder.attach(client.dispatcher());
    let task = client.spawn();
    timeout(DEADLINE, recorder.wait_for(12)).await.unwrap();
    task.stop().await.unwrap();

    let seqs = recorder.seqs();
    assert_all_delivered(&seqs, 2..14).expect_pass();
    assert_only_delivered(&seqs, 2..14).expect_pass();
    assert_first_delivery_ordered(&seqs).expect_pass();
    assert_eq!(seqs.iter().filter(|s| **s == 6).count(), 2);
    assert_eq!(seqs.iter().filter(|s| **s == 7).count(), 2);
    assert_eq!(seqs.iter().filter(|s| **s == 8).count(), 1);

    // The filter negotiated by the first process was reused
    assert_eq!(server.uploaded_filters().len(), 1);
}

// ============================================================================
// S-CANCEL-* Cancellation at arbitrary points
// ============================================================================

/// S-CANCEL-01: Stopping and restarting at random moments loses nothing.
#[tokio::test(start_paused = true)]
async fn s_cancel_01_random_stops_lose_nothing() {
    let chaos = ChaosConfig::default()
        .with_latency(Duration::ZERO, Duration::from_millis(800))
        .with_failure_rate(0.2)
        .with_seed(3);
    let (server, transport) = setup(3, 4, chaos);
    let store = MemoryStore::new();
    let recorder = Recorder::new();
    let mut rng = StdRng::seed_from_u64(11);

    let client = Arc::new(SyncClient::new(config(), transport.clone(), store.clone()));
    recorder.attach(client.dispatcher());
    sync_until_success(&*client, &CancellationToken::new())
        .await
        .unwrap();

    let mut posted = 0;
    for _ in 0..8 {
        server.post_messages(5);
        posted += 5;
        let task = client.spawn();
        let run_for = Duration::from_millis(rng.gen_range(0..15_000));
        tokio::time::sleep(run_for).await;
        task.stop().await.unwrap();
    }

    let task = client.spawn();
    timeout(DEADLINE, recorder.wait_for(posted)).await.unwrap();
    task.stop().await.unwrap();

    let seqs = recorder.seqs();
    let range = 4..4 + posted as u64;
    assert_all_delivered(&seqs, range.clone()).expect_pass();
    assert_only_delivered(&seqs, range).expect_pass();
    assert_first_delivery_ordered(&seqs).expect_pass();
    assert_eq!(store.load_cursor(&account()).await.unwrap(), server.head());
}

// ============================================================================
// S-QUEUE-* Queued delivery
// ============================================================================

/// S-QUEUE-01: A tiny queue throttles the loop without losing or reordering.
#[tokio::test(start_paused = true)]
async fn s_queue_01_small_queue_backpressure() {
    let (server, transport) = setup(10, 0, ChaosConfig::default());
    let config = config().with_queue_capacity(2);
    let (client, mut listener) = SyncClient::with_event_queue(config, transport, MemoryStore::new());
    let client = Arc::new(client);
    let recorder = Recorder::new();
    recorder.attach(client.dispatcher());

    sync_until_success(&*client, &CancellationToken::new())
        .await
        .unwrap();
    server.post_messages(30);

    let stop = listener.stop_handle();
    let consumer = tokio::spawn(async move { listener.run(&CancellationToken::new()).await });
    let task = client.spawn();

    timeout(DEADLINE, recorder.wait_for(30)).await.unwrap();
    task.stop().await.unwrap();
    stop.stop();
    consumer.await.unwrap().unwrap();

    let seqs = recorder.seqs();
    assert_all_delivered(&seqs, 0..30).expect_pass();
    assert_no_duplicates(&seqs).expect_pass();
    assert_first_delivery_ordered(&seqs).expect_pass();
}

/// S-QUEUE-02: A crashed consumer closes the queue and halts the producer.
#[tokio::test(start_paused = true)]
async fn s_queue_02_consumer_crash_halts_producer() {
    let (server, transport) = setup(10, 0, ChaosConfig::default());
    let store = MemoryStore::new();
    let (client, mut listener) =
        SyncClient::with_event_queue(config(), transport, store.clone());
    client.on(EventType::ROOM_MESSAGE, |event| {
        if message_seq(event) == Some(1) {
            panic!("consumer bug");
        }
    });

    let cancel = CancellationToken::new();
    sync_until_success(&client, &cancel).await.unwrap();
    server.post_messages(3);
    sync_until_success(&client, &cancel).await.unwrap();
    let queued_up_to = store.load_cursor(&account()).await.unwrap();
    assert_eq!(queued_up_to, server.head());

    let consumed = listener.run(&CancellationToken::new()).await;
    assert!(matches!(consumed, Err(SyncError::Dispatch(_))));

    server.post_messages(2);
    let produced = sync_until_success(&client, &cancel).await;
    assert!(matches!(
        produced,
        Err(SyncError::Dispatch(DispatchError::QueueClosed))
    ));
    assert_eq!(store.load_cursor(&account()).await.unwrap(), queued_up_to);
}

// ============================================================================
// S-HIST-* History suppression
// ============================================================================

/// S-HIST-01: History present at the first sync is never delivered.
#[tokio::test(start_paused = true)]
async fn s_hist_01_initial_history_suppressed() {
    let (server, transport) = setup(100, 50, ChaosConfig::default());
    let client = Arc::new(SyncClient::new(config(), transport, MemoryStore::new()));
    let recorder = Recorder::new();
    recorder.attach(client.dispatcher());

    let task = client.spawn();
    // Let the initial sync happen before anything new is posted
    tokio::time::sleep(Duration::from_secs(1)).await;
    let first = server.post_messages(5);
    timeout(DEADLINE, recorder.wait_for(5)).await.unwrap();
    task.stop().await.unwrap();

    assert_eq!(first, 50);
    assert_only_delivered(&recorder.seqs(), 50..55).expect_pass();
}

/// S-HIST-02: The backlog of a room the account just joined is skipped.
#[tokio::test(start_paused = true)]
async fn s_hist_02_join_backlog_suppressed() {
    let (server, transport) = setup(100, 0, ChaosConfig::default());
    let client = Arc::new(SyncClient::new(config(), transport, MemoryStore::new()));
    let recorder = Recorder::new();
    recorder.attach(client.dispatcher());
    sync_until_success(&*client, &CancellationToken::new())
        .await
        .unwrap();

    server.post_messages(3);
    server.join_room(RoomId::new("!fresh:sim.example").unwrap(), 20);
    server.post_messages(3);

    let task = client.spawn();
    timeout(DEADLINE, recorder.wait_for(6)).await.unwrap();
    task.stop().await.unwrap();

    assert!(recorder.others().is_empty());
    let seqs = recorder.seqs();
    assert_eq!(seqs, vec![0, 1, 2, 4, 5, 6]);
}
