//! Integration tests for the watcher loop against a scripted source.

use keyspace_watcher::core::KeyspaceEvent;
use keyspace_watcher::notify::signals::{SIGHUP, SIGINT, SIGTERM};
use keyspace_watcher::notify::{KeyspaceWatcher, PollStrategy, ShutdownRequest, shutdown_channel};
use keyspace_watcher::sources::{ScriptStep, ScriptedSource};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Seen = Arc<Mutex<Vec<KeyspaceEvent>>>;

async fn watcher_with_recorder(
    source: ScriptedSource,
    strategy: PollStrategy,
) -> (KeyspaceWatcher<ScriptedSource>, Seen) {
    let mut watcher = KeyspaceWatcher::new(source, strategy);
    watcher.subscribe_all().await.unwrap();

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    watcher.subscribe(move |event| seen_clone.lock().unwrap().push(event.clone()));

    (watcher, seen)
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_event() {
    let e1 = ScriptedSource::event("PORT", "Ethernet0", "hset");
    let source = ScriptedSource::new()
        .then(ScriptStep::Timeout)
        .then(ScriptStep::Events(vec![e1.clone()]));
    let (mut watcher, seen) =
        watcher_with_recorder(source, PollStrategy::default()).await;

    assert_eq!(watcher.tick().await, 0);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(watcher.stats().timeouts, 1);

    assert_eq!(watcher.tick().await, 1);
    assert_eq!(*seen.lock().unwrap(), vec![e1]);
    assert_eq!(watcher.stats().events, 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_does_not_stop_loop() {
    let source = ScriptedSource::new()
        .then(ScriptStep::Error("epoll_wait failed".to_string()))
        .then(ScriptStep::Events(vec![ScriptedSource::event("NTP", "global", "hset")]));
    let (mut watcher, seen) =
        watcher_with_recorder(source, PollStrategy::default()).await;

    assert_eq!(watcher.tick().await, 0);
    assert_eq!(watcher.stats().failures, 1);

    assert_eq!(watcher.tick().await, 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drain_error_is_counted_and_loop_continues() {
    let source = ScriptedSource::new()
        .then(ScriptStep::Malformed("garbage".to_string()))
        .then(ScriptStep::Events(vec![ScriptedSource::event("AAA", "authentication", "del")]));
    let (mut watcher, seen) =
        watcher_with_recorder(source, PollStrategy::default()).await;

    assert_eq!(watcher.tick().await, 0);
    assert_eq!(watcher.tick().await, 1);
    assert_eq!(watcher.stats().failures, 1);
    assert_eq!(seen.lock().unwrap()[0].operation, "del");
}

#[tokio::test(start_paused = true)]
async fn test_events_dispatched_in_source_order() {
    let a = ScriptedSource::event("PORT", "Ethernet0", "hset");
    let b = ScriptedSource::event("PORT", "Ethernet0", "hset");
    let c = ScriptedSource::event("FEATURE", "bgp", "hdel");
    let source = ScriptedSource::new()
        .then(ScriptStep::Events(vec![a.clone(), b.clone()]))
        .then(ScriptStep::Events(vec![c.clone()]));
    let strategy = PollStrategy::fixed_interval(Duration::from_secs(1));
    let (mut watcher, seen) = watcher_with_recorder(source, strategy).await;

    watcher.tick().await;
    watcher.tick().await;

    // Duplicates are kept.
    assert_eq!(*seen.lock().unwrap(), vec![a, b, c]);
}

#[tokio::test(start_paused = true)]
async fn test_loop_never_stops_on_its_own() {
    let (mut watcher, seen) =
        watcher_with_recorder(ScriptedSource::new(), PollStrategy::default()).await;

    for _ in 0..1000 {
        assert_eq!(watcher.tick().await, 0);
    }

    let stats = watcher.stats();
    assert_eq!(stats.iterations, 1000);
    assert_eq!(stats.timeouts, 1000);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_exits_on_interrupt() {
    let (mut watcher, _seen) =
        watcher_with_recorder(ScriptedSource::new(), PollStrategy::default()).await;
    let (controller, shutdown) = shutdown_channel();

    let (request, ()) = tokio::join!(watcher.run(shutdown), async move {
        tokio::time::sleep(Duration::from_secs(11)).await;
        controller.handle_signal(SIGINT);
    });

    assert_eq!(
        request,
        ShutdownRequest {
            signal: SIGINT,
            exit_code: 130
        }
    );
    assert!(watcher.stats().iterations >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_hangup_keeps_running_until_terminate() {
    let (mut watcher, _seen) =
        watcher_with_recorder(ScriptedSource::new(), PollStrategy::default()).await;
    let (controller, shutdown) = shutdown_channel();

    let (request, ()) = tokio::join!(watcher.run(shutdown), async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        controller.handle_signal(SIGHUP);
        tokio::time::sleep(Duration::from_secs(4)).await;
        controller.handle_signal(SIGTERM);
    });

    assert_eq!(request.exit_code, 143);
    // Waits ended at 2s, 4s and 6s before SIGTERM at 7s.
    assert!(watcher.stats().iterations >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_poll_sleep() {
    let source = ScriptedSource::new();
    let strategy = PollStrategy::fixed_interval(Duration::from_secs(3600));
    let (mut watcher, _seen) = watcher_with_recorder(source, strategy).await;
    let (controller, shutdown) = shutdown_channel();

    let start = tokio::time::Instant::now();
    let (request, ()) = tokio::join!(watcher.run(shutdown), async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.handle_signal(SIGTERM);
    });

    assert_eq!(request.exit_code, 143);
    assert!(start.elapsed() < Duration::from_secs(3600));
    assert_eq!(watcher.source().poll_calls(), 0);
}

#[tokio::test]
async fn test_pending_request_stops_before_first_iteration() {
    let (mut watcher, _seen) =
        watcher_with_recorder(ScriptedSource::new(), PollStrategy::default()).await;
    let (controller, shutdown) = shutdown_channel();
    controller.handle_signal(SIGINT);

    let request = watcher.run(shutdown).await;
    assert_eq!(request.exit_code, 130);
    assert_eq!(watcher.stats().iterations, 0);
    assert_eq!(watcher.source().select_calls(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failing_source_does_not_starve_signal_task() {
    let mut source = ScriptedSource::new();
    for _ in 0..50_000 {
        source = source.then(ScriptStep::Error("stream closed".to_string()));
    }
    let (mut watcher, _seen) = watcher_with_recorder(source, PollStrategy::default()).await;
    let (controller, shutdown) = shutdown_channel();

    tokio::spawn(async move {
        controller.handle_signal(SIGINT);
    });

    let request = watcher.run(shutdown).await;
    assert_eq!(request.exit_code, 130);
    assert!(watcher.stats().failures <= 1);
    assert!(watcher.source().remaining_steps() >= 49_999);
}

#[tokio::test(start_paused = true)]
async fn test_failed_wait_takes_the_full_timeout() {
    let source = ScriptedSource::new()
        .then(ScriptStep::Error("stream closed".to_string()))
        .then(ScriptStep::Error("stream closed".to_string()));
    let (mut watcher, _seen) = watcher_with_recorder(source, PollStrategy::default()).await;

    let start = tokio::time::Instant::now();
    watcher.tick().await;
    watcher.tick().await;
    assert!(start.elapsed() >= Duration::from_secs(4));
    assert_eq!(watcher.stats().failures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribed_callback_stops_receiving() {
    let source = ScriptedSource::new()
        .then(ScriptStep::Events(vec![ScriptedSource::event("PORT", "Ethernet0", "hset")]))
        .then(ScriptStep::Events(vec![ScriptedSource::event("PORT", "Ethernet0", "del")]));
    let mut watcher = KeyspaceWatcher::new(source, PollStrategy::default());
    watcher.subscribe_all().await.unwrap();

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let id = watcher.subscribe(move |event| seen_clone.lock().unwrap().push(event.clone()));

    assert_eq!(watcher.tick().await, 1);
    assert!(watcher.unsubscribe(id));
    assert_eq!(watcher.tick().await, 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}
