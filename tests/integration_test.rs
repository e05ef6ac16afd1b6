use ganttfeed::core::{
    Connection, Coordinator, SharedStateCell, StreamStatus, CLOSE_CHANNEL, RECORD_CHANNEL,
};
use ganttfeed::{PublishMode, Simulator};
use std::time::Duration;
use tokio::time::{sleep, timeout};

async fn wait_until_not_streaming(coordinator: &Coordinator) {
    timeout(Duration::from_secs(2), async {
        while coordinator.status() == StreamStatus::Streaming {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stream did not end in time");
}

#[tokio::test]
async fn test_simulated_feed_end_to_end() {
    let config = ganttfeed::FeedConfig {
        record_count: 3,
        sprints_per_project: 2,
        emit_interval_ms: 1,
        ..Default::default()
    };

    let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
    let (subscription, mut updates) = coordinator.observe_updates();

    let connection = Connection::new();
    let feed = Simulator::from_config(&config).run(connection.clone());
    coordinator.start_stream(connection);

    // one publish per emitted record, in emission order
    for n in 0..3 {
        let fragment = timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fragment.tasks[0].id, format!("P{}", n + 1));
        // project entry plus one per sprint
        assert_eq!(fragment.tasks.len(), 3);
        assert_eq!(fragment.links.len(), 1);
    }

    feed.await.unwrap().unwrap();
    wait_until_not_streaming(&coordinator).await;
    assert_eq!(coordinator.status(), StreamStatus::Closed);

    subscription.cancel();
    subscription.cancel();
}

#[tokio::test]
async fn test_accumulate_mode_builds_full_graph() {
    let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Accumulate));
    let (_subscription, mut updates) = coordinator.observe_updates();

    let connection = Connection::new();
    coordinator.start_stream(connection.clone());

    connection.deliver(RECORD_CHANNEL, r#"[{"id":"P1","sprints":[{"id":"S1"}]}]"#);
    connection.deliver(RECORD_CHANNEL, r#"[{"id":"P2","sprints":[{"id":"S2"}]}]"#);
    connection.deliver(CLOSE_CHANNEL, "{}");

    let first = updates.recv().await.unwrap();
    assert_eq!(first.tasks.len(), 2);

    // the second publish carries the whole graph so far
    let second = updates.recv().await.unwrap();
    assert_eq!(second.tasks.len(), 4);
    let ids: Vec<&str> = second.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "S1", "P2", "S2"]);

    // latest() mirrors the last publish for polling consumers
    wait_until_not_streaming(&coordinator).await;
    assert_eq!(coordinator.cell().latest().unwrap().tasks.len(), 4);
}

#[tokio::test]
async fn test_replacement_tears_down_prior_stream() {
    let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
    let (_subscription, mut updates) = coordinator.observe_updates();

    let first = Connection::new();
    coordinator.start_stream(first.clone());

    let second = Connection::new();
    coordinator.start_stream(second.clone());
    assert!(first.is_closed());

    // events on the replaced connection go nowhere
    assert!(!first.deliver(RECORD_CHANNEL, r#"[{"id":"stale"}]"#));

    second.deliver(RECORD_CHANNEL, r#"[{"id":"P1"}]"#);
    let fragment = timeout(Duration::from_secs(2), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fragment.tasks[0].id, "P1");
}

#[tokio::test]
async fn test_malformed_payload_fails_stream_not_process() {
    let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));
    let (_subscription, mut updates) = coordinator.observe_updates();

    let connection = Connection::new();
    coordinator.start_stream(connection.clone());

    connection.deliver(RECORD_CHANNEL, r#"[{"id":"P1"}]"#);
    assert_eq!(updates.recv().await.unwrap().tasks.len(), 1);

    connection.deliver(RECORD_CHANNEL, "{{{");
    wait_until_not_streaming(&coordinator).await;
    assert_eq!(coordinator.status(), StreamStatus::Failed);
    assert!(connection.is_closed());

    // nothing was published for the bad payload
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn test_observers_see_only_post_subscription_publishes() {
    let mut coordinator = Coordinator::new(SharedStateCell::new(PublishMode::Incremental));

    let connection = Connection::new();
    coordinator.start_stream(connection.clone());

    connection.deliver(RECORD_CHANNEL, r#"[{"id":"P1"}]"#);
    // let the pump publish before the late observer attaches
    sleep(Duration::from_millis(20)).await;

    let (_subscription, mut late) = coordinator.observe_updates();
    assert!(late.try_recv().is_err());

    connection.deliver(RECORD_CHANNEL, r#"[{"id":"P2"}]"#);
    let fragment = timeout(Duration::from_secs(2), late.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fragment.tasks[0].id, "P2");
}
