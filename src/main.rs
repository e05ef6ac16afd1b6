//! GanttFeed demo entry point
//!
//! Wires the simulated feed into the pipeline and logs every published
//! fragment the way a chart sink would consume them.

use anyhow::Result;
use ganttfeed::core::{Connection, Coordinator, SharedStateCell, StreamStatus};
use ganttfeed::{FeedConfig, Simulator};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("GanttFeed v{}", env!("CARGO_PKG_VERSION"));

    let config = FeedConfig::auto_load()?;
    log::info!(
        "publish mode: {:?}, {} records every {}ms",
        config.publish_mode,
        config.record_count,
        config.emit_interval_ms
    );

    let cell = SharedStateCell::new(config.publish_mode);
    let mut coordinator = Coordinator::new(cell);

    // Subscribe before starting so no fragment is missed
    let (subscription, mut updates) = coordinator.observe_updates();

    let connection = Connection::new();
    let feed = Simulator::from_config(&config).run(connection.clone());
    coordinator.start_stream(connection);

    let mut published = 0usize;
    loop {
        tokio::select! {
            maybe = updates.recv() => match maybe {
                Some(fragment) => {
                    published += 1;
                    log::info!(
                        "update {}: {} tasks, {} links",
                        published,
                        fragment.tasks.len(),
                        fragment.links.len()
                    );
                }
                None => break,
            },
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                if coordinator.status() != StreamStatus::Streaming {
                    // drain anything published before the stream ended
                    while let Ok(fragment) = updates.try_recv() {
                        published += 1;
                        log::info!(
                            "update {}: {} tasks, {} links",
                            published,
                            fragment.tasks.len(),
                            fragment.links.len()
                        );
                    }
                    break;
                }
            }
        }
    }

    subscription.cancel();
    feed.await??;

    match coordinator.status() {
        StreamStatus::Failed => log::error!("stream ended with a failure"),
        status => log::info!("stream status: {:?}", status),
    }
    log::info!("done: {} fragments published", published);

    Ok(())
}
