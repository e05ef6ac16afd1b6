//! Demo data source - drives a push connection with generated records
//!
//! Stands in for the HTTP endpoint of the real deployment: emits one
//! `record-channel` event per generated project at a fixed interval, then
//! one `close-channel` event, then stops. Generation is deterministic so
//! tests and demos see stable ids and dates.

use crate::config::FeedConfig;
use crate::core::{
    Connection, LinkKind, RawLink, RawProjectRecord, RawSprintRecord, CLOSE_CHANNEL,
    RECORD_CHANNEL,
};
use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::time::Duration;
use tokio::task::JoinHandle;

const SPRINT_LENGTH_DAYS: u32 = 7;

/// Generator for simulated project/sprint records
pub struct Simulator {
    pub record_count: usize,
    pub sprints_per_project: usize,
    pub emit_interval: Duration,
    pub start_date: NaiveDate,
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            record_count: 5,
            sprints_per_project: 3,
            emit_interval: Duration::from_millis(500),
            // fixed anchor keeps generated charts reproducible
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        }
    }
}

impl Simulator {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            record_count: config.record_count,
            sprints_per_project: config.sprints_per_project,
            emit_interval: Duration::from_millis(config.emit_interval_ms),
            ..Self::default()
        }
    }

    /// Generate the n-th project record.
    ///
    /// Sprints run back to back and are chained with finish-to-start
    /// links, so every link endpoint exists within the record itself.
    pub fn project_record(&self, n: usize) -> RawProjectRecord {
        let id = format!("P{}", n + 1);
        let start = self.start_date + ChronoDuration::weeks(2 * n as i64);

        let sprints: Vec<RawSprintRecord> = (0..self.sprints_per_project)
            .map(|s| RawSprintRecord {
                id: format!("{}-S{}", id, s + 1),
                text: format!("Sprint {}", s + 1),
                start_date: Some(start + ChronoDuration::days((s as u32 * SPRINT_LENGTH_DAYS) as i64)),
                duration: Some(SPRINT_LENGTH_DAYS),
            })
            .collect();

        let links: Vec<RawLink> = sprints
            .windows(2)
            .map(|pair| RawLink {
                source: pair[0].id.clone(),
                target: pair[1].id.clone(),
                kind: LinkKind::FinishToStart,
            })
            .collect();

        RawProjectRecord {
            id: id.clone(),
            text: format!("Project {}", n + 1),
            start_date: Some(start),
            duration: Some(self.sprints_per_project as u32 * SPRINT_LENGTH_DAYS),
            sprints,
            links,
        }
    }

    /// Spawn the feed task on `connection`.
    ///
    /// Emits every record, then the close signal. Stops early without
    /// error if the consumer tears the connection down first.
    pub fn run(self, connection: Connection) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            for n in 0..self.record_count {
                let record = self.project_record(n);
                let payload = serde_json::to_string(&vec![record])?;
                if !connection.deliver(RECORD_CHANNEL, payload) {
                    log::warn!("connection closed before feed finished");
                    return Ok(());
                }
                log::debug!("emitted record {}/{}", n + 1, self.record_count);
                tokio::time::sleep(self.emit_interval).await;
            }
            connection.deliver(CLOSE_CHANNEL, "{}");
            log::info!("feed complete: {} records", self.record_count);
            Ok(())
        })
    }
}
