//! Graph model - raw wire records and the normalized task/link entries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Link type discriminator, wire-compatible with common Gantt widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl Default for LinkKind {
    fn default() -> Self {
        Self::FinishToStart
    }
}

/// Raw dependency edge as emitted by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: LinkKind,
}

/// Raw sprint record nested inside a project record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSprintRecord {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<u32>,
}

/// Server-emitted project update - one entry of a `record-channel` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProjectRecord {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub sprints: Vec<RawSprintRecord>,
    #[serde(default)]
    pub links: Vec<RawLink>,
}

/// Presentation-only discriminator for normalized tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Project,
    Sprint,
}

/// Normalized task consumed by the chart sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: String,
    /// None for project-level tasks, owning project id for sprint-level
    pub parent: Option<String>,
    pub text: String,
    pub start_date: Option<NaiveDate>,
    pub duration: Option<u32>,
    pub kind: TaskKind,
}

/// Directed edge between two task entries.
///
/// Both endpoints must reference task ids present in the aggregated graph;
/// dangling references are a data-source contract violation and are left
/// for the sink to reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

/// Incremental task/link batch produced from one push-event payload.
///
/// Task order is arrival order; ids are unique within the aggregated graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFragment {
    pub tasks: Vec<TaskEntry>,
    pub links: Vec<LinkEntry>,
}

impl GraphFragment {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.links.is_empty()
    }

    /// Fold another fragment into this one.
    ///
    /// A task whose id is already present replaces the existing entry in
    /// place, keeping its original position; new tasks append. Links that
    /// are exact duplicates of an existing link are dropped.
    pub fn merge(&mut self, other: GraphFragment) {
        for task in other.tasks {
            match self.tasks.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task,
                None => self.tasks.push(task),
            }
        }
        for link in other.links {
            if !self.links.contains(&link) {
                self.links.push(link);
            }
        }
    }
}
