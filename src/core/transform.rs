//! Pure reshaping of raw records into normalized task/link entries
//!
//! No state, no I/O. Temporal bounds are passed through unmodified;
//! validation (start after end etc.) is the rendering sink's problem.

use super::model::{GraphFragment, LinkEntry, RawProjectRecord, TaskEntry, TaskKind};

/// Normalize one project record into task entries.
///
/// Produces exactly one project-level entry (no parent) plus one
/// sprint-level entry per contained sprint, each parented to the project.
/// Sprints missing temporal bounds inherit the project's.
pub fn to_task_entries(record: &RawProjectRecord) -> Vec<TaskEntry> {
    let mut entries = Vec::with_capacity(1 + record.sprints.len());

    entries.push(TaskEntry {
        id: record.id.clone(),
        parent: None,
        text: record.text.clone(),
        start_date: record.start_date,
        duration: record.duration,
        kind: TaskKind::Project,
    });

    for sprint in &record.sprints {
        entries.push(TaskEntry {
            id: sprint.id.clone(),
            parent: Some(record.id.clone()),
            text: sprint.text.clone(),
            start_date: sprint.start_date.or(record.start_date),
            duration: sprint.duration.or(record.duration),
            kind: TaskKind::Sprint,
        });
    }

    entries
}

/// Promote a record's embedded links unchanged.
pub fn to_link_batch(record: &RawProjectRecord) -> Vec<LinkEntry> {
    record
        .links
        .iter()
        .map(|link| LinkEntry {
            source: link.source.clone(),
            target: link.target.clone(),
            kind: link.kind,
        })
        .collect()
}

/// Fold one whole `record-channel` payload into a single fragment.
///
/// Tasks and links concatenate in record order; each payload yields its
/// own fragment, there is no buffering across payloads.
pub fn fold_records(records: &[RawProjectRecord]) -> GraphFragment {
    let mut fragment = GraphFragment::default();
    for record in records {
        fragment.tasks.extend(to_task_entries(record));
        fragment.links.extend(to_link_batch(record));
    }
    fragment
}
