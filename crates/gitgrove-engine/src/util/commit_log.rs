use anyhow::Context;
use gitgrove_core::CommitEvent;
use std::fs;
use std::path::Path;

/// Reads a JSON array of commit events. Order does not matter; the engine sorts.
pub fn load_commit_log(path: &Path) -> anyhow::Result<Vec<CommitEvent>> {
    let data = fs::read(path)
        .with_context(|| format!("failed to read commit log {}", path.display()))?;
    parse_commit_log(&data).with_context(|| format!("failed to parse commit log {}", path.display()))
}

pub fn parse_commit_log(data: &[u8]) -> anyhow::Result<Vec<CommitEvent>> {
    let events: Vec<CommitEvent> = serde_json::from_slice(data)?;
    tracing::debug!(events = events.len(), "commit log parsed");
    Ok(events)
}
