use anyhow::{Context, Result};
use gitgrove_engine::load_commit_log;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::driver::Control;

const COALESCE_WINDOW: Duration = Duration::from_millis(250);

fn is_reload_trigger(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}

/// Editors often replace files by rename, so compare file names, not full paths.
fn touches(event_path: &Path, log: &Path) -> bool {
    match (event_path.file_name(), log.file_name()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Watches the commit log's directory and sends `Control::Reload` after writes settle.
pub fn spawn(log: PathBuf, tx: mpsc::Sender<Control>) -> Result<()> {
    let dir = match log.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // notify callback thread -> tokio channel
    let (raw_tx, mut raw_rx) = mpsc::channel::<()>(64);
    let target = log.clone();
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: std::result::Result<notify::Event, notify::Error>| {
            let Ok(event) = res else {
                return;
            };
            if is_reload_trigger(&event.kind) && event.paths.iter().any(|p| touches(p, &target)) {
                let _ = raw_tx.try_send(());
            }
        },
        notify::Config::default(),
    )?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", dir.display()))?;
    tracing::info!(log = %log.display(), "watching commit log for changes");

    tokio::spawn(async move {
        let _watcher = watcher;
        let mut pending = false;
        let mut tick = tokio::time::interval(COALESCE_WINDOW);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = raw_rx.recv() => {
                    if changed.is_none() {
                        break;
                    }
                    pending = true;
                }
                _ = tick.tick() => {
                    if !pending {
                        continue;
                    }
                    pending = false;
                    match load_commit_log(&log) {
                        Ok(events) => {
                            tracing::info!(events = events.len(), "commit log changed, reloading");
                            if tx.send(Control::Reload(events)).await.is_err() {
                                break;
                            }
                        }
                        // half-written files are retried on the next change
                        Err(err) => tracing::warn!(error = %err, "commit log reload failed"),
                    }
                }
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn writes_trigger_reload_but_removal_does_not() {
        assert!(is_reload_trigger(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_reload_trigger(&EventKind::Create(CreateKind::File)));
        assert!(!is_reload_trigger(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn matches_by_file_name() {
        let log = Path::new("data/commits.json");
        assert!(touches(Path::new("/abs/data/commits.json"), log));
        assert!(!touches(Path::new("/abs/data/commits.json.swp"), log));
        assert!(!touches(Path::new("/"), log));
    }
}
