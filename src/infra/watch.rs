use notify::event::EventKind;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WatchSignal {
    Changed,
    Error(String),
}

/// OS change notifications for one session file. Stops when dropped.
pub struct SessionFileWatcher {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for SessionFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFileWatcher").finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn watch_session_file<F>(path: &Path, on_signal: F) -> Result<SessionFileWatcher, WatchError>
where
    F: Fn(WatchSignal) + Send + 'static,
{
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if should_trigger_reload(&event) {
                    on_signal(WatchSignal::Changed);
                }
            }
            Err(error) => on_signal(WatchSignal::Error(error.to_string())),
        },
        Config::default(),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;

    Ok(SessionFileWatcher { _watcher: watcher })
}

fn should_trigger_reload(event: &notify::Event) -> bool {
    matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Other
    )
}
