//! Source file watcher for hot reload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Watches the files backing routes and forwards changed paths.
///
/// Files are watched through their parent directory so that editors which
/// replace a file on save keep triggering events.
pub struct SourceWatcher {
    watcher: RecommendedWatcher,
    /// Watched directory -> recursive.
    watched: BTreeMap<PathBuf, bool>,
}

impl SourceWatcher {
    /// Create a watcher that sends every changed path on `change_tx`.
    pub fn new(change_tx: mpsc::UnboundedSender<PathBuf>) -> Result<Self, notify::Error> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        for path in event.paths {
                            tracing::trace!(path = ?path, kind = ?event.kind, "File event");
                            let _ = change_tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        Ok(Self {
            watcher,
            watched: BTreeMap::new(),
        })
    }

    /// Make the watched set cover exactly `targets`.
    pub fn sync<I>(&mut self, targets: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let desired = watch_set(targets);

        let stale: Vec<PathBuf> = self
            .watched
            .keys()
            .filter(|dir| !desired.contains_key(*dir))
            .cloned()
            .collect();
        for dir in stale {
            if let Err(e) = self.watcher.unwatch(&dir) {
                tracing::debug!(path = ?dir, error = %e, "Failed to unwatch");
            }
            self.watched.remove(&dir);
        }

        for (dir, recursive) in desired {
            if self.watched.get(&dir) == Some(&recursive) {
                continue;
            }
            let mode = if recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            match self.watcher.watch(&dir, mode) {
                Ok(()) => {
                    tracing::debug!(path = ?dir, recursive, "Watching");
                    self.watched.insert(dir, recursive);
                }
                Err(e) => tracing::warn!(path = ?dir, error = %e, "Cannot watch path"),
            }
        }
    }

    pub fn watched_dirs(&self) -> impl Iterator<Item = &Path> {
        self.watched.keys().map(PathBuf::as_path)
    }
}

/// Directories to watch for a set of targets. A directory target is watched
/// recursively; a file target through its parent, non-recursively.
fn watch_set<I>(targets: I) -> BTreeMap<PathBuf, bool>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut set: BTreeMap<PathBuf, bool> = BTreeMap::new();
    for target in targets {
        let (dir, recursive) = if target.is_dir() {
            (target, true)
        } else {
            match target.parent() {
                Some(parent) => (parent.to_path_buf(), false),
                None => continue,
            }
        };
        let entry = set.entry(dir).or_insert(false);
        *entry |= recursive;
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_watch_set() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        fs::create_dir(&site).unwrap();

        let set = watch_set(vec![
            dir.path().join("a.sh"),
            dir.path().join("b.sh"),
            site.clone(),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(dir.path()), Some(&false));
        assert_eq!(set.get(&site), Some(&true));
    }

    #[tokio::test]
    async fn test_reports_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("handler.sh");
        fs::write(&file, "v1").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = SourceWatcher::new(tx).unwrap();
        watcher.sync(vec![file.clone()]);
        assert_eq!(watcher.watched_dirs().count(), 1);

        fs::write(&file, "v2").unwrap();
        let changed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(path) if path == file => return true,
                    Some(_) => continue,
                    None => return false,
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(changed);
    }
}
