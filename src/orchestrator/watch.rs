//! Polling-based file watching with a registered callback.
//!
//! Each watched path gets one background loop that compares modification
//! timestamps between ticks. Polling keeps the implementation portable;
//! an OS-notification backend could replace it behind the same surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

use super::process::Orchestrator;
use crate::constants::WATCH_POLL_INTERVAL_MS;

/// Callback invoked with the watched path on each observed change.
pub type WatchCallback = Arc<dyn Fn(&Path) + Send + Sync + 'static>;

/// One watched path and its debounce state.
///
/// The callback fires at most once per strict increase of the tracked
/// modification timestamp, and at least once immediately if the path
/// already exists when watching begins. Repeated identical timestamps
/// collapse into a single effective event.
pub struct WatchTarget {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    callback: WatchCallback,
}

impl WatchTarget {
    /// Create a target that has not observed the path yet.
    pub fn new(path: impl Into<PathBuf>, callback: WatchCallback) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
            callback,
        }
    }

    /// The watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One poll: fire the callback if the modification time advanced.
    ///
    /// Stat errors (path briefly missing, permission race) are suppressed
    /// and retried on the next tick. Returns whether the callback fired.
    pub fn tick(&mut self) -> bool {
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified());
        match modified {
            Ok(mtime) => {
                if self.last_modified.is_none_or(|last| mtime > last) {
                    self.last_modified = Some(mtime);
                    (self.callback)(&self.path);
                    return true;
                }
                false
            },
            Err(_) => false,
        }
    }
}

impl Orchestrator {
    /// Watch a path, invoking `callback` whenever its modification time
    /// strictly increases. An already-existing path fires immediately on
    /// the first tick. The loop runs until global shutdown.
    pub fn watch(&self, path: impl Into<PathBuf>, callback: WatchCallback) {
        let shared = self.shared.clone();
        let mut target = WatchTarget::new(path, callback);
        tracing::debug!(path = %target.path().display(), "watching for changes");

        std::thread::spawn(move || {
            while !shared.shutdown.load(Ordering::SeqCst) {
                target.tick();
                std::thread::sleep(Duration::from_millis(WATCH_POLL_INTERVAL_MS));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn counting_target(path: &Path) -> (WatchTarget, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let count = fired.clone();
        let callback: WatchCallback = Arc::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        (WatchTarget::new(path, callback), fired)
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn existing_path_fires_on_first_tick() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.css");
        std::fs::write(&path, "body {}").unwrap();

        let (mut target, fired) = counting_target(&path);
        assert!(target.tick());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_path_fires_once_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.css");

        let (mut target, fired) = counting_target(&path);
        assert!(!target.tick());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        std::fs::write(&path, "body {}").unwrap();
        assert!(target.tick());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identical_timestamp_does_not_refire() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.css");
        std::fs::write(&path, "body {}").unwrap();

        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&path, stamp);

        let (mut target, fired) = counting_target(&path);
        assert!(target.tick());

        // Rewrite with the same timestamp: no new event.
        std::fs::write(&path, "body { color: red }").unwrap();
        set_mtime(&path, stamp);
        assert!(!target.tick());
        assert!(!target.tick());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn strictly_newer_timestamp_fires_once_each() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.css");
        std::fs::write(&path, "body {}").unwrap();

        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&path, stamp);

        let (mut target, fired) = counting_target(&path);
        target.tick();

        set_mtime(&path, stamp + Duration::from_secs(1));
        assert!(target.tick());
        assert!(!target.tick());

        set_mtime(&path, stamp + Duration::from_secs(2));
        assert!(target.tick());
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn callback_receives_the_watched_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("build.css");
        std::fs::write(&path, "").unwrap();

        let seen: Arc<parking_lot::Mutex<Option<PathBuf>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let sink = seen.clone();
        let callback: WatchCallback = Arc::new(move |p| {
            *sink.lock() = Some(p.to_path_buf());
        });

        let mut target = WatchTarget::new(&path, callback);
        target.tick();
        assert_eq!(seen.lock().as_deref(), Some(path.as_path()));
    }
}
