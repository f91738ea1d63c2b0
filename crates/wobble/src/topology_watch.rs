//! Topology file loading and hot reload

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use wobble_core::{CoreError, SharedTopology};

/// Load `path` into `shared`
///
/// A missing or broken file is logged, not fatal: until a valid file shows up
/// the publisher idles.
pub fn load(shared: &SharedTopology, path: &Path) {
    match shared.load_file(path) {
        Ok(leds) => tracing::info!("Loaded topology {:?} with {} LEDs", path, leds),
        Err(CoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Topology {:?} not found, idling until it appears", path)
        }
        Err(e) => tracing::error!("Failed to load topology {:?}: {}", path, e),
    }
}

/// Reload after a file event; a file that is gone clears the snapshot
fn reload(shared: &SharedTopology, path: &Path) {
    match shared.load_file(path) {
        Ok(leds) => tracing::info!("Reloaded topology {:?} with {} LEDs", path, leds),
        Err(CoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Topology {:?} removed, clearing", path);
            shared.clear();
        }
        Err(e) => tracing::error!(
            "Failed to reload topology {:?}, keeping previous: {}",
            path,
            e
        ),
    }
}

/// Reload the topology whenever `path` changes
///
/// Watches the parent directory so that files replaced by editors or created
/// after startup are picked up. Removing the file or moving it away clears the
/// topology.
pub fn watch(shared: SharedTopology, path: PathBuf) -> Result<RecommendedWatcher> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name: OsString = path
        .file_name()
        .with_context(|| format!("Topology path {:?} has no file name", path))?
        .to_os_string();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if !ours {
                return;
            }

            // Renames arrive as modify events, so removal is decided by the reload itself
            if event.kind.is_remove() || event.kind.is_create() || event.kind.is_modify() {
                reload(&shared, &path);
            }
        }
        Err(e) => tracing::error!("Topology watch error: {}", e),
    })
    .context("Failed to create topology watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {:?}", dir))?;

    tracing::info!("Watching {:?} for topology changes", dir);
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};
    use wobble_core::TopologyProvider;

    const TOPOLOGY: &str =
        r#"{"devices":[{"id":"a","strips":[{"index":0,"leds":[{"index":0},{"index":1}]}]}]}"#;

    #[test]
    fn test_load_missing_file_leaves_empty() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedTopology::empty();
        load(&shared, &dir.path().join("absent.json"));
        assert!(shared.snapshot().is_none());
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        fs::write(&path, TOPOLOGY).unwrap();

        let shared = SharedTopology::empty();
        load(&shared, &path);
        assert_eq!(shared.snapshot().unwrap().led_count(), 2);
    }

    fn wait_for(shared: &SharedTopology, pred: impl Fn(Option<usize>) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if pred(shared.snapshot().map(|t| t.led_count())) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_reload_missing_file_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        fs::write(&path, TOPOLOGY).unwrap();

        let shared = SharedTopology::empty();
        load(&shared, &path);
        fs::remove_file(&path).unwrap();

        reload(&shared, &path);
        assert!(shared.snapshot().is_none());
    }

    #[test]
    fn test_reload_broken_file_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        fs::write(&path, TOPOLOGY).unwrap();

        let shared = SharedTopology::empty();
        load(&shared, &path);
        fs::write(&path, "{ not json").unwrap();

        reload(&shared, &path);
        assert_eq!(shared.snapshot().unwrap().led_count(), 2);
    }

    #[test]
    fn test_watch_reloads_and_clears_on_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        let shared = SharedTopology::empty();
        let _watcher = watch(shared.clone(), path.clone()).unwrap();

        fs::write(&path, TOPOLOGY).unwrap();
        assert!(wait_for(&shared, |leds| leds == Some(2)));

        fs::remove_file(&path).unwrap();
        assert!(wait_for(&shared, |leds| leds.is_none()));
    }

    #[test]
    fn test_watch_clears_when_moved_away() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.json");
        let shared = SharedTopology::empty();
        let _watcher = watch(shared.clone(), path.clone()).unwrap();

        fs::write(&path, TOPOLOGY).unwrap();
        assert!(wait_for(&shared, |leds| leds == Some(2)));

        fs::rename(&path, elsewhere.path().join("topology.json")).unwrap();
        assert!(wait_for(&shared, |leds| leds.is_none()));
    }

    #[test]
    fn test_watch_requires_file_name() {
        assert!(watch(SharedTopology::empty(), PathBuf::from("/")).is_err());
    }
}
