//! Reloading when the config file changes.
//!
//! A `notify` watcher feeds a background thread through a std channel. The
//! thread runs every event through a [`SaveDetector`] and, when it reports a
//! completed save, calls the reload closure and publishes the outcome on one
//! of two single-slot `crossbeam` channels.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, trace, warn};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::TagconfError;

const RENAMED: u8 = 1 << 0;
const CHMODDED: u8 = 1 << 1;
const REMOVED: u8 = 1 << 2;
const SWAP_SAVE: u8 = RENAMED | CHMODDED | REMOVED;

/// Recognises a finished save from a stream of file events.
///
/// Editors that write directly produce a data-modify event, which counts
/// at once. Editors that save through a swap file produce rename, then
/// metadata change, then remove; each step only counts when the previous
/// ones have been seen, and the full sequence counts as a save.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveDetector {
    state: u8,
}

impl SaveDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event. Returns `true` when the file should be reloaded.
    pub fn observe(&mut self, kind: &EventKind) -> bool {
        match kind {
            EventKind::Modify(ModifyKind::Name(_)) if self.state == 0 => self.state |= RENAMED,
            EventKind::Modify(ModifyKind::Metadata(_)) if self.state == RENAMED => {
                self.state |= CHMODDED
            }
            EventKind::Remove(_) if self.state == RENAMED | CHMODDED => self.state |= REMOVED,
            _ => {}
        }
        is_write(kind) || self.state == SWAP_SAVE
    }

    pub fn reset(&mut self) {
        self.state = 0;
    }
}

fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}

/// Receivers for a running watch loop.
///
/// `updates` carries the unix time (seconds) of each successful reload,
/// `errors` each failed reload or watcher error. Both hold one pending
/// value; the loop waits for the consumer when a slot is full.
#[derive(Debug)]
pub struct Watch {
    pub updates: Receiver<i64>,
    pub errors: Receiver<TagconfError>,
}

impl Watch {
    /// A watch that never delivers, for loaders with watching off.
    pub fn idle() -> Self {
        Self {
            updates: channel::never(),
            errors: channel::never(),
        }
    }
}

/// Watch `path` and call `reload` after every detected save.
///
/// The loop runs on its own thread until the process exits or a receiver
/// of the returned [`Watch`] is dropped.
pub fn spawn<F>(path: PathBuf, reload: F) -> Result<Watch, TagconfError>
where
    F: FnMut() -> Result<(), TagconfError> + Send + 'static,
{
    // notify is callback based; bridge it to a channel the loop can block on
    let (notify_tx, notify_rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    let (update_tx, updates) = channel::bounded(1);
    let (error_tx, errors) = channel::bounded(1);

    let thread_path = path.clone();
    std::thread::Builder::new()
        .name("tagconf-watch".into())
        .spawn(move || {
            run(
                watcher,
                notify_rx,
                thread_path,
                reload,
                update_tx,
                error_tx,
            )
        })
        .map_err(|e| TagconfError::IoError { path, source: e })?;

    Ok(Watch { updates, errors })
}

fn run<F>(
    mut watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<notify::Event>>,
    path: PathBuf,
    mut reload: F,
    updates: Sender<i64>,
    errors: Sender<TagconfError>,
) where
    F: FnMut() -> Result<(), TagconfError>,
{
    let mut detector = SaveDetector::new();
    while let Ok(result) = events.recv() {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                if errors.send(TagconfError::Watch(e)).is_err() {
                    break;
                }
                continue;
            }
        };
        trace!("watch event {:?}", event.kind);
        if !detector.observe(&event.kind) {
            continue;
        }

        debug!("{} changed, reloading", path.display());
        let delivered = match reload() {
            Ok(()) => updates.send(unix_now()).is_ok(),
            Err(e) => {
                warn!("reloading {} failed: {e}", path.display());
                errors.send(e).is_ok()
            }
        };
        if !delivered {
            break;
        }

        detector.reset();
        // a save that replaced the file leaves the old watch dangling
        if watcher.unwatch(&path).is_err() {
            trace!("{} was not watched", path.display());
        }
        if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive)
            && errors.send(TagconfError::Watch(e)).is_err()
        {
            break;
        }
    }
    debug!("stopped watching {}", path.display());
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{
        AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode,
    };

    fn rename() -> EventKind {
        EventKind::Modify(ModifyKind::Name(RenameMode::From))
    }

    fn chmod() -> EventKind {
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))
    }

    fn remove() -> EventKind {
        EventKind::Remove(RemoveKind::File)
    }

    fn write() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    #[test]
    fn direct_write_triggers() {
        let mut detector = SaveDetector::new();
        assert!(detector.observe(&write()));
    }

    #[test]
    fn swap_file_sequence_triggers() {
        let mut detector = SaveDetector::new();
        assert!(!detector.observe(&rename()));
        assert!(!detector.observe(&chmod()));
        assert!(detector.observe(&remove()));
    }

    #[test]
    fn out_of_order_steps_are_ignored() {
        let mut detector = SaveDetector::new();
        assert!(!detector.observe(&chmod()));
        assert!(!detector.observe(&remove()));
        assert!(!detector.observe(&rename()));
        assert!(!detector.observe(&remove()), "remove before chmod");
        assert!(!detector.observe(&chmod()));
        assert!(detector.observe(&remove()));
    }

    #[test]
    fn unrelated_events_do_not_trigger() {
        let mut detector = SaveDetector::new();
        assert!(!detector.observe(&EventKind::Access(AccessKind::Any)));
        assert!(!detector.observe(&EventKind::Create(CreateKind::File)));
        assert_eq!(detector, SaveDetector::new());
    }

    #[test]
    fn reset_clears_progress() {
        let mut detector = SaveDetector::new();
        detector.observe(&rename());
        detector.observe(&chmod());
        detector.reset();
        assert!(!detector.observe(&remove()));
    }

    #[test]
    fn idle_watch_never_delivers() {
        let watch = Watch::idle();
        assert!(watch.updates.try_recv().is_err());
        assert!(watch.errors.try_recv().is_err());
    }
}
