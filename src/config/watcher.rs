// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Hot reload of the engine configuration file.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by writing a new file and renaming it over the old one
//! are still seen. Bursts of notifications for the file collapse into one
//! reload once they have been quiet for the debounce window.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::EngineConfig;

/// Default quiet period before a changed file is reloaded
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Outcome of a change to the watched file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    /// The file changed and parsed into a valid configuration
    Reloaded(Box<EngineConfig>),
    /// The file changed but could not be read, parsed or validated
    Rejected(String),
    /// The file was removed; the running configuration stays in effect
    Removed,
}

/// Collapses a burst of change notifications into a single pending reload
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    last_change: Option<Instant>,
    removed: bool,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_change: None,
            removed: false,
        }
    }

    fn touch(&mut self, at: Instant, removed: bool) {
        self.last_change = Some(at);
        self.removed = removed;
    }

    /// Returns `Some(removed)` once the burst has been quiet long enough
    fn settle(&mut self, now: Instant) -> Option<bool> {
        let last = self.last_change?;
        if now.duration_since(last) < self.window {
            return None;
        }
        self.last_change = None;
        Some(self.removed)
    }
}

/// Watches one configuration file
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<ConfigEvent>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Start watching `path`. `debounce_ms` defaults to `DEFAULT_DEBOUNCE_MS`.
    pub fn new<P: AsRef<Path>>(path: P, debounce_ms: Option<u64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let window = Duration::from_millis(debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS));

        let (raw_tx, raw_rx) = mpsc::channel::<Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = raw_tx.send(event);
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {:?}", dir))?;

        let (event_tx, event_rx) = mpsc::channel();
        let target = path.clone();
        thread::spawn(move || watch_loop(raw_rx, event_tx, target, window));

        info!(path = ?path, "watching configuration");
        Ok(Self {
            _watcher: watcher,
            events: event_rx,
            path,
        })
    }

    /// The configuration file being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next event, if one is ready
    pub fn try_recv(&self) -> Option<ConfigEvent> {
        self.events.try_recv().ok()
    }

    /// The most recent valid configuration among the pending events.
    ///
    /// Rejections and removals are logged and otherwise ignored.
    pub fn latest(&self) -> Option<EngineConfig> {
        let mut latest = None;
        while let Some(event) = self.try_recv() {
            match event {
                ConfigEvent::Reloaded(config) => latest = Some(*config),
                ConfigEvent::Rejected(reason) => warn!(%reason, "configuration change ignored"),
                ConfigEvent::Removed => warn!(path = ?self.path, "configuration file removed"),
            }
        }
        latest
    }
}

/// Only the parent directory is watched, so a matching file name is enough
fn same_file(a: &Path, b: &Path) -> bool {
    a.file_name().is_some() && a.file_name() == b.file_name()
}

fn watch_loop(raw: Receiver<Event>, out: Sender<ConfigEvent>, target: PathBuf, window: Duration) {
    let mut debouncer = Debouncer::new(window);
    let poll = (window / 4).max(Duration::from_millis(10));

    loop {
        match raw.recv_timeout(poll) {
            Ok(event) => {
                if !event.paths.iter().any(|p| same_file(p, &target)) {
                    continue;
                }
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {
                        debouncer.touch(Instant::now(), false)
                    }
                    EventKind::Remove(_) => debouncer.touch(Instant::now(), !target.exists()),
                    _ => {}
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(removed) = debouncer.settle(Instant::now()) {
            let event = if removed {
                ConfigEvent::Removed
            } else {
                reload(&target)
            };
            if out.send(event).is_err() {
                break;
            }
        }
    }
    debug!(path = ?target, "config watch loop finished");
}

fn reload(path: &Path) -> ConfigEvent {
    match EngineConfig::load(path) {
        Ok(config) => ConfigEvent::Reloaded(Box::new(config)),
        Err(e) => ConfigEvent::Rejected(format!("{:#}", e)),
    }
}

/// Validate a configuration file without applying it
pub fn validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    EngineConfig::load(path)
}
