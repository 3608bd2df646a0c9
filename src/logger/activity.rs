//! Activity logger thread.
//!
//! A dedicated thread owns the [`JsonlWriter`]. The panel loop and the request
//! workers send [`ActivityEvent`]s through a bounded crossbeam channel with
//! `try_send()`, so a slow disk never stalls the UI.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, SpkError};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 512;

/// Where a status record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Push,
    Pull,
}

impl StatusSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }
}

/// Events recorded in the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    PanelStarted {
        version: String,
        host: String,
    },
    PanelStopped {
        reason: String,
    },
    ConfigLoaded {
        path: String,
        config_hash: String,
    },
    Navigated {
        view: String,
        title: String,
        depth: usize,
    },
    UnknownView {
        view: String,
    },
    StatusIngested {
        source: StatusSource,
        hostname: String,
    },
    StatusPull {
        path: String,
    },
    Request {
        method: String,
        path: String,
    },
    TransportFailed {
        path: String,
        code: Option<u16>,
        text: String,
    },
    ActionRejected {
        path: String,
        msg: String,
    },
    StreamTerminated {
        details: String,
    },
    StreamError {
        details: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

/// Cheaply cloneable, non-blocking sender for activity events.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Queue an event. Drops it (and counts the drop) when the channel is full.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events lost to back-pressure and not yet reported in the log.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop. Blocks only until queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }

    /// A handle whose events go nowhere. Used by one-shot commands and tests.
    pub fn disconnected() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Spawn the logger thread.
pub fn spawn_logger(
    config: JsonlConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    spawn_logger_with_capacity(config, CHANNEL_CAPACITY)
}

/// Spawn the logger thread with an explicit channel capacity.
pub fn spawn_logger_with_capacity(
    config: JsonlConfig,
    capacity: usize,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("spk-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped))
        .map_err(|e| SpkError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::StreamError, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if event == ActivityEvent::Shutdown {
            break;
        }
        jsonl.write_entry(&to_log_entry(&event));
        if rx.is_empty() {
            jsonl.flush();
        }
    }
    jsonl.flush();
}

/// Map an activity event to its JSONL record.
pub fn to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::PanelStarted { version, host } => {
            let mut e = LogEntry::new(EventType::PanelStart, Severity::Info);
            e.details = Some(format!("version={version} host={host}"));
            e
        }
        ActivityEvent::PanelStopped { reason } => {
            let mut e = LogEntry::new(EventType::PanelStop, Severity::Info);
            e.details = Some(format!("reason={reason}"));
            e
        }
        // Handled by the thread loop; never written.
        ActivityEvent::Shutdown => LogEntry::new(EventType::PanelStop, Severity::Info),
        ActivityEvent::ConfigLoaded { path, config_hash } => {
            let mut e = LogEntry::new(EventType::ConfigLoaded, Severity::Info);
            e.path = Some(path.clone());
            e.details = Some(format!("config_hash={config_hash}"));
            e
        }
        ActivityEvent::Navigated { view, title, depth } => {
            let mut e = LogEntry::new(EventType::Navigation, Severity::Info);
            e.view = Some(view.clone());
            e.message = Some(title.clone());
            e.details = Some(format!("depth={depth}"));
            e
        }
        ActivityEvent::UnknownView { view } => {
            let mut e = LogEntry::new(EventType::UnknownView, Severity::Warning);
            e.view = Some(view.clone());
            e.code = Some("SPK-2001".to_string());
            e
        }
        ActivityEvent::StatusIngested { source, hostname } => {
            let mut e = LogEntry::new(EventType::StatusIngested, Severity::Info);
            e.details = Some(format!("source={} hostname={hostname}", source.as_str()));
            e
        }
        ActivityEvent::StatusPull { path } => {
            let mut e = LogEntry::new(EventType::StatusPull, Severity::Info);
            e.path = Some(path.clone());
            e
        }
        ActivityEvent::Request { method, path } => {
            let mut e = LogEntry::new(EventType::Request, Severity::Info);
            e.path = Some(path.clone());
            e.details = Some(format!("method={method}"));
            e
        }
        ActivityEvent::TransportFailed { path, code, text } => {
            let mut e = LogEntry::new(EventType::TransportError, Severity::Warning);
            e.path = Some(path.clone());
            e.code = code.map(|c| c.to_string());
            e.message = Some(text.clone());
            e
        }
        ActivityEvent::ActionRejected { path, msg } => {
            let mut e = LogEntry::new(EventType::ActionRejected, Severity::Warning);
            e.path = Some(path.clone());
            e.code = Some("SPK-2102".to_string());
            e.message = Some(msg.clone());
            e
        }
        ActivityEvent::StreamTerminated { details } => {
            let mut e = LogEntry::new(EventType::StreamTerminated, Severity::Critical);
            e.code = Some("SPK-2103".to_string());
            e.details = Some(details.clone());
            e
        }
        ActivityEvent::StreamError { details } => {
            let mut e = LogEntry::new(EventType::StreamError, Severity::Warning);
            e.details = Some(details.clone());
            e
        }
    }
}
