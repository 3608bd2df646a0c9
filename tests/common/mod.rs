#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::Value;

use sprinkler_panel::core::config::Config;
use sprinkler_panel::logger::activity::ActivityLoggerHandle;
use sprinkler_panel::panel::model::PanelModel;
use sprinkler_panel::panel::runtime::PanelRuntime;
use sprinkler_panel::transport::{
    Body, EventSink, FetchResource, FetchResult, Request, SseEvent, StreamItem, SubscribeEvents,
    Subscription, TransportError,
};

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_spkl") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "spkl.exe" } else { "spkl" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve spkl binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("spkl-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .envs(env.iter().copied())
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute spkl command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ──────────────────── scripted controller ────────────────────

/// In-memory controller: replies are scripted per `METHOD path`, every
/// request is recorded, and stream events are pushed by the test.
///
/// A scripted queue keeps replaying its last reply once drained; an
/// unscripted path answers 404.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<FetchResult>>>,
    requests: Mutex<Vec<Request>>,
    sink: Mutex<Option<EventSink>>,
    subscriptions: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

fn key(method: &str, path: &str) -> String {
    format!("{method} {path}")
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, path: &str, body: Value) {
        self.reply_with(method, path, Ok(Body::Json(body)));
    }

    pub fn reply_text(&self, method: &str, path: &str, text: &str) {
        self.reply_with(method, path, Ok(Body::Text(text.to_string())));
    }

    pub fn fail(&self, method: &str, path: &str, err: TransportError) {
        self.reply_with(method, path, Err(err));
    }

    pub fn reply_with(&self, method: &str, path: &str, result: FetchResult) {
        self.replies
            .lock()
            .entry(key(method, path))
            .or_default()
            .push_back(result);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    pub fn last_request(&self, path: &str) -> Option<Request> {
        self.requests.lock().iter().rev().find(|r| r.path == path).cloned()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver a named event to the open subscription, if any.
    pub fn emit(&self, event: &str, data: &str) -> bool {
        self.emit_item(StreamItem::Event(SseEvent {
            event: event.to_string(),
            data: data.to_string(),
            id: None,
        }))
    }

    pub fn emit_item(&self, item: StreamItem) -> bool {
        match self.sink.lock().as_mut() {
            Some(sink) => {
                sink(item);
                true
            }
            None => false,
        }
    }
}

impl FetchResource for ScriptedTransport {
    fn fetch(&self, request: &Request) -> FetchResult {
        self.requests.lock().push(request.clone());
        let mut replies = self.replies.lock();
        let Some(queue) = replies.get_mut(&key(request.method.as_str(), &request.path)) else {
            return Err(TransportError::http(404));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Err(TransportError::http(404)))
        } else {
            queue.front().cloned().unwrap_or_else(|| Err(TransportError::http(404)))
        }
    }
}

impl SubscribeEvents for ScriptedTransport {
    fn subscribe(&self, _path: &str, sink: EventSink) -> Result<Subscription, TransportError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock() = Some(sink);
        let closed = Arc::clone(&self.closed);
        Ok(Subscription::new(move || {
            closed.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// ──────────────────── runtime helpers ────────────────────

pub const SETTLE: Duration = Duration::from_secs(5);

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
}

pub fn runtime_with(transport: &Arc<ScriptedTransport>, config: &Config) -> PanelRuntime {
    let model = PanelModel::new(config, today());
    PanelRuntime::new(model, transport.clone(), ActivityLoggerHandle::disconnected())
}

pub fn runtime(transport: &Arc<ScriptedTransport>) -> PanelRuntime {
    runtime_with(transport, &Config::default())
}

/// Default-stream `data:` payload wrapping a status record.
pub fn status_event(status: &Value) -> String {
    serde_json::json!({ "apiStatus": status }).to_string()
}
