//! Transport that shells out to `curl`.
//!
//! Requests run `curl -sS -X METHOD --max-time T -w '\n%{http_code}' URL` and
//! read the status code from the trailing line. The event stream runs
//! `curl -sN URL` as a long-lived child whose stdout feeds an [`SseParser`].

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use memchr::memrchr;
use parking_lot::Mutex;

use super::{
    Body, EventSink, FetchResource, FetchResult, Request, SseParser, StreamItem, SubscribeEvents,
    Subscription, TransportError,
};
use crate::core::config::ControllerConfig;

/// `curl`-backed controller transport.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    host: String,
    binary: String,
    timeout_secs: u64,
}

impl CurlTransport {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            host: config.host.clone(),
            binary: config.curl_binary.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    fn request_args(&self, request: &Request) -> Vec<String> {
        let mut args = vec![
            "-sS".to_string(),
            "-X".to_string(),
            request.method.as_str().to_string(),
            "--max-time".to_string(),
            self.timeout_secs.to_string(),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
        ];
        if let Some(body) = &request.body {
            args.push("-H".to_string());
            args.push("Content-Type: application/json".to_string());
            args.push("--data".to_string());
            args.push(body.to_string());
        }
        args.push(self.url(&request.path));
        args
    }
}

impl FetchResource for CurlTransport {
    fn fetch(&self, request: &Request) -> FetchResult {
        let output = Command::new(&self.binary)
            .args(self.request_args(request))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TransportError::unreachable(format!("{} not found or failed: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let text = stderr.trim();
            return Err(TransportError::unreachable(if text.is_empty() {
                format!("{} exited with {}", self.binary, output.status)
            } else {
                text.to_string()
            }));
        }

        let (body, code) = split_status_trailer(&output.stdout).ok_or_else(|| {
            TransportError::unreachable("response carried no status code")
        })?;
        if !(200..300).contains(&code) {
            return Err(TransportError::http(code));
        }
        Ok(Body::parse(&String::from_utf8_lossy(body)))
    }
}

impl SubscribeEvents for CurlTransport {
    fn subscribe(&self, path: &str, mut sink: EventSink) -> Result<Subscription, TransportError> {
        let mut child = Command::new(&self.binary)
            .args(["-sN", "-H", "Accept: text/event-stream"])
            .arg(self.url(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TransportError::unreachable(format!("{} not found or failed: {e}", self.binary)))?;

        let Some(mut stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(TransportError::unreachable("event stream has no stdout"));
        };

        let child: Arc<Mutex<Option<Child>>> = Arc::new(Mutex::new(Some(child)));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_closed = Arc::clone(&closed);
        let reader_child = Arc::clone(&child);
        thread::Builder::new()
            .name("spk-sse".to_string())
            .spawn(move || {
                let mut parser = SseParser::new();
                let mut chunk = [0_u8; 4096];
                loop {
                    match stdout.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            for event in parser.feed(&chunk[..n]) {
                                if reader_closed.load(Ordering::Acquire) {
                                    return;
                                }
                                sink(StreamItem::Event(event));
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            if !reader_closed.load(Ordering::Acquire) {
                                sink(StreamItem::Failed(TransportError::unreachable(
                                    format!("event stream read failed: {e}"),
                                )));
                            }
                            return;
                        }
                    }
                }
                if !reader_closed.load(Ordering::Acquire) {
                    let status = reader_child
                        .lock()
                        .as_mut()
                        .and_then(|c| c.wait().ok())
                        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
                    sink(StreamItem::Failed(TransportError::unreachable(format!(
                        "event stream ended ({status})"
                    ))));
                }
            })
            .map_err(|e| TransportError::unreachable(format!("failed to spawn sse reader: {e}")))?;

        Ok(Subscription::new(move || {
            closed.store(true, Ordering::Release);
            if let Some(mut c) = child.lock().take() {
                let _ = c.kill();
                let _ = c.wait();
            }
        }))
    }
}

/// Split `body\n<code>` as produced by `-w '\n%{http_code}'`.
fn split_status_trailer(stdout: &[u8]) -> Option<(&[u8], u16)> {
    let nl = memrchr(b'\n', stdout)?;
    let code = std::str::from_utf8(&stdout[nl + 1..]).ok()?.trim().parse().ok()?;
    Some((&stdout[..nl], code))
}
