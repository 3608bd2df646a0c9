//! Panel runtime: executes [`PanelCmd`]s and feeds results back as messages.
//!
//! The loop thread owns the [`PanelModel`]. Requests run on short-lived
//! worker threads and the event subscription runs on its own reader thread;
//! both report through one crossbeam channel, so every model mutation happens
//! on the loop thread in arrival order.
//!
//! [`PanelRuntime`] itself has no terminal dependency. [`run_terminal`] wraps
//! it in the crossterm loop.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::core::errors::{Result, SpkError};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::transport::{Request, StreamItem, Subscription, Transport, TransportError};

use super::actions::Continuation;
use super::model::{PanelCmd, PanelModel, PanelMsg};
use super::status::StreamEvent;
use super::update::update;

/// Headless driver around [`update`].
pub struct PanelRuntime {
    model: PanelModel,
    transport: Arc<dyn Transport>,
    logger: ActivityLoggerHandle,
    tx: Sender<PanelMsg>,
    rx: Receiver<PanelMsg>,
    subscription: Option<Subscription>,
    /// Requests whose reply has not been queued yet.
    pending: Arc<AtomicUsize>,
}

impl PanelRuntime {
    pub fn new(model: PanelModel, transport: Arc<dyn Transport>, logger: ActivityLoggerHandle) -> Self {
        let (tx, rx) = unbounded();
        Self {
            model,
            transport,
            logger,
            tx,
            rx,
            subscription: None,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn model(&self) -> &PanelModel {
        &self.model
    }

    pub fn is_streaming(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_open)
    }

    /// Requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Apply `msg` and execute whatever it asks for.
    pub fn dispatch(&mut self, msg: PanelMsg) {
        let cmd = update(&mut self.model, msg);
        self.execute(cmd);
    }

    fn execute(&mut self, cmd: PanelCmd) {
        match cmd {
            PanelCmd::None | PanelCmd::Quit => {}
            PanelCmd::Request { request, then } => self.spawn_request(request, then),
            PanelCmd::Subscribe { path } => self.subscribe(&path),
            PanelCmd::CloseStream => {
                if let Some(mut subscription) = self.subscription.take() {
                    subscription.close();
                }
            }
            PanelCmd::Log(event) => self.logger.send(event),
            PanelCmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
        }
    }

    fn spawn_request(&self, request: Request, then: Continuation) {
        self.logger.send(ActivityEvent::Request {
            method: request.method.to_string(),
            path: request.path.clone(),
        });

        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::AcqRel);

        let failed_request = request.clone();
        let failed_then = then.clone();
        let spawned = thread::Builder::new()
            .name("spk-request".to_string())
            .spawn(move || {
                let result = transport.fetch(&request);
                let _ = tx.send(PanelMsg::Response {
                    request,
                    then,
                    result,
                });
                pending.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            let _ = self.tx.send(PanelMsg::Response {
                request: failed_request,
                then: failed_then,
                result: Err(TransportError::unreachable(format!(
                    "failed to spawn request worker: {e}"
                ))),
            });
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }

    fn subscribe(&mut self, path: &str) {
        if self.is_streaming() {
            return;
        }
        let tx = self.tx.clone();
        let sink = Box::new(move |item: StreamItem| {
            let event = match item {
                StreamItem::Event(event) => StreamEvent::from_sse(&event),
                StreamItem::Failed(err) => Some(StreamEvent::Error(err.to_string())),
            };
            if let Some(event) = event {
                let _ = tx.send(PanelMsg::Stream(event));
            }
        });
        match self.transport.subscribe(path, sink) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(err) => {
                let _ = self.tx.send(PanelMsg::Stream(StreamEvent::Error(err.to_string())));
            }
        }
    }

    /// Handle every queued message, waiting up to `wait` for the first one.
    /// Returns how many were handled.
    pub fn pump(&mut self, wait: Duration) -> usize {
        let mut handled = 0;
        match self.rx.recv_timeout(wait) {
            Ok(msg) => {
                self.dispatch(msg);
                handled += 1;
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return 0,
        }
        while let Ok(msg) = self.rx.try_recv() {
            self.dispatch(msg);
            handled += 1;
        }
        handled
    }

    /// Pump until no request is outstanding and the queue is empty.
    pub fn settle(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending_requests() == 0 && self.rx.is_empty() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SpkError::Runtime {
                    details: format!(
                        "{} request(s) still pending after {timeout:?}",
                        self.pending_requests()
                    ),
                });
            }
            self.pump((deadline - now).min(Duration::from_millis(20)));
        }
    }

    /// Close the stream, record the stop and release the logger.
    pub fn shutdown(mut self, reason: &str) -> PanelModel {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        self.logger.send(ActivityEvent::PanelStopped {
            reason: reason.to_string(),
        });
        self.model
    }
}

#[cfg(feature = "cli")]
pub use terminal::run_terminal;

#[cfg(feature = "cli")]
mod terminal {
    use std::io::{self, Write};
    use std::time::Duration;

    use chrono::Local;
    use crossterm::cursor::{Hide, Show};
    use crossterm::event::{self, Event};
    use crossterm::execute;
    use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};

    use super::PanelRuntime;
    use crate::core::errors::{Result, SpkError};
    use crate::panel::input::map_key;
    use crate::panel::model::PanelMsg;
    use crate::panel::render::paint;

    #[cfg(feature = "signals")]
    use crate::panel::signals::ShutdownSignal;

    fn terminal_error(e: &io::Error) -> SpkError {
        SpkError::Runtime {
            details: format!("terminal: {e}"),
        }
    }

    /// Run the interactive panel until the operator quits or a signal arrives.
    pub fn run_terminal(runtime: PanelRuntime, tick: Duration) -> Result<PanelRuntime> {
        let mut stdout = io::stdout();

        terminal::enable_raw_mode().map_err(|e| terminal_error(&e))?;
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(terminal_error(&e));
        }

        let mut runtime = runtime;
        let result = run_inner(&mut stdout, &mut runtime, tick);

        // Always restore terminal state.
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result.map(|()| runtime).map_err(|e| terminal_error(&e))
    }

    fn run_inner<W: Write>(out: &mut W, runtime: &mut PanelRuntime, tick: Duration) -> io::Result<()> {
        #[cfg(feature = "signals")]
        let signal = ShutdownSignal::new();

        runtime.dispatch(PanelMsg::Start);
        let mut today = Local::now().date_naive();
        runtime.dispatch(PanelMsg::Tick { today });

        loop {
            #[cfg(feature = "signals")]
            if signal.requested() && !runtime.model().quit {
                runtime.dispatch(PanelMsg::Quit);
            }
            if runtime.model().quit {
                return Ok(());
            }

            runtime.pump(Duration::ZERO);

            let (cols, rows) = terminal::size()?;
            paint(out, runtime.model(), cols, rows)?;

            if event::poll(tick)?
                && let Event::Key(key) = event::read()?
                && let Some(msg) = map_key(&key, runtime.model())
            {
                runtime.dispatch(msg);
            }

            let now = Local::now().date_naive();
            if now != today {
                today = now;
                runtime.dispatch(PanelMsg::Tick { today });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::core::config::Config;
    use crate::transport::{Body, EventSink, FetchResource, FetchResult, SseEvent, SubscribeEvents};

    #[derive(Default)]
    struct Canned {
        sink: Mutex<Option<EventSink>>,
    }

    impl FetchResource for Canned {
        fn fetch(&self, request: &Request) -> FetchResult {
            match request.path.as_str() {
                "/status" => Ok(Body::Json(json!({"hostname": "sp3", "time": "06:00:00"}))),
                _ => Err(TransportError::http(404)),
            }
        }
    }

    impl SubscribeEvents for Canned {
        fn subscribe(&self, _path: &str, sink: EventSink) -> std::result::Result<Subscription, TransportError> {
            *self.sink.lock() = Some(sink);
            Ok(Subscription::new(|| {}))
        }
    }

    fn runtime(transport: Arc<Canned>) -> PanelRuntime {
        let model = PanelModel::new(&Config::default(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        PanelRuntime::new(model, transport, ActivityLoggerHandle::disconnected())
    }

    #[test]
    fn start_pulls_and_subscribes() {
        let transport = Arc::new(Canned::default());
        let mut rt = runtime(Arc::clone(&transport));
        rt.dispatch(PanelMsg::Start);
        assert!(rt.is_streaming());
        rt.settle(Duration::from_secs(5)).unwrap();
        assert_eq!(rt.model().registry.text(crate::panel::registry::ElementId::HeadTitle), "sp3");
    }

    #[test]
    fn stream_items_become_messages() {
        let transport = Arc::new(Canned::default());
        let mut rt = runtime(Arc::clone(&transport));
        rt.dispatch(PanelMsg::Start);
        rt.settle(Duration::from_secs(5)).unwrap();

        if let Some(sink) = transport.sink.lock().as_mut() {
            sink(StreamItem::Event(SseEvent {
                event: "stop".to_string(),
                data: String::new(),
                id: None,
            }));
        }
        assert_eq!(rt.pump(Duration::from_secs(1)), 1);
        assert!(!rt.is_streaming());
        assert!(!rt.model().stream_open);
    }

    #[test]
    fn failed_request_settles() {
        let transport = Arc::new(Canned::default());
        let mut rt = runtime(transport);
        rt.dispatch(PanelMsg::Zone(Some(2)));
        rt.settle(Duration::from_secs(5)).unwrap();
        assert_eq!(rt.pending_requests(), 0);
        assert_eq!(
            rt.model().registry.text(crate::panel::registry::ElementId::PanelLine1),
            "STATUS: 404"
        );
    }
}
