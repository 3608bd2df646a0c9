//! Controller status record and its projection onto the display panel.
//!
//! [`StatusSync`] owns the single "latest status" value. Pushes and pulls both
//! replace it wholesale and then render, so the display always reflects the
//! most recently arrived record.

#![allow(missing_docs)]

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::{Result, SpkError};
use crate::core::helpers::display_value;
use crate::transport::{Request, SseEvent, TransportError};

use super::registry::{ElementId, ElementRegistry, INVISIBLE};
use super::views::{ViewId, ViewStack};

/// Scheduler state as reported by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SchedulerState {
    Running,
    Paused,
    #[default]
    Stopped,
    /// Between two items of a running schedule.
    Between,
    Other(String),
}

impl SchedulerState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Between => "between",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SchedulerState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            "between" => Self::Between,
            _ => Self::Other(value),
        }
    }
}

impl From<SchedulerState> for String {
    fn from(value: SchedulerState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known controller status. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Active zones. The firmware sends numbers; kept as text.
    #[serde(default, deserialize_with = "zone_list")]
    pub on: Vec<String>,
    #[serde(default)]
    pub scheduler_state: SchedulerState,
    /// Schedule name or the raw list of schedule items.
    #[serde(default, deserialize_with = "non_empty_value")]
    pub schedule: Option<Value>,
    #[serde(default, deserialize_with = "optional_text")]
    pub curr_cycle: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub next_cycle: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub start_date_time: Option<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub resume: Option<String>,
    #[serde(default)]
    pub hostname: String,
    /// Everything else the controller reported, in wire order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text for the display panel chosen by the branch priority
/// current cycle > schedule > next cycle > system off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLines {
    pub line1: String,
    pub line2: String,
    pub state: String,
    pub buttons_hidden: bool,
}

impl StatusRecord {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| SpkError::MalformedStatus {
            details: e.to_string(),
        })
    }

    /// Decode the data of a default stream event: `{"apiStatus": {...}}`.
    pub fn from_event_data(data: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(data).map_err(|e| SpkError::MalformedStatus {
            details: e.to_string(),
        })?;
        let status = value
            .get_mut("apiStatus")
            .map(Value::take)
            .ok_or_else(|| SpkError::MalformedStatus {
                details: "event data has no apiStatus".to_string(),
            })?;
        Self::from_value(status)
    }

    pub fn schedule_text(&self) -> Option<String> {
        self.schedule.as_ref().map(display_value)
    }

    /// Active zones joined with `,`; `-` when none.
    pub fn zones_text(&self) -> String {
        if self.on.is_empty() {
            "-".to_string()
        } else {
            self.on.join(",")
        }
    }

    pub fn is_system_off(&self) -> bool {
        self.resume.as_deref() == Some("system off")
    }

    /// `HH:MM` from the controller clock.
    pub fn clock(&self) -> String {
        self.time.chars().take(5).collect()
    }

    /// Primary display lines, or `None` when no branch applies.
    pub fn panel_lines(&self) -> Option<PanelLines> {
        if let Some(cycle) = &self.curr_cycle {
            return Some(PanelLines {
                line1: format!("Current cycle: {cycle}"),
                line2: format!("Zone: {}", self.zones_text()),
                state: self.scheduler_state.to_string(),
                buttons_hidden: false,
            });
        }
        if let Some(schedule) = self.schedule_text() {
            // A queued schedule reports `stopped` until it starts; hide that.
            let state = if self.scheduler_state == SchedulerState::Stopped {
                String::new()
            } else {
                self.scheduler_state.to_string()
            };
            return Some(PanelLines {
                line1: format!("Schedule: {schedule}"),
                line2: format!("Zone: {}", self.zones_text()),
                state,
                buttons_hidden: false,
            });
        }
        if let Some(next) = &self.next_cycle {
            return Some(PanelLines {
                line1: format!("Next cycle: {next}"),
                line2: self.start_date_time.clone().unwrap_or_default(),
                state: String::new(),
                buttons_hidden: true,
            });
        }
        if self.is_system_off() {
            return Some(PanelLines {
                line1: "System Off".to_string(),
                line2: "Tap System Hold to resume operation".to_string(),
                state: String::new(),
                buttons_hidden: true,
            });
        }
        None
    }
}

/// A decoded push from the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Status(Box<StatusRecord>),
    /// Named `stop` event; the subscription is over.
    Stop(String),
    Error(String),
}

impl StreamEvent {
    /// Decode one parsed SSE event. Unknown named events are ignored.
    pub fn from_sse(event: &SseEvent) -> Option<Self> {
        match event.event.as_str() {
            "message" => Some(match StatusRecord::from_event_data(&event.data) {
                Ok(record) => Self::Status(Box::new(record)),
                Err(e) => Self::Error(e.to_string()),
            }),
            "stop" => Some(Self::Stop(event.data.clone())),
            _ => None,
        }
    }
}

/// What `ensure_and_render` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensure {
    Rendered,
    /// No record held; the caller must issue this pull.
    Pull(Request),
    /// A pull is already on its way.
    Pending,
}

/// Owner of the shared status record.
#[derive(Debug, Clone)]
pub struct StatusSync {
    record: Option<StatusRecord>,
    pull_in_flight: bool,
    status_path: String,
}

impl StatusSync {
    pub fn new(status_path: impl Into<String>) -> Self {
        Self {
            record: None,
            pull_in_flight: false,
            status_path: status_path.into(),
        }
    }

    pub fn record(&self) -> Option<&StatusRecord> {
        self.record.as_ref()
    }

    pub fn pull_in_flight(&self) -> bool {
        self.pull_in_flight
    }

    pub fn status_path(&self) -> &str {
        &self.status_path
    }

    /// Replace the record with a pushed one and render.
    pub fn ingest_push(&mut self, record: StatusRecord, views: &ViewStack, reg: &mut ElementRegistry) {
        self.record = Some(record);
        self.render(views, reg);
    }

    /// A pull resolved; same as a push, and the pull is no longer outstanding.
    pub fn ingest_pull(&mut self, record: StatusRecord, views: &ViewStack, reg: &mut ElementRegistry) {
        self.pull_in_flight = false;
        self.ingest_push(record, views, reg);
    }

    /// A pull failed. The failure is shown on the status lines; no retry.
    pub fn pull_failed(&mut self, err: &TransportError, reg: &mut ElementRegistry) {
        self.pull_in_flight = false;
        project_transport_failure(reg, err);
    }

    /// A pull returned something that is not a status record.
    pub fn pull_abandoned(&mut self) {
        self.pull_in_flight = false;
    }

    /// Render now if a record is held, otherwise ask for one.
    pub fn ensure_and_render(&mut self, views: &ViewStack, reg: &mut ElementRegistry) -> Ensure {
        if self.record.is_some() {
            self.render(views, reg);
            return Ensure::Rendered;
        }
        if self.pull_in_flight {
            return Ensure::Pending;
        }
        self.pull_in_flight = true;
        Ensure::Pull(Request::get(self.status_path.clone()))
    }

    /// Drop the held record so the next `ensure_and_render` pulls.
    pub fn invalidate(&mut self) {
        self.record = None;
    }

    /// Project the held record onto the display elements.
    pub fn render(&self, views: &ViewStack, reg: &mut ElementRegistry) {
        let Some(rec) = &self.record else {
            return;
        };

        if views.top() == ViewId::HOME {
            reg.set_text(ElementId::SystemTitle, format!("{} Controls", rec.hostname));
        }
        reg.set_text(ElementId::HeadTitle, rec.hostname.clone());

        if let Some(lines) = rec.panel_lines() {
            reg.set_text(ElementId::PanelLine1, lines.line1);
            reg.set_text(ElementId::PanelLine2, lines.line2);
            reg.set_text(ElementId::PanelState, lines.state);
            reg.set_hidden(ElementId::PanelButtons, lines.buttons_hidden);
        }

        reg.set_text(ElementId::PanelTime, rec.clock());
        set_pause_glyphs(reg, rec.scheduler_state == SchedulerState::Paused);
    }
}

/// Exactly one of the two glyphs is shown, both written from one decision.
fn set_pause_glyphs(reg: &mut ElementRegistry, paused: bool) {
    let (shown, hidden) = if paused {
        (ElementId::PauseGlyph, ElementId::PlayGlyph)
    } else {
        (ElementId::PlayGlyph, ElementId::PauseGlyph)
    };
    reg.get_mut(shown).remove_class(INVISIBLE);
    reg.get_mut(hidden).add_class(INVISIBLE);
}

/// Show a failed request on the display panel: `STATUS: <code>` and its text.
pub fn project_transport_failure(reg: &mut ElementRegistry, err: &TransportError) {
    reg.set_text(ElementId::PanelTime, "");
    reg.set_text(ElementId::PanelLine1, format!("STATUS: {}", err.code_label()));
    reg.set_text(ElementId::PanelLine2, err.text.clone());
    reg.set_text(ElementId::PanelState, "");
}

fn zone_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|v| match v {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s),
            other => Err(de::Error::custom(format!("zone must be a number or string, got {other}"))),
        })
        .collect()
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(display_value(&other)).filter(|s| !s.is_empty()),
    })
}

fn non_empty_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> StatusRecord {
        StatusRecord::from_value(value).unwrap()
    }

    fn rendered(rec: StatusRecord) -> ElementRegistry {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        sync.ingest_push(rec, &views, &mut reg);
        reg
    }

    #[test]
    fn decodes_firmware_payload() {
        let rec = record(json!({
            "on": [3, 5],
            "schedulerState": "running",
            "schedule": [[[3], 10], [[5], 5]],
            "currCycle": "",
            "nextCycle": "weekday",
            "startDateTime": "Tue 06:00",
            "time": "14:05:30 Mon 2 Jun",
            "resume": "",
            "hostname": "sp3",
            "holdDays": 0
        }));
        assert_eq!(rec.on, vec!["3", "5"]);
        assert_eq!(rec.scheduler_state, SchedulerState::Running);
        assert_eq!(rec.schedule_text().as_deref(), Some("3,10,5,5"));
        assert_eq!(rec.curr_cycle, None);
        assert_eq!(rec.next_cycle.as_deref(), Some("weekday"));
        assert_eq!(rec.resume, None);
        assert_eq!(rec.extra.get("holdDays"), Some(&json!(0)));
    }

    #[test]
    fn unknown_scheduler_state_is_kept_verbatim() {
        let rec = record(json!({"schedulerState": "watering", "time": ""}));
        assert_eq!(rec.scheduler_state.as_str(), "watering");
        assert_eq!(record(json!({"schedulerState": "between"})).scheduler_state, SchedulerState::Between);
    }

    #[test]
    fn event_data_requires_api_status() {
        let rec = StatusRecord::from_event_data(r#"{"apiStatus":{"hostname":"sp3","time":"07:00:00"}}"#)
            .unwrap();
        assert_eq!(rec.hostname, "sp3");
        let err = StatusRecord::from_event_data(r#"{"status":"ok"}"#).unwrap_err();
        assert_eq!(err.code(), "SPK-2104");
        assert!(StatusRecord::from_event_data("not json").is_err());
    }

    #[test]
    fn current_cycle_scenario() {
        let reg = rendered(record(json!({
            "on": [],
            "schedulerState": "paused",
            "nextCycle": null,
            "currCycle": "C1",
            "time": "14:05:30"
        })));
        assert_eq!(reg.text(ElementId::PanelLine1), "Current cycle: C1");
        assert_eq!(reg.text(ElementId::PanelLine2), "Zone: -");
        assert_eq!(reg.text(ElementId::PanelState), "paused");
        assert_eq!(reg.text(ElementId::PanelTime), "14:05");
        assert!(reg.get(ElementId::PauseGlyph).is_shown());
        assert!(!reg.get(ElementId::PlayGlyph).is_shown());
        assert!(!reg.is_hidden(ElementId::PanelButtons));
    }

    #[test]
    fn current_cycle_beats_next_cycle() {
        let reg = rendered(record(json!({
            "on": ["2"],
            "schedulerState": "running",
            "currCycle": "C1",
            "nextCycle": "C2",
            "startDateTime": "Wed 05:00",
            "time": "05:10:00"
        })));
        assert_eq!(reg.text(ElementId::PanelLine1), "Current cycle: C1");
        assert_eq!(reg.text(ElementId::PanelLine2), "Zone: 2");
        assert!(!reg.text(ElementId::PanelLine1).contains("C2"));
        assert!(!reg.text(ElementId::PanelLine2).contains("Wed"));
    }

    #[test]
    fn stopped_state_is_masked_on_schedule_branch() {
        let base = json!({"schedule": "S1", "on": ["3"], "time": "10:00:00"});
        let mut stopped = base.clone();
        stopped["schedulerState"] = json!("stopped");
        let reg = rendered(record(stopped));
        assert_eq!(reg.text(ElementId::PanelLine1), "Schedule: S1");
        assert_eq!(reg.text(ElementId::PanelLine2), "Zone: 3");
        assert_eq!(reg.text(ElementId::PanelState), "");

        let mut running = base;
        running["schedulerState"] = json!("running");
        let reg = rendered(record(running));
        assert_eq!(reg.text(ElementId::PanelState), "running");
    }

    #[test]
    fn next_cycle_branch_hides_buttons() {
        let reg = rendered(record(json!({
            "schedulerState": "stopped",
            "nextCycle": "weekday",
            "startDateTime": "Tue 06:00",
            "time": "22:15:00"
        })));
        assert_eq!(reg.text(ElementId::PanelLine1), "Next cycle: weekday");
        assert_eq!(reg.text(ElementId::PanelLine2), "Tue 06:00");
        assert_eq!(reg.text(ElementId::PanelState), "");
        assert!(reg.is_hidden(ElementId::PanelButtons));
        assert!(reg.get(ElementId::PlayGlyph).is_shown());
        assert!(!reg.get(ElementId::PauseGlyph).is_shown());
    }

    #[test]
    fn system_off_branch() {
        let reg = rendered(record(json!({"resume": "system off", "time": "09:00:00", "hostname": "sp3"})));
        assert_eq!(reg.text(ElementId::PanelLine1), "System Off");
        assert_eq!(reg.text(ElementId::PanelLine2), "Tap System Hold to resume operation");
        assert_eq!(reg.text(ElementId::SystemTitle), "sp3 Controls");
        assert_eq!(reg.text(ElementId::HeadTitle), "sp3");
    }

    #[test]
    fn unmatched_branch_leaves_lines_alone() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        reg.set_text(ElementId::PanelLine1, "earlier");
        sync.ingest_push(record(json!({"time": "08:30:00"})), &views, &mut reg);
        assert_eq!(reg.text(ElementId::PanelLine1), "earlier");
        assert_eq!(reg.text(ElementId::PanelTime), "08:30");
    }

    #[test]
    fn title_only_rewritten_at_home() {
        let mut sync = StatusSync::new("/status");
        let mut views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        views.push(&mut reg, "zones", None).unwrap();
        sync.ingest_push(record(json!({"hostname": "sp3", "time": "08:30:00"})), &views, &mut reg);
        assert_eq!(reg.text(ElementId::SystemTitle), "Zones");
        assert_eq!(reg.text(ElementId::HeadTitle), "sp3");
    }

    #[test]
    fn repeated_paused_renders_keep_one_glyph() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        let paused = record(json!({"schedulerState": "paused", "time": "08:30:00"}));
        for _ in 0..3 {
            sync.ingest_push(paused.clone(), &views, &mut reg);
            let shown = [ElementId::PauseGlyph, ElementId::PlayGlyph]
                .into_iter()
                .filter(|id| reg.get(*id).is_shown())
                .count();
            assert_eq!(shown, 1);
        }
    }

    #[test]
    fn ensure_pulls_once_then_renders() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();

        assert_eq!(
            sync.ensure_and_render(&views, &mut reg),
            Ensure::Pull(Request::get("/status"))
        );
        assert_eq!(sync.ensure_and_render(&views, &mut reg), Ensure::Pending);
        assert_eq!(reg.text(ElementId::PanelTime), "");

        sync.ingest_pull(record(json!({"time": "11:11:11"})), &views, &mut reg);
        assert!(!sync.pull_in_flight());
        assert_eq!(reg.text(ElementId::PanelTime), "11:11");
        assert_eq!(sync.ensure_and_render(&views, &mut reg), Ensure::Rendered);
    }

    #[test]
    fn invalidate_forces_next_pull() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        sync.ingest_push(record(json!({"time": "11:11:11"})), &views, &mut reg);
        sync.invalidate();
        assert!(sync.record().is_none());
        assert!(matches!(sync.ensure_and_render(&views, &mut reg), Ensure::Pull(_)));
    }

    #[test]
    fn later_record_wins() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        sync.ingest_push(record(json!({"currCycle": "R1", "time": "01:00:00"})), &views, &mut reg);
        sync.ingest_push(record(json!({"currCycle": "R2", "time": "02:00:00"})), &views, &mut reg);
        assert_eq!(reg.text(ElementId::PanelLine1), "Current cycle: R2");
        assert_eq!(sync.record().unwrap().curr_cycle.as_deref(), Some("R2"));
    }

    #[test]
    fn failed_pull_is_projected() {
        let mut sync = StatusSync::new("/status");
        let views = ViewStack::new();
        let mut reg = ElementRegistry::standard();
        let _ = sync.ensure_and_render(&views, &mut reg);
        sync.pull_failed(&TransportError::http(503), &mut reg);
        assert!(!sync.pull_in_flight());
        assert_eq!(reg.text(ElementId::PanelLine1), "STATUS: 503");
        assert_eq!(reg.text(ElementId::PanelLine2), "Service Unavailable");
        assert_eq!(reg.text(ElementId::PanelTime), "");
    }

    #[test]
    fn stream_events_decode() {
        let status = SseEvent {
            event: "message".to_string(),
            data: r#"{"apiStatus":{"time":"10:00:00"}}"#.to_string(),
            id: None,
        };
        assert!(matches!(StreamEvent::from_sse(&status), Some(StreamEvent::Status(_))));

        let stop = SseEvent {
            event: "stop".to_string(),
            data: "{}".to_string(),
            id: None,
        };
        assert_eq!(StreamEvent::from_sse(&stop), Some(StreamEvent::Stop("{}".to_string())));

        let garbage = SseEvent {
            event: "message".to_string(),
            data: "garbage".to_string(),
            id: None,
        };
        assert!(matches!(StreamEvent::from_sse(&garbage), Some(StreamEvent::Error(_))));

        let ping = SseEvent {
            event: "ping".to_string(),
            data: "1".to_string(),
            id: None,
        };
        assert_eq!(StreamEvent::from_sse(&ping), None);
    }
}
