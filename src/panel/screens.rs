//! Per-view state for the panels behind the home menu.
//!
//! Each screen is plain data plus the requests its buttons produce. Replies
//! are applied by `update` through the matching `apply_*`/`fill_*` method.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Value, json};

use crate::core::helpers::{display_value, hold_day_labels};
use crate::transport::{Body, Request};

/// Zone buttons on the controller: 1..=8.
pub const ZONE_COUNT: u8 = 8;

/// Minute buttons of the schedule builder.
pub const MINUTE_CHOICES: [u16; 7] = [5, 10, 15, 20, 30, 45, 60];

pub const NO_ZONE_SELECTED: &str = "Select a Zone first, then press a Minutes button.";
pub const NO_CYCLE_TYPE: &str = "Select a cycle type";
pub const NO_CYCLES: &str = "No cycles found";
pub const LOG_LOADING: &str = "Retrieving log...";
pub const LOG_EMPTY: &str = "(log empty)";
pub const HOLD_RESUMED: &str = "Normal system operation resumed.";

const LOG_MISSING_MSG: &str = "file '/log.dat' not found";

static ZONES_INPUT: OnceLock<Option<Regex>> = OnceLock::new();
static DIGITS_INPUT: OnceLock<Option<Regex>> = OnceLock::new();

fn accepts(cell: &OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_none_or(|re| re.is_match(text))
}

/// JS `parseInt`: leading digits, `None` when there are none.
fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

// ──────────────────── zones ────────────────────

/// Direct zone control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZonesScreen {
    /// Zones shown as running.
    pub active: BTreeSet<u8>,
}

impl ZonesScreen {
    /// Mark the zones listed in a status reply as running.
    pub fn mark_active(&mut self, status: &Value) {
        self.active.clear();
        if let Some(on) = status.get("on").and_then(Value::as_array) {
            self.active.extend(
                on.iter()
                    .filter_map(|z| parse_leading_int(&display_value(z)))
                    .filter_map(|z| u8::try_from(z).ok()),
            );
        }
    }

    /// `Some(n)` turns zone `n` on, `None` turns every zone off.
    pub fn request(zone: Option<u8>) -> Request {
        match zone {
            Some(n) => Request::get(format!("/zone/{n}/on")),
            None => Request::get("/zone/all/off"),
        }
    }

    pub fn apply(&mut self, zone: Option<u8>) {
        match zone {
            Some(n) => {
                self.active.insert(n);
            }
            None => self.active.clear(),
        }
    }
}

// ──────────────────── schedule builder ────────────────────

/// Zone + minutes quick scheduling, plus a free-form list of schedule items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleBuilder {
    pub selected: BTreeSet<u8>,
    /// Index into [`MINUTE_CHOICES`].
    pub minute_cursor: usize,
    /// Comma-separated schedule items, e.g. `[[3],10],[[2,6],5]`.
    pub draft: String,
    /// Last `/status` or schedule post reply, shown under the builder.
    pub status_area: StatusTable,
}

impl ScheduleBuilder {
    pub fn toggle(&mut self, zone: u8) {
        if !self.selected.remove(&zone) {
            self.selected.insert(zone);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn minutes(&self) -> u16 {
        MINUTE_CHOICES[self.minute_cursor.min(MINUTE_CHOICES.len() - 1)]
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let max = MINUTE_CHOICES.len() - 1;
        self.minute_cursor = self.minute_cursor.saturating_add_signed(delta).min(max);
    }

    /// Request for the selected zones at `minutes`; clears the selection.
    pub fn take_minutes_request(&mut self, minutes: u16) -> Result<Request, &'static str> {
        if self.selected.is_empty() {
            return Err(NO_ZONE_SELECTED);
        }
        let zones: Vec<String> = self.selected.iter().map(u8::to_string).collect();
        self.selected.clear();
        Ok(Request::get(format!("/schd/{}/{minutes}", zones.join(","))))
    }

    /// POST `/schd/set` or `/schd/append` with the drafted items.
    pub fn post_request(&self, append: bool) -> Result<Request, String> {
        let items: Value = serde_json::from_str(&format!("[{}]", self.draft))
            .map_err(|e| format!("Schedule items are not valid: {e}"))?;
        let path = if append { "/schd/append" } else { "/schd/set" };
        Ok(Request::post(path, json!({ "schedule": items })))
    }

    /// Status word shown after a set/append reply.
    pub fn post_outcome(body: &Body, append: bool) -> &'static str {
        match body.status_field() {
            Some("ok") if append => "Schedule appended",
            Some("ok") => "Schedule started",
            _ => "Error",
        }
    }
}

// ──────────────────── cycles ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclesScreen {
    pub names: Vec<String>,
    pub cursor: usize,
    pub loaded: bool,
}

impl CyclesScreen {
    pub fn list_request() -> Request {
        Request::get("/cycles.json")
    }

    /// Fill from `{cycles: [{name}, ...]}`.
    pub fn fill(&mut self, body: &Body) {
        self.names = body
            .as_json()
            .and_then(|v| v.get("cycles"))
            .and_then(Value::as_array)
            .map(|cycles| {
                cycles
                    .iter()
                    .filter_map(|c| c.get("name"))
                    .map(display_value)
                    .collect()
            })
            .unwrap_or_default();
        self.cursor = self.cursor.min(self.names.len().saturating_sub(1));
        self.loaded = true;
    }

    pub fn selected(&self) -> Option<&str> {
        self.names.get(self.cursor).map(String::as_str)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let max = self.names.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(max);
    }

    pub fn run_request(name: &str) -> Request {
        Request::get(format!("/cycle/{}/run", urlencoding::encode(name)))
    }

    pub fn fetch_request(name: &str) -> Request {
        Request::get(format!("/cycle/{}", urlencoding::encode(name)))
    }

    pub fn delete_request(name: &str) -> Request {
        Request::delete("/cycle", json!({ "name": name }))
    }
}

// ──────────────────── cycle form ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleType {
    SpecificDays,
    Every2ndDay,
    Every3rdDay,
    Off,
}

impl CycleType {
    pub const ALL: [Self; 4] = [
        Self::SpecificDays,
        Self::Every2ndDay,
        Self::Every3rdDay,
        Self::Off,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpecificDays => "specificDays",
            Self::Every2ndDay => "every2ndDay",
            Self::Every3rdDay => "every3rdDay",
            Self::Off => "off",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    /// Next type in the selector, starting from none.
    pub fn cycle(current: Option<Self>) -> Self {
        match current {
            None | Some(Self::Off) => Self::SpecificDays,
            Some(Self::SpecificDays) => Self::Every2ndDay,
            Some(Self::Every2ndDay) => Self::Every3rdDay,
            Some(Self::Every3rdDay) => Self::Off,
        }
    }
}

/// One `zones` / `runTime` pair of the cycle schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleRow {
    pub zones: String,
    pub run_time: String,
}

/// Text fields that accept typed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ScheduleDraft,
    HoldCustomDays,
    Adjustment,
    CycleName,
    CycleHour,
    CycleMin,
    CycleFirst,
    CycleCount,
    RowZones(usize),
    RowRunTime(usize),
}

impl Field {
    pub fn label(self) -> String {
        match self {
            Self::ScheduleDraft => "items".to_string(),
            Self::HoldCustomDays => "days".to_string(),
            Self::Adjustment => "adjustment".to_string(),
            Self::CycleName => "name".to_string(),
            Self::CycleHour => "hour".to_string(),
            Self::CycleMin => "min".to_string(),
            Self::CycleFirst => "first".to_string(),
            Self::CycleCount => "count".to_string(),
            Self::RowZones(i) => format!("zones #{}", i + 1),
            Self::RowRunTime(i) => format!("runTime #{}", i + 1),
        }
    }
}

/// Add / edit form for a watering cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleForm {
    pub name: String,
    pub cycle_type: Option<CycleType>,
    /// 0 = Sunday.
    pub days: BTreeSet<u8>,
    pub hour: String,
    pub min: String,
    pub first: String,
    pub count: String,
    /// Always ends with an empty row waiting for input.
    pub rows: Vec<ScheduleRow>,
}

impl Default for CycleForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            cycle_type: None,
            days: BTreeSet::new(),
            hour: String::new(),
            min: String::new(),
            first: String::new(),
            count: String::new(),
            rows: vec![ScheduleRow::default()],
        }
    }
}

impl CycleForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fill from a `/cycle/{name}` reply.
    pub fn fill(&mut self, cycle: &Value) {
        self.clear();
        let text = |key: &str| cycle.get(key).map(display_value).unwrap_or_default();
        self.name = text("name");
        self.hour = text("hour");
        self.min = text("min");
        self.first = text("first");
        self.count = text("count");
        self.cycle_type = cycle
            .get("type")
            .and_then(Value::as_str)
            .and_then(CycleType::parse);
        if let Some(days) = cycle.get("days").and_then(Value::as_array) {
            self.days = days
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|d| u8::try_from(d).ok())
                .filter(|d| *d < 7)
                .collect();
        }
        if let Some(items) = cycle.get("schedule").and_then(Value::as_array) {
            let mut rows: Vec<ScheduleRow> = items
                .iter()
                .map(|item| ScheduleRow {
                    zones: item.get(0).map(display_value).unwrap_or_default(),
                    run_time: item.get(1).map(display_value).unwrap_or_default(),
                })
                .collect();
            rows.push(ScheduleRow::default());
            self.rows = rows;
        }
    }

    pub fn toggle_day(&mut self, day: u8) {
        if day < 7 && !self.days.remove(&day) {
            self.days.insert(day);
        }
    }

    /// Fill the trailing empty row slot: appends a fresh empty row.
    pub fn add_row(&mut self) {
        self.rows.push(ScheduleRow::default());
    }

    /// Remove row `index`, keeping at least one row.
    pub fn remove_row(&mut self, index: usize) {
        if index < self.rows.len() {
            self.rows.remove(index);
        }
        if self.rows.is_empty() {
            self.rows.push(ScheduleRow::default());
        }
    }

    /// Tab order of the form's text fields.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::CycleName,
            Field::CycleHour,
            Field::CycleMin,
            Field::CycleFirst,
            Field::CycleCount,
        ];
        for i in 0..self.rows.len() {
            fields.push(Field::RowZones(i));
            fields.push(Field::RowRunTime(i));
        }
        fields
    }

    pub fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::CycleName => Some(&mut self.name),
            Field::CycleHour => Some(&mut self.hour),
            Field::CycleMin => Some(&mut self.min),
            Field::CycleFirst => Some(&mut self.first),
            Field::CycleCount => Some(&mut self.count),
            Field::RowZones(i) => self.rows.get_mut(i).map(|r| &mut r.zones),
            Field::RowRunTime(i) => self.rows.get_mut(i).map(|r| &mut r.run_time),
            _ => None,
        }
    }

    /// Payload for POST `/cycle`.
    pub fn payload(&self) -> Result<Value, &'static str> {
        let cycle_type = self.cycle_type.ok_or(NO_CYCLE_TYPE)?;
        let or_default = |text: &str, default: i64| {
            parse_leading_int(text).filter(|n| *n != 0).unwrap_or(default)
        };

        let schedule: Vec<Value> = self
            .rows
            .iter()
            .filter_map(|row| {
                let pieces: Vec<Option<i64>> = row.zones.split(',').map(parse_leading_int).collect();
                pieces.first().copied().flatten()?;
                let zones: Vec<Value> = pieces.into_iter().map(|z| json!(z)).collect();
                Some(json!([zones, parse_leading_int(&row.run_time)]))
            })
            .collect();

        Ok(json!({
            "name": self.name,
            "type": cycle_type.as_str(),
            "days": self.days.iter().collect::<Vec<_>>(),
            "hour": or_default(&self.hour, 0),
            "min": or_default(&self.min, 0),
            "first": or_default(&self.first, 1),
            "count": or_default(&self.count, 1),
            "schedule": schedule,
        }))
    }

    pub fn save_request(&self) -> Result<Request, &'static str> {
        Ok(Request::post("/cycle", self.payload()?))
    }
}

/// Whether `text` is an acceptable value for `field`.
pub fn field_accepts(field: Field, text: &str) -> bool {
    match field {
        Field::RowZones(_) => accepts(&ZONES_INPUT, r"^[0-9,]*$", text),
        Field::CycleHour
        | Field::CycleMin
        | Field::CycleFirst
        | Field::CycleCount
        | Field::RowRunTime(_)
        | Field::HoldCustomDays => accepts(&DIGITS_INPUT, r"^\d*$", text),
        Field::ScheduleDraft | Field::Adjustment | Field::CycleName => true,
    }
}

// ──────────────────── system hold ────────────────────

/// Which part of the hold view is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HoldPane {
    #[default]
    Loading,
    /// Quick day buttons, `Custom`, `Turn Off`.
    Start { labels: Vec<String> },
    Custom,
    /// The system is off; offer to turn it back on.
    TurnOn,
    /// A hold is active until `resume`.
    Cancel { resume: String },
    Resumed,
}

/// A button in the hold view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldChoice {
    /// Hold for 1..=6 days.
    Days(u8),
    Custom,
    SubmitCustom,
    TurnOff,
    /// Turn on, or cancel the active hold.
    Resume,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldScreen {
    pub pane: HoldPane,
    pub custom_days: String,
}

impl HoldScreen {
    pub fn load_request() -> Request {
        Request::get("/hold")
    }

    /// Pick the sub-view from `{holdDays, resume}`.
    pub fn fill(&mut self, reply: &Value, today: NaiveDate) {
        let hold_days = reply.get("holdDays").and_then(Value::as_i64).unwrap_or(0);
        self.pane = match hold_days {
            0 => {
                self.custom_days.clear();
                HoldPane::Start {
                    labels: hold_day_labels(today, 6),
                }
            }
            -1 => HoldPane::TurnOn,
            _ => HoldPane::Cancel {
                resume: reply.get("resume").map(display_value).unwrap_or_default(),
            },
        };
    }

    /// Request for `choice`, or `None` when it only switches the pane.
    pub fn choose(&mut self, choice: HoldChoice) -> Option<Request> {
        match choice {
            HoldChoice::Days(n) => Some(Request::get(format!("/hold/{n}"))),
            HoldChoice::Custom => {
                self.pane = HoldPane::Custom;
                None
            }
            HoldChoice::SubmitCustom => Some(Request::get(format!("/hold/{}", self.custom_days))),
            HoldChoice::TurnOff => Some(Request::get("/hold/-1")),
            HoldChoice::Resume => Some(Request::get("/hold/0")),
        }
    }

    /// Reply to `/hold/{n}`: the hold is now active.
    pub fn apply_set(&mut self, reply: &Body) {
        let resume = reply
            .as_json()
            .and_then(|v| v.get("resume"))
            .map(display_value)
            .unwrap_or_default();
        self.pane = HoldPane::Cancel { resume };
    }
}

// ──────────────────── log / settings / adjustment / status ────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScreen {
    pub text: String,
    /// First visible line.
    pub scroll: usize,
}

impl LogScreen {
    pub fn request() -> Request {
        Request::get("/log/show")
    }

    pub fn loading(&mut self) {
        self.text = LOG_LOADING.to_string();
        self.scroll = 0;
    }

    /// Apply a `/log/show` reply. Returns whether the log text changed.
    pub fn fill(&mut self, body: &Body) -> bool {
        match body {
            Body::Text(text) => self.text.clone_from(text),
            Body::Json(Value::Object(obj)) if obj.contains_key("status") => {
                if obj.get("status").and_then(Value::as_str) != Some("error") {
                    return false;
                }
                let msg = obj.get("msg").map(display_value).unwrap_or_default();
                self.text = if msg == LOG_MISSING_MSG {
                    LOG_EMPTY.to_string()
                } else {
                    msg
                };
                return true;
            }
            Body::Json(value) => self.text = display_value(value),
        }
        self.scroll_to_bottom();
        true
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.line_count().saturating_sub(1);
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsScreen {
    pub logic: String,
    pub output_enable: String,
}

impl SettingsScreen {
    pub fn requests() -> [Request; 2] {
        [Request::get("/logic"), Request::get("/oe")]
    }

    pub fn restart_request() -> Request {
        Request::get("/restart")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentScreen {
    pub value: String,
}

impl AdjustmentScreen {
    pub fn load_request() -> Request {
        Request::get("/adj")
    }

    pub fn submit_request(&self) -> Request {
        Request::get(format!("/adj/{}", self.value.trim()))
    }
}

/// Key / value rows of a JSON object reply, in reply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    pub rows: Vec<(String, String)>,
}

impl StatusTable {
    pub fn from_body(body: &Body) -> Self {
        let rows = match body.as_json() {
            Some(Value::Object(obj)) => obj
                .iter()
                .map(|(k, v)| (k.clone(), display_value(v)))
                .collect(),
            _ => Vec::new(),
        };
        Self { rows }
    }

    /// One aligned `key  value` line per row.
    pub fn to_lines(&self) -> Vec<String> {
        self.rows.iter().map(|(k, v)| format!("{k:<16} {v}")).collect()
    }
}
