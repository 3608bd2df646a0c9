//! Elm-style state model for the control panel.
//!
//! All panel state lives in [`PanelModel`]. Input, replies and pushed events
//! arrive as [`PanelMsg`] values; side-effects are described by [`PanelCmd`]
//! values returned from [`super::update::update`].
//!
//! The model is deterministic: nothing here performs I/O.

#![allow(missing_docs)]

use std::collections::VecDeque;

use chrono::NaiveDate;

use crate::core::config::Config;
use crate::logger::activity::ActivityEvent;
use crate::transport::{FetchResult, Request};

use super::actions::{Continuation, DisplayButton};
use super::registry::ElementRegistry;
use super::screens::{
    AdjustmentScreen, CycleForm, CyclesScreen, Field, HoldChoice, HoldPane, HoldScreen, LogScreen,
    ScheduleBuilder, SettingsScreen, StatusTable, ZonesScreen,
};
use super::status::{StatusSync, StreamEvent};
use super::views::{ViewId, ViewStack};

// ──────────────────── notices ────────────────────

/// Blocking message shown over the panel until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: Option<String>,
    pub body: String,
}

// ──────────────────── messages ────────────────────

/// Text-field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    Backspace,
    Clear,
}

/// Everything that can happen to the panel.
#[derive(Debug, Clone)]
pub enum PanelMsg {
    /// First message after startup: pull status and open the event stream.
    Start,
    /// Periodic tick carrying the local date (used for hold labels).
    Tick { today: NaiveDate },
    /// Push a view by id.
    Navigate(String),
    /// Activate entry `n` of the home menu.
    Menu(usize),
    Back,
    /// The header's right button.
    RightAction,
    Display(DisplayButton),
    /// `Some(n)` turns zone `n` on, `None` turns all zones off.
    Zone(Option<u8>),
    ScheduleToggle(u8),
    ScheduleClear,
    ScheduleMinuteCursor(isize),
    ScheduleMinutes(u16),
    SchedulePost { append: bool },
    /// Re-read the status path into the schedule status table.
    ScheduleRefresh,
    CycleCursor(isize),
    CycleRun,
    CycleEdit { copy: bool },
    CycleDelete,
    CycleNextType,
    CycleDay(u8),
    CycleAddRow,
    CycleRemoveRow,
    CycleSubmit,
    Hold(HoldChoice),
    AdjustmentSubmit,
    LogScroll(isize),
    Edit(EditOp),
    FocusNext,
    Unfocus,
    DismissNotice,
    /// A request finished.
    Response {
        request: Request,
        then: Continuation,
        result: FetchResult,
    },
    Stream(StreamEvent),
    Quit,
}

// ──────────────────── commands ────────────────────

/// Side-effects for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCmd {
    None,
    /// Issue `request`; its reply comes back as [`PanelMsg::Response`].
    Request {
        request: Request,
        then: Continuation,
    },
    /// Open the event stream at `path`.
    Subscribe { path: String },
    /// Close the event stream for good.
    CloseStream,
    Log(ActivityEvent),
    Batch(Vec<Self>),
    Quit,
}

impl PanelCmd {
    pub fn request(request: Request, then: Continuation) -> Self {
        Self::Request { request, then }
    }

    /// Batch `cmds`, dropping `None`s and collapsing trivial batches.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| *c != Self::None).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Depth-first list of the non-batch commands.
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

// ──────────────────── model ────────────────────

/// Complete panel state.
#[derive(Debug, Clone)]
pub struct PanelModel {
    pub registry: ElementRegistry,
    pub views: ViewStack,
    pub status: StatusSync,
    pub zones: ZonesScreen,
    pub schedule: ScheduleBuilder,
    pub cycles: CyclesScreen,
    pub cycle_form: CycleForm,
    pub hold: HoldScreen,
    pub adjustment: AdjustmentScreen,
    pub log: LogScreen,
    pub settings: SettingsScreen,
    pub status_table: StatusTable,
    pub notices: VecDeque<Notice>,
    pub notice_limit: usize,
    /// Text field receiving typed input.
    pub focus: Option<Field>,
    pub today: NaiveDate,
    pub pull_on_start: bool,
    pub events_path: String,
    /// The event stream was opened and has not been closed.
    pub stream_open: bool,
    pub quit: bool,
}

impl PanelModel {
    pub fn new(config: &Config, today: NaiveDate) -> Self {
        Self {
            registry: ElementRegistry::standard(),
            views: ViewStack::new(),
            status: StatusSync::new(config.controller.status_path.clone()),
            zones: ZonesScreen::default(),
            schedule: ScheduleBuilder::default(),
            cycles: CyclesScreen::default(),
            cycle_form: CycleForm::default(),
            hold: HoldScreen::default(),
            adjustment: AdjustmentScreen::default(),
            log: LogScreen::default(),
            settings: SettingsScreen::default(),
            status_table: StatusTable::default(),
            notices: VecDeque::new(),
            notice_limit: config.panel.notice_limit.max(1),
            focus: None,
            today,
            pull_on_start: config.panel.pull_on_start,
            events_path: config.controller.events_path.clone(),
            stream_open: false,
            quit: false,
        }
    }

    pub fn top(&self) -> ViewId {
        self.views.top()
    }

    /// Queue a notice, evicting the oldest when full.
    pub fn push_notice(&mut self, title: Option<&str>, body: impl Into<String>) {
        while self.notices.len() >= self.notice_limit {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            title: title.map(str::to_string),
            body: body.into(),
        });
    }

    /// Oldest undismissed notice.
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    /// Text fields editable on the visible view, in tab order.
    pub fn editable_fields(&self) -> Vec<Field> {
        match self.top() {
            ViewId::Schedule => vec![Field::ScheduleDraft],
            ViewId::CycleEdit => self.cycle_form.fields(),
            ViewId::SeasonalAdjustment => vec![Field::Adjustment],
            ViewId::SystemHold if self.hold.pane == HoldPane::Custom => {
                vec![Field::HoldCustomDays]
            }
            _ => Vec::new(),
        }
    }

    pub fn field_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::ScheduleDraft => Some(&mut self.schedule.draft),
            Field::HoldCustomDays => Some(&mut self.hold.custom_days),
            Field::Adjustment => Some(&mut self.adjustment.value),
            other => self.cycle_form.field_mut(other),
        }
    }

    pub fn field_text(&self, field: Field) -> &str {
        match field {
            Field::ScheduleDraft => &self.schedule.draft,
            Field::HoldCustomDays => &self.hold.custom_days,
            Field::Adjustment => &self.adjustment.value,
            Field::CycleName => &self.cycle_form.name,
            Field::CycleHour => &self.cycle_form.hour,
            Field::CycleMin => &self.cycle_form.min,
            Field::CycleFirst => &self.cycle_form.first,
            Field::CycleCount => &self.cycle_form.count,
            Field::RowZones(i) => self.cycle_form.rows.get(i).map_or("", |r| r.zones.as_str()),
            Field::RowRunTime(i) => self.cycle_form.rows.get(i).map_or("", |r| r.run_time.as_str()),
        }
    }
}
