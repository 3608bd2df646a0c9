//! Pure update function for the Elm-style panel.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//! This module performs zero I/O.

#![allow(clippy::too_many_lines)]

use serde_json::Value;

use crate::core::helpers::display_value;
use crate::logger::activity::{ActivityEvent, StatusSource};
use crate::transport::{Body, Request, TransportError};

use super::actions::{Continuation, Outcome, classify, display_request};
use super::model::{EditOp, PanelCmd, PanelModel, PanelMsg};
use super::registry::ElementId;
use super::screens::{
    AdjustmentScreen, CyclesScreen, Field, HOLD_RESUMED, HoldChoice, HoldPane, HoldScreen,
    LogScreen, ScheduleBuilder, SettingsScreen, StatusTable, ZonesScreen, field_accepts,
};
use super::status::{Ensure, StatusRecord, StreamEvent, project_transport_failure};
use super::views::{MAIN_MENU, ViewAction, ViewId, menu_view_name};

/// Notice shown once the controller ends the event stream.
pub const STREAM_CLOSED_NOTICE: &str = "EventSource closed";
/// Title of the notice confirming a restart request.
pub const RESTART_TITLE: &str = "Restart Controller";

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut PanelModel, msg: PanelMsg) -> PanelCmd {
    match msg {
        PanelMsg::Start => {
            let pull = if model.pull_on_start {
                ensure_status(model)
            } else {
                PanelCmd::None
            };
            model.stream_open = true;
            PanelCmd::batch(vec![
                pull,
                PanelCmd::Subscribe {
                    path: model.events_path.clone(),
                },
            ])
        }

        PanelMsg::Tick { today } => {
            model.today = today;
            PanelCmd::None
        }

        PanelMsg::Navigate(name) => navigate(model, &name, None),

        PanelMsg::Menu(index) => open_menu_entry(model, index),

        PanelMsg::Back => go_back(model),

        PanelMsg::RightAction => right_action(model),

        PanelMsg::Display(button) => {
            let state = model.registry.text(ElementId::PanelState).to_string();
            PanelCmd::request(display_request(button, &state), Continuation::DisplayControl)
        }

        PanelMsg::Zone(zone) => {
            PanelCmd::request(ZonesScreen::request(zone), Continuation::ZoneChanged { zone })
        }

        PanelMsg::ScheduleToggle(zone) => {
            model.schedule.toggle(zone);
            PanelCmd::None
        }

        PanelMsg::ScheduleClear => {
            model.schedule.clear();
            PanelCmd::None
        }

        PanelMsg::ScheduleMinuteCursor(delta) => {
            model.schedule.move_cursor(delta);
            PanelCmd::None
        }

        PanelMsg::ScheduleMinutes(minutes) => match model.schedule.take_minutes_request(minutes) {
            Ok(request) => PanelCmd::request(request, Continuation::ScheduleQueued),
            Err(notice) => {
                model.push_notice(None, notice);
                PanelCmd::None
            }
        },

        PanelMsg::ScheduleRefresh => PanelCmd::request(
            Request::get(model.status.status_path().to_string()),
            Continuation::ScheduleStatusArea,
        ),

        PanelMsg::SchedulePost { append } => match model.schedule.post_request(append) {
            Ok(request) => {
                PanelCmd::request(request, Continuation::SchedulePosted { append })
            }
            Err(notice) => {
                model.push_notice(None, notice);
                PanelCmd::None
            }
        },

        PanelMsg::CycleCursor(delta) => {
            model.cycles.move_cursor(delta);
            PanelCmd::None
        }

        PanelMsg::CycleRun => model.cycles.selected().map_or(PanelCmd::None, |name| {
            PanelCmd::request(CyclesScreen::run_request(name), Continuation::CycleRan)
        }),

        PanelMsg::CycleEdit { copy } => {
            model.cycles.selected().map_or(PanelCmd::None, |name| {
                PanelCmd::request(
                    CyclesScreen::fetch_request(name),
                    Continuation::CycleLoaded {
                        name: name.to_string(),
                        copy,
                    },
                )
            })
        }

        PanelMsg::CycleDelete => model.cycles.selected().map_or(PanelCmd::None, |name| {
            PanelCmd::request(CyclesScreen::delete_request(name), Continuation::CycleDeleted)
        }),

        PanelMsg::CycleNextType => {
            model.cycle_form.cycle_type =
                Some(super::screens::CycleType::cycle(model.cycle_form.cycle_type));
            PanelCmd::None
        }

        PanelMsg::CycleDay(day) => {
            model.cycle_form.toggle_day(day);
            PanelCmd::None
        }

        PanelMsg::CycleAddRow => {
            model.cycle_form.add_row();
            PanelCmd::None
        }

        PanelMsg::CycleRemoveRow => {
            let row = match model.focus {
                Some(Field::RowZones(i) | Field::RowRunTime(i)) => i,
                _ => model.cycle_form.rows.len().saturating_sub(1),
            };
            model.cycle_form.remove_row(row);
            model.focus = None;
            PanelCmd::None
        }

        PanelMsg::CycleSubmit => match model.cycle_form.save_request() {
            Ok(request) => PanelCmd::request(request, Continuation::CycleSaved),
            Err(notice) => {
                model.push_notice(None, notice);
                PanelCmd::None
            }
        },

        PanelMsg::Hold(choice) => {
            let Some(request) = model.hold.choose(choice) else {
                model.focus = (model.hold.pane == HoldPane::Custom).then_some(Field::HoldCustomDays);
                return PanelCmd::None;
            };
            let then = match choice {
                HoldChoice::TurnOff => Continuation::HoldTurnedOff,
                HoldChoice::Resume => Continuation::HoldResumed,
                HoldChoice::Days(_) | HoldChoice::Custom | HoldChoice::SubmitCustom => {
                    Continuation::HoldSet
                }
            };
            PanelCmd::request(request, then)
        }

        PanelMsg::AdjustmentSubmit => {
            PanelCmd::request(model.adjustment.submit_request(), Continuation::AdjustmentSet)
        }

        PanelMsg::LogScroll(delta) => {
            model.log.scroll_by(delta);
            PanelCmd::None
        }

        PanelMsg::Edit(op) => {
            apply_edit(model, op);
            PanelCmd::None
        }

        PanelMsg::FocusNext => {
            let fields = model.editable_fields();
            model.focus = match model.focus.and_then(|f| fields.iter().position(|x| *x == f)) {
                Some(i) => fields.get(i + 1).or_else(|| fields.first()).copied(),
                None => fields.first().copied(),
            };
            PanelCmd::None
        }

        PanelMsg::Unfocus => {
            model.focus = None;
            PanelCmd::None
        }

        PanelMsg::DismissNotice => {
            model.notices.pop_front();
            PanelCmd::None
        }

        PanelMsg::Response {
            request,
            then,
            result,
        } => handle_response(model, &request, then, result),

        PanelMsg::Stream(event) => handle_stream(model, event),

        PanelMsg::Quit => {
            model.quit = true;
            let close = if model.stream_open {
                model.stream_open = false;
                PanelCmd::CloseStream
            } else {
                PanelCmd::None
            };
            PanelCmd::batch(vec![close, PanelCmd::Quit])
        }
    }
}

// ──────────────────── navigation ────────────────────

fn navigate(model: &mut PanelModel, name: &str, title: Option<&str>) -> PanelCmd {
    match model.views.push(&mut model.registry, name, title) {
        Ok(view) => {
            model.focus = None;
            PanelCmd::Log(navigated(model, view))
        }
        Err(_) => PanelCmd::Log(ActivityEvent::UnknownView {
            view: name.to_string(),
        }),
    }
}

fn navigated(model: &PanelModel, view: ViewId) -> ActivityEvent {
    ActivityEvent::Navigated {
        view: view.as_str().to_string(),
        title: model.registry.text(ElementId::SystemTitle).to_string(),
        depth: model.views.len(),
    }
}

/// Pop one view; back at home the status is rendered (pulling if needed).
fn go_back(model: &mut PanelModel) -> PanelCmd {
    if !model.views.pop(&mut model.registry) {
        return PanelCmd::None;
    }
    model.focus = None;
    let log = PanelCmd::Log(navigated(model, model.views.top()));
    let ensure = if model.views.at_home() {
        ensure_status(model)
    } else {
        PanelCmd::None
    };
    PanelCmd::batch(vec![log, ensure])
}

fn ensure_status(model: &mut PanelModel) -> PanelCmd {
    match model.status.ensure_and_render(&model.views, &mut model.registry) {
        Ensure::Rendered | Ensure::Pending => PanelCmd::None,
        Ensure::Pull(request) => PanelCmd::batch(vec![
            PanelCmd::Log(ActivityEvent::StatusPull {
                path: request.path.clone(),
            }),
            PanelCmd::request(request, Continuation::IngestStatus),
        ]),
    }
}

fn open_menu_entry(model: &mut PanelModel, index: usize) -> PanelCmd {
    if !model.views.at_home() {
        return PanelCmd::None;
    }
    let Some(label) = MAIN_MENU.get(index) else {
        return PanelCmd::None;
    };
    let name = menu_view_name(label);
    let Some(view) = ViewId::from_name(&name) else {
        return PanelCmd::Log(ActivityEvent::UnknownView { view: name });
    };
    match view {
        ViewId::Zones => PanelCmd::request(
            Request::get(model.status.status_path().to_string()),
            Continuation::OpenZones,
        ),
        ViewId::Schedule => {
            model.registry.set_text(ElementId::ScheduleStatus, "");
            navigate(model, &name, None)
        }
        ViewId::Cycles => PanelCmd::batch(vec![
            PanelCmd::request(CyclesScreen::list_request(), Continuation::CyclesLoaded),
            navigate(model, &name, None),
        ]),
        ViewId::Status => PanelCmd::batch(vec![
            navigate(model, &name, None),
            PanelCmd::request(
                Request::get(model.status.status_path().to_string()),
                Continuation::StatusTable,
            ),
        ]),
        ViewId::SystemSettings => {
            let [logic, oe] = SettingsScreen::requests();
            PanelCmd::batch(vec![
                navigate(model, &name, None),
                PanelCmd::request(logic, Continuation::LogicLoaded),
                PanelCmd::request(oe, Continuation::OutputEnableLoaded),
            ])
        }
        ViewId::Log => {
            model.log.loading();
            model.registry.set_text(ElementId::LogContents, model.log.text.clone());
            PanelCmd::batch(vec![
                navigate(model, &name, None),
                PanelCmd::request(LogScreen::request(), Continuation::LogLoaded),
            ])
        }
        ViewId::SeasonalAdjustment => PanelCmd::batch(vec![
            navigate(model, &name, None),
            PanelCmd::request(AdjustmentScreen::load_request(), Continuation::AdjustmentLoaded),
        ]),
        ViewId::SystemHold => {
            PanelCmd::request(HoldScreen::load_request(), Continuation::HoldLoaded)
        }
        ViewId::Main | ViewId::CycleEdit => navigate(model, &name, None),
    }
}

fn right_action(model: &mut PanelModel) -> PanelCmd {
    let button = model.registry.get(ElementId::RightButton);
    let action = if button.hidden { None } else { button.action };
    match action {
        None => PanelCmd::None,
        Some(ViewAction::AddCycle) => {
            model.cycle_form.clear();
            navigate(model, ViewId::CycleEdit.as_str(), Some("Add Cycle"))
        }
        Some(ViewAction::RefreshStatus) => PanelCmd::request(
            Request::get(model.status.status_path().to_string()),
            Continuation::StatusTable,
        ),
        Some(ViewAction::RestartController) => {
            PanelCmd::request(SettingsScreen::restart_request(), Continuation::Restarted)
        }
        Some(ViewAction::ScrollLogBottom) => {
            model.log.scroll_to_bottom();
            PanelCmd::None
        }
    }
}

fn apply_edit(model: &mut PanelModel, op: EditOp) {
    let Some(field) = model.focus else {
        return;
    };
    let Some(text) = model.field_mut(field) else {
        return;
    };
    let mut candidate = text.clone();
    match op {
        EditOp::Insert(c) => candidate.push(c),
        EditOp::Backspace => {
            candidate.pop();
        }
        EditOp::Clear => candidate.clear(),
    }
    if field_accepts(field, &candidate) {
        *text = candidate;
    }
}

// ──────────────────── replies ────────────────────

fn handle_response(
    model: &mut PanelModel,
    request: &Request,
    then: Continuation,
    result: crate::transport::FetchResult,
) -> PanelCmd {
    match classify(&then, result) {
        Outcome::Failed(err) => {
            if then == Continuation::IngestStatus {
                model.status.pull_failed(&err, &mut model.registry);
            } else {
                project_transport_failure(&mut model.registry, &err);
            }
            PanelCmd::Log(transport_failed(request, &err))
        }
        Outcome::Rejected(msg) => {
            model.push_notice(None, msg.clone());
            PanelCmd::Log(ActivityEvent::ActionRejected {
                path: request.path.clone(),
                msg,
            })
        }
        Outcome::Accepted(body) => apply_accepted(model, request, then, &body),
    }
}

fn transport_failed(request: &Request, err: &TransportError) -> ActivityEvent {
    ActivityEvent::TransportFailed {
        path: request.path.clone(),
        code: err.code,
        text: err.text.clone(),
    }
}

fn field_text(body: &Body, key: &str) -> Option<String> {
    body.as_json()?.get(key).map(display_value)
}

fn apply_accepted(
    model: &mut PanelModel,
    request: &Request,
    then: Continuation,
    body: &Body,
) -> PanelCmd {
    match then {
        Continuation::IngestStatus => {
            let decoded = body
                .as_json()
                .cloned()
                .ok_or_else(|| "status reply is not JSON".to_string())
                .and_then(|v| StatusRecord::from_value(v).map_err(|e| e.to_string()));
            match decoded {
                Ok(record) => {
                    let hostname = record.hostname.clone();
                    model.status.ingest_pull(record, &model.views, &mut model.registry);
                    PanelCmd::Log(ActivityEvent::StatusIngested {
                        source: StatusSource::Pull,
                        hostname,
                    })
                }
                Err(text) => {
                    model.status.pull_abandoned();
                    PanelCmd::Log(transport_failed(request, &TransportError::unreachable(text)))
                }
            }
        }

        Continuation::OpenZones => {
            if let Some(status) = body.as_json() {
                model.zones.mark_active(status);
            }
            navigate(model, ViewId::Zones.as_str(), None)
        }

        Continuation::ZoneChanged { zone } => {
            model.zones.apply(zone);
            model.registry.set_text(ElementId::ZonesStatus, body.compact());
            PanelCmd::None
        }

        Continuation::ScheduleQueued => {
            model.registry.set_text(ElementId::ScheduleStatus, body.compact());
            PanelCmd::None
        }

        Continuation::SchedulePosted { append } => {
            model.schedule.status_area = StatusTable::from_body(body);
            model.registry.set_text(
                ElementId::ScheduleStatus,
                ScheduleBuilder::post_outcome(body, append),
            );
            PanelCmd::None
        }

        Continuation::DisplayControl | Continuation::CycleRan => PanelCmd::None,

        Continuation::StatusTable => {
            model.status_table = StatusTable::from_body(body);
            PanelCmd::None
        }

        Continuation::ScheduleStatusArea => {
            model.schedule.status_area = StatusTable::from_body(body);
            PanelCmd::None
        }

        Continuation::CyclesLoaded => {
            model.cycles.fill(body);
            PanelCmd::None
        }

        Continuation::CycleDeleted => {
            PanelCmd::request(CyclesScreen::list_request(), Continuation::CyclesLoaded)
        }

        Continuation::CycleLoaded { name, copy } => {
            let Some(cycle) = body.as_json() else {
                return PanelCmd::None;
            };
            model.cycle_form.fill(cycle);
            if model.cycle_form.name.is_empty() {
                model.cycle_form.name.clone_from(&name);
            }
            let title = format!("Edit {name}");
            if copy {
                model.cycle_form.name.push_str(" Copy");
            }
            navigate(model, ViewId::CycleEdit.as_str(), Some(&title))
        }

        Continuation::CycleSaved => {
            model.status.invalidate();
            PanelCmd::batch(vec![
                PanelCmd::request(CyclesScreen::list_request(), Continuation::CyclesLoaded),
                go_back(model),
            ])
        }

        Continuation::HoldLoaded => {
            let reply = body.as_json().cloned().unwrap_or(Value::Null);
            model.hold.fill(&reply, model.today);
            model.registry.set_hidden(ElementId::HoldResult, true);
            if model.views.top() == ViewId::SystemHold {
                PanelCmd::None
            } else {
                navigate(model, ViewId::SystemHold.as_str(), None)
            }
        }

        Continuation::HoldSet => {
            model.hold.apply_set(body);
            model.focus = None;
            PanelCmd::None
        }

        Continuation::HoldTurnedOff => {
            model.hold.pane = HoldPane::TurnOn;
            PanelCmd::None
        }

        Continuation::HoldResumed => {
            model.hold.pane = HoldPane::Resumed;
            model.registry.set_text(ElementId::HoldResult, HOLD_RESUMED);
            model.registry.set_hidden(ElementId::HoldResult, false);
            PanelCmd::None
        }

        Continuation::AdjustmentLoaded => {
            model.adjustment.value = field_text(body, "adj").unwrap_or_default();
            PanelCmd::None
        }

        Continuation::AdjustmentSet => {
            let adj = field_text(body, "adj").unwrap_or_else(|| model.adjustment.value.clone());
            model.push_notice(None, format!("Seasonal adjustment set to {adj}"));
            go_back(model)
        }

        Continuation::LogLoaded => {
            if model.log.fill(body) {
                model.registry.set_text(ElementId::LogContents, model.log.text.clone());
            }
            PanelCmd::None
        }

        Continuation::LogicLoaded => {
            model.settings.logic = field_text(body, "logic").unwrap_or_default();
            PanelCmd::None
        }

        Continuation::OutputEnableLoaded => {
            model.settings.output_enable = field_text(body, "oe").unwrap_or_default();
            PanelCmd::None
        }

        Continuation::Restarted => {
            let status = body
                .status_field()
                .map_or_else(|| body.compact(), str::to_string);
            model.push_notice(Some(RESTART_TITLE), status);
            PanelCmd::None
        }
    }
}

// ──────────────────── event stream ────────────────────

fn handle_stream(model: &mut PanelModel, event: StreamEvent) -> PanelCmd {
    if !model.stream_open {
        return PanelCmd::None;
    }
    match event {
        StreamEvent::Status(record) => {
            let hostname = record.hostname.clone();
            model.status.ingest_push(*record, &model.views, &mut model.registry);
            PanelCmd::Log(ActivityEvent::StatusIngested {
                source: StatusSource::Push,
                hostname,
            })
        }
        StreamEvent::Stop(details) => {
            model.stream_open = false;
            model.push_notice(None, STREAM_CLOSED_NOTICE);
            PanelCmd::batch(vec![
                PanelCmd::CloseStream,
                PanelCmd::Log(ActivityEvent::StreamTerminated { details }),
            ])
        }
        StreamEvent::Error(details) => PanelCmd::Log(ActivityEvent::StreamError { details }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::core::config::Config;
    use crate::transport::Method;

    fn model() -> PanelModel {
        PanelModel::new(&Config::default(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
    }

    fn requests(cmd: PanelCmd) -> Vec<(Request, Continuation)> {
        cmd.flatten()
            .into_iter()
            .filter_map(|c| match c {
                PanelCmd::Request { request, then } => Some((request, then)),
                _ => None,
            })
            .collect()
    }

    fn reply(model: &mut PanelModel, request: Request, then: Continuation, value: Value) -> PanelCmd {
        update(
            model,
            PanelMsg::Response {
                request,
                then,
                result: Ok(Body::Json(value)),
            },
        )
    }

    fn push_status(model: &mut PanelModel, value: Value) -> PanelCmd {
        let record = StatusRecord::from_value(value).unwrap();
        update(model, PanelMsg::Stream(StreamEvent::Status(Box::new(record))))
    }

    #[test]
    fn start_pulls_once_and_subscribes() {
        let mut m = model();
        let cmd = update(&mut m, PanelMsg::Start);
        let flat = cmd.flatten();
        assert!(flat.contains(&PanelCmd::Subscribe { path: "/sse".to_string() }));
        let pulls = requests(PanelCmd::Batch(flat));
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].0.path, "/status");
        assert_eq!(pulls[0].1, Continuation::IngestStatus);
        assert!(m.stream_open);
    }

    #[test]
    fn start_without_pull() {
        let mut m = model();
        m.pull_on_start = false;
        let cmd = update(&mut m, PanelMsg::Start);
        assert!(requests(cmd).is_empty());
    }

    #[test]
    fn pull_reply_renders() {
        let mut m = model();
        let pull = requests(update(&mut m, PanelMsg::Start)).remove(0);
        reply(&mut m, pull.0, pull.1, json!({"hostname": "sp3", "time": "09:41:00", "currCycle": "C1"}));
        assert_eq!(m.registry.text(ElementId::PanelLine1), "Current cycle: C1");
        assert_eq!(m.registry.text(ElementId::SystemTitle), "sp3 Controls");
        assert!(!m.status.pull_in_flight());
    }

    #[test]
    fn unknown_view_changes_nothing() {
        let mut m = model();
        let before = m.registry.clone();
        let cmd = update(&mut m, PanelMsg::Navigate("garden_view".to_string()));
        assert_eq!(
            cmd,
            PanelCmd::Log(ActivityEvent::UnknownView {
                view: "garden_view".to_string()
            })
        );
        assert_eq!(m.registry, before);
        assert!(m.views.at_home());
    }

    #[test]
    fn back_to_home_pulls_when_no_record() {
        let mut m = model();
        update(&mut m, PanelMsg::Navigate("log".to_string()));
        let cmd = update(&mut m, PanelMsg::Back);
        let pulls = requests(cmd);
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].1, Continuation::IngestStatus);

        update(&mut m, PanelMsg::Navigate("log".to_string()));
        assert!(requests(update(&mut m, PanelMsg::Back)).is_empty());
    }

    #[test]
    fn back_to_home_renders_held_record() {
        let mut m = model();
        m.stream_open = true;
        update(&mut m, PanelMsg::Navigate("zones".to_string()));
        push_status(&mut m, json!({"hostname": "sp3", "time": "10:00:00"}));
        assert_eq!(m.registry.text(ElementId::SystemTitle), "Zones");
        let cmd = update(&mut m, PanelMsg::Back);
        assert!(requests(cmd).is_empty());
        assert_eq!(m.registry.text(ElementId::SystemTitle), "sp3 Controls");
    }

    #[test]
    fn zones_menu_fetches_then_pushes() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Menu(0))).remove(0);
        assert_eq!(then, Continuation::OpenZones);
        assert!(m.views.at_home());
        reply(&mut m, req, then, json!({"on": [3]}));
        assert_eq!(m.top(), ViewId::Zones);
        assert!(m.zones.active.contains(&3));
    }

    #[test]
    fn menu_ignored_away_from_home() {
        let mut m = model();
        update(&mut m, PanelMsg::Navigate("log".to_string()));
        assert_eq!(update(&mut m, PanelMsg::Menu(2)), PanelCmd::None);
    }

    #[test]
    fn log_menu_shows_loading_then_text() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Menu(5))).remove(0);
        assert_eq!(m.top(), ViewId::Log);
        assert_eq!(m.registry.text(ElementId::LogContents), "Retrieving log...");
        update(
            &mut m,
            PanelMsg::Response {
                request: req,
                then,
                result: Ok(Body::Text("06:00 zone 1 on".to_string())),
            },
        );
        assert_eq!(m.registry.text(ElementId::LogContents), "06:00 zone 1 on");
    }

    #[test]
    fn rejected_zone_raises_notice() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Zone(Some(4)))).remove(0);
        assert_eq!(req.path, "/zone/4/on");
        let cmd = reply(&mut m, req, then, json!({"status": "error", "msg": "zone busy"}));
        assert_eq!(m.current_notice().unwrap().body, "zone busy");
        assert!(matches!(cmd, PanelCmd::Log(ActivityEvent::ActionRejected { .. })));
        assert!(m.zones.active.is_empty());
    }

    #[test]
    fn accepted_zone_updates_selection() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Zone(Some(4)))).remove(0);
        reply(&mut m, req, then, json!({"status": "ok"}));
        assert!(m.zones.active.contains(&4));
        assert_eq!(m.registry.text(ElementId::ZonesStatus), r#"{"status":"ok"}"#);
    }

    #[test]
    fn transport_failure_projects_onto_display() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Zone(None))).remove(0);
        let cmd = update(
            &mut m,
            PanelMsg::Response {
                request: req,
                then,
                result: Err(TransportError::unreachable("connection refused")),
            },
        );
        assert_eq!(m.registry.text(ElementId::PanelLine1), "STATUS: 0");
        assert_eq!(m.registry.text(ElementId::PanelLine2), "connection refused");
        assert!(matches!(cmd, PanelCmd::Log(ActivityEvent::TransportFailed { code: None, .. })));
        assert!(m.notices.is_empty());
    }

    #[test]
    fn minutes_without_zone_is_a_notice() {
        let mut m = model();
        assert_eq!(update(&mut m, PanelMsg::ScheduleMinutes(10)), PanelCmd::None);
        assert_eq!(
            m.current_notice().unwrap().body,
            "Select a Zone first, then press a Minutes button."
        );
    }

    #[test]
    fn schedule_status_area_follows_refresh_and_post() {
        let mut m = model();
        update(&mut m, PanelMsg::Navigate("schedule_view".to_string()));
        let (req, then) = requests(update(&mut m, PanelMsg::ScheduleRefresh)).remove(0);
        assert_eq!((req.path.as_str(), &then), ("/status", &Continuation::ScheduleStatusArea));
        reply(&mut m, req, then, json!({"status": "error", "hostname": "sp3"}));
        assert!(m.current_notice().is_none());
        assert_eq!(m.schedule.status_area.rows[1], ("hostname".to_string(), "sp3".to_string()));

        m.schedule.draft = "[[3],10]".to_string();
        let (req, then) =
            requests(update(&mut m, PanelMsg::SchedulePost { append: false })).remove(0);
        reply(&mut m, req, then, json!({"status": "ok", "queued": 1}));
        assert_eq!(m.registry.text(ElementId::ScheduleStatus), "Schedule started");
        assert_eq!(m.schedule.status_area.rows.len(), 2);
        assert_eq!(m.schedule.status_area.rows[1].0, "queued");
    }

    #[test]
    fn pause_button_uses_state_label() {
        let mut m = model();
        m.stream_open = true;
        push_status(&mut m, json!({"currCycle": "C1", "schedulerState": "paused", "time": "1"}));
        let (req, _) = requests(update(
            &mut m,
            PanelMsg::Display(super::super::actions::DisplayButton::PauseResume),
        ))
        .remove(0);
        assert_eq!(req.path, "/schd/resume");
    }

    #[test]
    fn stop_event_closes_stream() {
        let mut m = model();
        update(&mut m, PanelMsg::Start);
        let cmd = update(&mut m, PanelMsg::Stream(StreamEvent::Stop("bye".to_string())));
        let flat = cmd.flatten();
        assert!(flat.contains(&PanelCmd::CloseStream));
        assert!(flat.contains(&PanelCmd::Log(ActivityEvent::StreamTerminated {
            details: "bye".to_string()
        })));
        assert_eq!(m.current_notice().unwrap().body, STREAM_CLOSED_NOTICE);
        assert!(!m.stream_open);

        let late = push_status(&mut m, json!({"currCycle": "late", "time": "1"}));
        assert_eq!(late, PanelCmd::None);
        assert!(m.status.record().is_none());
    }

    #[test]
    fn pushes_are_last_write_wins() {
        let mut m = model();
        m.stream_open = true;
        push_status(&mut m, json!({"currCycle": "R1", "time": "01:00:00"}));
        push_status(&mut m, json!({"currCycle": "R2", "time": "02:00:00"}));
        assert_eq!(m.registry.text(ElementId::PanelLine1), "Current cycle: R2");
    }

    #[test]
    fn add_cycle_right_action() {
        let mut m = model();
        update(&mut m, PanelMsg::Navigate("cycles".to_string()));
        m.cycle_form.name = "stale".to_string();
        update(&mut m, PanelMsg::RightAction);
        assert_eq!(m.top(), ViewId::CycleEdit);
        assert_eq!(m.registry.text(ElementId::SystemTitle), "Add Cycle");
        assert!(m.cycle_form.name.is_empty());
        assert!(m.registry.is_hidden(ElementId::RightButton));
    }

    #[test]
    fn cycle_copy_loads_form() {
        let mut m = model();
        update(&mut m, PanelMsg::Navigate("cycles".to_string()));
        m.cycles.names = vec!["Front".to_string()];
        let (req, then) = requests(update(&mut m, PanelMsg::CycleEdit { copy: true })).remove(0);
        assert_eq!(req.path, "/cycle/Front");
        reply(&mut m, req, then, json!({"name": "Front", "type": "off", "schedule": []}));
        assert_eq!(m.cycle_form.name, "Front Copy");
        assert_eq!(m.registry.text(ElementId::SystemTitle), "Edit Front");
    }

    #[test]
    fn cycle_save_refreshes_invalidates_and_pops() {
        let mut m = model();
        m.stream_open = true;
        push_status(&mut m, json!({"time": "1"}));
        update(&mut m, PanelMsg::Navigate("cycles".to_string()));
        update(&mut m, PanelMsg::Navigate("cycle_edit".to_string()));

        assert_eq!(update(&mut m, PanelMsg::CycleSubmit), PanelCmd::None);
        assert_eq!(m.current_notice().unwrap().body, "Select a cycle type");
        update(&mut m, PanelMsg::DismissNotice);

        update(&mut m, PanelMsg::CycleNextType);
        let (req, then) = requests(update(&mut m, PanelMsg::CycleSubmit)).remove(0);
        assert_eq!(req.method, Method::Post);
        let cmd = reply(&mut m, req, then, json!({"status": "ok"}));
        let reqs = requests(cmd);
        assert_eq!(reqs[0].0.path, "/cycles.json");
        assert_eq!(m.top(), ViewId::Cycles);
        assert!(m.status.record().is_none());
    }

    #[test]
    fn hold_flow() {
        let mut m = model();
        let (req, then) = requests(update(&mut m, PanelMsg::Menu(7))).remove(0);
        reply(&mut m, req, then, json!({"holdDays": 0}));
        assert_eq!(m.top(), ViewId::SystemHold);
        assert!(matches!(m.hold.pane, HoldPane::Start { .. }));

        let (req, then) = requests(update(&mut m, PanelMsg::Hold(HoldChoice::Days(2)))).remove(0);
        reply(&mut m, req, then, json!({"status": "ok", "resume": "Wed 4 Jun"}));
        assert_eq!(
            m.hold.pane,
            HoldPane::Cancel {
                resume: "Wed 4 Jun".to_string()
            }
        );

        let (req, then) = requests(update(&mut m, PanelMsg::Hold(HoldChoice::Resume))).remove(0);
        reply(&mut m, req, then, json!({"status": "ok"}));
        assert_eq!(m.registry.text(ElementId::HoldResult), HOLD_RESUMED);
        assert!(!m.registry.is_hidden(ElementId::HoldResult));
    }

    #[test]
    fn custom_hold_focuses_days() {
        let mut m = model();
        m.views.push(&mut m.registry, "system_hold", None).unwrap();
        update(&mut m, PanelMsg::Hold(HoldChoice::Custom));
        assert_eq!(m.focus, Some(Field::HoldCustomDays));
        update(&mut m, PanelMsg::Edit(EditOp::Insert('1')));
        update(&mut m, PanelMsg::Edit(EditOp::Insert('x')));
        update(&mut m, PanelMsg::Edit(EditOp::Insert('4')));
        assert_eq!(m.hold.custom_days, "14");
    }

    #[test]
    fn adjustment_set_notices_and_pops() {
        let mut m = model();
        let cmd = update(&mut m, PanelMsg::Menu(6));
        let (req, then) = requests(cmd).remove(0);
        reply(&mut m, req, then, json!({"adj": 100}));
        assert_eq!(m.adjustment.value, "100");

        m.adjustment.value = "80".to_string();
        let (req, then) = requests(update(&mut m, PanelMsg::AdjustmentSubmit)).remove(0);
        assert_eq!(req.path, "/adj/80");
        reply(&mut m, req, then, json!({"status": "ok", "adj": 80}));
        assert_eq!(m.current_notice().unwrap().body, "Seasonal adjustment set to 80");
        assert!(m.views.at_home());
    }

    #[test]
    fn restart_shows_titled_notice() {
        let mut m = model();
        update(&mut m, PanelMsg::Menu(4));
        let (req, then) = requests(update(&mut m, PanelMsg::RightAction)).remove(0);
        assert_eq!(req.path, "/restart");
        reply(&mut m, req, then, json!({"status": "ok"}));
        let notice = m.current_notice().unwrap();
        assert_eq!(notice.title.as_deref(), Some(RESTART_TITLE));
        assert_eq!(notice.body, "ok");
    }

    #[test]
    fn focus_cycles_through_fields() {
        let mut m = model();
        m.views.push(&mut m.registry, "schedule", None).unwrap();
        update(&mut m, PanelMsg::FocusNext);
        assert_eq!(m.focus, Some(Field::ScheduleDraft));
        update(&mut m, PanelMsg::FocusNext);
        assert_eq!(m.focus, Some(Field::ScheduleDraft));
        update(&mut m, PanelMsg::Unfocus);
        assert_eq!(m.focus, None);
    }

    #[test]
    fn quit_closes_open_stream() {
        let mut m = model();
        update(&mut m, PanelMsg::Start);
        let flat = update(&mut m, PanelMsg::Quit).flatten();
        assert_eq!(flat, vec![PanelCmd::CloseStream, PanelCmd::Quit]);
        assert!(m.quit);
    }
}
