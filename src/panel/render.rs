//! Terminal painting of the element registry and the visible view.
//!
//! The text of every region is built by plain functions ([`header_line`],
//! [`display_lines`], [`body_lines`]) so it can be tested without a
//! terminal; [`paint`] only positions and colors it.

#![allow(missing_docs)]

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use super::input::footer_hint;
use super::model::PanelModel;
use super::registry::{ElementId, ElementRegistry};
use super::screens::{HoldPane, MINUTE_CHOICES, NO_CYCLES, ZONE_COUNT};
use super::views::{MAIN_MENU, ViewId};

/// Terminal glyph for a `bi-*` icon class.
fn glyph_symbol(class: &str) -> &'static str {
    match class {
        "bi-plus-circle" => "[+]",
        "bi-arrow-clockwise" => "[r]",
        "bi-bootstrap-reboot" => "[!]",
        "bi-arrow-down-circle" => "[v]",
        _ => "[ ]",
    }
}

/// `< Title  [glyph]        hostname`
pub fn header_line(reg: &ElementRegistry, width: usize) -> String {
    let back = if reg.get(ElementId::BackButton).is_shown() { "< " } else { "  " };
    let right_button = reg.get(ElementId::RightButton);
    let glyph = if right_button.is_shown() {
        right_button.glyph().map(glyph_symbol).unwrap_or("[r]")
    } else {
        ""
    };
    let left = format!("{back}{}  {glyph}", reg.text(ElementId::SystemTitle));
    let host = reg.text(ElementId::HeadTitle);
    let pad = width.saturating_sub(left.chars().count() + host.chars().count() + 1);
    format!("{left}{:pad$}{host} ", "")
}

/// Display panel: two text lines, then state, clock and the control buttons.
pub fn display_lines(reg: &ElementRegistry) -> [String; 3] {
    let glyph = if reg.get(ElementId::PauseGlyph).is_shown() {
        "||"
    } else if reg.get(ElementId::PlayGlyph).is_shown() {
        "|>"
    } else {
        "  "
    };
    let buttons = if reg.is_hidden(ElementId::PanelButtons) {
        String::new()
    } else {
        format!("  [c]ancel [k]skip [p]{glyph}")
    };
    [
        reg.text(ElementId::PanelLine1).to_string(),
        reg.text(ElementId::PanelLine2).to_string(),
        format!(
            "{:<10} {:>5}{buttons}",
            reg.text(ElementId::PanelState),
            reg.text(ElementId::PanelTime)
        ),
    ]
}

fn zone_row(selected: impl Fn(u8) -> bool) -> String {
    (1..=ZONE_COUNT)
        .map(|z| if selected(z) { format!("[{z}]") } else { format!(" {z} ") })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Body of the visible view.
pub fn body_lines(model: &PanelModel) -> Vec<String> {
    let reg = &model.registry;
    match model.top() {
        ViewId::Main => MAIN_MENU
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}  {label}", i + 1))
            .collect(),
        ViewId::Zones => vec![
            zone_row(|z| model.zones.active.contains(&z)),
            String::new(),
            reg.text(ElementId::ZonesStatus).to_string(),
        ],
        ViewId::Schedule => {
            let minutes = MINUTE_CHOICES
                .iter()
                .map(|m| {
                    if *m == model.schedule.minutes() {
                        format!("<{m}>")
                    } else {
                        m.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let mut lines = vec![
                format!("Zones   {}", zone_row(|z| model.schedule.selected.contains(&z))),
                format!("Minutes {minutes}"),
                format!("Items   {}", model.schedule.draft),
                String::new(),
                reg.text(ElementId::ScheduleStatus).to_string(),
            ];
            lines.extend(model.schedule.status_area.to_lines());
            lines
        }
        ViewId::Cycles => {
            if model.cycles.names.is_empty() {
                return vec![NO_CYCLES.to_string()];
            }
            model
                .cycles
                .names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let marker = if i == model.cycles.cursor { ">" } else { " " };
                    format!("{marker} {name}")
                })
                .collect()
        }
        ViewId::CycleEdit => {
            let form = &model.cycle_form;
            let days = (0..7_u8)
                .map(|d| {
                    let label = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"][usize::from(d)];
                    if form.days.contains(&d) { format!("[{label}]") } else { format!(" {label} ") }
                })
                .collect::<Vec<_>>()
                .join("");
            let mut lines = vec![
                format!("Name   {}", form.name),
                format!("Type   {}", form.cycle_type.map_or("-", |t| t.as_str())),
                format!("Days   {days}"),
                format!("Start  {}:{}  first {}  count {}", form.hour, form.min, form.first, form.count),
                "Zones / run time".to_string(),
            ];
            lines.extend(
                form.rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| format!("{:>2}. {:<16} {}", i + 1, row.zones, row.run_time)),
            );
            lines
        }
        ViewId::Status => model.status_table.to_lines(),
        ViewId::SystemSettings => vec![
            format!("Logic          {}", model.settings.logic),
            format!("Output enable  {}", model.settings.output_enable),
        ],
        ViewId::Log => reg
            .text(ElementId::LogContents)
            .lines()
            .skip(model.log.scroll)
            .map(str::to_string)
            .collect(),
        ViewId::SeasonalAdjustment => vec![format!("Adjustment  {}%", model.adjustment.value)],
        ViewId::SystemHold => {
            let mut lines = match &model.hold.pane {
                HoldPane::Loading => vec![String::new()],
                HoldPane::Start { labels } => {
                    let mut lines: Vec<String> = labels
                        .iter()
                        .enumerate()
                        .map(|(i, label)| format!("{}  until {label}", i + 1))
                        .collect();
                    lines.push("c  Custom".to_string());
                    lines.push("o  Turn Off".to_string());
                    lines
                }
                HoldPane::Custom => vec![format!("Days  {}", model.hold.custom_days)],
                HoldPane::TurnOn => vec!["System is off.  enter  Turn On".to_string()],
                HoldPane::Cancel { resume } => {
                    vec![format!("On hold until {resume}.  enter  Cancel Hold")]
                }
                HoldPane::Resumed => Vec::new(),
            };
            if reg.get(ElementId::HoldResult).is_shown() {
                lines.push(reg.text(ElementId::HoldResult).to_string());
            }
            lines
        }
    }
}

/// Paint a full frame.
pub fn paint<W: Write>(out: &mut W, model: &PanelModel, width: u16, height: u16) -> io::Result<()> {
    let width_usize = usize::from(width);
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    // ── Header ──
    queue!(
        out,
        MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        SetAttribute(Attribute::Bold)
    )?;
    write!(out, "{}", header_line(&model.registry, width_usize))?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    // ── Display panel ──
    let mut row = 2_u16;
    for line in display_lines(&model.registry) {
        queue!(out, MoveTo(2, row), SetForegroundColor(Color::White))?;
        write!(out, "{line}")?;
        row += 1;
    }
    queue!(out, SetAttribute(Attribute::Reset))?;
    row += 1;

    // ── View body ──
    let footer_row = height.saturating_sub(1);
    for line in body_lines(model) {
        if row >= footer_row {
            break;
        }
        queue!(out, MoveTo(2, row))?;
        write!(out, "{line}")?;
        row += 1;
    }

    if let Some(field) = model.focus {
        queue!(
            out,
            MoveTo(2, footer_row.saturating_sub(1)),
            SetForegroundColor(Color::Yellow)
        )?;
        write!(out, "{}: {}_", field.label(), model.field_text(field))?;
        queue!(out, SetAttribute(Attribute::Reset))?;
    }

    // ── Footer ──
    queue!(out, MoveTo(0, footer_row), SetForegroundColor(Color::DarkGrey))?;
    write!(out, " {}", footer_hint(model.top()))?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    // ── Notice overlay ──
    if let Some(notice) = model.current_notice() {
        let top = height / 3;
        queue!(
            out,
            MoveTo(4, top),
            SetForegroundColor(Color::Yellow),
            SetAttribute(Attribute::Bold)
        )?;
        write!(out, "{}", notice.title.as_deref().unwrap_or("Notice"))?;
        queue!(out, SetAttribute(Attribute::Reset), MoveTo(4, top + 1))?;
        write!(out, "{}", notice.body)?;
        queue!(out, MoveTo(4, top + 3), SetForegroundColor(Color::DarkGrey))?;
        write!(out, "enter to dismiss")?;
        queue!(out, SetAttribute(Attribute::Reset))?;
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::core::config::Config;
    use crate::panel::screens::StatusTable;
    use crate::panel::status::StatusRecord;
    use crate::transport::Body;

    fn model() -> PanelModel {
        PanelModel::new(&Config::default(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
    }

    #[test]
    fn header_shows_back_and_glyph() {
        let mut m = model();
        assert!(header_line(&m.registry, 60).starts_with("  Sprinkler Controls"));
        m.views.push(&mut m.registry, "cycles", None).unwrap();
        m.registry.set_text(ElementId::HeadTitle, "sp3");
        let header = header_line(&m.registry, 60);
        assert!(header.starts_with("< Cycles  [+]"));
        assert!(header.trim_end().ends_with("sp3"));
        assert_eq!(header.chars().count(), 60);
    }

    #[test]
    fn display_lines_follow_registry() {
        let mut m = model();
        let record = StatusRecord::from_value(json!({
            "currCycle": "C1",
            "schedulerState": "paused",
            "time": "14:05:30"
        }))
        .unwrap();
        m.status.ingest_push(record, &m.views, &mut m.registry);
        let [line1, line2, line3] = display_lines(&m.registry);
        assert_eq!(line1, "Current cycle: C1");
        assert_eq!(line2, "Zone: -");
        assert!(line3.starts_with("paused"));
        assert!(line3.contains("14:05"));
        assert!(line3.contains("[p]||"));
    }

    #[test]
    fn empty_cycle_list() {
        let mut m = model();
        m.views.push(&mut m.registry, "cycles", None).unwrap();
        assert_eq!(body_lines(&m), vec![NO_CYCLES.to_string()]);
    }

    #[test]
    fn schedule_body_ends_with_status_area() {
        let mut m = model();
        m.views.push(&mut m.registry, "schedule_view", None).unwrap();
        m.registry.set_text(ElementId::ScheduleStatus, "Schedule started");
        m.schedule.status_area = StatusTable::from_body(&Body::Json(json!({"hostname": "sp3"})));
        let lines = body_lines(&m);
        assert_eq!(lines[lines.len() - 2], "Schedule started");
        assert_eq!(lines[lines.len() - 1], format!("{:<16} sp3", "hostname"));
    }

    #[test]
    fn home_lists_menu() {
        let lines = body_lines(&model());
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[7], "8  System Hold");
    }

    #[test]
    fn paint_writes_a_frame() {
        let mut m = model();
        m.push_notice(Some("Restart Controller"), "ok");
        let mut buf = Vec::new();
        paint(&mut buf, &m, 80, 24).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("Sprinkler Controls"));
        assert!(text.contains("Restart Controller"));
        assert!(text.contains("q quit"));
    }
}
