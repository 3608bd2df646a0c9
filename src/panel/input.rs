//! Key routing for the terminal front end.
//!
//! Order: an open notice swallows everything except dismissal, a focused text
//! field takes printable keys, then global keys, then keys of the visible view.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::actions::DisplayButton;
use super::model::{EditOp, PanelModel, PanelMsg};
use super::screens::{HoldChoice, HoldPane};
use super::views::{MAIN_MENU, ViewId};

/// Translate one key press into a message, if it means anything here.
pub fn map_key(key: &KeyEvent, model: &PanelModel) -> Option<PanelMsg> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(PanelMsg::Quit);
    }
    if model.current_notice().is_some() {
        return matches!(key.code, KeyCode::Enter | KeyCode::Esc).then_some(PanelMsg::DismissNotice);
    }
    if model.focus.is_some() {
        return Some(match key.code {
            KeyCode::Char(c) => PanelMsg::Edit(EditOp::Insert(c)),
            KeyCode::Backspace => PanelMsg::Edit(EditOp::Backspace),
            KeyCode::Delete => PanelMsg::Edit(EditOp::Clear),
            KeyCode::Tab => PanelMsg::FocusNext,
            KeyCode::Esc | KeyCode::Enter => PanelMsg::Unfocus,
            _ => return None,
        });
    }

    match key.code {
        KeyCode::Esc | KeyCode::Backspace => return Some(PanelMsg::Back),
        KeyCode::Tab => return Some(PanelMsg::FocusNext),
        KeyCode::Char('r') => return Some(PanelMsg::RightAction),
        _ => {}
    }

    match model.top() {
        ViewId::Main => home_key(key.code),
        ViewId::Zones => match key.code {
            KeyCode::Char('0' | 'o') => Some(PanelMsg::Zone(None)),
            code => zone_digit(code).map(|z| PanelMsg::Zone(Some(z))),
        },
        ViewId::Schedule => match key.code {
            KeyCode::Char('x') => Some(PanelMsg::ScheduleClear),
            KeyCode::Left => Some(PanelMsg::ScheduleMinuteCursor(-1)),
            KeyCode::Right => Some(PanelMsg::ScheduleMinuteCursor(1)),
            KeyCode::Enter => Some(PanelMsg::ScheduleMinutes(model.schedule.minutes())),
            KeyCode::Char('s') => Some(PanelMsg::SchedulePost { append: false }),
            KeyCode::Char('a') => Some(PanelMsg::SchedulePost { append: true }),
            KeyCode::Char('u') => Some(PanelMsg::ScheduleRefresh),
            code => zone_digit(code).map(PanelMsg::ScheduleToggle),
        },
        ViewId::Cycles => match key.code {
            KeyCode::Up => Some(PanelMsg::CycleCursor(-1)),
            KeyCode::Down => Some(PanelMsg::CycleCursor(1)),
            KeyCode::Enter | KeyCode::Char('g') => Some(PanelMsg::CycleRun),
            KeyCode::Char('e') => Some(PanelMsg::CycleEdit { copy: false }),
            KeyCode::Char('y') => Some(PanelMsg::CycleEdit { copy: true }),
            KeyCode::Char('d') => Some(PanelMsg::CycleDelete),
            _ => None,
        },
        ViewId::CycleEdit => match key.code {
            KeyCode::Char('t') => Some(PanelMsg::CycleNextType),
            KeyCode::Char(c @ '0'..='6') => Some(PanelMsg::CycleDay(c as u8 - b'0')),
            KeyCode::Char('+') => Some(PanelMsg::CycleAddRow),
            KeyCode::Char('-') => Some(PanelMsg::CycleRemoveRow),
            KeyCode::Enter => Some(PanelMsg::CycleSubmit),
            _ => None,
        },
        ViewId::SystemHold => hold_key(key.code, &model.hold.pane),
        ViewId::SeasonalAdjustment => {
            (key.code == KeyCode::Enter).then_some(PanelMsg::AdjustmentSubmit)
        }
        ViewId::Log => match key.code {
            KeyCode::Up => Some(PanelMsg::LogScroll(-1)),
            KeyCode::Down => Some(PanelMsg::LogScroll(1)),
            KeyCode::PageUp => Some(PanelMsg::LogScroll(-10)),
            KeyCode::PageDown => Some(PanelMsg::LogScroll(10)),
            _ => None,
        },
        ViewId::Status | ViewId::SystemSettings => None,
    }
}

fn home_key(code: KeyCode) -> Option<PanelMsg> {
    match code {
        KeyCode::Char('q') => Some(PanelMsg::Quit),
        KeyCode::Char('c') => Some(PanelMsg::Display(DisplayButton::Cancel)),
        KeyCode::Char('k') => Some(PanelMsg::Display(DisplayButton::Skip)),
        KeyCode::Char('p') => Some(PanelMsg::Display(DisplayButton::PauseResume)),
        KeyCode::Char(c @ '1'..='9') => {
            let index = usize::from(c as u8 - b'1');
            (index < MAIN_MENU.len()).then_some(PanelMsg::Menu(index))
        }
        _ => None,
    }
}

fn hold_key(code: KeyCode, pane: &HoldPane) -> Option<PanelMsg> {
    let choice = match (pane, code) {
        (HoldPane::Start { .. }, KeyCode::Char(c @ '1'..='6')) => HoldChoice::Days(c as u8 - b'0'),
        (HoldPane::Start { .. }, KeyCode::Char('c')) => HoldChoice::Custom,
        (HoldPane::Start { .. }, KeyCode::Char('o')) => HoldChoice::TurnOff,
        (HoldPane::Custom, KeyCode::Enter) => HoldChoice::SubmitCustom,
        (HoldPane::TurnOn | HoldPane::Cancel { .. }, KeyCode::Enter) => HoldChoice::Resume,
        _ => return None,
    };
    Some(PanelMsg::Hold(choice))
}

fn zone_digit(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(c @ '1'..='8') => Some(c as u8 - b'0'),
        _ => None,
    }
}

/// Key hints for the footer of `view`.
pub const fn footer_hint(view: ViewId) -> &'static str {
    match view {
        ViewId::Main => "1-8 menu  c cancel  k skip  p pause/resume  q quit",
        ViewId::Zones => "1-8 zone on  0 all off  esc back",
        ViewId::Schedule => "1-8 zone  </> minutes  enter queue  tab items  s set  a append  x clear  u status",
        ViewId::Cycles => "up/down select  enter run  e edit  y copy  d delete  r add",
        ViewId::CycleEdit => "tab fields  t type  0-6 days  + row  - row  enter save",
        ViewId::Status => "r refresh  esc back",
        ViewId::SystemSettings => "r restart  esc back",
        ViewId::Log => "up/down/pgup/pgdn scroll  r bottom  esc back",
        ViewId::SeasonalAdjustment => "tab edit  enter set  esc back",
        ViewId::SystemHold => "1-6 days  c custom  o turn off  enter confirm  esc back",
    }
}
