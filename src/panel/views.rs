//! Static view catalog and the navigation stack.
//!
//! Views are declared once in [`VIEWS`] and never created or destroyed; the
//! stack only flips their visibility and remembers the title each view showed
//! when something was pushed over it.

#![allow(missing_docs)]

use crate::core::errors::{Result, SpkError};
use crate::core::helpers::last;

use super::registry::{ElementId, ElementRegistry};

/// Every declared screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewId {
    Main,
    Zones,
    Schedule,
    Cycles,
    CycleEdit,
    Status,
    SystemSettings,
    Log,
    SeasonalAdjustment,
    SystemHold,
}

impl ViewId {
    /// Permanent bottom of the stack.
    pub const HOME: Self = Self::Main;

    pub const ALL: [Self; 10] = [
        Self::Main,
        Self::Zones,
        Self::Schedule,
        Self::Cycles,
        Self::CycleEdit,
        Self::Status,
        Self::SystemSettings,
        Self::Log,
        Self::SeasonalAdjustment,
        Self::SystemHold,
    ];

    pub fn decl(self) -> &'static ViewDecl {
        &VIEWS[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.decl().id
    }

    /// Resolve `zones` or `zones_view`.
    pub fn from_name(name: &str) -> Option<Self> {
        let full = if name.ends_with("_view") {
            name.to_string()
        } else {
            format!("{name}_view")
        };
        Self::ALL.into_iter().find(|v| v.as_str() == full)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Contextual action bound to the header's right button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    AddCycle,
    RefreshStatus,
    RestartController,
    ScrollLogBottom,
}

/// Compile-time declaration of one view.
#[derive(Debug)]
pub struct ViewDecl {
    pub view: ViewId,
    pub id: &'static str,
    pub title: &'static str,
    pub glyph: Option<&'static str>,
    pub action: Option<ViewAction>,
}

const fn plain(view: ViewId, id: &'static str, title: &'static str) -> ViewDecl {
    ViewDecl {
        view,
        id,
        title,
        glyph: None,
        action: None,
    }
}

/// Indexed by `ViewId as usize`.
pub const VIEWS: &[ViewDecl] = &[
    plain(ViewId::Main, "main_view", "Sprinkler Controls"),
    plain(ViewId::Zones, "zones_view", "Zones"),
    plain(ViewId::Schedule, "schedule_view", "Schedule"),
    ViewDecl {
        view: ViewId::Cycles,
        id: "cycles_view",
        title: "Cycles",
        glyph: Some("bi-plus-circle"),
        action: Some(ViewAction::AddCycle),
    },
    plain(ViewId::CycleEdit, "cycle_edit_view", "Edit Cycle"),
    ViewDecl {
        view: ViewId::Status,
        id: "status_view",
        title: "Status",
        glyph: Some("bi-arrow-clockwise"),
        action: Some(ViewAction::RefreshStatus),
    },
    ViewDecl {
        view: ViewId::SystemSettings,
        id: "system_settings_view",
        title: "System Settings",
        glyph: Some("bi-bootstrap-reboot"),
        action: Some(ViewAction::RestartController),
    },
    ViewDecl {
        view: ViewId::Log,
        id: "log_view",
        title: "Log",
        glyph: Some("bi-arrow-down-circle"),
        action: Some(ViewAction::ScrollLogBottom),
    },
    plain(
        ViewId::SeasonalAdjustment,
        "seasonal_adjustment_view",
        "Seasonal Adjustment",
    ),
    plain(ViewId::SystemHold, "system_hold_view", "System Hold"),
];

/// Home-screen menu, in display order.
pub const MAIN_MENU: [&str; 8] = [
    "Zones",
    "Schedule",
    "Cycles",
    "Status",
    "System Settings",
    "Log",
    "Seasonal Adjustment",
    "System Hold",
];

/// `System Hold` -> `system_hold`.
pub fn menu_view_name(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewState {
    visible: bool,
    last_title: Option<String>,
}

/// Navigation history. Never empty; the bottom is always [`ViewId::HOME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStack {
    stack: Vec<ViewId>,
    states: Vec<ViewState>,
}

impl ViewStack {
    pub fn new() -> Self {
        let mut states = vec![ViewState::default(); ViewId::ALL.len()];
        states[ViewId::HOME.index()].visible = true;
        Self {
            stack: vec![ViewId::HOME],
            states,
        }
    }

    pub fn top(&self) -> ViewId {
        last(&self.stack).copied().unwrap_or(ViewId::HOME)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn at_home(&self) -> bool {
        self.stack.len() == 1
    }

    pub fn ids(&self) -> &[ViewId] {
        &self.stack
    }

    pub fn is_visible(&self, view: ViewId) -> bool {
        self.states[view.index()].visible
    }

    /// Views currently flagged visible. Always exactly one.
    pub fn visible_views(&self) -> Vec<ViewId> {
        ViewId::ALL
            .into_iter()
            .filter(|v| self.is_visible(*v))
            .collect()
    }

    /// Title recorded for `view` when something was last pushed over it.
    pub fn last_title(&self, view: ViewId) -> Option<&str> {
        self.states[view.index()].last_title.as_deref()
    }

    /// Show `name` on top of the stack.
    ///
    /// The outgoing view remembers the title currently displayed, so a later
    /// `pop` restores it even if an in-view action had changed it. An unknown
    /// name changes nothing.
    pub fn push(
        &mut self,
        reg: &mut ElementRegistry,
        name: &str,
        title: Option<&str>,
    ) -> Result<ViewId> {
        let view = ViewId::from_name(name).ok_or_else(|| SpkError::UnknownView {
            view: name.to_string(),
        })?;
        let outgoing = self.top();

        self.states[outgoing.index()].last_title = Some(reg.text(ElementId::SystemTitle).to_string());
        reg.set_text(ElementId::SystemTitle, title.unwrap_or(view.decl().title));
        reg.set_hidden(ElementId::BackButton, false);
        apply_right_button(reg, view);

        self.states[outgoing.index()].visible = false;
        self.states[view.index()].visible = true;
        self.stack.push(view);
        Ok(view)
    }

    /// Drop the top view. Returns `false` (and changes nothing) at home.
    pub fn pop(&mut self, reg: &mut ElementRegistry) -> bool {
        if self.at_home() {
            return false;
        }
        let Some(leaving) = self.stack.pop() else {
            return false;
        };
        self.states[leaving.index()].visible = false;

        let exposed = self.top();
        self.states[exposed.index()].visible = true;
        let title = self.states[exposed.index()]
            .last_title
            .clone()
            .unwrap_or_else(|| exposed.decl().title.to_string());
        reg.set_text(ElementId::SystemTitle, title);
        reg.set_hidden(ElementId::BackButton, self.stack.len() <= 1);
        apply_right_button(reg, exposed);
        true
    }
}

impl Default for ViewStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Clear whatever the right button carried, then apply `view`'s declaration.
fn apply_right_button(reg: &mut ElementRegistry, view: ViewId) {
    let decl = view.decl();
    let button = reg.get_mut(ElementId::RightButton);
    button.remove_classes_with_prefix("bi-");
    button.action = None;

    if let Some(glyph) = decl.glyph {
        button.add_class(glyph);
    }
    button.action = decl.action;
    button.hidden = decl.glyph.is_none() && decl.action.is_none();
}
