//! Element registry: every UI element the panel mutates, addressed by a
//! symbolic [`ElementId`] and populated once at startup.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use super::views::ViewAction;

/// Class that hides an element while keeping its slot in the layout.
pub const INVISIBLE: &str = "invisible";

/// Symbolic names of the shared UI elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    /// Header title; holds the visible view's title.
    SystemTitle,
    /// Bare controller hostname, updated on every render.
    HeadTitle,
    BackButton,
    /// The single shared contextual button in the header.
    RightButton,
    PanelLine1,
    PanelLine2,
    PanelState,
    PanelTime,
    /// Cancel / skip / pause-resume group on the display panel.
    PanelButtons,
    PauseGlyph,
    PlayGlyph,
    ZonesStatus,
    ScheduleStatus,
    LogContents,
    HoldResult,
}

impl ElementId {
    pub const ALL: [Self; 15] = [
        Self::SystemTitle,
        Self::HeadTitle,
        Self::BackButton,
        Self::RightButton,
        Self::PanelLine1,
        Self::PanelLine2,
        Self::PanelState,
        Self::PanelTime,
        Self::PanelButtons,
        Self::PauseGlyph,
        Self::PlayGlyph,
        Self::ZonesStatus,
        Self::ScheduleStatus,
        Self::LogContents,
        Self::HoldResult,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// One element handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub text: String,
    pub hidden: bool,
    pub classes: BTreeSet<String>,
    /// Only used by [`ElementId::RightButton`].
    pub action: Option<ViewAction>,
}

impl Element {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    /// Remove every class starting with `prefix` (e.g. glyph classes `bi-*`).
    pub fn remove_classes_with_prefix(&mut self, prefix: &str) {
        self.classes.retain(|c| !c.starts_with(prefix));
    }

    /// Flip `class`; returns whether it is now present.
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.classes.remove(class) {
            false
        } else {
            self.classes.insert(class.to_string());
            true
        }
    }

    /// Shown: neither `hidden` nor carrying the `invisible` class.
    pub fn is_shown(&self) -> bool {
        !self.hidden && !self.has_class(INVISIBLE)
    }

    /// First glyph class (`bi-*`), if any.
    pub fn glyph(&self) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.starts_with("bi-"))
            .map(String::as_str)
    }
}

/// Complete by construction: every [`ElementId`] has exactly one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRegistry {
    elements: Vec<Element>,
}

impl ElementRegistry {
    /// Startup state: back and right buttons hidden, play glyph invisible,
    /// pause glyph shown, display buttons hidden until a status arrives.
    pub fn standard() -> Self {
        let mut reg = Self {
            elements: vec![Element::default(); ElementId::ALL.len()],
        };
        reg.set_text(ElementId::SystemTitle, super::views::ViewId::HOME.decl().title);
        reg.set_hidden(ElementId::BackButton, true);
        reg.set_hidden(ElementId::RightButton, true);
        reg.set_hidden(ElementId::PanelButtons, true);
        reg.set_hidden(ElementId::HoldResult, true);
        reg.get_mut(ElementId::PlayGlyph).add_class(INVISIBLE);
        reg
    }

    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.index()]
    }

    pub fn text(&self, id: ElementId) -> &str {
        &self.get(id).text
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) {
        self.get_mut(id).text = text.into();
    }

    pub fn set_hidden(&mut self, id: ElementId, hidden: bool) {
        self.get_mut(id).hidden = hidden;
    }

    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.get(id).hidden
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
