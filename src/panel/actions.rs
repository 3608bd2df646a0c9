//! Controller actions: what to do with a reply once it arrives.
//!
//! Every request the panel issues is paired with a [`Continuation`]. When the
//! reply comes back it goes through [`classify`] first, so transport failures
//! and rejected mutations are handled in one place and the continuation only
//! ever sees accepted bodies.

#![allow(missing_docs)]

use crate::transport::{Body, FetchResult, Request, TransportError};

/// Named success handler for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Status pull issued by `ensure_and_render`.
    IngestStatus,
    /// `/status` fetched on the way into the zones view.
    OpenZones,
    /// `/zone/{n}/on` or `/zone/all/off`.
    ZoneChanged { zone: Option<u8> },
    /// `/schd/{zones}/{minutes}`.
    ScheduleQueued,
    SchedulePosted { append: bool },
    /// Cancel, skip, pause or resume from the display panel.
    DisplayControl,
    /// `/status` for the key/value table of the status view.
    StatusTable,
    /// Status path read for the table under the schedule builder.
    ScheduleStatusArea,
    CyclesLoaded,
    CycleRan,
    CycleDeleted,
    /// `/cycle/{name}` for the edit form; `copy` appends ` Copy` to the name.
    CycleLoaded { name: String, copy: bool },
    CycleSaved,
    HoldLoaded,
    HoldSet,
    HoldTurnedOff,
    HoldResumed,
    AdjustmentLoaded,
    AdjustmentSet,
    LogLoaded,
    LogicLoaded,
    OutputEnableLoaded,
    Restarted,
}

impl Continuation {
    /// Whether a non-`ok` status in the reply means the controller refused.
    ///
    /// Reads and the handlers that show the status word themselves accept any
    /// status.
    pub const fn rejects_non_ok(&self) -> bool {
        matches!(
            self,
            Self::ZoneChanged { .. }
                | Self::ScheduleQueued
                | Self::DisplayControl
                | Self::CycleRan
                | Self::CycleDeleted
                | Self::CycleSaved
                | Self::HoldSet
                | Self::HoldTurnedOff
                | Self::HoldResumed
                | Self::AdjustmentSet
        )
    }
}

/// Result of classifying a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Failed(TransportError),
    /// The controller answered with a non-`ok` status.
    Rejected(String),
    Accepted(Body),
}

/// Sort a reply into failure, rejection or success.
pub fn classify(then: &Continuation, result: FetchResult) -> Outcome {
    let body = match result {
        Ok(body) => body,
        Err(err) => return Outcome::Failed(err),
    };
    if then.rejects_non_ok() {
        if let Some(status) = body.status_field() {
            if status != "ok" {
                let msg = body.msg_field().unwrap_or(status).to_string();
                return Outcome::Rejected(msg);
            }
        }
    }
    Outcome::Accepted(body)
}

/// Display panel buttons on the home view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayButton {
    Cancel,
    Skip,
    PauseResume,
}

/// Request for a display button; pause/play depends on the shown state label.
pub fn display_request(button: DisplayButton, state_label: &str) -> Request {
    match button {
        DisplayButton::Cancel => Request::get("/schd/cancel"),
        DisplayButton::Skip => Request::get("/schd/skip"),
        DisplayButton::PauseResume if state_label == "paused" => Request::get("/schd/resume"),
        DisplayButton::PauseResume => Request::get("/schd/pause"),
    }
}
