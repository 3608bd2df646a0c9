//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sprinkler_panel::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SpkError};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::logger::jsonl::JsonlConfig;

// Panel
pub use crate::panel::model::{PanelCmd, PanelModel, PanelMsg};
pub use crate::panel::registry::{ElementId, ElementRegistry};
pub use crate::panel::runtime::PanelRuntime;
pub use crate::panel::status::{StatusRecord, StatusSync, StreamEvent};
pub use crate::panel::update::update;
pub use crate::panel::views::{ViewId, ViewStack};

// Transport
pub use crate::transport::{
    Body, CurlTransport, EventSink, FetchResource, FetchResult, Request, StreamItem,
    SubscribeEvents, Subscription, Transport, TransportError,
};
